use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::DEFAULT_DEPLOY_ENDPOINT;
use crate::retry::RetryPolicy;
use crate::transport::HttpOptions;
use crate::upload::{DEFAULT_UPLOAD_ENDPOINT, DEFAULT_URL_PREFIX};

/// Project-local config file name, looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "mapsend.toml";

/// Retry parameters for one call site (`[upload.retry]`, `[deploy.retry]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Re-tries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub min_delay_ms: u64,
    /// Maximum backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Randomize delays within the bounds.
    #[serde(default)]
    pub jitter: bool,
}

impl RetryConfig {
    pub fn new(retries: u32, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            retries,
            min_delay_ms,
            max_delay_ms,
            jitter: false,
        }
    }

    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::from_retries(
            self.retries,
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .with_jitter(self.jitter)
    }
}

/// `[sourcemaps]`: where to look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcemapsConfig {
    /// Directories (relative to the project root) searched for `*.map`.
    pub include: Vec<String>,
    /// Globs of paths to leave out.
    pub exclude: Vec<String>,
}

impl Default for SourcemapsConfig {
    fn default() -> Self {
        Self {
            include: vec!["dist".to_string()],
            exclude: Vec::new(),
        }
    }
}

/// `[upload]`: ingestion endpoint, batching and retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: String,
    /// Files uploaded concurrently per batch; unset uploads everything at once.
    pub batch_size: Option<usize>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            batch_size: Some(10),
            connect_timeout_secs: 15,
            timeout_secs: 120,
            retry: RetryConfig::new(5, 500, 2000),
        }
    }
}

impl UploadConfig {
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// `[deploy]`: optional deploy marker after a successful upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub enabled: bool,
    pub app_id: String,
    pub personal_api_token: String,
    pub endpoint: String,
    pub retry: RetryConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            app_id: String::new(),
            personal_api_token: String::new(),
            endpoint: DEFAULT_DEPLOY_ENDPOINT.to_string(),
            retry: RetryConfig::new(3, 500, 2000),
        }
    }
}

/// Configuration loaded from `mapsend.toml` or `~/.config/mapsend/config.toml`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsendConfig {
    /// Application name as known to the monitoring service.
    pub app_name: String,
    /// Push API key for sourcemap ingestion.
    pub push_api_key: String,
    /// Revision to tag uploads with; defaults to the short git HEAD.
    pub revision: Option<String>,
    pub environment: String,
    /// Prefix for artifact names, e.g. `~/` or `https://cdn.example.com/assets`.
    pub url_prefix: String,
    /// Publish even for non-production builds.
    pub skip_environment_check: bool,
    /// Verbose logging.
    pub debug: bool,
    pub sourcemaps: SourcemapsConfig,
    pub upload: UploadConfig,
    pub deploy: DeployConfig,
}

impl Default for MapsendConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            push_api_key: String::new(),
            revision: None,
            environment: "production".to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            skip_environment_check: false,
            debug: false,
            sourcemaps: SourcemapsConfig::default(),
            upload: UploadConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

/// Placeholder printed instead of a configured secret.
fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("enabled", &self.enabled)
            .field("app_id", &self.app_id)
            .field("personal_api_token", &redact(&self.personal_api_token))
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .finish()
    }
}

impl fmt::Debug for MapsendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapsendConfig")
            .field("app_name", &self.app_name)
            .field("push_api_key", &redact(&self.push_api_key))
            .field("revision", &self.revision)
            .field("environment", &self.environment)
            .field("url_prefix", &self.url_prefix)
            .field("skip_environment_check", &self.skip_environment_check)
            .field("debug", &self.debug)
            .field("sourcemaps", &self.sourcemaps)
            .field("upload", &self.upload)
            .field("deploy", &self.deploy)
            .finish()
    }
}

/// Required setting missing for the requested operation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("`sourcemaps.include` must name at least one directory")]
    NoIncludeDirs,
}

impl MapsendConfig {
    pub fn validate_for_deploy(&self) -> Result<(), ConfigError> {
        if self.deploy.app_id.trim().is_empty() {
            return Err(ConfigError::Missing("deploy.app_id"));
        }
        if self.deploy.personal_api_token.trim().is_empty() {
            return Err(ConfigError::Missing("deploy.personal_api_token"));
        }
        Ok(())
    }
}

/// User-level config path (`$XDG_CONFIG_HOME/mapsend/config.toml`).
pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mapsend")?;
    Ok(xdg_dirs.get_config_home().join("config.toml"))
}

/// Parse a config file.
pub fn load_from_path(path: &Path) -> Result<MapsendConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: MapsendConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Config file to read: `explicit` (returned even if missing, so loading it
/// reports the error), else `<dir>/mapsend.toml`, else the user config file.
/// `None` means built-in defaults.
pub fn locate(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = dir.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    config_path().ok().filter(|user| user.is_file())
}

/// Config at `path`, or defaults when there is none.
pub fn load_located(path: Option<&Path>) -> Result<MapsendConfig> {
    match path {
        Some(path) => load_from_path(path),
        None => Ok(MapsendConfig::default()),
    }
}

/// Load configuration following the `locate` lookup order.
pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<MapsendConfig> {
    let path = locate(explicit, dir);
    match &path {
        Some(p) => tracing::debug!("loading config from {}", p.display()),
        None => tracing::debug!("no config file found, using defaults"),
    }
    load_located(path.as_deref())
}
