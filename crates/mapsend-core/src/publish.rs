//! Post-build pipeline: gate, revision, discovery, batched upload, deploy marker.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::PathBuf;

use crate::config::{ConfigError, MapsendConfig};
use crate::control::CancelSignal;
use crate::deploy::DeployMarker;
use crate::discover::find_sourcemaps;
use crate::gate::{evaluate, BuildContext, GateDecision, SkipReason};
use crate::retry::RetryPolicy;
use crate::revision::resolve_revision;
use crate::scheduler::{run_uploads, UploadOptions, UploadReport, UploadTask};
use crate::transport::HttpOptions;
use crate::upload::SourcemapUploader;

/// Deploy marker step, present when `[deploy]` is enabled.
#[derive(Debug, Clone)]
pub struct DeployStep {
    pub marker: DeployMarker,
    pub retry: RetryPolicy,
}

/// Everything a publish run needs, computed once from config and build context.
#[derive(Clone)]
pub struct PublishPlan {
    /// Project root; include dirs are relative to it and git runs here.
    pub root: PathBuf,
    pub build: BuildContext,
    pub skip_environment_check: bool,
    /// Explicit revision; falls back to the short git HEAD when unset.
    pub revision: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub upload_endpoint: String,
    pub push_api_key: String,
    pub app_name: String,
    pub environment: String,
    pub url_prefix: String,
    pub http: HttpOptions,
    pub upload: UploadOptions,
    pub deploy: Option<DeployStep>,
}

impl PublishPlan {
    /// Credentials are not checked here; `publish` checks them once the
    /// gate decides to run, so skipped builds need none.
    pub fn from_config(cfg: &MapsendConfig, build: BuildContext, root: impl Into<PathBuf>) -> Result<Self> {
        let http = cfg.upload.http_options();
        let deploy = if cfg.deploy.enabled {
            Some(DeployStep {
                marker: DeployMarker {
                    endpoint: cfg.deploy.endpoint.clone(),
                    app_id: cfg.deploy.app_id.clone(),
                    personal_api_token: cfg.deploy.personal_api_token.clone(),
                    http,
                },
                retry: cfg.deploy.retry.to_policy(),
            })
        } else {
            None
        };

        Ok(Self {
            root: root.into(),
            build,
            skip_environment_check: cfg.skip_environment_check,
            revision: cfg.revision.clone(),
            include: cfg.sourcemaps.include.clone(),
            exclude: cfg.sourcemaps.exclude.clone(),
            upload_endpoint: cfg.upload.endpoint.clone(),
            push_api_key: cfg.push_api_key.clone(),
            app_name: cfg.app_name.clone(),
            environment: cfg.environment.clone(),
            url_prefix: cfg.url_prefix.clone(),
            http,
            upload: UploadOptions {
                batch_size: cfg.upload.batch_size,
                retry: cfg.upload.retry.to_policy(),
            },
            deploy,
        })
    }

    /// Settings required to actually upload (and mark the deploy, if enabled).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::Missing("app_name"));
        }
        if self.push_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("push_api_key"));
        }
        if self.include.is_empty() {
            return Err(ConfigError::NoIncludeDirs);
        }
        if let Some(step) = &self.deploy {
            if step.marker.app_id.trim().is_empty() {
                return Err(ConfigError::Missing("deploy.app_id"));
            }
            if step.marker.personal_api_token.trim().is_empty() {
                return Err(ConfigError::Missing("deploy.personal_api_token"));
            }
        }
        Ok(())
    }

    fn uploader(&self, revision: &str) -> SourcemapUploader {
        SourcemapUploader {
            endpoint: self.upload_endpoint.clone(),
            push_api_key: self.push_api_key.clone(),
            app_name: self.app_name.clone(),
            environment: self.environment.clone(),
            url_prefix: self.url_prefix.clone(),
            revision: revision.to_string(),
            http: self.http,
        }
    }
}

impl fmt::Debug for PublishPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishPlan")
            .field("root", &self.root)
            .field("build", &self.build)
            .field("skip_environment_check", &self.skip_environment_check)
            .field("revision", &self.revision)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("upload_endpoint", &self.upload_endpoint)
            .field("push_api_key", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("environment", &self.environment)
            .field("url_prefix", &self.url_prefix)
            .field("upload", &self.upload)
            .field("deploy", &self.deploy)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Gate said no; nothing was resolved or sent.
    Skipped(SkipReason),
    /// No `*.map` files under the include dirs.
    NoSourcemaps { revision: String },
    Uploaded {
        revision: String,
        files: usize,
        batches: usize,
        deploy_marker: bool,
    },
}

/// Run the whole pipeline for one finished build.
pub async fn publish(plan: &PublishPlan, cancel: Option<&CancelSignal>) -> Result<PublishOutcome> {
    match evaluate(&plan.build, plan.skip_environment_check) {
        GateDecision::Skip(reason) => {
            match reason.warning() {
                Some(msg) => tracing::warn!("{}", msg),
                None => tracing::debug!("server-side build, not publishing sourcemaps"),
            }
            return Ok(PublishOutcome::Skipped(reason));
        }
        GateDecision::Run { non_production } => {
            if non_production {
                tracing::warn!("Running in non-production mode!");
            }
        }
    }

    plan.validate()?;

    let Some(revision) = resolve_revision(plan.revision.as_deref(), &plan.root) else {
        bail!("revision is empty, please check your config");
    };
    tracing::info!(revision = %revision, "publishing sourcemaps");

    let files = find_sourcemaps(&plan.root, &plan.include, &plan.exclude)?;
    if files.is_empty() {
        tracing::warn!("No sourcemaps found, skipping upload");
        return Ok(PublishOutcome::NoSourcemaps { revision });
    }

    let uploader = plan.uploader(&revision);
    let tasks = uploader.tasks_for(&files);
    let uploader = &uploader;
    let report = run_uploads(
        &tasks,
        |task: &UploadTask| {
            let task = task.clone();
            async move { uploader.upload(&task).await }
        },
        &plan.upload,
        cancel,
    )
    .await
    .map_err(anyhow::Error::new)
    .context("Error while uploading sourcemaps")?;

    let (files, batches) = match report {
        UploadReport::NothingToDo => (0, 0),
        UploadReport::Completed { uploaded, batches } => (uploaded, batches),
    };
    tracing::info!(files, batches, "uploaded sourcemaps");

    let deploy_marker = match &plan.deploy {
        Some(step) => {
            step.marker
                .create(&revision, &step.retry, cancel)
                .await
                .map_err(anyhow::Error::new)
                .context("Error while creating deploy marker")?;
            tracing::info!(revision = %revision, "created deploy marker");
            true
        }
        None => false,
    };

    Ok(PublishOutcome::Uploaded {
        revision,
        files,
        batches,
        deploy_marker,
    })
}
