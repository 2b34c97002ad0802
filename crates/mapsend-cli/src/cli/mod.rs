//! CLI for mapsend.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mapsend_core::client_config::ClientConfigFormat;
use mapsend_core::config;
use mapsend_core::control::CancelSignal;
use mapsend_core::logging;
use std::path::PathBuf;

use commands::{run_client_config, run_deploy, run_discover, run_upload};

/// Top-level CLI for mapsend.
#[derive(Debug, Parser)]
#[command(name = "mapsend")]
#[command(about = "mapsend: upload sourcemaps after a build and mark deploys", long_about = None)]
pub struct Cli {
    /// Config file (default: ./mapsend.toml, then ~/.config/mapsend/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root; include dirs are relative to it (default: current dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Verbose logging for mapsend itself.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload the build's sourcemaps, then optionally create a deploy marker.
    Upload(UploadArgs),

    /// Create a deploy marker only.
    Deploy {
        /// Revision to mark (default: config, then short git HEAD).
        #[arg(long)]
        revision: Option<String>,
    },

    /// List the sourcemaps an upload would send.
    Discover {
        /// Directory to search (repeatable; replaces `sourcemaps.include`).
        #[arg(long, value_name = "DIR")]
        include: Vec<String>,
        /// Glob to leave out (repeatable; added to `sourcemaps.exclude`).
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,
    },

    /// Print the client-side config exposing the revision.
    ClientConfig {
        #[arg(long)]
        revision: Option<String>,
        #[arg(long, value_enum, default_value = "json")]
        format: FormatArg,
    },
}

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    /// Revision to tag uploads with (default: config, then short git HEAD).
    #[arg(long)]
    pub revision: Option<String>,

    /// Directory to search (repeatable; replaces `sourcemaps.include`).
    #[arg(long, value_name = "DIR")]
    pub include: Vec<String>,

    /// Glob to leave out (repeatable; added to `sourcemaps.exclude`).
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    #[arg(long)]
    pub environment: Option<String>,

    /// Prefix for artifact names, e.g. `https://cdn.example.com/assets`.
    #[arg(long)]
    pub url_prefix: Option<String>,

    /// Files uploaded concurrently per batch; 0 uploads everything at once.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Build mode the sourcemaps came from.
    #[arg(long, value_enum, default_value = "production")]
    pub mode: BuildMode,

    /// The build did not emit sourcemaps.
    #[arg(long)]
    pub no_sourcemaps: bool,

    /// Server-side rendering build (never uploaded).
    #[arg(long)]
    pub ssr: bool,

    /// Upload even for non-production builds.
    #[arg(long)]
    pub skip_environment_check: bool,

    /// Create a deploy marker after uploading.
    #[arg(long)]
    pub deploy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildMode {
    Production,
    Development,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Module,
    Env,
}

impl From<FormatArg> for ClientConfigFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Json => ClientConfigFormat::Json,
            FormatArg::Module => ClientConfigFormat::Module,
            FormatArg::Env => ClientConfigFormat::Env,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let config_file = config::locate(self.config.as_deref(), &root);
        let cfg = config::load_located(config_file.as_deref())?;

        let debug = self.debug || cfg.debug;
        if let Err(e) = logging::init_logging(debug, self.log_file.as_deref()) {
            logging::init_logging_stderr(debug);
            tracing::warn!("could not open log file, logging to stderr: {:#}", e);
        }
        match &config_file {
            Some(path) => tracing::debug!("loaded config from {}", path.display()),
            None => tracing::debug!("no config file found, using defaults"),
        }
        tracing::debug!("loaded config: {:?}", cfg);

        let cancel = CancelSignal::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling pending requests");
                on_interrupt.cancel("interrupted");
            }
        });

        match self.command {
            CliCommand::Upload(args) => run_upload(cfg, &root, &args, &cancel).await?,
            CliCommand::Deploy { revision } => {
                run_deploy(&cfg, &root, revision.as_deref(), &cancel).await?
            }
            CliCommand::Discover { include, exclude } => {
                run_discover(cfg, &root, include, exclude)?
            }
            CliCommand::ClientConfig { revision, format } => {
                run_client_config(&cfg, &root, revision.as_deref(), format.into())?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
