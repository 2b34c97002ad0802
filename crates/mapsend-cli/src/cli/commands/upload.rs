//! `mapsend upload` – publish the build's sourcemaps.

use anyhow::Result;
use mapsend_core::config::MapsendConfig;
use mapsend_core::control::CancelSignal;
use mapsend_core::gate::BuildContext;
use mapsend_core::publish::{publish, PublishOutcome, PublishPlan};
use std::path::Path;

use crate::cli::{BuildMode, UploadArgs};

pub async fn run_upload(
    mut cfg: MapsendConfig,
    root: &Path,
    args: &UploadArgs,
    cancel: &CancelSignal,
) -> Result<()> {
    apply_overrides(&mut cfg, args);
    let plan = PublishPlan::from_config(&cfg, build_context(args), root)?;

    match publish(&plan, Some(cancel)).await? {
        PublishOutcome::Skipped(reason) => {
            tracing::debug!(?reason, "upload skipped");
        }
        PublishOutcome::NoSourcemaps { revision } => {
            println!("No sourcemaps to upload for revision {revision}");
        }
        PublishOutcome::Uploaded {
            revision,
            files,
            batches,
            deploy_marker,
        } => {
            println!("Uploaded {files} sourcemap(s) in {batches} batch(es) for revision {revision}");
            if deploy_marker {
                println!("Created deploy marker for revision {revision}");
            }
        }
    }
    Ok(())
}

/// Command-line flags win over file values.
fn apply_overrides(cfg: &mut MapsendConfig, args: &UploadArgs) {
    if let Some(rev) = &args.revision {
        cfg.revision = Some(rev.clone());
    }
    if !args.include.is_empty() {
        cfg.sourcemaps.include = args.include.clone();
    }
    cfg.sourcemaps.exclude.extend(args.exclude.iter().cloned());
    if let Some(env) = &args.environment {
        cfg.environment = env.clone();
    }
    if let Some(prefix) = &args.url_prefix {
        cfg.url_prefix = prefix.clone();
    }
    if let Some(n) = args.batch_size {
        cfg.upload.batch_size = Some(n);
    }
    if args.skip_environment_check {
        cfg.skip_environment_check = true;
    }
    if args.deploy {
        cfg.deploy.enabled = true;
    }
}

fn build_context(args: &UploadArgs) -> BuildContext {
    BuildContext {
        production: args.mode == BuildMode::Production,
        sourcemaps: !args.no_sourcemaps,
        ssr: args.ssr,
    }
}
