//! `mapsend deploy` – create a deploy marker without uploading.

use anyhow::{bail, Context, Result};
use mapsend_core::config::MapsendConfig;
use mapsend_core::control::CancelSignal;
use mapsend_core::deploy::DeployMarker;
use mapsend_core::revision::resolve_revision;
use std::path::Path;

pub async fn run_deploy(
    cfg: &MapsendConfig,
    root: &Path,
    revision: Option<&str>,
    cancel: &CancelSignal,
) -> Result<()> {
    cfg.validate_for_deploy()?;

    let explicit = revision.or(cfg.revision.as_deref());
    let Some(revision) = resolve_revision(explicit, root) else {
        bail!("revision is empty, please check your config");
    };

    let marker = DeployMarker {
        endpoint: cfg.deploy.endpoint.clone(),
        app_id: cfg.deploy.app_id.clone(),
        personal_api_token: cfg.deploy.personal_api_token.clone(),
        http: cfg.upload.http_options(),
    };
    marker
        .create(&revision, &cfg.deploy.retry.to_policy(), Some(cancel))
        .await
        .map_err(anyhow::Error::new)
        .context("Error while creating deploy marker")?;

    println!("Created deploy marker for revision {revision}");
    Ok(())
}
