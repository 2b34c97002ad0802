//! `mapsend client-config` – print the revision payload for client bundles.

use anyhow::Result;
use mapsend_core::client_config::{ClientConfig, ClientConfigFormat};
use mapsend_core::config::MapsendConfig;
use mapsend_core::revision::resolve_revision;
use std::path::Path;

pub fn run_client_config(
    cfg: &MapsendConfig,
    root: &Path,
    revision: Option<&str>,
    format: ClientConfigFormat,
) -> Result<()> {
    let explicit = revision.or(cfg.revision.as_deref());
    let release = resolve_revision(explicit, root);
    if release.is_none() {
        tracing::warn!("no revision found, client config will not carry a release");
    }

    let rendered = ClientConfig::new(release).render(format)?;
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
    Ok(())
}
