//! `mapsend discover` – list sourcemaps and the names they would upload under.

use anyhow::Result;
use mapsend_core::config::MapsendConfig;
use mapsend_core::discover::find_sourcemaps;
use mapsend_core::upload::artifact_name;
use std::path::Path;

pub fn run_discover(
    mut cfg: MapsendConfig,
    root: &Path,
    include: Vec<String>,
    exclude: Vec<String>,
) -> Result<()> {
    if !include.is_empty() {
        cfg.sourcemaps.include = include;
    }
    cfg.sourcemaps.exclude.extend(exclude);

    let found = find_sourcemaps(root, &cfg.sourcemaps.include, &cfg.sourcemaps.exclude)?;
    if found.is_empty() {
        println!("No sourcemaps found under {}", cfg.sourcemaps.include.join(", "));
        return Ok(());
    }
    for path in &found {
        let shown = path.strip_prefix(root).unwrap_or(path);
        println!("{}  ->  {}", shown.display(), artifact_name(path, &cfg.url_prefix));
    }
    println!("{} sourcemap(s)", found.len());
    Ok(())
}
