//! Sourcemap discovery: `<root>/<include>/**/*.map` minus exclude globs.

use anyhow::{Context, Result};
use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Find sourcemaps under each include directory (relative to `root`).
///
/// Exclude patterns are globs matched against the root-relative path, any of
/// its parent directories, and the absolute path, so `dist/legacy` drops the
/// whole directory. Result is deduplicated and sorted.
pub fn find_sourcemaps(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let excludes = exclude
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid exclude pattern: {}", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut found = BTreeSet::new();
    for dir in include {
        let base = root.join(dir);
        let pattern = format!("{}/**/*.map", Pattern::escape(&base.to_string_lossy()));
        tracing::debug!("searching for sourcemaps in {}", pattern);

        let entries = glob::glob(&pattern).with_context(|| format!("invalid include path: {}", dir))?;
        for entry in entries {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("skipping unreadable path {}: {}", e.path().display(), e.error());
                    continue;
                }
            };
            if !path.is_file() || is_excluded(&path, root, &excludes) {
                continue;
            }
            found.insert(path);
        }
    }

    tracing::debug!("found sourcemaps: {}", found.len());
    Ok(found.into_iter().collect())
}

fn is_excluded(path: &Path, root: &Path, excludes: &[Pattern]) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let rel = path.strip_prefix(root).unwrap_or(path);
    excludes.iter().any(|pat| {
        pat.matches_path(path)
            || rel
                .ancestors()
                .filter(|a| !a.as_os_str().is_empty())
                .any(|a| pat.matches_path(a))
    })
}
