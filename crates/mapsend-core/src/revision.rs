//! Revision discovery: explicit value or the short git HEAD.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

/// `git rev-parse --short HEAD` in `repo_dir`.
pub fn git_short_head(repo_dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(repo_dir)
        .output()
        .context("failed to run git")?;
    if !output.status.success() {
        bail!(
            "git rev-parse failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Resolve the revision from `explicit` or, when that is missing or empty,
/// from `fallback`. Trimmed; `None` if nothing usable comes back.
pub fn resolve_with<F>(explicit: Option<&str>, fallback: F) -> Option<String>
where
    F: FnOnce() -> Result<String>,
{
    let raw = match explicit.filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => match fallback() {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!("could not determine revision from git: {:#}", e);
                return None;
            }
        },
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Explicit revision, else the short git HEAD of `repo_dir`.
pub fn resolve_revision(explicit: Option<&str>, repo_dir: &Path) -> Option<String> {
    resolve_with(explicit, || git_short_head(repo_dir))
}
