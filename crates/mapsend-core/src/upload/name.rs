//! Logical artifact URL for an uploaded sourcemap.

use std::path::Path;

/// Default prefix prepended to artifact names.
pub const DEFAULT_URL_PREFIX: &str = "~/";

/// `<url_prefix without trailing slash>/<file name without .map>`.
///
/// `dist/assets/index-4f2a.js.map` with prefix `~/` becomes
/// `~/index-4f2a.js`; with `https://cdn.example.com/static/` it becomes
/// `https://cdn.example.com/static/index-4f2a.js`.
pub fn artifact_name(path: &Path, url_prefix: &str) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let js_name = file_name.strip_suffix(".map").unwrap_or(&file_name);
    let prefix = url_prefix.strip_suffix('/').unwrap_or(url_prefix);
    format!("{}/{}", prefix, js_name)
}
