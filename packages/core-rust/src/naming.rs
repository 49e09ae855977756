//! Deterministic derivation of service names and paths from unit files.
//!
//! A unit file such as `machine vision/read_meter.ipynb` becomes the service
//! name `read-meter` served under the path `machine-vision/read-meter`. The
//! derived strings are permanent identifiers for the life of the process, so
//! the rules here must be stable: every run of whitespace or underscore
//! characters collapses to a single hyphen, and only the final extension is
//! stripped.

use std::path::Path;

/// Collapses every run of whitespace or underscore characters into one hyphen.
///
/// Idempotent: the output contains neither whitespace nor underscores, so a
/// second application returns the input unchanged.
#[must_use]
pub fn normalize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for ch in raw.chars() {
        if ch.is_whitespace() || ch == '_' {
            if !in_run {
                out.push('-');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Derives the service definition name from a unit file name.
///
/// The final extension is stripped (`a.b.ipynb` keeps its inner `a.b`), then
/// the remainder is normalized.
#[must_use]
pub fn derive_service_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map_or(file_name, |s| s.to_str().unwrap_or(file_name));
    normalize_token(stem)
}

/// Derives the service URI path from a unit's path relative to the scan root.
///
/// The final extension is stripped and each path component is normalized
/// independently; components are joined with `/` regardless of the platform
/// separator, since the result is a URI path.
#[must_use]
pub fn derive_service_path(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    let components: Vec<String> = without_ext
        .components()
        .map(|c| normalize_token(&c.as_os_str().to_string_lossy()))
        .collect();
    components.join("/")
}
