//! Unit discovery and the dispatch table built from it.
//!
//! Discovery walks the configured unit root once at startup, derives the
//! service name and path for every eligible file, and hands the result to
//! the lifecycle manager (for registration) and the dispatch table (for
//! serving). The walk is sorted by file name, so a fixed tree always yields
//! the same sequence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use unitdock_core::naming::{derive_service_name, derive_service_path};

/// One discovered unit.
///
/// `source` keeps the unit's real file path. The derived `path` is a service
/// identifier only; it is never resolved back to the filesystem, so units
/// whose names contain spaces or underscores stay executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitEntry {
    /// Derived service definition name.
    pub name: String,
    /// Derived service URI path, unique within one scan.
    pub path: String,
    /// Real path of the unit file.
    pub source: PathBuf,
}

/// Errors from scanning the unit root.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The walk itself failed (missing root, permission problem).
    #[error("cannot scan unit root {root}: {source}")]
    Walk {
        /// The configured unit root.
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Two unit files normalize to the same service path.
    #[error("units {first} and {second} both map to service path '{path}'")]
    DuplicatePath {
        /// The colliding derived path.
        path: String,
        /// First unit file claiming the path.
        first: PathBuf,
        /// Second unit file claiming the path.
        second: PathBuf,
    },
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Scans `root` for unit files with the given extension (without dot).
///
/// Hidden files and directories are skipped. Entries come back depth-first
/// in file-name order, which makes the scan deterministic for a fixed tree.
///
/// # Errors
///
/// Returns [`DiscoveryError::Walk`] when the tree cannot be read and
/// [`DiscoveryError::DuplicatePath`] when two units collide on one derived
/// service path.
pub fn scan_units(root: &Path, extension: &str) -> Result<Vec<UnitEntry>, DiscoveryError> {
    let mut entries = Vec::new();
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        let name = derive_service_name(&entry.file_name().to_string_lossy());
        let service_path = derive_service_path(relative);

        if let Some(first) = claimed.get(&service_path) {
            return Err(DiscoveryError::DuplicatePath {
                path: service_path,
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }
        claimed.insert(service_path.clone(), path.to_path_buf());

        debug!(unit = %path.display(), service = %name, path = %service_path, "discovered unit");

        entries.push(UnitEntry {
            name,
            path: service_path,
            source: entry.into_path(),
        });
    }

    Ok(entries)
}

/// Immutable mapping from service path to unit, built once before serving.
///
/// Handlers share the table through an `Arc` and only ever read it, so no
/// locking is involved on the request path.
#[derive(Debug, Default, Clone)]
pub struct DispatchTable {
    entries: HashMap<String, UnitEntry>,
}

impl DispatchTable {
    /// Builds the table from discovery output.
    ///
    /// Path uniqueness is guaranteed by [`scan_units`]; a later duplicate
    /// would silently win here, so tables are only ever built from one scan.
    #[must_use]
    pub fn new(units: Vec<UnitEntry>) -> Self {
        let entries = units
            .into_iter()
            .map(|unit| (unit.path.clone(), unit))
            .collect();
        Self { entries }
    }

    /// Looks up the unit serving `service_path`.
    #[must_use]
    pub fn lookup(&self, service_path: &str) -> Option<&UnitEntry> {
        self.entries.get(service_path)
    }

    /// Number of dispatchable units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no units at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All service paths, sorted, for startup logging.
    #[must_use]
    pub fn service_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}
