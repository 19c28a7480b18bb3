//! Fast-path resolution cache: bare module name to last-resolved path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Process-wide map from bare module name to the absolute path it last
/// resolved to. Entries live for the process lifetime and are evicted
/// lazily when the cached path no longer exists on disk.
///
/// Names are compared case-insensitively, matching module-name semantics
/// elsewhere in the engine.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, PathBuf>,
}

impl ResolutionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached path, evicting it when stale.
    ///
    /// Returns the path only when it still exists on disk; a stale entry is
    /// removed and the caller falls through to full resolution.
    pub fn lookup(&mut self, name: &str) -> Option<PathBuf> {
        let key = Self::key(name);
        let path = self.entries.get(&key)?;
        if path.exists() {
            return Some(path.clone());
        }
        debug!(name, path = %path.display(), "evicting stale resolution cache entry");
        self.entries.remove(&key);
        None
    }

    /// Record the resolved path for a name.
    pub fn store(&mut self, name: &str, path: &Path) {
        self.entries.insert(Self::key(name), path.to_path_buf());
    }

    /// Drop an entry regardless of staleness.
    pub fn evict(&mut self, name: &str) {
        self.entries.remove(&Self::key(name));
    }

    /// Number of cached names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }
}
