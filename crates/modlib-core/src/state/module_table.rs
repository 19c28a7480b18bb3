//! The module table: loaded modules keyed by resolved path or synthetic key.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::domain::module::{ModuleKey, ModuleRecord, ResolvedModuleDescriptor};

/// A deferred cleanup action attached to a module-table entry.
///
/// Cleanups are an explicit ordered list, executed front-to-back when the
/// entry is removed. Chaining a new action puts it in front of whatever was
/// already there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// Recursively delete a staging directory.
    RemoveDirAll(PathBuf),
}

impl CleanupAction {
    /// Execute the action. Failures are logged, not propagated: unload must
    /// make progress even when a staging directory is already gone.
    pub fn run(&self) {
        match self {
            Self::RemoveDirAll(path) => {
                debug!(path = %path.display(), "removing staging directory");
                if let Err(error) = std::fs::remove_dir_all(path) {
                    if error.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            path = %path.display(),
                            %error,
                            "failed to remove staging directory during unload"
                        );
                    }
                }
            }
        }
    }
}

/// One loaded module plus its deferred cleanups.
#[derive(Debug, Clone)]
pub struct ModuleTableEntry {
    /// The loaded module record.
    pub record: Arc<ModuleRecord>,
    /// Cleanup actions, run front-to-back on removal.
    pub cleanups: Vec<CleanupAction>,
}

/// Map from resolved key to loaded module record.
///
/// The table holds at most one entry per key: this is the engine's source
/// of idempotence. Callers check-then-insert under the owning state lock.
#[derive(Debug, Default)]
pub struct ModuleTable {
    entries: IndexMap<ModuleKey, ModuleTableEntry>,
}

impl ModuleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a loaded module by key.
    #[must_use]
    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleTableEntry> {
        self.entries.get(key)
    }

    /// Whether a key is loaded.
    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a record under its own key, replacing any previous entry.
    ///
    /// Returns the displaced entry so the caller can decide whether its
    /// cleanups should run (forced reload) or be discarded.
    pub fn insert(
        &mut self,
        record: Arc<ModuleRecord>,
        cleanups: Vec<CleanupAction>,
    ) -> Option<ModuleTableEntry> {
        let key = record.key.clone();
        self.entries.insert(key, ModuleTableEntry { record, cleanups })
    }

    /// Remove an entry. The caller runs the returned entry's cleanups.
    pub fn remove(&mut self, key: &ModuleKey) -> Option<ModuleTableEntry> {
        self.entries.shift_remove(key)
    }

    /// Chain a cleanup action in front of an entry's existing list.
    pub fn prepend_cleanup(&mut self, key: &ModuleKey, action: CleanupAction) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.cleanups.insert(0, action);
        }
    }

    /// Find the first loaded record with the given module name
    /// (case-insensitive), in load order.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&ModuleTableEntry> {
        self.entries
            .values()
            .find(|entry| entry.record.name.eq_ignore_ascii_case(name))
    }

    /// Snapshot descriptors for every loaded module, in load order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ResolvedModuleDescriptor> {
        self.entries
            .values()
            .map(|entry| entry.record.descriptor())
            .collect()
    }

    /// Number of loaded modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no modules are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
