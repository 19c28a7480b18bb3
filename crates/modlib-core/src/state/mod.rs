//! Process-wide engine state.
//!
//! All shared mutable state lives in one `EngineState` value behind a
//! single lock, passed by handle into every component — never an implicit
//! singleton. Idempotence checks and table insertions are only correct
//! because both happen under the same guard.

mod module_table;
mod resolution_cache;
mod scope;

pub use module_table::{CleanupAction, ModuleTable, ModuleTableEntry};
pub use resolution_cache::ResolutionCache;
pub use scope::{Scope, ScopeBinding};

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::module::{ModuleKey, ModuleRecord};

/// The engine's shared mutable state.
///
/// Two logical module tables are maintained: the "all sessions" table and
/// the "current scope" table. Both are updated through [`EngineState`]
/// methods so no observer ever sees one updated without the other.
#[derive(Debug, Default)]
pub struct EngineState {
    /// Every module loaded in this process, across all sessions.
    pub all_modules: ModuleTable,
    /// Modules visible in the caller's current scope.
    pub scope_modules: ModuleTable,
    /// Fast-path name-to-path resolution cache.
    pub cache: ResolutionCache,
    /// Member bindings in the caller's active scope.
    pub scope: Scope,
}

impl EngineState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a loaded module in the all-sessions table.
    #[must_use]
    pub fn lookup_loaded(&self, key: &ModuleKey) -> Option<&ModuleTableEntry> {
        self.all_modules.get(key)
    }

    /// Register a loaded module into both tables.
    ///
    /// Cleanup actions attach to the all-sessions entry only, so unload
    /// runs each action exactly once. Any displaced entry's cleanups are
    /// run first (forced reload replaces the old materialization).
    pub fn register(&mut self, record: Arc<ModuleRecord>, cleanups: Vec<CleanupAction>) {
        info!(module = %record.name, key = %record.key, "registering module");
        if let Some(displaced) = self.all_modules.insert(Arc::clone(&record), cleanups) {
            for action in &displaced.cleanups {
                action.run();
            }
        }
        self.scope_modules.insert(record, Vec::new());
    }

    /// Remove a module from both tables, run its cleanups front-to-back,
    /// and drop its scope members. Returns the unloaded record.
    pub fn unload(&mut self, key: &ModuleKey) -> Option<Arc<ModuleRecord>> {
        let entry = self.all_modules.remove(key)?;
        self.scope_modules.remove(key);
        self.scope.remove_module_members(key);
        info!(module = %entry.record.name, key = %key, "unloading module");
        for action in &entry.cleanups {
            action.run();
        }
        Some(entry.record)
    }
}

/// Shared handle to the engine state, passed into every component.
pub type SharedState = Arc<Mutex<EngineState>>;

/// Create a fresh shared state handle.
#[must_use]
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(EngineState::new()))
}
