//! Remote module importers for modlib.
//!
//! - `staging` - deterministic staging paths and rollback guards
//! - `classify` - inventory file classification and staged-name generation
//! - `session` - proxy imports through an interactive remote session
//! - `inventory` - flattening imports from a management/inventory endpoint

pub mod classify;
mod inventory;
mod session;
pub mod staging;

pub use classify::RECOGNIZED_CMDLET_ADAPTER;
pub use inventory::{InventoryImporter, ENDPOINT_PRIVATE_KEY};
pub use session::SessionImporter;

use std::sync::Arc;

use modlib_core::{ImportFailure, ImportWarning, ModuleRecord};

/// The outcome of a batch remote import: successes, per-item failures,
/// and non-fatal warnings, all reported without aborting siblings.
#[derive(Debug, Default)]
pub struct ImportBatch {
    /// Successfully produced module records, in import order.
    pub records: Vec<Arc<ModuleRecord>>,
    /// Per-item failures, wrapped with the requested identifier.
    pub failures: Vec<ImportFailure>,
    /// Non-fatal conditions (partial capability and the like).
    pub warnings: Vec<ImportWarning>,
}

impl ImportBatch {
    /// Whether every requested item imported cleanly.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}
