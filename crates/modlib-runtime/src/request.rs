//! Import request and report types.
//!
//! These are the orchestrator's caller-facing DTOs: what to import, how,
//! and what happened per item.

use std::path::PathBuf;
use std::sync::Arc;

use modlib_core::{
    ImportFailure, ImportWarning, ModuleRecord, ModuleSpecification, ResolvedModuleDescriptor,
};

/// One item of a local import request.
#[derive(Debug, Clone)]
pub enum ImportTarget {
    /// A bare name or path string, resolved through the full ladder.
    Name(String),
    /// A fully-qualified specification (name plus version/GUID constraints).
    Spec(ModuleSpecification),
    /// An explicit filesystem path.
    Path(PathBuf),
    /// An already-resolved descriptor from a previous resolution.
    Descriptor(ResolvedModuleDescriptor),
}

impl ImportTarget {
    /// The identifier to report this item under.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Spec(spec) => spec.name().to_string(),
            Self::Path(path) => path.display().to_string(),
            Self::Descriptor(descriptor) => descriptor.key.to_string(),
        }
    }
}

/// Options shared by every import path.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Reload even when an entry already exists for the key.
    pub force: bool,
    /// Import the module's exported members into the caller's scope.
    pub import_members: bool,
    /// Optional member-name prefix (inserted after the verb dash).
    pub prefix: Option<String>,
    /// Skip members whose name already exists in scope instead of
    /// overwriting.
    pub no_clobber: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            force: false,
            import_members: true,
            prefix: None,
            no_clobber: false,
        }
    }
}

/// The outcome of one logical import request.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Successfully imported module records, in request order.
    pub imported: Vec<Arc<ModuleRecord>>,
    /// Per-item failures; siblings keep processing.
    pub failures: Vec<ImportFailure>,
    /// Non-fatal warnings.
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    /// Whether every item imported cleanly.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}
