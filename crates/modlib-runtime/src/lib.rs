//! Import orchestrator for modlib.
//!
//! - `request` - caller-facing request/report DTOs
//! - `engine` - dispatch, registration, and member import

mod engine;
mod request;

pub use engine::{prefixed_name, ImportEngine};
pub use request::{ImportOptions, ImportReport, ImportTarget};

// Re-export the pieces callers need alongside the engine
pub use modlib_core::{
    EngineSettings, ImportError, ImportFailure, ImportWarning, ModuleKey, ModuleRecord,
    ModuleSpecification, ResolvedModuleDescriptor, SharedState,
};
