//! Core domain types, ports, and shared state for the modlib module engine.
//!
//! This crate carries everything the resolver, importers, and orchestrator
//! share: the version/specification/manifest domain model, the error
//! taxonomy, the opaque remote ports, and the process-wide state handle.

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;
pub mod state;

// Re-export commonly used types for convenience
pub use domain::{
    parse_manifest, ExportedMembers, FileKind, ManifestError, ManifestTable, ManifestValue,
    MemberKind, ModuleKey, ModuleManifest, ModuleRecord, ModuleSpecification, ModuleType,
    ModuleVersion, PsData, RemoteBinding, ResolvedModuleDescriptor, SourceZone, StagedFile,
    VersionConstraint, ANY_VERSION,
};
pub use error::{ImportError, ImportFailure, ImportWarning, TransportError};
pub use ports::{
    InventoryEndpointPort, InventoryModuleDescriptor, RemoteModuleFile, RemoteModuleInfo,
    RemoteSessionPort,
};
pub use settings::{EngineSettings, SettingsError, SEARCH_PATH_ENV, STAGING_DIR_ENV};
pub use state::{
    new_shared_state, CleanupAction, EngineState, ModuleTable, ModuleTableEntry, ResolutionCache,
    Scope, ScopeBinding, SharedState,
};

// Silence unused dev-dependency warnings; these back the async state tests.
#[cfg(test)]
use tokio_test as _;
