//! Core domain types, independent of any infrastructure concerns.

pub mod manifest;
pub mod module;
pub mod specification;
pub mod version;

pub use manifest::{
    parse_manifest, ManifestError, ManifestTable, ManifestValue, ModuleManifest, PsData,
};
pub use module::{
    ExportedMembers, FileKind, MemberKind, ModuleKey, ModuleRecord, ModuleType, RemoteBinding,
    ResolvedModuleDescriptor, SourceZone, StagedFile,
};
pub use specification::ModuleSpecification;
pub use version::{ModuleVersion, VersionConstraint, ANY_VERSION};
