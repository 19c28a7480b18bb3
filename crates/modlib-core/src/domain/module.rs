//! Loaded-module domain types.
//!
//! These types represent modules in the engine, independent of any
//! infrastructure concerns. `ModuleRecord` is the in-process record of a
//! loaded module; `ResolvedModuleDescriptor` is the immutable, UI-safe
//! identity produced by resolution.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::manifest::{ManifestTable, ModuleManifest};
use super::version::ModuleVersion;
use crate::ports::{InventoryEndpointPort, RemoteSessionPort};

/// The kind of artifact a module was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleType {
    /// A loose script (`.ps1`) or script module (`.psm1`).
    Script,
    /// A compiled binary module (`.dll`).
    Binary,
    /// A manifest-described composite (`.psd1`).
    Manifest,
    /// A CIM-backed cmdlet-adapter module (`.cdxml`).
    Cim,
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Script => "Script",
            Self::Binary => "Binary",
            Self::Manifest => "Manifest",
            Self::Cim => "Cim",
        };
        f.write_str(name)
    }
}

/// The module-table key: a concrete artifact path, or a synthetic key for
/// modules materialized from in-memory data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKey {
    Path(PathBuf),
    Synthetic(String),
}

impl ModuleKey {
    /// Borrow the concrete path, when this key names one.
    #[must_use]
    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Path(path) => Some(path),
            Self::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Synthetic(key) => write!(f, "<{key}>"),
        }
    }
}

impl From<PathBuf> for ModuleKey {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// The immutable identity of a resolved module artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedModuleDescriptor {
    /// Table key the artifact resolves to.
    pub key: ModuleKey,
    /// Artifact kind.
    pub module_type: ModuleType,
    /// Declared version (manifest-described modules only).
    pub version: Option<ModuleVersion>,
    /// Declared GUID, when the manifest pins one.
    pub guid: Option<Uuid>,
    /// Identity of the remote host the artifact came from, if any.
    pub source_host_id: Option<String>,
}

/// Exported member name lists, straight from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMembers {
    pub functions: Vec<String>,
    pub cmdlets: Vec<String>,
    pub variables: Vec<String>,
    pub aliases: Vec<String>,
}

/// The kind of an exported member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Function,
    Cmdlet,
    Variable,
    Alias,
}

impl ExportedMembers {
    /// Iterate all members with their kinds, in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = (MemberKind, &str)> {
        self.functions
            .iter()
            .map(|n| (MemberKind::Function, n.as_str()))
            .chain(self.cmdlets.iter().map(|n| (MemberKind::Cmdlet, n.as_str())))
            .chain(
                self.variables
                    .iter()
                    .map(|n| (MemberKind::Variable, n.as_str())),
            )
            .chain(self.aliases.iter().map(|n| (MemberKind::Alias, n.as_str())))
    }

    /// Whether no members are declared at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.cmdlets.is_empty()
            && self.variables.is_empty()
            && self.aliases.is_empty()
    }
}

/// Classification of a file belonging to a remote-sourced module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// A cmdlet-adapter definition (`.cdxml`).
    Cmdletization,
    /// A type-extension table (`.ps1xml` named in `TypesToProcess`).
    Types,
    /// A format-extension table (`.ps1xml` named in `FormatsToProcess`).
    Formats,
    /// The module manifest (`.psd1`).
    Manifest,
    /// Anything else.
    Other,
}

/// Zone-of-origin marking for files materialized from a remote source,
/// consumed by downstream trust checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceZone {
    /// The local machine.
    Local,
    /// An intranet/managed source (remote session or inventory endpoint).
    Intranet,
}

/// A file written into a staging directory during a remote import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// Where the file was written locally.
    pub path: PathBuf,
    /// What the file is, per the classification rules.
    pub kind: FileKind,
    /// Zone-of-origin marking.
    pub zone: SourceZone,
}

/// The remote handle a proxy module forwards its invocations through.
#[derive(Clone)]
pub enum RemoteBinding {
    /// Commands forward into an interactive remote session.
    Session(Arc<dyn RemoteSessionPort>),
    /// Object operations are issued against an inventory endpoint.
    Inventory(Arc<dyn InventoryEndpointPort>),
}

impl RemoteBinding {
    /// The identity string of the bound remote source.
    #[must_use]
    pub fn host_id(&self) -> String {
        match self {
            Self::Session(session) => session.host_id(),
            Self::Inventory(endpoint) => endpoint.endpoint_id(),
        }
    }
}

impl fmt::Debug for RemoteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(session) => write!(f, "RemoteBinding::Session({})", session.host_id()),
            Self::Inventory(endpoint) => {
                write!(f, "RemoteBinding::Inventory({})", endpoint.endpoint_id())
            }
        }
    }
}

/// A loaded module in the current process.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Module name as it appears to the host.
    pub name: String,
    /// Declared version, when manifest-described.
    pub version: Option<ModuleVersion>,
    /// Declared GUID, when manifest-described.
    pub guid: Option<Uuid>,
    /// Artifact kind.
    pub module_type: ModuleType,
    /// Table key for this record.
    pub key: ModuleKey,
    /// Concrete artifact path, absent for in-memory loads.
    pub path: Option<PathBuf>,
    /// The typed manifest view, for manifest-described modules.
    pub manifest: Option<ModuleManifest>,
    /// Exported members.
    pub exports: ExportedMembers,
    /// Nested module records produced during the load.
    pub nested: Vec<ModuleRecord>,
    /// Declared cmdlet adapter, for cmdlet-adapter units.
    pub adapter: Option<String>,
    /// Remote source this module forwards to, if any.
    pub remote: Option<RemoteBinding>,
    /// Private data table (manifest `PrivateData` plus engine injections).
    pub private_data: ManifestTable,
    /// Files materialized into this module's staging directory.
    pub staged_files: Vec<StagedFile>,
    /// Identity of the remote host the artifact came from.
    pub source_host_id: Option<String>,
    /// When the record was created.
    pub loaded_at: DateTime<Utc>,
}

impl ModuleRecord {
    /// Create a minimal record for a local artifact.
    #[must_use]
    pub fn new(name: impl Into<String>, module_type: ModuleType, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            version: None,
            guid: None,
            module_type,
            key: ModuleKey::Path(path.clone()),
            path: Some(path),
            manifest: None,
            exports: ExportedMembers::default(),
            nested: Vec::new(),
            adapter: None,
            remote: None,
            private_data: ManifestTable::default(),
            staged_files: Vec::new(),
            source_host_id: None,
            loaded_at: Utc::now(),
        }
    }

    /// The immutable descriptor for this record.
    #[must_use]
    pub fn descriptor(&self) -> ResolvedModuleDescriptor {
        ResolvedModuleDescriptor {
            key: self.key.clone(),
            module_type: self.module_type,
            version: self.version,
            guid: self.guid,
            source_host_id: self.source_host_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_members_iterate_in_manifest_order() {
        let exports = ExportedMembers {
            functions: vec!["Get-Disk".into()],
            cmdlets: vec!["Set-Disk".into()],
            variables: vec!["DiskDefaults".into()],
            aliases: vec!["gd".into()],
        };
        let members: Vec<_> = exports.iter().collect();
        assert_eq!(
            members,
            vec![
                (MemberKind::Function, "Get-Disk"),
                (MemberKind::Cmdlet, "Set-Disk"),
                (MemberKind::Variable, "DiskDefaults"),
                (MemberKind::Alias, "gd"),
            ]
        );
    }

    #[test]
    fn descriptor_reflects_record_identity() {
        let mut record =
            ModuleRecord::new("Disk", ModuleType::Manifest, PathBuf::from("/m/Disk.psd1"));
        record.version = Some("1.2".parse().unwrap());
        let descriptor = record.descriptor();
        assert_eq!(descriptor.module_type, ModuleType::Manifest);
        assert_eq!(descriptor.key, ModuleKey::Path(PathBuf::from("/m/Disk.psd1")));
        assert_eq!(descriptor.version, Some("1.2".parse().unwrap()));
    }

    #[test]
    fn synthetic_keys_display_bracketed() {
        let key = ModuleKey::Synthetic("endpoint/Disk/1.0".into());
        assert_eq!(key.to_string(), "<endpoint/Disk/1.0>");
        assert!(key.as_path().is_none());
    }
}
