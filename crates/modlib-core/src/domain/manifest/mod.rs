//! Module manifest data model.
//!
//! A manifest is data, not code: a key/value table describing a module's
//! composition. Values are a closed tagged union (text, list-of-text,
//! nested table, opaque) and every conversion out of that union is an
//! explicit fallible function.
//!
//! The text format is parsed by [`parser::parse_manifest`], which never
//! evaluates script content.

mod parser;

pub use parser::parse_manifest;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::module::ExportedMembers;
use super::version::ModuleVersion;

/// Errors produced while parsing or interpreting manifest data.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest text is not well-formed restricted data.
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A value had a shape the consuming key cannot accept.
    #[error("key '{key}': expected {expected}, found {found}")]
    UnexpectedType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A value failed to parse as a module version.
    #[error("key '{key}': malformed version string '{text}'")]
    BadVersion { key: String, text: String },

    /// A value failed to parse as a GUID.
    #[error("key '{key}': malformed GUID '{text}'")]
    BadGuid { key: String, text: String },
}

/// A manifest value: the closed union of shapes manifest data can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    /// A quoted string.
    Text(String),
    /// An array of strings.
    List(Vec<String>),
    /// A nested key/value table.
    Table(ManifestTable),
    /// A bare token carried through verbatim (`$true`, numbers, ...).
    Opaque(String),
}

impl ManifestValue {
    /// Human-readable shape name, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Table(_) => "table",
            Self::Opaque(_) => "opaque token",
        }
    }

    /// Borrow the text content when this value is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Opaque(text) => Some(text),
            _ => None,
        }
    }

    /// Coerce to a list of strings. Scalars become one-element lists.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnexpectedType`] for nested tables.
    pub fn to_string_list(&self, key: &str) -> Result<Vec<String>, ManifestError> {
        match self {
            Self::Text(text) | Self::Opaque(text) => Ok(vec![text.clone()]),
            Self::List(items) => Ok(items.clone()),
            Self::Table(_) => Err(ManifestError::UnexpectedType {
                key: key.to_string(),
                expected: "text or list",
                found: self.kind(),
            }),
        }
    }

    /// Coerce to a module version.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::BadVersion`] when the text does not parse,
    /// or [`ManifestError::UnexpectedType`] for non-textual values.
    pub fn to_version(&self, key: &str) -> Result<ModuleVersion, ManifestError> {
        let text = self.as_text().ok_or_else(|| ManifestError::UnexpectedType {
            key: key.to_string(),
            expected: "version text",
            found: self.kind(),
        })?;
        text.parse().map_err(|_| ManifestError::BadVersion {
            key: key.to_string(),
            text: text.to_string(),
        })
    }

    /// Coerce to a GUID.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::BadGuid`] when the text does not parse,
    /// or [`ManifestError::UnexpectedType`] for non-textual values.
    pub fn to_guid(&self, key: &str) -> Result<Uuid, ManifestError> {
        let text = self.as_text().ok_or_else(|| ManifestError::UnexpectedType {
            key: key.to_string(),
            expected: "GUID text",
            found: self.kind(),
        })?;
        Uuid::parse_str(text).map_err(|_| ManifestError::BadGuid {
            key: key.to_string(),
            text: text.to_string(),
        })
    }
}

/// An order-preserving key/value table with case-insensitive key lookup.
///
/// Keys keep the casing they were written with; lookups ignore ASCII case,
/// matching the host's hashtable semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestTable {
    entries: IndexMap<String, ManifestValue>,
}

impl ManifestTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any entry whose key matches ignoring case.
    pub fn insert(&mut self, key: impl Into<String>, value: ManifestValue) {
        let key = key.into();
        if let Some(index) = self.position(&key) {
            if let Some((_, slot)) = self.entries.get_index_mut(index) {
                *slot = value;
            }
        } else {
            self.entries.insert(key, value);
        }
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ManifestValue> {
        self.position(key)
            .and_then(|i| self.entries.get_index(i))
            .map(|(_, value)| value)
    }

    /// Case-insensitive mutable lookup.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ManifestValue> {
        let index = self.position(key)?;
        self.entries.get_index_mut(index).map(|(_, value)| value)
    }

    /// Whether a key is present, ignoring case.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .keys()
            .position(|k| k.eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for ManifestTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{{ {} entries }}", self.entries.len())
    }
}

/// Recognized manifest keys.
pub mod keys {
    pub const ROOT_MODULE: &str = "RootModule";
    pub const MODULE_VERSION: &str = "ModuleVersion";
    pub const GUID: &str = "GUID";
    pub const NESTED_MODULES: &str = "NestedModules";
    pub const REQUIRED_MODULES: &str = "RequiredModules";
    pub const REQUIRED_ASSEMBLIES: &str = "RequiredAssemblies";
    pub const TYPES_TO_PROCESS: &str = "TypesToProcess";
    pub const FORMATS_TO_PROCESS: &str = "FormatsToProcess";
    pub const SCRIPTS_TO_PROCESS: &str = "ScriptsToProcess";
    pub const FILE_LIST: &str = "FileList";
    pub const MODULE_LIST: &str = "ModuleList";
    pub const FUNCTIONS_TO_EXPORT: &str = "FunctionsToExport";
    pub const CMDLETS_TO_EXPORT: &str = "CmdletsToExport";
    pub const VARIABLES_TO_EXPORT: &str = "VariablesToExport";
    pub const ALIASES_TO_EXPORT: &str = "AliasesToExport";
    pub const PRIVATE_DATA: &str = "PrivateData";
    pub const PS_DATA: &str = "PSData";
}

/// Marketplace metadata from the reserved `PSData` sub-table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsData {
    pub tags: Vec<String>,
    pub license_uri: Option<String>,
    pub project_uri: Option<String>,
    pub icon_uri: Option<String>,
    pub release_notes: Option<String>,
}

/// The typed view over a parsed manifest table.
///
/// Recognized keys are lifted into typed fields; unknown keys pass through
/// into `private_data` rather than being rejected.
#[derive(Debug, Clone, Default)]
pub struct ModuleManifest {
    pub root_module: Option<String>,
    pub module_version: Option<ModuleVersion>,
    pub guid: Option<Uuid>,
    pub nested_modules: Vec<String>,
    pub required_modules: Vec<String>,
    pub required_assemblies: Vec<String>,
    pub types_to_process: Vec<String>,
    pub formats_to_process: Vec<String>,
    pub scripts_to_process: Vec<String>,
    pub file_list: Vec<String>,
    pub module_list: Vec<String>,
    pub exports: ExportedMembers,
    pub private_data: ManifestTable,
}

impl ModuleManifest {
    /// Normalize a raw manifest table into the typed view.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] when a recognized key holds a value of
    /// the wrong shape, or when the version/GUID text is malformed.
    pub fn from_table(table: &ManifestTable) -> Result<Self, ManifestError> {
        let mut manifest = Self::default();

        for (key, value) in table.iter() {
            if key.eq_ignore_ascii_case(keys::ROOT_MODULE) {
                manifest.root_module = value.as_text().map(ToString::to_string);
            } else if key.eq_ignore_ascii_case(keys::MODULE_VERSION) {
                manifest.module_version = Some(value.to_version(key)?);
            } else if key.eq_ignore_ascii_case(keys::GUID) {
                manifest.guid = Some(value.to_guid(key)?);
            } else if key.eq_ignore_ascii_case(keys::NESTED_MODULES) {
                manifest.nested_modules = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::REQUIRED_MODULES) {
                manifest.required_modules = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::REQUIRED_ASSEMBLIES) {
                manifest.required_assemblies = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::TYPES_TO_PROCESS) {
                manifest.types_to_process = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::FORMATS_TO_PROCESS) {
                manifest.formats_to_process = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::SCRIPTS_TO_PROCESS) {
                manifest.scripts_to_process = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::FILE_LIST) {
                manifest.file_list = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::MODULE_LIST) {
                manifest.module_list = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::FUNCTIONS_TO_EXPORT) {
                manifest.exports.functions = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::CMDLETS_TO_EXPORT) {
                manifest.exports.cmdlets = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::VARIABLES_TO_EXPORT) {
                manifest.exports.variables = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::ALIASES_TO_EXPORT) {
                manifest.exports.aliases = value.to_string_list(key)?;
            } else if key.eq_ignore_ascii_case(keys::PRIVATE_DATA) {
                if let ManifestValue::Table(data) = value {
                    for (k, v) in data.iter() {
                        manifest.private_data.insert(k, v.clone());
                    }
                } else {
                    return Err(ManifestError::UnexpectedType {
                        key: key.to_string(),
                        expected: "table",
                        found: value.kind(),
                    });
                }
            } else {
                // Unknown keys pass through into PrivateData.
                manifest.private_data.insert(key, value.clone());
            }
        }

        Ok(manifest)
    }

    /// Marketplace metadata from the reserved `PSData` sub-table, if any.
    #[must_use]
    pub fn ps_data(&self) -> Option<PsData> {
        let ManifestValue::Table(table) = self.private_data.get(keys::PS_DATA)? else {
            return None;
        };
        let text = |key: &str| {
            table
                .get(key)
                .and_then(ManifestValue::as_text)
                .map(ToString::to_string)
        };
        Some(PsData {
            tags: table
                .get("Tags")
                .and_then(|v| v.to_string_list("Tags").ok())
                .unwrap_or_default(),
            license_uri: text("LicenseUri"),
            project_uri: text("ProjectUri"),
            icon_uri: text("IconUri"),
            release_notes: text("ReleaseNotes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ManifestValue {
        ManifestValue::Text(s.to_string())
    }

    #[test]
    fn table_lookup_ignores_case() {
        let mut table = ManifestTable::new();
        table.insert("ModuleVersion", text("1.2"));
        assert!(table.contains_key("moduleversion"));
        assert_eq!(table.get("MODULEVERSION"), Some(&text("1.2")));

        // Replacement through a differently-cased key keeps one entry.
        table.insert("moduleVersion", text("1.3"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("ModuleVersion"), Some(&text("1.3")));
    }

    #[test]
    fn typed_view_lifts_recognized_keys() {
        let mut table = ManifestTable::new();
        table.insert("RootModule", text("Disk.psm1"));
        table.insert("ModuleVersion", text("2.1.0"));
        table.insert(
            "NestedModules",
            ManifestValue::List(vec!["A.cdxml".into(), "B.cdxml".into()]),
        );
        table.insert("FunctionsToExport", text("*"));

        let manifest = ModuleManifest::from_table(&table).unwrap();
        assert_eq!(manifest.root_module.as_deref(), Some("Disk.psm1"));
        assert_eq!(manifest.module_version, Some("2.1.0".parse().unwrap()));
        assert_eq!(manifest.nested_modules.len(), 2);
        assert_eq!(manifest.exports.functions, vec!["*".to_string()]);
    }

    #[test]
    fn unknown_keys_flow_into_private_data() {
        let mut table = ManifestTable::new();
        table.insert("CompanyName", text("Contoso"));
        let mut private = ManifestTable::new();
        private.insert("HelpBaseUri", text("https://example.test/help"));
        table.insert("PrivateData", ManifestValue::Table(private));

        let manifest = ModuleManifest::from_table(&table).unwrap();
        assert!(manifest.private_data.contains_key("CompanyName"));
        assert!(manifest.private_data.contains_key("HelpBaseUri"));
    }

    #[test]
    fn bad_version_text_is_reported() {
        let mut table = ManifestTable::new();
        table.insert("ModuleVersion", text("one.two"));
        let err = ModuleManifest::from_table(&table).unwrap_err();
        assert!(matches!(err, ManifestError::BadVersion { .. }));
    }

    #[test]
    fn scalar_coerces_to_single_element_list() {
        let value = text("Disk.cdxml");
        assert_eq!(
            value.to_string_list("NestedModules").unwrap(),
            vec!["Disk.cdxml".to_string()]
        );
        let table = ManifestValue::Table(ManifestTable::new());
        assert!(table.to_string_list("NestedModules").is_err());
    }

    #[test]
    fn ps_data_sub_table_is_typed() {
        let mut psdata = ManifestTable::new();
        psdata.insert("Tags", ManifestValue::List(vec!["storage".into()]));
        psdata.insert("LicenseUri", text("https://example.test/license"));
        let mut private = ManifestTable::new();
        private.insert("PSData", ManifestValue::Table(psdata));
        let mut table = ManifestTable::new();
        table.insert("PrivateData", ManifestValue::Table(private));

        let manifest = ModuleManifest::from_table(&table).unwrap();
        let data = manifest.ps_data().unwrap();
        assert_eq!(data.tags, vec!["storage".to_string()]);
        assert!(data.license_uri.is_some());
        assert!(data.release_notes.is_none());
    }
}
