//! Classification of inventory-served files and staged-name generation.

use std::path::Path;

use modlib_core::{FileKind, ModuleManifest};
use modlib_resolve::{CMDLETIZATION_EXT, DATA_XML_EXT, MANIFEST_EXT};

/// The single cmdlet-adapter type this engine supports. Nested modules
/// declaring anything else abort their module's import.
pub const RECOGNIZED_CMDLET_ADAPTER: &str = "CimCmdletAdapter";

/// Maximum stem length kept from the original file name when staging.
const STAGED_STEM_MAX: usize = 20;

/// Classify a remote file by extension, cross-referenced against the
/// manifest's own declared file lists.
///
/// A data-XML file counts as a types table only when the manifest names it
/// in `TypesToProcess` and *not* in `FormatsToProcess`; the symmetric rule
/// applies for formats. Everything ambiguous falls out as `Other`.
#[must_use]
pub fn classify_file(file_name: &str, manifest: &ModuleManifest) -> FileKind {
    let path = Path::new(file_name);
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return FileKind::Other;
    };

    if ext.eq_ignore_ascii_case(CMDLETIZATION_EXT) {
        return FileKind::Cmdletization;
    }
    if ext.eq_ignore_ascii_case(MANIFEST_EXT) {
        return FileKind::Manifest;
    }
    if ext.eq_ignore_ascii_case(DATA_XML_EXT) {
        let in_types = list_names_file(&manifest.types_to_process, file_name);
        let in_formats = list_names_file(&manifest.formats_to_process, file_name);
        return match (in_types, in_formats) {
            (true, false) => FileKind::Types,
            (false, true) => FileKind::Formats,
            _ => FileKind::Other,
        };
    }
    FileKind::Other
}

/// Whether a manifest file list names the given file. List entries may
/// carry relative paths; comparison is by file name, ignoring case.
fn list_names_file(list: &[String], file_name: &str) -> bool {
    let target = base_name(file_name);
    list.iter()
        .any(|entry| base_name(entry).eq_ignore_ascii_case(target))
}

fn base_name(entry: &str) -> &str {
    // Manifest lists may use either separator style regardless of the
    // local platform.
    entry.rsplit(['/', '\\']).next().unwrap_or(entry)
}

/// Regenerate a collision-resistant staged file name: a truncated stem,
/// a random suffix, and the original extension.
#[must_use]
pub fn staged_file_name(original: &str) -> String {
    let path = Path::new(original);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("staged");
    let stem: String = stem.chars().take(STAGED_STEM_MAX).collect();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{}.{ext}", &suffix[..8]),
        None => format!("{stem}_{}", &suffix[..8]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlib_core::domain::manifest::ManifestTable;
    use modlib_core::ManifestValue;

    fn manifest_with_lists(types: &[&str], formats: &[&str]) -> ModuleManifest {
        let mut table = ManifestTable::new();
        table.insert(
            "TypesToProcess",
            ManifestValue::List(types.iter().map(ToString::to_string).collect()),
        );
        table.insert(
            "FormatsToProcess",
            ManifestValue::List(formats.iter().map(ToString::to_string).collect()),
        );
        ModuleManifest::from_table(&table).unwrap()
    }

    #[test]
    fn cmdletization_by_extension_alone() {
        let manifest = manifest_with_lists(&[], &[]);
        assert_eq!(
            classify_file("DiskInfo.cdxml", &manifest),
            FileKind::Cmdletization
        );
    }

    #[test]
    fn types_requires_list_membership_and_exclusion() {
        let manifest = manifest_with_lists(&["Disk.Types.ps1xml"], &["Disk.Format.ps1xml"]);
        assert_eq!(
            classify_file("Disk.Types.ps1xml", &manifest),
            FileKind::Types
        );
        assert_eq!(
            classify_file("Disk.Format.ps1xml", &manifest),
            FileKind::Formats
        );
        // Declared in neither list: ambiguous, not a types table.
        assert_eq!(
            classify_file("Random.ps1xml", &manifest),
            FileKind::Other
        );
    }

    #[test]
    fn a_file_in_both_lists_is_ambiguous() {
        let manifest = manifest_with_lists(&["Both.ps1xml"], &["Both.ps1xml"]);
        assert_eq!(classify_file("Both.ps1xml", &manifest), FileKind::Other);
    }

    #[test]
    fn list_entries_with_relative_paths_still_match() {
        let manifest = manifest_with_lists(&[".\\types\\Disk.Types.ps1xml"], &[]);
        assert_eq!(
            classify_file("Disk.Types.ps1xml", &manifest),
            FileKind::Types
        );
    }

    #[test]
    fn staged_names_truncate_and_stay_unique() {
        let original = "AVeryLongCmdletizationFileName.cdxml";
        let a = staged_file_name(original);
        let b = staged_file_name(original);
        assert_ne!(a, b);
        assert!(a.ends_with(".cdxml"));
        assert!(a.len() <= STAGED_STEM_MAX + 1 + 8 + 1 + 5);
    }
}
