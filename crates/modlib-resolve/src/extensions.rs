//! Recognized module artifact extensions and their probe order.

use std::path::Path;

use modlib_core::ModuleType;

/// Module manifest (data file describing a composite module).
pub const MANIFEST_EXT: &str = "psd1";
/// Compiled binary module.
pub const BINARY_EXT: &str = "dll";
/// Script module.
pub const SCRIPT_MODULE_EXT: &str = "psm1";
/// Loose script.
pub const SCRIPT_EXT: &str = "ps1";
/// Cmdlet-adapter definition.
pub const CMDLETIZATION_EXT: &str = "cdxml";
/// Type/format extension table.
pub const DATA_XML_EXT: &str = "ps1xml";

/// Fixed probe order wherever multiple extensions are tried.
///
/// The ordering is a deliberate precedence: manifest > binary >
/// script-module > script. A directory containing both a manifest and a
/// loose script must resolve to the manifest.
pub const PROBE_ORDER: [&str; 4] = [MANIFEST_EXT, BINARY_EXT, SCRIPT_MODULE_EXT, SCRIPT_EXT];

/// Classify a path by its extension.
#[must_use]
pub fn module_type_for(path: &Path) -> Option<ModuleType> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case(MANIFEST_EXT) {
        Some(ModuleType::Manifest)
    } else if ext.eq_ignore_ascii_case(BINARY_EXT) {
        Some(ModuleType::Binary)
    } else if ext.eq_ignore_ascii_case(SCRIPT_MODULE_EXT) || ext.eq_ignore_ascii_case(SCRIPT_EXT) {
        Some(ModuleType::Script)
    } else if ext.eq_ignore_ascii_case(CMDLETIZATION_EXT) {
        Some(ModuleType::Cim)
    } else {
        None
    }
}

/// Whether the path carries any recognized module extension.
#[must_use]
pub fn has_recognized_extension(path: &Path) -> bool {
    module_type_for(path).is_some()
}
