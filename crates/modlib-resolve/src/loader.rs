//! Artifact loading: turn a concrete module file into a `ModuleRecord`.
//!
//! Loading here is structural only. Manifests are parsed as restricted
//! data; script and binary artifacts are recorded, never executed.

use std::path::{Path, PathBuf};

use tracing::debug;

use modlib_core::domain::manifest::ManifestTable;
use modlib_core::{
    ImportError, ModuleKey, ModuleManifest, ModuleRecord, ModuleType, RemoteBinding,
};

use crate::extensions::{module_type_for, CMDLETIZATION_EXT};

/// Ambient context threaded through a load: where the artifact came from.
#[derive(Default, Clone)]
pub struct LoadContext {
    /// Remote handle the loaded module forwards invocations through.
    pub remote: Option<RemoteBinding>,
    /// Identity of the remote host the artifact came from.
    pub source_host_id: Option<String>,
}

impl LoadContext {
    /// Context for a purely local load.
    #[must_use]
    pub fn local() -> Self {
        Self::default()
    }
}

/// Load a module artifact from disk.
///
/// # Errors
///
/// Returns [`ImportError::NotFound`] for unrecognized extensions,
/// [`ImportError::Io`] for hard filesystem failures, and manifest errors
/// mapped through the engine taxonomy.
pub fn load_artifact(path: &Path, ctx: &LoadContext) -> Result<ModuleRecord, ImportError> {
    let Some(module_type) = module_type_for(path) else {
        return Err(ImportError::NotFound {
            name: path.display().to_string(),
        });
    };
    debug!(path = %path.display(), %module_type, "loading module artifact");

    match module_type {
        ModuleType::Manifest => load_manifest_file(path, ctx),
        ModuleType::Cim => load_cmdletization_file(path, ctx),
        ModuleType::Script | ModuleType::Binary => {
            let mut record = ModuleRecord::new(stem_of(path), module_type, path.to_path_buf());
            record.remote = ctx.remote.clone();
            record.source_host_id = ctx.source_host_id.clone();
            Ok(record)
        }
    }
}

/// Load a manifest file from disk.
fn load_manifest_file(path: &Path, ctx: &LoadContext) -> Result<ModuleRecord, ImportError> {
    let name = stem_of(path);
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = modlib_core::parse_manifest(&text)
        .map_err(|e| ImportError::from_manifest(name.as_str(), e))?;
    let dir = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
    load_manifest_table(&name, &table, ModuleKey::Path(path.to_path_buf()), &dir, ctx)
        .map(|mut record| {
            record.path = Some(path.to_path_buf());
            record
        })
}

/// Materialize a module record from already-parsed manifest data.
///
/// This is the in-memory load path: the table may have been rewritten
/// after parsing and never written back to disk. `dir` anchors relative
/// references (nested modules, file lists).
///
/// # Errors
///
/// Returns manifest interpretation errors mapped through the engine
/// taxonomy.
pub fn load_manifest_table(
    name: &str,
    table: &ManifestTable,
    key: ModuleKey,
    dir: &Path,
    ctx: &LoadContext,
) -> Result<ModuleRecord, ImportError> {
    let manifest =
        ModuleManifest::from_table(table).map_err(|e| ImportError::from_manifest(name, e))?;

    let mut record = ModuleRecord {
        name: name.to_string(),
        version: manifest.module_version,
        guid: manifest.guid,
        module_type: ModuleType::Manifest,
        key,
        path: None,
        manifest: None,
        exports: manifest.exports.clone(),
        nested: Vec::new(),
        adapter: None,
        remote: ctx.remote.clone(),
        private_data: manifest.private_data.clone(),
        staged_files: Vec::new(),
        source_host_id: ctx.source_host_id.clone(),
        loaded_at: chrono::Utc::now(),
    };

    for nested_name in &manifest.nested_modules {
        record.nested.push(load_nested(dir, nested_name, ctx)?);
    }

    record.manifest = Some(manifest);
    Ok(record)
}

/// Shallow-load a nested module reference from a manifest.
///
/// Nested artifacts that exist on disk are loaded structurally; dangling
/// references become synthetic records so the parent still loads.
fn load_nested(dir: &Path, nested_name: &str, ctx: &LoadContext) -> Result<ModuleRecord, ImportError> {
    let candidate = dir.join(nested_name);
    if candidate.is_file() {
        return load_artifact(&candidate, ctx);
    }
    debug!(nested = nested_name, "nested module reference has no local file");
    let module_type = module_type_for(&candidate).unwrap_or(ModuleType::Script);
    let mut record = ModuleRecord::new(stem_of(&candidate), module_type, candidate);
    record.key = ModuleKey::Synthetic(nested_name.to_string());
    record.path = None;
    record.remote = ctx.remote.clone();
    record.source_host_id = ctx.source_host_id.clone();
    Ok(record)
}

/// Load a cmdlet-adapter definition, capturing its declared adapter.
fn load_cmdletization_file(path: &Path, ctx: &LoadContext) -> Result<ModuleRecord, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut record = ModuleRecord::new(stem_of(path), ModuleType::Cim, path.to_path_buf());
    record.adapter = scan_cmdlet_adapter(&content);
    record.remote = ctx.remote.clone();
    record.source_host_id = ctx.source_host_id.clone();
    Ok(record)
}

/// Extract the `CmdletAdapter="..."` declaration from a cmdletization
/// definition, if present.
#[must_use]
pub fn scan_cmdlet_adapter(content: &str) -> Option<String> {
    let marker = "CmdletAdapter=\"";
    let start = content.find(marker)? + marker.len();
    let rest = &content[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmdlet_adapter_scan_finds_the_declaration() {
        let content = r#"<CmdletizationMetadata>
  <Class ClassName="root/storage/Disk" CmdletAdapter="CimCmdletAdapter">
  </Class>
</CmdletizationMetadata>"#;
        assert_eq!(
            scan_cmdlet_adapter(content).as_deref(),
            Some("CimCmdletAdapter")
        );
        assert_eq!(scan_cmdlet_adapter("<Class ClassName=\"x\"/>"), None);
    }

    #[test]
    fn manifest_load_builds_nested_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("DiskInfo.cdxml"),
            "<Class CmdletAdapter=\"CimCmdletAdapter\"/>",
        )
        .unwrap();
        let manifest_path = dir.path().join("Disk.psd1");
        std::fs::write(
            &manifest_path,
            "@{ ModuleVersion = '1.0'; NestedModules = @('DiskInfo.cdxml') }",
        )
        .unwrap();

        let record = load_artifact(&manifest_path, &LoadContext::local()).unwrap();
        assert_eq!(record.module_type, ModuleType::Manifest);
        assert_eq!(record.version, Some("1.0".parse().unwrap()));
        assert_eq!(record.nested.len(), 1);
        assert_eq!(record.nested[0].module_type, ModuleType::Cim);
        assert_eq!(record.nested[0].adapter.as_deref(), Some("CimCmdletAdapter"));
    }

    #[test]
    fn dangling_nested_references_become_synthetic() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("Disk.psd1");
        std::fs::write(&manifest_path, "@{ NestedModules = 'Missing.psm1' }").unwrap();

        let record = load_artifact(&manifest_path, &LoadContext::local()).unwrap();
        assert_eq!(record.nested.len(), 1);
        assert!(matches!(record.nested[0].key, ModuleKey::Synthetic(_)));
    }

    #[test]
    fn unrecognized_extension_is_not_found() {
        let err = load_artifact(&PathBuf::from("/m/readme.txt"), &LoadContext::local());
        assert!(matches!(err, Err(ImportError::NotFound { .. })));
    }

    #[test]
    fn malformed_manifest_version_keeps_its_category() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("Disk.psd1");
        std::fs::write(&manifest_path, "@{ ModuleVersion = 'not.a.version' }").unwrap();

        let err = load_artifact(&manifest_path, &LoadContext::local()).unwrap_err();
        assert!(matches!(err, ImportError::MalformedVersion { .. }));
    }
}
