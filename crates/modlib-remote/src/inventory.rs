//! Remote inventory importer.
//!
//! Imports modules discovered through a management/inventory endpoint: no
//! interactive session, just structured descriptors and raw file blobs.
//! Files are classified, flattened into a staging directory under
//! regenerated names, and the manifest is rewritten in memory to reference
//! them — it is never written back to disk, so on-disk content keeps its
//! original bytes.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use modlib_core::domain::manifest::{keys, ManifestTable};
use modlib_core::{
    parse_manifest, CleanupAction, FileKind, ImportError, ImportFailure, ImportWarning,
    InventoryEndpointPort, InventoryModuleDescriptor, ManifestValue, ModuleKey, ModuleManifest,
    ModuleRecord, ModuleType, RemoteBinding, SharedState, SourceZone, StagedFile,
};
use modlib_resolve::{load_manifest_table, LoadContext};

use crate::classify::{classify_file, staged_file_name, RECOGNIZED_CMDLET_ADAPTER};
use crate::staging::{staging_dir, StagingGuard};
use crate::ImportBatch;

/// Private-data key under which the endpoint identity is injected into
/// every nested adapter module.
pub const ENDPOINT_PRIVATE_KEY: &str = "InventoryEndpoint";

/// Imports modules from management/inventory endpoints.
pub struct InventoryImporter {
    state: SharedState,
    staging_root: PathBuf,
}

impl InventoryImporter {
    /// Create an importer over the shared engine state.
    #[must_use]
    pub fn new(state: SharedState, staging_root: PathBuf) -> Self {
        Self {
            state,
            staging_root,
        }
    }

    /// Import every module matching the requested name patterns.
    ///
    /// Patterns with zero matches report `NotFound`; matches that can only
    /// be imported through an interactive session report `SessionOnly`.
    /// Per-module failures never abort sibling imports.
    ///
    /// # Errors
    ///
    /// Only the initial endpoint query can fail the whole call; everything
    /// after is reported per item in the returned batch.
    #[instrument(skip_all, fields(endpoint = %endpoint.endpoint_id()))]
    pub async fn import(
        &self,
        endpoint: &Arc<dyn InventoryEndpointPort>,
        patterns: &[String],
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<ImportBatch, ImportError> {
        let descriptors = tokio::select! {
            () = cancel.cancelled() => {
                return Err(ImportError::Cancelled {
                    module: patterns.join(", "),
                });
            }
            result = endpoint.query_modules(patterns, cancel) => {
                result.map_err(|source| ImportError::Transport {
                    module: patterns.join(", "),
                    source,
                })?
            }
        };

        let mut batch = ImportBatch::default();

        for pattern in patterns {
            if !descriptors
                .iter()
                .any(|d| pattern_matches(pattern, &d.name))
            {
                batch.failures.push(ImportFailure {
                    identifier: pattern.clone(),
                    error: ImportError::NotFound {
                        name: pattern.clone(),
                    },
                });
            }
        }

        for descriptor in descriptors {
            if cancel.is_cancelled() {
                batch.failures.push(ImportFailure {
                    identifier: descriptor.name.clone(),
                    error: ImportError::Cancelled {
                        module: descriptor.name,
                    },
                });
                break;
            }
            if descriptor.session_only {
                batch.failures.push(ImportFailure {
                    identifier: descriptor.name.clone(),
                    error: ImportError::SessionOnly {
                        name: descriptor.name,
                    },
                });
                continue;
            }
            let name = descriptor.name.clone();
            match self
                .import_descriptor(endpoint, &descriptor, force, cancel)
                .await
            {
                Ok((record, warnings)) => {
                    batch.records.push(record);
                    batch.warnings.extend(warnings);
                }
                Err(error) => batch.failures.push(ImportFailure {
                    identifier: name,
                    error,
                }),
            }
        }

        Ok(batch)
    }

    /// Import one management-capable module descriptor.
    async fn import_descriptor(
        &self,
        endpoint: &Arc<dyn InventoryEndpointPort>,
        descriptor: &InventoryModuleDescriptor,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<(Arc<ModuleRecord>, Vec<ImportWarning>), ImportError> {
        let name = &descriptor.name;
        let endpoint_id = endpoint.endpoint_id();

        // Locate and parse the primary manifest. Manifests are data here:
        // the same parser as local loading, with nothing executed and no
        // elements loaded yet.
        let manifest_file = descriptor
            .files
            .iter()
            .find(|f| classify_by_extension_is_manifest(&f.file_name))
            .ok_or_else(|| ImportError::NothingToImport { name: name.clone() })?;
        let manifest_text = String::from_utf8_lossy(&manifest_file.raw);
        let mut table = parse_manifest(&manifest_text)
            .map_err(|e| ImportError::from_manifest(name.clone(), e))?;
        let manifest = ModuleManifest::from_table(&table)
            .map_err(|e| ImportError::from_manifest(name.clone(), e))?;

        // The staging path is computed twice: once before the manifest is
        // parsed (no version known yet), and again once the declared
        // version is available.
        let provisional = staging_dir(&self.staging_root, &endpoint_id, name, None);
        let staging = manifest.module_version.map_or(provisional, |version| {
            staging_dir(&self.staging_root, &endpoint_id, name, Some(&version))
        });
        let key = ModuleKey::Synthetic(staging.display().to_string());

        // Existence check and registration are atomic under the state
        // guard, like the session path.
        let mut state = self.state.lock().await;

        if !force {
            if let Some(entry) = state.all_modules.get(&key) {
                debug!(module = %name, "versioned staging path already loaded, short-circuiting");
                return Ok((Arc::clone(&entry.record), Vec::new()));
            }
        }

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled {
                module: name.clone(),
            });
        }

        let guard = StagingGuard::create(&staging)?;

        // Classify and flatten every served file under regenerated,
        // collision-resistant names, marked as intranet-sourced for
        // downstream trust checks.
        let mut staged = Vec::with_capacity(descriptor.files.len());
        let mut renames: Vec<(String, String)> = Vec::new();
        let mut adapter_file_count = 0usize;
        for file in &descriptor.files {
            let kind = classify_file(&file.file_name, &manifest);
            if kind == FileKind::Cmdletization {
                adapter_file_count += 1;
            }
            let staged_name = staged_file_name(&file.file_name);
            let path = guard.path().join(&staged_name);
            std::fs::write(&path, &file.raw).map_err(|source| ImportError::Io {
                path: path.clone(),
                source,
            })?;
            staged.push(StagedFile {
                path,
                kind,
                zone: SourceZone::Intranet,
            });
            renames.push((file.file_name.clone(), staged_name));
        }

        // Rewrite the manifest's file lists to the staged names — the
        // primary copy here, plus any localized copy of the manifest data.
        rewrite_file_lists(&mut table, &renames);
        let localized = localized_manifest_table(descriptor, &manifest_file.file_name, &renames);
        if let Some(localized) = &localized {
            table.insert("LocalizedManifest", ManifestValue::Table(localized.clone()));
        }

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled {
                module: name.clone(),
            });
        }

        // Load from the rewritten in-memory structure rather than from
        // disk; the staged files keep their original bytes so content
        // hashes still match what the endpoint served.
        let ctx = LoadContext {
            remote: Some(RemoteBinding::Inventory(Arc::clone(endpoint))),
            source_host_id: Some(endpoint_id.clone()),
        };
        let mut record = load_manifest_table(name, &table, key, guard.path(), &ctx)?;
        record.staged_files = staged;

        // Every nested adapter module must declare the one recognized
        // cmdlet adapter; anything else is fatal for this module's import.
        for nested in &mut record.nested {
            if nested.module_type == ModuleType::Cim {
                let adapter = nested.adapter.clone().unwrap_or_else(|| "(undeclared)".into());
                if adapter != RECOGNIZED_CMDLET_ADAPTER {
                    return Err(ImportError::UnsupportedAdapter {
                        module: name.clone(),
                        adapter,
                    });
                }
            }
            // The adapter needs to know which endpoint to issue object
            // operations against.
            nested.private_data.insert(
                ENDPOINT_PRIVATE_KEY,
                ManifestValue::Text(endpoint_id.clone()),
            );
            nested.remote = Some(RemoteBinding::Inventory(Arc::clone(endpoint)));
        }

        let warnings = mixed_mode_warnings(name, &record, adapter_file_count);
        for warning in &warnings {
            warn!(module = %name, %warning, "partial import");
        }

        let record = Arc::new(record);
        state.register(
            Arc::clone(&record),
            vec![CleanupAction::RemoveDirAll(guard.disarm())],
        );
        info!(module = %record.name, key = %record.key, "imported module from inventory endpoint");
        Ok((record, warnings))
    }
}

/// Detect mixed-mode modules: declared capabilities this importer cannot
/// carry over. Partial success, not failure.
fn mixed_mode_warnings(
    name: &str,
    record: &ModuleRecord,
    adapter_file_count: usize,
) -> Vec<ImportWarning> {
    let Some(manifest) = record.manifest.as_ref() else {
        return Vec::new();
    };

    let mut skipped = Vec::new();
    if !manifest.scripts_to_process.is_empty() {
        skipped.push("script-processing files");
    }
    if !manifest.required_assemblies.is_empty() {
        skipped.push("required assemblies");
    }
    let declared_modules =
        manifest.nested_modules.len() + usize::from(manifest.root_module.is_some());
    if declared_modules > adapter_file_count {
        skipped.push("modules without a recognized adapter definition");
    }

    if skipped.is_empty() {
        Vec::new()
    } else {
        vec![ImportWarning::PartialCapability {
            module: name.to_string(),
            detail: format!("not imported: {}", skipped.join(", ")),
        }]
    }
}

/// Rewrite every file-list field in a manifest table to the staged names.
fn rewrite_file_lists(table: &mut ManifestTable, renames: &[(String, String)]) {
    const LIST_KEYS: [&str; 6] = [
        keys::NESTED_MODULES,
        keys::TYPES_TO_PROCESS,
        keys::FORMATS_TO_PROCESS,
        keys::SCRIPTS_TO_PROCESS,
        keys::FILE_LIST,
        keys::ROOT_MODULE,
    ];
    for key in LIST_KEYS {
        let Some(value) = table.get_mut(key) else {
            continue;
        };
        match value {
            ManifestValue::Text(text) | ManifestValue::Opaque(text) => {
                if let Some(renamed) = renamed_for(text, renames) {
                    *value = ManifestValue::Text(renamed);
                }
            }
            ManifestValue::List(items) => {
                for item in items.iter_mut() {
                    if let Some(renamed) = renamed_for(item, renames) {
                        *item = renamed;
                    }
                }
            }
            ManifestValue::Table(_) => {}
        }
    }
}

/// Map an original manifest file reference to its staged name.
fn renamed_for(entry: &str, renames: &[(String, String)]) -> Option<String> {
    let target = entry.rsplit(['/', '\\']).next().unwrap_or(entry);
    renames
        .iter()
        .find(|(original, _)| original.eq_ignore_ascii_case(target))
        .map(|(_, staged)| staged.clone())
}

/// Parse and rewrite a localized/secondary copy of the manifest data, if
/// the endpoint served one.
fn localized_manifest_table(
    descriptor: &InventoryModuleDescriptor,
    primary_name: &str,
    renames: &[(String, String)],
) -> Option<ManifestTable> {
    let secondary = descriptor.files.iter().find(|f| {
        f.file_name != primary_name && classify_by_extension_is_manifest(&f.file_name)
    })?;
    let text = String::from_utf8_lossy(&secondary.raw);
    match parse_manifest(&text) {
        Ok(mut table) => {
            rewrite_file_lists(&mut table, renames);
            Some(table)
        }
        Err(error) => {
            debug!(file = %secondary.file_name, %error, "ignoring unparseable localized manifest");
            None
        }
    }
}

fn classify_by_extension_is_manifest(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(modlib_resolve::MANIFEST_EXT))
}

/// Wildcard-aware requested-name matching. Invalid patterns fall back to
/// a literal, case-insensitive comparison.
fn pattern_matches(pattern: &str, name: &str) -> bool {
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..glob::MatchOptions::new()
    };
    glob::Pattern::new(pattern).map_or_else(
        |_| pattern.eq_ignore_ascii_case(name),
        |p| p.matches_with(name, options),
    )
}
