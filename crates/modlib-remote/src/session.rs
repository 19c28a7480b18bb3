//! Remote session importer.
//!
//! Imports a module that exists only inside an interactive remote session
//! by asking the remote host to generate a command-proxy definition, then
//! loading that definition locally as an ordinary manifest module bound to
//! the session.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use modlib_core::{
    CleanupAction, FileKind, ImportError, ImportFailure, ManifestValue, ModuleKey, ModuleRecord,
    ModuleSpecification, RemoteBinding, RemoteModuleInfo, RemoteSessionPort, SharedState,
    SourceZone, StagedFile,
};
use modlib_resolve::{load_artifact, LoadContext, MANIFEST_EXT};

use crate::staging::{staging_dir, StagingGuard};
use crate::ImportBatch;

/// Imports modules from interactive remote sessions.
pub struct SessionImporter {
    state: SharedState,
    staging_root: PathBuf,
}

impl SessionImporter {
    /// Create an importer over the shared engine state.
    #[must_use]
    pub fn new(state: SharedState, staging_root: PathBuf) -> Self {
        Self {
            state,
            staging_root,
        }
    }

    /// Import a batch of specifications through one session.
    ///
    /// Per-item failures are reported individually and never abort
    /// sibling imports.
    pub async fn import(
        &self,
        session: &Arc<dyn RemoteSessionPort>,
        specs: &[ModuleSpecification],
        force: bool,
        cancel: &CancellationToken,
    ) -> ImportBatch {
        let mut batch = ImportBatch::default();
        for spec in specs {
            match self.import_one(session, spec, force, cancel).await {
                Ok(record) => batch.records.push(record),
                Err(error) => batch.failures.push(ImportFailure {
                    identifier: spec.name().to_string(),
                    error,
                }),
            }
        }
        batch
    }

    /// Import a single specification through the session.
    ///
    /// On success the produced proxy module is registered in the module
    /// table with its staging directory chained into the cleanup list. On
    /// any failure the partially created staging directory is deleted
    /// synchronously before the error propagates.
    #[instrument(skip_all, fields(module = %spec.name(), host = %session.host_id()))]
    pub async fn import_one(
        &self,
        session: &Arc<dyn RemoteSessionPort>,
        spec: &ModuleSpecification,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<Arc<ModuleRecord>, ImportError> {
        let name = spec.name().to_string();

        // Ask the remote host to import the module in-session and report
        // the resulting identity.
        let info = tokio::select! {
            () = cancel.cancelled() => {
                return Err(ImportError::Cancelled { module: name });
            }
            result = session.import_module(spec, cancel) => {
                result.map_err(|source| ImportError::Transport {
                    module: name.clone(),
                    source,
                })?
            }
        };

        // Deterministic staging path from (name, version, host identity).
        let staging = staging_dir(
            &self.staging_root,
            &session.host_id(),
            &info.name,
            info.version.as_ref(),
        );
        let manifest_path = staging.join(format!("{}.{MANIFEST_EXT}", info.name));
        let key = ModuleKey::Path(manifest_path.clone());

        // The existence check, proxy generation, and table insertion all
        // happen under the state guard, so concurrent imports of the same
        // module serialize here instead of racing to create two staging
        // directories.
        let mut state = self.state.lock().await;

        if !force && manifest_path.is_file() {
            if let Some(entry) = state.all_modules.get(&key) {
                debug!(module = %info.name, "proxy already materialized, skipping regeneration");
                return Ok(Arc::clone(&entry.record));
            }
        }

        let guard = StagingGuard::create(&staging)?;

        let generated = tokio::select! {
            () = cancel.cancelled() => {
                return Err(ImportError::Cancelled { module: info.name.clone() });
            }
            result = session.generate_proxy(&info, guard.path(), cancel) => {
                result.map_err(|source| ImportError::Transport {
                    module: info.name.clone(),
                    source,
                })?
            }
        };
        if generated.is_empty() {
            return Err(ImportError::NothingToImport { name: info.name });
        }

        let staged_files = finalize_staging(&info, &guard, &generated, &manifest_path)?;

        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled { module: info.name });
        }

        // From here on the proxy is just another local manifest.
        let ctx = LoadContext {
            remote: Some(RemoteBinding::Session(Arc::clone(session))),
            source_host_id: Some(session.host_id()),
        };
        let mut record = load_artifact(&manifest_path, &ctx)?;
        record.staged_files = staged_files;
        if record.version.is_none() {
            record.version = info.version;
        }
        if record.guid.is_none() {
            record.guid = info.guid;
        }
        // Help-location metadata from the remote host rides along opaquely.
        if let Some(help_uri) = &info.help_uri {
            record
                .private_data
                .insert("HelpInfoUri", ManifestValue::Text(help_uri.clone()));
        }

        let record = Arc::new(record);
        state.register(
            Arc::clone(&record),
            vec![CleanupAction::RemoveDirAll(guard.disarm())],
        );
        info!(module = %record.name, key = %record.key, "imported proxy module from session");
        Ok(record)
    }
}

/// Rename the generated manifest to the module's own name and record
/// every staged file with its zone-of-origin. The generator's raw output
/// names never leak into the local namespace.
fn finalize_staging(
    info: &RemoteModuleInfo,
    guard: &StagingGuard,
    generated: &[PathBuf],
    manifest_path: &std::path::Path,
) -> Result<Vec<StagedFile>, ImportError> {
    let mut staged = Vec::with_capacity(generated.len());
    let mut manifest_seen = false;

    for file_name in generated {
        let generated_path = guard.path().join(file_name);
        let is_manifest = file_name
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXT));

        let path = if is_manifest && !manifest_seen {
            manifest_seen = true;
            if generated_path != *manifest_path {
                std::fs::rename(&generated_path, manifest_path).map_err(|source| {
                    ImportError::Io {
                        path: manifest_path.to_path_buf(),
                        source,
                    }
                })?;
            }
            manifest_path.to_path_buf()
        } else {
            generated_path
        };

        let kind = if is_manifest {
            FileKind::Manifest
        } else {
            FileKind::Other
        };
        staged.push(StagedFile {
            path,
            kind,
            zone: SourceZone::Intranet,
        });
    }

    if !manifest_seen {
        return Err(ImportError::NothingToImport {
            name: info.name.clone(),
        });
    }
    Ok(staged)
}
