//! The import orchestrator.
//!
//! Dispatches a logical import request to the local resolver, the remote
//! session importer, or the remote inventory importer, then performs the
//! shared post-steps: registration into both module tables and optional
//! member import into the caller's scope. Registration, the no-clobber
//! scope check, and the binding writes all happen under one state guard.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use modlib_core::{
    EngineSettings, EngineState, ImportError, ImportFailure, InventoryEndpointPort, MemberKind,
    ModuleKey, ModuleRecord, ModuleSpecification, RemoteSessionPort, ResolvedModuleDescriptor,
    ScopeBinding, SharedState, VersionConstraint, ANY_VERSION,
};
use modlib_remote::{InventoryImporter, SessionImporter};
use modlib_resolve::{load_artifact, LoadContext, LocalResolver, Resolved};

use crate::request::{ImportOptions, ImportReport, ImportTarget};

/// Top-level entry point for module imports.
pub struct ImportEngine {
    state: SharedState,
    resolver: LocalResolver,
    session_importer: SessionImporter,
    inventory_importer: InventoryImporter,
}

impl ImportEngine {
    /// Build an engine over fresh process state.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_state(modlib_core::new_shared_state(), settings)
    }

    /// Build an engine over existing shared state (the host environment
    /// keeps its own handle for loaded-module queries).
    #[must_use]
    pub fn with_state(state: SharedState, settings: EngineSettings) -> Self {
        let resolver = LocalResolver::new(settings.search_path.clone());
        let session_importer =
            SessionImporter::new(Arc::clone(&state), settings.staging_root.clone());
        let inventory_importer =
            InventoryImporter::new(Arc::clone(&state), settings.staging_root.clone());
        Self {
            state,
            resolver,
            session_importer,
            inventory_importer,
        }
    }

    /// The shared state handle, for host-environment queries.
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Import local targets (names, specifications, paths, or previously
    /// resolved descriptors). Per-item failures never abort siblings.
    pub async fn import_local(
        &self,
        targets: &[ImportTarget],
        options: &ImportOptions,
    ) -> ImportReport {
        let mut report = ImportReport::default();
        for target in targets {
            let identifier = target.identifier();
            match self.import_one_local(target, options).await {
                Ok(record) => report.imported.push(record),
                Err(error) => {
                    debug!(item = %identifier, %error, "local import item failed");
                    report.failures.push(ImportFailure { identifier, error });
                }
            }
        }
        report
    }

    /// Import modules from an interactive remote session.
    pub async fn import_from_session(
        &self,
        session: &Arc<dyn RemoteSessionPort>,
        specs: &[ModuleSpecification],
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> ImportReport {
        let batch = self
            .session_importer
            .import(session, specs, options.force, cancel)
            .await;
        self.finish_remote_batch(batch, options).await
    }

    /// Import modules discovered through an inventory endpoint.
    pub async fn import_from_inventory(
        &self,
        endpoint: &Arc<dyn InventoryEndpointPort>,
        patterns: &[String],
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> ImportReport {
        match self
            .inventory_importer
            .import(endpoint, patterns, options.force, cancel)
            .await
        {
            Ok(batch) => self.finish_remote_batch(batch, options).await,
            Err(error) => {
                let mut report = ImportReport::default();
                report.failures.push(ImportFailure {
                    identifier: patterns.join(", "),
                    error,
                });
                report
            }
        }
    }

    /// Unload a module: remove it from both tables, run its cleanups, and
    /// drop its scope members.
    pub async fn unload(&self, key: &ModuleKey) -> Option<Arc<ModuleRecord>> {
        self.state.lock().await.unload(key)
    }

    /// Snapshot of every loaded module, for the host environment.
    pub async fn loaded_modules(&self) -> Vec<ResolvedModuleDescriptor> {
        self.state.lock().await.all_modules.descriptors()
    }

    /// Whether a key is currently loaded.
    pub async fn is_loaded(&self, key: &ModuleKey) -> bool {
        self.state.lock().await.all_modules.contains(key)
    }

    /// Resolve and register one local target. The resolution ladder, the
    /// table insertion, and the member binding all run under a single
    /// state guard so concurrent imports of the same name serialize.
    async fn import_one_local(
        &self,
        target: &ImportTarget,
        options: &ImportOptions,
    ) -> Result<Arc<ModuleRecord>, ImportError> {
        let mut state = self.state.lock().await;

        let (input, constraint, spec) = match target {
            ImportTarget::Name(name) => (name.clone(), ANY_VERSION, None),
            ImportTarget::Path(path) => (path.display().to_string(), ANY_VERSION, None),
            ImportTarget::Spec(spec) => (spec.name().to_string(), *spec.constraint(), Some(spec)),
            ImportTarget::Descriptor(descriptor) => {
                return Self::import_descriptor_target(&mut state, descriptor, options);
            }
        };

        let resolved = self
            .resolver
            .resolve(
                &mut state,
                &input,
                &constraint,
                options.force,
                &LoadContext::local(),
            )?
            .ok_or_else(|| not_found(&input, &constraint))?;

        let record = match resolved {
            Resolved::AlreadyLoaded(record) => {
                Self::check_guid(spec, &record)?;
                record
            }
            Resolved::Loaded(record) => {
                let record = Arc::new(record);
                Self::check_guid(spec, &record)?;
                state.register(Arc::clone(&record), Vec::new());
                record
            }
        };

        if options.import_members {
            bind_members(&mut state, &record, options);
        }
        info!(module = %record.name, key = %record.key, "imported module");
        Ok(record)
    }

    /// Import an already-resolved descriptor: reuse the loaded entry when
    /// present, otherwise load its concrete path.
    fn import_descriptor_target(
        state: &mut EngineState,
        descriptor: &ResolvedModuleDescriptor,
        options: &ImportOptions,
    ) -> Result<Arc<ModuleRecord>, ImportError> {
        if !options.force {
            if let Some(entry) = state.all_modules.get(&descriptor.key) {
                let record = Arc::clone(&entry.record);
                if options.import_members {
                    bind_members(state, &record, options);
                }
                return Ok(record);
            }
        }
        let Some(path) = descriptor.key.as_path() else {
            // A synthetic key names an in-memory materialization that is
            // no longer loaded; there is nothing on disk to reload.
            return Err(ImportError::NotFound {
                name: descriptor.key.to_string(),
            });
        };
        let record = Arc::new(load_artifact(path, &LoadContext::local())?);
        state.register(Arc::clone(&record), Vec::new());
        if options.import_members {
            bind_members(state, &record, options);
        }
        Ok(record)
    }

    /// Shared post-steps for remote batches: member import under one
    /// guard, then fold the batch into a report.
    async fn finish_remote_batch(
        &self,
        batch: modlib_remote::ImportBatch,
        options: &ImportOptions,
    ) -> ImportReport {
        if options.import_members {
            let mut state = self.state.lock().await;
            for record in &batch.records {
                bind_members(&mut state, record, options);
            }
        }
        ImportReport {
            imported: batch.records,
            failures: batch.failures,
            warnings: batch.warnings,
        }
    }

    fn check_guid(
        spec: Option<&ModuleSpecification>,
        record: &ModuleRecord,
    ) -> Result<(), ImportError> {
        let Some(spec) = spec else {
            return Ok(());
        };
        if spec.matches(record.version.as_ref(), record.guid) {
            Ok(())
        } else {
            Err(ImportError::NotFound {
                name: spec.name().to_string(),
            })
        }
    }
}

/// Surface a resolution miss: plain `NotFound` for unconstrained lookups,
/// the version-mismatch sub-case when a constraint was in play.
fn not_found(name: &str, constraint: &VersionConstraint) -> ImportError {
    if constraint.is_any() {
        ImportError::NotFound {
            name: name.to_string(),
        }
    } else {
        ImportError::NoMatchingVersion {
            name: name.to_string(),
            constraint: *constraint,
        }
    }
}

/// Bind a module's exported members into the caller's scope.
///
/// Wildcard entries cannot be enumerated without executing module code,
/// so only concrete names bind. The existing-name check and the write
/// happen on the same `&mut` state, which is what makes no-clobber safe
/// against concurrent importers.
fn bind_members(state: &mut EngineState, record: &Arc<ModuleRecord>, options: &ImportOptions) {
    for (kind, member) in record.exports.iter() {
        if member.contains(['*', '?']) {
            continue;
        }
        // Prefixes apply to command nouns; variable names carry none.
        let bound_name = match (kind, options.prefix.as_deref()) {
            (MemberKind::Variable, _) | (_, None) => member.to_string(),
            (_, Some(prefix)) => prefixed_name(member, prefix),
        };
        let binding = ScopeBinding {
            kind,
            member: member.to_string(),
            module: record.key.clone(),
        };
        if options.no_clobber {
            if !state.scope.bind_if_absent(bound_name.as_str(), binding) {
                debug!(
                    member = %bound_name,
                    module = %record.name,
                    "member already bound, skipping (no-clobber)"
                );
            }
        } else {
            state.scope.bind(bound_name, binding);
        }
    }
}

/// Insert a prefix into a member name: after the verb dash when the name
/// is verb-noun shaped, otherwise in front.
#[must_use]
pub fn prefixed_name(member: &str, prefix: &str) -> String {
    member.find('-').map_or_else(
        || format!("{prefix}{member}"),
        |dash| format!("{}-{}{}", &member[..dash], prefix, &member[dash + 1..]),
    )
}
