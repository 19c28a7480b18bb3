//! The local resolver: multi-strategy resolution of a name or path to a
//! loadable module artifact.
//!
//! The ladder is an explicit ordered sequence of fallible steps. Each step
//! returns found/not-found; resolution continues to the next step only on
//! not-found. Hard I/O failures propagate immediately — they are never
//! folded into the not-found fallthrough.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use modlib_core::{
    EngineState, ImportError, ModuleKey, ModuleRecord, ModuleVersion, VersionConstraint,
};

use crate::extensions::{has_recognized_extension, PROBE_ORDER};
use crate::loader::{load_artifact, LoadContext};

/// A successful resolution: either the module was already loaded, or a
/// fresh record was produced that the caller still has to register.
#[derive(Debug)]
pub enum Resolved {
    /// The module table already held a matching entry; no artifact was
    /// loaded.
    AlreadyLoaded(Arc<ModuleRecord>),
    /// A fresh record, loaded but not yet registered.
    Loaded(ModuleRecord),
}

impl Resolved {
    /// The record behind either variant.
    #[must_use]
    pub fn record(&self) -> &ModuleRecord {
        match self {
            Self::AlreadyLoaded(record) => record,
            Self::Loaded(record) => record,
        }
    }
}

/// Resolves names and paths against the module table, the resolution
/// cache, and the ordered module search path.
///
/// The resolver owns no shared state: callers pass `&mut EngineState`
/// under their own guard, so the already-loaded check, the cache check,
/// and any cache population are atomic with respect to other importers.
#[derive(Debug, Clone)]
pub struct LocalResolver {
    search_path: Vec<PathBuf>,
}

impl LocalResolver {
    /// Create a resolver over an ordered search path (highest precedence
    /// first).
    #[must_use]
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// The configured search path.
    #[must_use]
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Resolve a module reference.
    ///
    /// Returns `Ok(None)` when no strategy produced an artifact — the
    /// caller decides whether that surfaces as `NotFound` or as a
    /// version-mismatch, depending on the constraint.
    ///
    /// # Errors
    ///
    /// Propagates hard I/O failures and manifest errors; a plain miss is
    /// not an error.
    pub fn resolve(
        &self,
        state: &mut EngineState,
        name_or_path: &str,
        constraint: &VersionConstraint,
        force: bool,
        ctx: &LoadContext,
    ) -> Result<Option<Resolved>, ImportError> {
        // Step 1: already-loaded check against the literal input.
        let literal_key = ModuleKey::Path(PathBuf::from(name_or_path));
        if !force {
            if let Some(entry) = state.all_modules.get(&literal_key) {
                if constraint.is_compatible(entry.record.version.as_ref()) {
                    debug!(input = name_or_path, "resolved from module table");
                    return Ok(Some(Resolved::AlreadyLoaded(Arc::clone(&entry.record))));
                }
                debug!(
                    input = name_or_path,
                    "loaded version does not satisfy the constraint, re-resolving"
                );
            }
        }

        // Step 2: fast-path cache, only for unconstrained lookups.
        if constraint.is_any() && !force {
            if let Some(cached) = state.cache.lookup(name_or_path) {
                debug!(input = name_or_path, path = %cached.display(), "resolution cache hit");
                let cached_key = ModuleKey::Path(cached.clone());
                if let Some(entry) = state.all_modules.get(&cached_key) {
                    return Ok(Some(Resolved::AlreadyLoaded(Arc::clone(&entry.record))));
                }
                return self
                    .resolve_rooted(&cached, constraint, ctx)
                    .map(|r| r.map(Resolved::Loaded));
            }
        }

        // Step 3: rootedness check.
        let input_path = Path::new(name_or_path);
        let is_rooted =
            input_path.is_absolute() || name_or_path.contains(['/', std::path::MAIN_SEPARATOR]);

        if is_rooted {
            // Steps 4-6: rooted resolution.
            return self
                .resolve_rooted(input_path, constraint, ctx)
                .map(|r| r.map(Resolved::Loaded));
        }

        // Step 7: bare name against the ordered search path.
        for dir in &self.search_path {
            let module_dir = dir.join(name_or_path);
            if let Some(record) = self.resolve_directory(&module_dir, name_or_path, constraint, ctx)?
            {
                debug!(
                    name = name_or_path,
                    path = %record.key,
                    "resolved from module search path"
                );
                if constraint.is_any() {
                    if let Some(path) = record.path.as_deref() {
                        state.cache.store(name_or_path, path);
                    }
                }
                return Ok(Some(Resolved::Loaded(record)));
            }
        }

        Ok(None)
    }

    /// Steps 4-6: resolve a rooted path (existing file, existing directory
    /// with default-member search, or nonexistent path with extension
    /// probing).
    fn resolve_rooted(
        &self,
        path: &Path,
        constraint: &VersionConstraint,
        ctx: &LoadContext,
    ) -> Result<Option<ModuleRecord>, ImportError> {
        if path.is_file() {
            let record = load_artifact(path, ctx)?;
            if constraint.is_compatible(record.version.as_ref()) {
                return Ok(Some(record));
            }
            return Ok(None);
        }

        if path.is_dir() {
            // Default-member resolution: a file inside the directory
            // sharing the directory's own base name.
            let Some(base) = path.file_name().map(|s| s.to_string_lossy().into_owned()) else {
                return Ok(None);
            };
            return self.resolve_directory(path, &base, constraint, ctx);
        }

        // Step 5: rooted-but-nonexistent with an explicit extension.
        if has_recognized_extension(path) {
            return Ok(None);
        }

        // Step 6: rooted-but-nonexistent without an extension — probe the
        // fixed extension order against the literal path.
        self.probe_extensions(path, constraint, ctx)
    }

    /// Default-member search inside `dir` for `base`, then one level in
    /// through version-segmented subdirectories (highest parseable version
    /// first; names that fail to parse are skipped, not errors).
    fn resolve_directory(
        &self,
        dir: &Path,
        base: &str,
        constraint: &VersionConstraint,
        ctx: &LoadContext,
    ) -> Result<Option<ModuleRecord>, ImportError> {
        if !dir.is_dir() {
            return Ok(None);
        }

        if let Some(record) = self.probe_extensions(&dir.join(base), constraint, ctx)? {
            return Ok(Some(record));
        }

        let mut versions: Vec<(ModuleVersion, PathBuf)> = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|source| ImportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ImportError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let entry_path = entry.path();
            if !entry_path.is_dir() {
                continue;
            }
            let Some(dir_name) = entry_path.file_name().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            // Subdirectories that do not parse as versions are skipped.
            if let Ok(version) = dir_name.parse::<ModuleVersion>() {
                versions.push((version, entry_path));
            }
        }
        versions.sort_by(|a, b| b.0.cmp(&a.0));

        for (version, subdir) in versions {
            if !constraint.is_compatible(Some(&version)) {
                debug!(%version, dir = %subdir.display(), "version directory outside constraint");
                continue;
            }
            if let Some(record) = self.probe_extensions(&subdir.join(base), constraint, ctx)? {
                return Ok(Some(record));
            }
        }

        // One level in through a same-named subdirectory.
        let same_named = dir.join(base);
        if same_named.is_dir() {
            if let Some(record) =
                self.probe_extensions(&same_named.join(base), constraint, ctx)?
            {
                return Ok(Some(record));
            }
        }

        Ok(None)
    }

    /// Try each recognized extension, in fixed precedence order, against
    /// `stem` (a path without extension). The first existing artifact is
    /// loaded; a loaded artifact whose declared version fails the
    /// constraint ends the probe rather than falling through to a
    /// lower-precedence artifact in the same directory.
    fn probe_extensions(
        &self,
        stem: &Path,
        constraint: &VersionConstraint,
        ctx: &LoadContext,
    ) -> Result<Option<ModuleRecord>, ImportError> {
        for ext in PROBE_ORDER {
            // Append rather than `with_extension`: module names may carry
            // dots of their own (`Contoso.Storage`).
            let mut raw = stem.as_os_str().to_os_string();
            raw.push(format!(".{ext}"));
            let candidate = PathBuf::from(raw);
            if candidate.is_file() {
                let record = load_artifact(&candidate, ctx)?;
                if constraint.is_compatible(record.version.as_ref()) {
                    return Ok(Some(record));
                }
                debug!(
                    path = %candidate.display(),
                    "artifact version does not satisfy the constraint"
                );
                return Ok(None);
            }
        }
        Ok(None)
    }
}
