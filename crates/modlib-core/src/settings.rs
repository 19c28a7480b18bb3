//! Engine settings: the module search path and staging root.
//!
//! Pure domain types with defaults and environment overrides; adapters
//! decide where the values ultimately come from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the module search path (platform path-list
/// syntax, highest precedence first).
pub const SEARCH_PATH_ENV: &str = "MODLIB_PATH";

/// Environment variable overriding the staging root for remote imports.
pub const STAGING_DIR_ENV: &str = "MODLIB_STAGING_DIR";

/// Errors raised while resolving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Could not determine the platform data directory.
    #[error("cannot determine system data directory")]
    NoDataDir,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Ordered module search path, highest precedence first. Consumed
    /// read-only by bare-name resolution.
    pub search_path: Vec<PathBuf>,
    /// Root directory under which remote imports materialize their staging
    /// directories.
    pub staging_root: PathBuf,
}

impl EngineSettings {
    /// Settings rooted at the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NoDataDir`] when the platform data
    /// directory cannot be determined.
    pub fn with_defaults() -> Result<Self, SettingsError> {
        let data_root = dirs::data_dir()
            .ok_or(SettingsError::NoDataDir)?
            .join("modlib");
        Ok(Self {
            search_path: vec![data_root.join("modules")],
            staging_root: data_root.join("staging"),
        })
    }

    /// Defaults plus environment overrides (`MODLIB_PATH`,
    /// `MODLIB_STAGING_DIR`).
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NoDataDir`] when defaults are needed and
    /// the platform data directory cannot be determined.
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut settings = Self::with_defaults()?;
        if let Some(raw) = std::env::var_os(SEARCH_PATH_ENV) {
            settings.search_path = std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(raw) = std::env::var_os(STAGING_DIR_ENV) {
            settings.staging_root = PathBuf::from(raw);
        }
        Ok(settings)
    }

    /// Replace the search path, keeping everything else.
    #[must_use]
    pub fn with_search_path(mut self, search_path: Vec<PathBuf>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Replace the staging root, keeping everything else.
    #[must_use]
    pub fn with_staging_root(mut self, staging_root: PathBuf) -> Self {
        self.staging_root = staging_root;
        self
    }
}
