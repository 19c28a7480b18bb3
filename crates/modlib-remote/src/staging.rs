//! Staging-directory lifecycle for remote imports.
//!
//! Staging paths are deterministic — derived from the remote identity,
//! module name, and version — so repeated imports of the same remote
//! module converge on the same local directory. The guard owns the
//! directory until ownership is explicitly transferred to the module's
//! cleanup list; every failure path deletes it synchronously.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use modlib_core::{ImportError, ModuleVersion};

/// Compute the staging directory for a remote module.
#[must_use]
pub fn staging_dir(
    root: &Path,
    remote_id: &str,
    name: &str,
    version: Option<&ModuleVersion>,
) -> PathBuf {
    let leaf = match version {
        Some(version) => format!("{}_{version}", sanitize(name)),
        None => sanitize(name),
    };
    root.join(sanitize(remote_id)).join(leaf)
}

/// Replace path-hostile characters so any remote identity becomes a single
/// path component.
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// RAII owner of a staging directory.
///
/// Dropping an armed guard deletes the directory recursively; `disarm`
/// hands the path over to the caller (normally into a module's cleanup
/// list) and leaves the directory in place.
#[derive(Debug)]
pub struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    /// Create the staging directory (and parents) and arm the guard.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] when the directory cannot be created.
    pub fn create(path: &Path) -> Result<Self, ImportError> {
        std::fs::create_dir_all(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "created staging directory");
        Ok(Self {
            path: path.to_path_buf(),
            armed: true,
        })
    }

    /// The staging directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transfer ownership of the directory to the caller.
    #[must_use]
    pub fn disarm(mut self) -> PathBuf {
        self.armed = false;
        self.path.clone()
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        debug!(path = %self.path.display(), "rolling back staging directory");
        if let Err(error) = std::fs::remove_dir_all(&self.path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    %error,
                    "failed to roll back staging directory"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_paths_are_deterministic() {
        let root = PathBuf::from("/staging");
        let version: ModuleVersion = "1.2.3".parse().unwrap();
        let a = staging_dir(&root, "server01:5985", "Disk", Some(&version));
        let b = staging_dir(&root, "server01:5985", "Disk", Some(&version));
        assert_eq!(a, b);
        assert_eq!(a, PathBuf::from("/staging/server01_5985/Disk_1.2.3"));
    }

    #[test]
    fn versionless_and_versioned_paths_differ() {
        let root = PathBuf::from("/staging");
        let version: ModuleVersion = "1.0".parse().unwrap();
        let before = staging_dir(&root, "host", "Disk", None);
        let after = staging_dir(&root, "host", "Disk", Some(&version));
        assert_ne!(before, after);
    }

    #[test]
    fn dropped_guard_rolls_back() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("host").join("Disk_1.0");
        {
            let _guard = StagingGuard::create(&staging).unwrap();
            std::fs::write(staging.join("partial.psd1"), "@{}").unwrap();
            assert!(staging.exists());
        }
        assert!(!staging.exists());
    }

    #[test]
    fn disarmed_guard_leaves_the_directory() {
        let root = tempfile::tempdir().unwrap();
        let staging = root.path().join("host").join("Disk_1.0");
        let guard = StagingGuard::create(&staging).unwrap();
        let kept = guard.disarm();
        assert!(kept.exists());
    }
}
