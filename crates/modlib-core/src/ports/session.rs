//! Remote session port definition.
//!
//! The engine drives an interactive remote session through this trait and
//! never sees the transport underneath. It needs exactly two capabilities:
//! run the remote host's own import operation and collect its structured
//! result, and generate command-proxy artifacts into a local directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::specification::ModuleSpecification;
use crate::domain::version::ModuleVersion;
use crate::error::TransportError;

/// Identity reported back by the remote host's import operation.
///
/// The engine treats these as opaque key/value results; remote module
/// internals beyond these fields are never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModuleInfo {
    /// Module name as the remote host resolved it.
    pub name: String,
    /// Version the remote host loaded, when it reported one.
    pub version: Option<ModuleVersion>,
    /// GUID the remote host reported, if any.
    pub guid: Option<Uuid>,
    /// Help-location metadata, carried through verbatim.
    pub help_uri: Option<String>,
}

/// An interactive remote session the engine can import modules through.
///
/// Implementations are injected as `Arc<dyn RemoteSessionPort>`; the engine
/// keeps the handle on the produced proxy record so later invocations know
/// which session to forward to.
#[async_trait]
pub trait RemoteSessionPort: Send + Sync {
    /// Identity string of the remote host, used for staging-path
    /// derivation. Must be stable across calls for the same host.
    fn host_id(&self) -> String;

    /// Run the remote host's import operation for `spec` inside the session
    /// and report the resulting module identity.
    async fn import_module(
        &self,
        spec: &ModuleSpecification,
        cancel: &CancellationToken,
    ) -> Result<RemoteModuleInfo, TransportError>;

    /// Generate command-proxy artifacts for an imported remote module into
    /// `dest`, returning the file names produced (relative to `dest`).
    ///
    /// An empty result means the remote side had nothing to export; the
    /// engine treats that as a failed import, not a success.
    async fn generate_proxy(
        &self,
        module: &RemoteModuleInfo,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, TransportError>;
}
