//! Inventory endpoint port definition.
//!
//! A management/inventory endpoint can enumerate module descriptors and
//! serve raw file contents without an interactive session. The engine only
//! needs wildcard-aware query plus a stable endpoint identity; addressing
//! (resource locator, namespace) stays behind the trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

/// A raw file served by the inventory endpoint for one module.
///
/// Classification into cmdletization/types/formats happens locally in the
/// importer; the endpoint only supplies names and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModuleFile {
    /// File name as known on the remote side.
    pub file_name: String,
    /// Raw file content.
    pub raw: Vec<u8>,
}

/// A module descriptor returned by the inventory endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryModuleDescriptor {
    /// Module name.
    pub name: String,
    /// Whether the module can only be imported through an interactive
    /// session. Management-capable modules are flattened and loaded
    /// directly; session-only ones must go through the session importer.
    pub session_only: bool,
    /// Every file the endpoint serves for this module.
    pub files: Vec<RemoteModuleFile>,
}

/// A management/inventory endpoint the engine can discover modules through.
#[async_trait]
pub trait InventoryEndpointPort: Send + Sync {
    /// Identity string of the endpoint (resource locator plus namespace),
    /// used for staging-path derivation. Must be stable across calls.
    fn endpoint_id(&self) -> String;

    /// Query the endpoint for all modules matching the requested names.
    /// Names may contain wildcards; matching happens on the remote side.
    async fn query_modules(
        &self,
        patterns: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<InventoryModuleDescriptor>, TransportError>;
}
