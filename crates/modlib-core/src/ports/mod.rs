//! Port definitions for the engine's external collaborators.
//!
//! Both remote protocols are opaque handles: the engine sees capabilities,
//! never transports. Implementations are injected as `Arc<dyn Port>` the
//! same way throughout the workspace.

mod inventory;
mod session;

pub use inventory::{InventoryEndpointPort, InventoryModuleDescriptor, RemoteModuleFile};
pub use session::{RemoteModuleInfo, RemoteSessionPort};
