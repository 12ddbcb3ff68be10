//! mirror-client: native synchronization client for server-mirrored state.
//!
//! Builds on mirror-core with the networking half: the reconnecting push
//! channel (tokio-tungstenite), the REST transport (reqwest), the generic
//! sync controller, and the two concrete domain stores.

pub mod channel;
pub mod classroom;
pub mod controller;
pub mod items;
pub mod rest;

// Re-export key types for convenience
pub use channel::{ChannelConfig, ChannelEvent, PushChannel, RECONNECT_DELAY};
pub use classroom::ClassroomStore;
pub use controller::SyncController;
pub use items::ItemListStore;
pub use rest::{HttpRest, InMemoryRest, RestError, RestTransport};
