//! mirror-core: platform-neutral core for the server-mirrored state cache.
//!
//! This crate provides:
//! - Entity types mirrored from the server
//! - The push-channel wire envelope
//! - The observable store holding the mirrored snapshot
//! - Collection schemas binding a domain to its REST/push representation
//!
//! Networking lives in mirror-client; nothing here performs I/O.

pub mod envelope;
pub mod events;
pub mod model;
pub mod schema;
pub mod state;

pub use envelope::{DecodeError, PushEnvelope};
pub use events::{EventBus, Subscription};
pub use model::{Class, ClassroomSnapshot, Course, Item};
pub use schema::{ClassroomSchema, CollectionSchema, ItemListSchema};
pub use state::{ConnectionState, Store, StoreEvent, StoreState};
