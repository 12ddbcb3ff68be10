//! Collection schemas: how one mirrored domain maps onto the wire.
//!
//! The sync machinery is generic; a schema pins down the snapshot type, the
//! REST path that serves the full snapshot, and which push kinds carry a
//! replacement for it. Two schemas exist: the classroom domain
//! (classes + courses) and the flat item list.

use crate::envelope::PushEnvelope;
use crate::model::{ClassroomSnapshot, Item};
use serde_json::Value;
use tracing::warn;

/// Binds one collection set to its REST and push-channel representation.
pub trait CollectionSchema: Send + Sync + 'static {
    /// Complete server-side snapshot of the collection set.
    type Snapshot: Clone + Default + Send + Sync + 'static;

    /// Short name used in surfaced error messages ("data", "items").
    const NAME: &'static str;

    /// REST path serving the full snapshot.
    const SNAPSHOT_PATH: &'static str;

    /// Decode the body of a snapshot fetch.
    fn decode_snapshot(value: Value) -> Result<Self::Snapshot, serde_json::Error>;

    /// Decode a push frame into a replacement snapshot.
    ///
    /// Returns `None` both for unrecognized kinds (ignored for forward
    /// compatibility) and for recognized kinds whose payload fails to
    /// decode (discarded, never surfaced).
    fn apply_push(envelope: &PushEnvelope) -> Option<Self::Snapshot>;
}

/// Classes + courses, served by `GET /data` and pushed as `data_updated`.
pub struct ClassroomSchema;

impl CollectionSchema for ClassroomSchema {
    type Snapshot = ClassroomSnapshot;

    const NAME: &'static str = "data";
    const SNAPSHOT_PATH: &'static str = "/data";

    fn decode_snapshot(value: Value) -> Result<Self::Snapshot, serde_json::Error> {
        serde_json::from_value(value)
    }

    fn apply_push(envelope: &PushEnvelope) -> Option<Self::Snapshot> {
        if envelope.kind != "data_updated" {
            return None;
        }
        match serde_json::from_value(envelope.payload.clone()) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Discarding data_updated push with bad payload: {}", e);
                None
            }
        }
    }
}

/// The flat item list, served by `GET /items` and pushed as `items_updated`.
pub struct ItemListSchema;

impl CollectionSchema for ItemListSchema {
    type Snapshot = Vec<Item>;

    const NAME: &'static str = "items";
    const SNAPSHOT_PATH: &'static str = "/items";

    fn decode_snapshot(value: Value) -> Result<Self::Snapshot, serde_json::Error> {
        serde_json::from_value(value)
    }

    fn apply_push(envelope: &PushEnvelope) -> Option<Self::Snapshot> {
        if envelope.kind != "items_updated" {
            return None;
        }
        match serde_json::from_value(envelope.payload.clone()) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!("Discarding items_updated push with bad payload: {}", e);
                None
            }
        }
    }
}
