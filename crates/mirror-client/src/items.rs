//! Store for the flat to-do item list.

use crate::channel::{ChannelConfig, PushChannel};
use crate::controller::SyncController;
use crate::rest::RestTransport;
use mirror_core::{Item, ItemListSchema, Store};
use serde_json::json;
use std::sync::Arc;

/// Mirrors the item list and issues its mutations.
///
/// Successful writes change nothing locally; the refreshed list arrives via
/// `items_updated` pushes.
pub struct ItemListStore<T: RestTransport + 'static> {
    controller: Arc<SyncController<ItemListSchema, T>>,
    channel: PushChannel,
}

impl<T: RestTransport + 'static> ItemListStore<T> {
    pub fn new(transport: Arc<T>, ws_url: impl Into<String>) -> Self {
        Self::with_config(transport, ws_url, ChannelConfig::default())
    }

    pub fn with_config(
        transport: Arc<T>,
        ws_url: impl Into<String>,
        config: ChannelConfig,
    ) -> Self {
        let controller = Arc::new(SyncController::new(transport));
        let (channel, events) = PushChannel::with_config(ws_url, config);
        let _ = controller.spawn_pump(events);
        Self {
            controller,
            channel,
        }
    }

    /// The observable store backing the list.
    pub fn store(&self) -> Arc<Store<Vec<Item>>> {
        self.controller.store()
    }

    /// Open the push channel (idempotent).
    pub fn connect(&mut self) {
        self.channel.connect();
    }

    /// Close the push channel and suppress reconnection.
    pub fn disconnect(&mut self) {
        self.channel.disconnect();
    }

    /// Fetch the full item list.
    pub async fn fetch_items(&self) {
        self.controller.load_initial().await;
    }

    /// Create a new item. Whitespace-only titles are a silent no-op.
    pub async fn add_item(&self, title: &str) {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return;
        }

        let body = json!({ "title": trimmed, "completed": false });
        self.controller
            .run_mutation("add item", self.controller.transport().post_json("/items", body))
            .await;
    }

    /// Flip an item's completion state.
    pub async fn toggle_item(&self, item: &Item) {
        let path = format!("/items/{}", item.id);
        let body = json!({ "completed": !item.completed });
        self.controller
            .run_mutation("update item", self.controller.transport().put_json(&path, body))
            .await;
    }

    /// Delete an item.
    pub async fn delete_item(&self, item_id: &str) {
        let path = format!("/items/{}", item_id);
        self.controller
            .run_mutation("delete item", self.controller.transport().delete(&path))
            .await;
    }
}
