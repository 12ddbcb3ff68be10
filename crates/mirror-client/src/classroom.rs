//! Store for the classroom domain (classes + courses).

use crate::channel::{ChannelConfig, PushChannel};
use crate::controller::SyncController;
use crate::rest::RestTransport;
use mirror_core::{ClassroomSchema, ClassroomSnapshot, Store};
use serde_json::json;
use std::sync::Arc;

/// Mirrors the classroom collections and issues their mutations.
///
/// Edits go out over REST with patch bodies only; the refreshed collections
/// come back over the push channel as `data_updated`.
pub struct ClassroomStore<T: RestTransport + 'static> {
    controller: Arc<SyncController<ClassroomSchema, T>>,
    channel: PushChannel,
}

impl<T: RestTransport + 'static> ClassroomStore<T> {
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

    /// The observable store backing this domain.
    pub fn store(&self) -> Arc<Store<ClassroomSnapshot>> {
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

    /// Fetch the full classroom snapshot.
    pub async fn fetch_data(&self) {
        self.controller.load_initial().await;
    }

    /// Rename a class. The new collections arrive via `data_updated`.
    pub async fn update_class_alias(&self, class_id: &str, alias: &str) {
        let path = format!("/classes/{}", class_id);
        let body = json!({ "alias": alias });
        self.controller
            .run_mutation("update class", self.controller.transport().put_json(&path, body))
            .await;
    }

    /// Reassign the classes a course is taught to.
    pub async fn update_course_class_ids(&self, course_id: &str, class_ids: &[String]) {
        let path = format!("/courses/{}", course_id);
        let body = json!({ "class_ids": class_ids });
        self.controller
            .run_mutation("update course", self.controller.transport().put_json(&path, body))
            .await;
    }
}
