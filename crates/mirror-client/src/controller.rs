//! Orchestration between REST calls, the push channel, and the store.
//!
//! Mutations never touch local state on success: the server broadcasts the
//! resulting truth over the push channel, and only a recognized push
//! replaces the snapshot (wholesale, unconditionally - a push arriving out
//! of order silently wins). There is no ordering guarantee between a
//! mutation's REST acknowledgment and the next push; a success response may
//! resolve before or after the refreshed state arrives.

use crate::channel::ChannelEvent;
use crate::rest::RestTransport;
use mirror_core::{CollectionSchema, ConnectionState, Store};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Bridges one collection schema's REST surface and push kinds into a store.
pub struct SyncController<S: CollectionSchema, T: RestTransport> {
    transport: Arc<T>,
    store: Arc<Store<S::Snapshot>>,
}

impl<S: CollectionSchema, T: RestTransport + 'static> SyncController<S, T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            store: Arc::new(Store::new()),
        }
    }

    pub fn store(&self) -> Arc<Store<S::Snapshot>> {
        Arc::clone(&self.store)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the full current snapshot and replace the store wholesale.
    ///
    /// On failure the previous snapshot is left untouched and the error
    /// surface is set. Concurrent calls are not deduplicated; the last
    /// response to arrive simply overwrites the store.
    pub async fn load_initial(&self) {
        self.store.set_loading(true);
        self.store.clear_error();

        let result = self.transport.get_json(S::SNAPSHOT_PATH).await;
        match result {
            Ok(body) => match S::decode_snapshot(body) {
                Ok(snapshot) => self.store.replace(snapshot),
                Err(e) => self
                    .store
                    .set_error(format!("Failed to fetch {}: {}", S::NAME, e)),
            },
            Err(e) => self
                .store
                .set_error(format!("Failed to fetch {}: {}", S::NAME, e)),
        }

        self.store.set_loading(false);
    }

    /// Run one mutation against the backend.
    ///
    /// Clears the error surface, awaits the request, and on failure records
    /// `"Failed to {label}: {reason}"`. On success nothing else happens
    /// locally; the push channel delivers the authoritative state.
    pub async fn run_mutation<F>(&self, label: &str, request: F)
    where
        F: Future<Output = crate::rest::Result<()>>,
    {
        self.store.clear_error();
        if let Err(e) = request.await {
            self.store.set_error(format!("Failed to {}: {}", label, e));
        }
    }

    /// Apply one channel event to the store.
    pub fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::State(state) => {
                self.store.set_connection(state);
                if state == ConnectionState::Connected {
                    self.store.clear_error();
                }
            }
            ChannelEvent::Message(envelope) => match S::apply_push(&envelope) {
                Some(snapshot) => self.store.replace(snapshot),
                None => debug!("Ignoring push frame of kind {:?}", envelope.kind),
            },
            ChannelEvent::Error(message) => self.store.set_error(message),
        }
    }

    /// Spawn a task draining channel events into the store.
    ///
    /// Runs until the channel's event sender is dropped.
    pub fn spawn_pump(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                controller.handle_event(event);
            }
            debug!("Channel event pump stopped");
        })
    }
}
