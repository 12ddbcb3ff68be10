//! Observable store holding the server-mirrored snapshot.
//!
//! The store is a passive value holder: it is mutated only by the sync
//! controller and the push-channel pump, and exposes read-only copies plus
//! change notifications to everything else. No validation, no derived
//! indices, no diffing: the snapshot is always either empty (before the
//! first fetch) or the last complete server-authoritative replacement.

use crate::events::{EventBus, Subscription};
use std::sync::{Arc, RwLock};

/// State of the push-channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot of the full store: collections plus status flags.
#[derive(Debug, Clone)]
pub struct StoreState<S> {
    /// Last complete snapshot received from the server.
    pub collections: S,
    /// Push-channel connection state.
    pub connection: ConnectionState,
    /// Whether an initial fetch is in flight.
    pub loading: bool,
    /// Last operation failure, overwritten by each new failure and cleared
    /// at the start of each new attempt.
    pub error: Option<String>,
}

/// Change notifications emitted by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The snapshot was replaced wholesale.
    SnapshotReplaced,
    ConnectionChanged(ConnectionState),
    LoadingChanged(bool),
    ErrorChanged(Option<String>),
}

/// Observable holder of one mirrored collection set.
pub struct Store<S> {
    inner: RwLock<StoreState<S>>,
    bus: Arc<EventBus<StoreEvent>>,
}

impl<S: Clone + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Default> Store<S> {
    /// Create an empty store: no collections, disconnected, not loading.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState {
                collections: S::default(),
                connection: ConnectionState::Disconnected,
                loading: false,
                error: None,
            }),
            bus: Arc::new(EventBus::new()),
        }
    }

    /// Read the full store state.
    pub fn state(&self) -> StoreState<S> {
        self.read().clone()
    }

    /// Read just the collections snapshot.
    pub fn collections(&self) -> S {
        self.read().collections.clone()
    }

    pub fn connection(&self) -> ConnectionState {
        self.read().connection
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    /// Subscribe to change notifications.
    pub fn subscribe(
        &self,
        callback: impl Fn(StoreEvent) + Send + Sync + 'static,
    ) -> Subscription<StoreEvent> {
        self.bus.subscribe(callback)
    }

    /// Replace the snapshot wholesale. Never merges.
    pub fn replace(&self, collections: S) {
        self.write().collections = collections;
        self.bus.emit(StoreEvent::SnapshotReplaced);
    }

    pub fn set_connection(&self, connection: ConnectionState) {
        let changed = {
            let mut inner = self.write();
            let changed = inner.connection != connection;
            inner.connection = connection;
            changed
        };
        if changed {
            self.bus.emit(StoreEvent::ConnectionChanged(connection));
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.write().loading = loading;
        self.bus.emit(StoreEvent::LoadingChanged(loading));
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.write().error = Some(message.clone());
        self.bus.emit(StoreEvent::ErrorChanged(Some(message)));
    }

    pub fn clear_error(&self) {
        let had_error = {
            let mut inner = self.write();
            inner.error.take().is_some()
        };
        if had_error {
            self.bus.emit(StoreEvent::ErrorChanged(None));
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState<S>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState<S>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
