//! Reconnecting push-channel client.
//!
//! Maintains a single logical WebSocket connection to the server's push
//! endpoint, decoding text frames into [`PushEnvelope`]s and delivering
//! them, together with connection-state transitions, over an event channel.
//!
//! The lifecycle is owned by one driver task per `connect()`:
//! Connecting -> Connected -> (close) -> Disconnected -> fixed-delay sleep
//! -> Connecting again, forever. `disconnect()` revokes the driver's
//! publishing rights and aborts it, which also cancels any pending
//! reconnect sleep. There is at most one live transport and at most one
//! pending reconnect timer per channel instance.

use futures::StreamExt;
use mirror_core::{ConnectionState, PushEnvelope};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

/// Delay between a non-explicit close and the next connection attempt.
///
/// Fixed interval, no backoff and no cap.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Configuration for the push channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Delay before reconnecting after a non-explicit close.
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Event emitted by the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Connection state transition.
    State(ConnectionState),
    /// A decoded push frame.
    Message(PushEnvelope),
    /// Transport-level error. Does not itself change connection state;
    /// reconnection is driven solely by the close path.
    Error(String),
}

/// Serializes everything a driver emits against `connect()`/`disconnect()`.
///
/// Each driver task holds the generation it was spawned under; revoking
/// bumps the generation, so a driver that is being torn down can never
/// publish after the handle's own Disconnected, even if it was mid-emit on
/// another runtime thread when the abort landed.
struct StateGate {
    generation: Mutex<u64>,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl StateGate {
    fn new(event_tx: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            generation: Mutex::new(0),
            state_tx,
            event_tx,
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Publish a state transition on behalf of a driver. Dropped silently
    /// if the driver's generation has been revoked. Edge-triggered.
    fn publish(&self, generation: u64, state: ConnectionState) {
        let guard = self.lock();
        if *guard != generation {
            return;
        }
        self.send_state(state);
    }

    /// Forward a message or error on behalf of a driver. Dropped silently
    /// if the driver's generation has been revoked.
    fn forward(&self, generation: u64, event: ChannelEvent) {
        let guard = self.lock();
        if *guard != generation {
            return;
        }
        let _ = self.event_tx.send(event);
    }

    /// Invalidate the current driver; returns the generation for its
    /// replacement.
    fn revoke(&self) -> u64 {
        let mut guard = self.lock();
        *guard += 1;
        *guard
    }

    /// Invalidate the current driver and publish a transition in the same
    /// critical section, so no stale publish can interleave.
    fn revoke_and_publish(&self, state: ConnectionState) {
        let mut guard = self.lock();
        *guard += 1;
        self.send_state(state);
    }

    fn send_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            let _ = self.event_tx.send(ChannelEvent::State(state));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to one logical push-channel connection.
pub struct PushChannel {
    url: String,
    config: ChannelConfig,
    gate: Arc<StateGate>,
    driver: Option<JoinHandle<()>>,
}

impl PushChannel {
    /// Create a channel for the given `ws://` URL.
    ///
    /// Returns the handle plus the receiver for channel events. Events from
    /// every (re)connection of this handle arrive on the same receiver.
    pub fn new(url: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        Self::with_config(url, ChannelConfig::default())
    }

    /// Create a channel with a custom reconnect delay.
    pub fn with_config(
        url: impl Into<String>,
        config: ChannelConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                url: url.into(),
                config,
                gate: Arc::new(StateGate::new(event_tx)),
                driver: None,
            },
            event_rx,
        )
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.gate.state()
    }

    /// Start the connection lifecycle.
    ///
    /// No-op while Connecting or Connected: at most one transport exists
    /// per handle. A driver that is Disconnected waiting out its reconnect
    /// delay is replaced, so an explicit `connect()` attempts immediately
    /// instead of finishing the sleep.
    pub fn connect(&mut self) {
        let live = self.driver.as_ref().is_some_and(|d| !d.is_finished());
        if live && self.state() != ConnectionState::Disconnected {
            debug!("connect() ignored: push channel already live");
            return;
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }

        info!("Opening push channel to {}", self.url);
        let url = self.url.clone();
        let delay = self.config.reconnect_delay;
        let gate = Arc::clone(&self.gate);
        let generation = gate.revoke();
        self.driver = Some(tokio::spawn(async move {
            drive(url, delay, gate, generation).await;
        }));
    }

    /// Tear the connection down and stay down.
    ///
    /// Revokes the driver's generation and publishes Disconnected in one
    /// critical section, then aborts the driver (cancelling any pending
    /// reconnect sleep): no reconnect and no stale transition can surface
    /// after this returns. Idempotent.
    pub fn disconnect(&mut self) {
        self.gate.revoke_and_publish(ConnectionState::Disconnected);
        if let Some(driver) = self.driver.take() {
            driver.abort();
            info!("Push channel to {} disconnected", self.url);
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.gate.revoke();
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

/// Connection lifecycle loop. Runs until aborted or revoked.
async fn drive(url: String, reconnect_delay: Duration, gate: Arc<StateGate>, generation: u64) {
    loop {
        gate.publish(generation, ConnectionState::Connecting);

        match connect_async(&url).await {
            Ok((ws, _)) => {
                info!("Push channel connected to {}", url);
                gate.publish(generation, ConnectionState::Connected);

                read_frames(ws, &gate, generation).await;

                warn!(
                    "Push channel to {} closed, reconnecting in {:?}",
                    url, reconnect_delay
                );
            }
            Err(e) => {
                // A failed connect behaves like an immediate close: error
                // surfaced, then the same fixed-delay retry.
                warn!("Push channel connect to {} failed: {}", url, e);
                gate.forward(generation, ChannelEvent::Error(e.to_string()));
            }
        }

        gate.publish(generation, ConnectionState::Disconnected);

        // The single pending reconnect timer. Aborting the driver cancels it.
        tokio::time::sleep(reconnect_delay).await;
    }
}

/// Read frames until the connection closes.
async fn read_frames(
    mut ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    gate: &StateGate,
    generation: u64,
) {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => decode_frame(&text, gate, generation),
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => decode_frame(text, gate, generation),
                Err(_) => warn!("Dropping non-UTF-8 push frame ({} bytes)", data.len()),
            },
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Ok(Message::Frame(_)) => continue,
            Err(e) => {
                match e {
                    WsError::ConnectionClosed | WsError::AlreadyClosed => {
                        debug!("Push channel stream closed");
                    }
                    _ => {
                        error!("Push channel error: {}", e);
                        gate.forward(generation, ChannelEvent::Error(e.to_string()));
                    }
                }
                break;
            }
        }
    }
}

/// Decode one text frame and forward it. Malformed frames are dropped:
/// logged, never surfaced, never a connection error.
fn decode_frame(text: &str, gate: &StateGate, generation: u64) {
    match PushEnvelope::decode(text) {
        Ok(envelope) => {
            debug!("Push frame: {}", envelope.kind);
            gate.forward(generation, ChannelEvent::Message(envelope));
        }
        Err(e) => {
            warn!("Failed to parse push frame: {}", e);
        }
    }
}
