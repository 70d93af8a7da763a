//! Session connection state machine
//!
//! One [`SessionConnection`] owns at most one duplex channel per session
//! identifier. It serializes state transitions, queues outbound messages
//! while the channel is down, schedules reconnection with exponential
//! backoff and jitter, and runs the heartbeat monitor while connected.

use crate::config::ConnectionConfig;
use crate::envelope::{message_types, Envelope};
use crate::error::MedilinkError;
use crate::event::{ConnectionEvent, EventStream, SessionEvent};
use crate::heartbeat::HeartbeatMonitor;
use crate::queue::MessageQueue;
use crate::transport::{close_codes, is_reconnect_eligible, Transport, TransportEvent, TransportFactory};
use parking_lot::{Mutex as SyncMutex, RwLock as SyncRwLock};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of a session connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel; the resting and terminal state
    Disconnected,
    /// A transport open is in flight
    Connecting,
    /// The channel is open and draining traffic
    Connected,
    /// The transport reported an error; disconnection handling follows
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Outcome of a send attempt
///
/// Sending never fails outright: anything that cannot be transmitted right
/// now is buffered for the next successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The message went out on the open channel
    Sent,
    /// The message was buffered in the outbound queue
    Queued,
}

impl SendStatus {
    /// Whether the message was transmitted immediately
    pub fn is_sent(&self) -> bool {
        matches!(self, SendStatus::Sent)
    }
}

/// Counters describing a connection's activity
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    /// Transport opens attempted (including reconnections)
    pub connect_attempts: u64,
    /// Transport opens that succeeded
    pub successful_connects: u64,
    /// Messages transmitted on an open channel
    pub messages_sent: u64,
    /// Messages buffered while the channel was down
    pub messages_queued: u64,
    /// Queued messages dropped for exceeding the age limit
    pub messages_expired: u64,
    /// Inbound frames dropped as unparseable
    pub frames_dropped: u64,
    /// Liveness probes sent
    pub heartbeats_sent: u64,
}

/// Persistent duplex channel to a capture-session endpoint
pub struct SessionConnection {
    inner: Arc<ConnectionInner>,
}

pub(crate) struct ConnectionInner {
    id: Uuid,
    config: ConnectionConfig,
    factory: Arc<dyn TransportFactory>,
    self_ref: Weak<ConnectionInner>,
    state: SyncRwLock<ConnectionState>,
    session_id: SyncRwLock<Option<String>>,
    should_reconnect: AtomicBool,
    reconnect_attempts: AtomicU32,
    queue: SyncMutex<MessageQueue>,
    last_seen: SyncRwLock<Instant>,
    sink: Mutex<Option<Box<dyn Transport>>>,
    reader_task: SyncMutex<Option<JoinHandle<()>>>,
    heartbeat_task: SyncMutex<Option<JoinHandle<()>>>,
    reconnect_timer: SyncMutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    stats: SyncRwLock<ConnectionStats>,
}

impl SessionConnection {
    /// Create a connection and the stream of events it emits
    pub fn new(config: ConnectionConfig, factory: Arc<dyn TransportFactory>) -> (Self, EventStream) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let queue = MessageQueue::new(config.max_queue_size, config.max_message_age);
        let inner = Arc::new_cyclic(|weak| ConnectionInner {
            id: Uuid::new_v4(),
            config,
            factory,
            self_ref: weak.clone(),
            state: SyncRwLock::new(ConnectionState::Disconnected),
            session_id: SyncRwLock::new(None),
            should_reconnect: AtomicBool::new(false),
            reconnect_attempts: AtomicU32::new(0),
            queue: SyncMutex::new(queue),
            last_seen: SyncRwLock::new(Instant::now()),
            sink: Mutex::new(None),
            reader_task: SyncMutex::new(None),
            heartbeat_task: SyncMutex::new(None),
            reconnect_timer: SyncMutex::new(None),
            events: event_tx,
            stats: SyncRwLock::new(ConnectionStats::default()),
        });
        (Self { inner }, EventStream::new(event_rx))
    }

    /// Open the channel for `session_id`
    ///
    /// A no-op while already connecting or connected. Enables automatic
    /// reconnection until [`disconnect`](Self::disconnect) is called.
    pub async fn connect(&self, session_id: &str) -> Result<(), MedilinkError> {
        if session_id.is_empty() {
            return Err(MedilinkError::InvalidSession {
                reason: "session id must not be empty".to_string(),
            });
        }
        if matches!(
            self.inner.state(),
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            debug!(connection = %self.inner.id, "connect ignored, channel already active");
            return Ok(());
        }
        self.inner.cancel_reconnect_timer();
        *self.inner.session_id.write() = Some(session_id.to_string());
        // An explicit connect restarts the reconnection budget.
        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);
        self.inner.should_reconnect.store(true, Ordering::SeqCst);
        self.inner.open_transport().await
    }

    /// Close the channel and disable automatic reconnection
    ///
    /// Terminal for this connection until a new [`connect`](Self::connect).
    pub async fn disconnect(&self) {
        info!(connection = %self.inner.id, "disconnecting session channel");
        self.inner.should_reconnect.store(false, Ordering::SeqCst);
        self.inner.cancel_reconnect_timer();
        self.inner.stop_heartbeat();
        if let Some(mut transport) = self.inner.sink.lock().await.take() {
            transport.close(close_codes::NORMAL, "client disconnect").await;
        }
        self.inner.abort_reader();
        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Transmit a message now, or buffer it if the channel is down
    pub async fn send(&self, message: Value) -> SendStatus {
        self.inner.send_value(message).await
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Whether the channel is currently open
    pub fn is_connected(&self) -> bool {
        self.inner.state() == ConnectionState::Connected
    }

    /// Session identifier of the most recent `connect` call
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.read().clone()
    }

    /// Identifier of this connection instance, used in log lines
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Snapshot of the activity counters
    pub fn stats(&self) -> ConnectionStats {
        self.inner.stats.read().clone()
    }

    /// Number of messages waiting in the outbound queue
    pub fn queued_len(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

impl ConnectionInner {
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = {
            let mut slot = self.state.write();
            std::mem::replace(&mut *slot, state)
        };
        if previous != state {
            debug!(connection = %self.id, "state {} -> {}", previous, state);
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    /// Time since the last inbound message
    pub(crate) fn idle(&self) -> Duration {
        self.last_seen.read().elapsed()
    }

    pub(crate) fn record_heartbeat(&self) {
        self.stats.write().heartbeats_sent += 1;
    }

    async fn open_transport(&self) -> Result<(), MedilinkError> {
        self.set_state(ConnectionState::Connecting);
        let session_id = self.session_id.read().clone().unwrap_or_default();
        let endpoint = self.config.endpoint_for(&session_id);
        info!(connection = %self.id, "connecting to {}", endpoint);
        self.stats.write().connect_attempts += 1;

        match self.factory.connect(&endpoint).await {
            Ok(handle) => {
                *self.sink.lock().await = Some(handle.sink);
                self.reconnect_attempts.store(0, Ordering::SeqCst);
                *self.last_seen.write() = Instant::now();
                self.set_state(ConnectionState::Connected);
                self.stats.write().successful_connects += 1;
                self.spawn_reader(handle.events);
                self.drain_queue().await;
                self.start_heartbeat();
                self.emit(ConnectionEvent::Connected);
                info!(connection = %self.id, "session channel established");
                Ok(())
            }
            Err(err) => {
                warn!(connection = %self.id, "transport open failed: {}", err);
                self.set_state(ConnectionState::Error);
                self.emit(ConnectionEvent::TransportError {
                    message: err.to_string(),
                });
                self.handle_close(close_codes::ABNORMAL, "transport open failed")
                    .await;
                Err(err)
            }
        }
    }

    fn spawn_reader(&self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        let weak = self.self_ref.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else { return };
                match event {
                    TransportEvent::Message(text) => inner.handle_frame(&text).await,
                    TransportEvent::Error(message) => {
                        warn!(connection = %inner.id, "transport error: {}", message);
                        inner.set_state(ConnectionState::Error);
                        inner.emit(ConnectionEvent::TransportError { message });
                    }
                    TransportEvent::Closed { code, reason } => {
                        inner.handle_close(code, &reason).await;
                        break;
                    }
                }
            }
            debug!("reader task finished");
        });
        if let Some(previous) = self.reader_task.lock().replace(task) {
            previous.abort();
        }
    }

    async fn handle_frame(&self, text: &str) {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                // Unparseable frames are dropped, never escalated.
                warn!(connection = %self.id, "dropping unparseable frame: {}", err);
                self.stats.write().frames_dropped += 1;
                return;
            }
        };
        *self.last_seen.write() = Instant::now();
        if envelope.kind == message_types::HEARTBEAT {
            let _ = self.send_value(Envelope::heartbeat_response()).await;
            return;
        }
        self.emit(ConnectionEvent::Session(SessionEvent::from_envelope(envelope)));
    }

    async fn handle_close(&self, code: u16, reason: &str) {
        if self.state() == ConnectionState::Disconnected {
            return;
        }
        self.stop_heartbeat();
        self.sink.lock().await.take();
        self.set_state(ConnectionState::Disconnected);
        self.emit(ConnectionEvent::Disconnected {
            code,
            reason: reason.to_string(),
        });
        if self.should_reconnect.load(Ordering::SeqCst) && is_reconnect_eligible(code) {
            self.schedule_reconnect();
        } else {
            debug!(connection = %self.id, code, "close is final, not reconnecting");
        }
    }

    fn schedule_reconnect(&self) {
        let attempts = self.reconnect_attempts.load(Ordering::SeqCst);
        if attempts >= self.config.max_reconnect_attempts {
            warn!(connection = %self.id, attempts, "reconnection attempts exhausted");
            self.emit(ConnectionEvent::ConnectionFailed { attempts });
            return;
        }
        let attempt = attempts + 1;
        self.reconnect_attempts.store(attempt, Ordering::SeqCst);
        let delay = self.config.reconnect_delay(attempt);
        info!(connection = %self.id, attempt, ?delay, "scheduling reconnection");
        let weak = self.self_ref.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            if !inner.should_reconnect.load(Ordering::SeqCst) {
                return;
            }
            if matches!(
                inner.state(),
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                return;
            }
            let _ = inner.open_transport().await;
        });
        if let Some(previous) = self.reconnect_timer.lock().replace(timer) {
            previous.abort();
        }
    }

    pub(crate) async fn send_value(&self, message: Value) -> SendStatus {
        if self.state() == ConnectionState::Connected {
            let mut sink = self.sink.lock().await;
            if let Some(transport) = sink.as_mut() {
                match transport.send(message.to_string()).await {
                    Ok(()) => {
                        self.stats.write().messages_sent += 1;
                        return SendStatus::Sent;
                    }
                    Err(err) => {
                        debug!(connection = %self.id, "send failed, queueing: {}", err);
                    }
                }
            }
        }
        self.queue.lock().enqueue(message);
        self.stats.write().messages_queued += 1;
        SendStatus::Queued
    }

    async fn drain_queue(&self) {
        let (fresh, expired) = self.queue.lock().drain_fresh();
        if expired > 0 {
            self.stats.write().messages_expired += expired as u64;
            debug!(connection = %self.id, expired, "discarded expired queued messages");
        }
        if fresh.is_empty() {
            return;
        }
        info!(connection = %self.id, count = fresh.len(), "flushing queued messages");
        for payload in fresh {
            let _ = self.send_value(payload).await;
        }
    }

    /// Close the transport immediately and run disconnection handling with
    /// the given code, as if the peer had closed the channel
    pub(crate) async fn force_close(&self, code: u16, reason: &str) {
        if let Some(mut transport) = self.sink.lock().await.take() {
            transport.close(code, reason).await;
        }
        self.abort_reader();
        self.handle_close(code, reason).await;
    }

    fn start_heartbeat(&self) {
        let task = HeartbeatMonitor::spawn(self.config.heartbeat_timeout, self.self_ref.clone());
        if let Some(previous) = self.heartbeat_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn stop_heartbeat(&self) {
        if let Some(task) = self.heartbeat_task.lock().take() {
            task.abort();
        }
    }

    fn cancel_reconnect_timer(&self) {
        if let Some(timer) = self.reconnect_timer.lock().take() {
            timer.abort();
        }
    }

    fn abort_reader(&self) {
        if let Some(task) = self.reader_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.cancel_reconnect_timer();
        self.stop_heartbeat();
        self.abort_reader();
    }
}

impl fmt::Debug for SessionConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConnection")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state())
            .field("session_id", &*self.inner.session_id.read())
            .finish()
    }
}
