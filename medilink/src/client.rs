//! Client facade wiring the session connection to the recovery engine
//!
//! The [`SessionClient`] owns one connection and one recovery engine. A pump
//! task forwards domain events to the host bridge as serialized envelopes and
//! routes connection exhaustion into the recovery engine; collaborator
//! failures reported by the host layer enter through
//! [`report_failure`](SessionClient::report_failure).

use crate::config::ClientConfig;
use medilink_core::{
    ConnectionEvent, ConnectionState, ConnectionStats, EventStream, MedilinkError, SendStatus,
    SessionConnection, TransportFactory, WebSocketFactory,
};
use medilink_recovery::{
    default_chains, ErrorCategory, ErrorRecord, Failure, FeatureFlagStore, FeatureFlags,
    HostBridge, MediaEngine, RecoveryDeps, RecoveryEngine, RecoveryEvent, RecoveryEventStream,
    ThumbnailPipeline,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Events surfaced to the embedding UI layer
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A connection lifecycle or traffic event
    Connection(ConnectionEvent),
    /// A recovery or degraded-mode notice
    Recovery(RecoveryEvent),
}

impl ClientEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::Connection(event) => event.event_type(),
            ClientEvent::Recovery(event) => event.event_type(),
        }
    }
}

/// Stream of client events for async iteration
#[derive(Debug)]
pub struct ClientEventStream {
    receiver: mpsc::UnboundedReceiver<ClientEvent>,
}

impl ClientEventStream {
    /// Create a new stream around a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<ClientEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<ClientEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Option<ClientEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Builder for [`SessionClient`]
pub struct SessionClientBuilder {
    config: ClientConfig,
    factory: Arc<dyn TransportFactory>,
    media_engine: Option<Arc<dyn MediaEngine>>,
    thumbnails: Option<Arc<dyn ThumbnailPipeline>>,
    bridge: Option<Arc<dyn HostBridge>>,
}

impl SessionClientBuilder {
    /// Create a builder with the production WebSocket transport
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            factory: Arc::new(WebSocketFactory),
            media_engine: None,
            thumbnails: None,
            bridge: None,
        }
    }

    /// Replace the transport factory (tests use an in-memory transport)
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Attach the media streaming engine collaborator
    pub fn with_media_engine(mut self, media_engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(media_engine);
        self
    }

    /// Attach the thumbnail pipeline collaborator
    pub fn with_thumbnails(mut self, thumbnails: Arc<dyn ThumbnailPipeline>) -> Self {
        self.thumbnails = Some(thumbnails);
        self
    }

    /// Attach the host-application bridge
    pub fn with_host_bridge(mut self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Wire everything together and spawn the event pumps
    pub fn build(self) -> Result<(SessionClient, ClientEventStream), MedilinkError> {
        let media_engine = self.media_engine.ok_or_else(|| MedilinkError::Initialization {
            reason: "media engine collaborator is required".to_string(),
        })?;
        let thumbnails = self.thumbnails.ok_or_else(|| MedilinkError::Initialization {
            reason: "thumbnail pipeline collaborator is required".to_string(),
        })?;
        let bridge = self.bridge.ok_or_else(|| MedilinkError::Initialization {
            reason: "host bridge collaborator is required".to_string(),
        })?;

        let flags = Arc::new(FeatureFlagStore::default());
        let (connection, conn_events) =
            SessionConnection::new(self.config.connection.clone(), self.factory);
        let connection = Arc::new(connection);

        let (mut engine, recovery_events) =
            RecoveryEngine::new(flags.clone(), self.config.max_error_history);
        let deps = RecoveryDeps {
            connection: connection.clone(),
            media_engine,
            thumbnails,
            bridge: bridge.clone(),
            flags: flags.clone(),
            network_retry_delay: self.config.network_retry_delay,
        };
        for (category, actions) in default_chains(&deps) {
            engine.register_chain(category, actions);
        }
        let engine = Arc::new(engine);

        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let connection_pump =
            spawn_connection_pump(conn_events, engine.clone(), bridge.clone(), client_tx.clone());
        let recovery_pump = spawn_recovery_pump(recovery_events, client_tx);

        let client = SessionClient {
            inner: Arc::new(ClientInner {
                connection,
                engine,
                flags,
                pump_tasks: Mutex::new(vec![connection_pump, recovery_pump]),
            }),
        };
        Ok((client, ClientEventStream::new(client_rx)))
    }
}

fn spawn_connection_pump(
    mut events: EventStream,
    engine: Arc<RecoveryEngine>,
    bridge: Arc<dyn HostBridge>,
    client_tx: mpsc::UnboundedSender<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match &event {
                ConnectionEvent::Session(session_event) => {
                    bridge.post_message(&session_event.to_envelope().to_string());
                }
                ConnectionEvent::ConnectionFailed { attempts } => {
                    // Transport-level errors recover locally through queueing
                    // and backoff; only reconnection exhaustion escalates.
                    let failure = Failure::new(format!(
                        "websocket reconnection gave up after {attempts} attempts"
                    ))
                    .with_code("CONNECTION_FAILED");
                    engine.handle(failure).await;
                }
                _ => {}
            }
            if client_tx.send(ClientEvent::Connection(event)).is_err() {
                break;
            }
        }
        debug!("connection event pump finished");
    })
}

fn spawn_recovery_pump(
    mut events: RecoveryEventStream,
    client_tx: mpsc::UnboundedSender<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if client_tx.send(ClientEvent::Recovery(event)).is_err() {
                break;
            }
        }
        debug!("recovery event pump finished");
    })
}

/// Resilient realtime client for one capture session at a time
pub struct SessionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    connection: Arc<SessionConnection>,
    engine: Arc<RecoveryEngine>,
    flags: Arc<FeatureFlagStore>,
    pump_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionClient {
    /// Start building a client
    pub fn builder(config: ClientConfig) -> SessionClientBuilder {
        SessionClientBuilder::new(config)
    }

    /// Open the session channel
    pub async fn connect(&self, session_id: &str) -> Result<(), MedilinkError> {
        self.inner.connection.connect(session_id).await
    }

    /// Close the channel and disable automatic reconnection
    pub async fn disconnect(&self) {
        self.inner.connection.disconnect().await
    }

    /// Transmit a message now, or buffer it until the channel returns
    pub async fn send(&self, message: Value) -> SendStatus {
        self.inner.connection.send(message).await
    }

    /// Route a collaborator failure through the recovery engine
    ///
    /// Returns whether a recovery action succeeded; `false` means the
    /// failsafe has activated for the failure's category.
    pub async fn report_failure(&self, failure: Failure) -> bool {
        self.inner.engine.handle(failure).await
    }

    /// Explicitly retry a degraded category, clearing its feature flags
    ///
    /// For connection and network categories this also reconnects the
    /// channel if a session is known.
    pub async fn retry_category(&self, category: ErrorCategory) -> Result<(), MedilinkError> {
        info!(%category, "manual retry requested");
        match category {
            ErrorCategory::ConnectionFailed | ErrorCategory::NetworkError => {
                self.inner.flags.restore_realtime();
                if let Some(session_id) = self.inner.connection.session_id() {
                    if !self.inner.connection.is_connected() {
                        self.inner.connection.connect(&session_id).await?;
                    }
                }
            }
            ErrorCategory::MediaEngineError | ErrorCategory::MediaPlaybackError => {
                self.inner.flags.restore_media_engine();
            }
            ErrorCategory::ThumbnailFailed => {
                self.inner.flags.restore_unified_thumbnails();
            }
            ErrorCategory::Unknown => {}
        }
        Ok(())
    }

    /// Current feature availability, for gating playback UI paths
    pub fn flags(&self) -> FeatureFlags {
        self.inner.flags.snapshot()
    }

    /// Error history, most recent first
    pub fn error_history(&self) -> Vec<ErrorRecord> {
        self.inner.engine.history()
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Whether the session channel is open
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Session identifier of the most recent connect call
    pub fn session_id(&self) -> Option<String> {
        self.inner.connection.session_id()
    }

    /// Connection activity counters
    pub fn stats(&self) -> ConnectionStats {
        self.inner.connection.stats()
    }

    /// Disconnect and stop the event pumps
    pub async fn shutdown(&self) {
        self.inner.connection.disconnect().await;
        for task in self.inner.pump_tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("state", &self.inner.connection.state())
            .field("session_id", &self.inner.connection.session_id())
            .field("flags", &self.inner.flags.snapshot())
            .finish()
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        for task in self.pump_tasks.lock().drain(..) {
            task.abort();
        }
    }
}
