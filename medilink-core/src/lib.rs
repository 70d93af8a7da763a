//! # Medilink Core
//!
//! Core session-channel layer for the medilink streaming client: a persistent
//! duplex connection to a capture-session endpoint with automatic
//! reconnection, exponential backoff with jitter, heartbeat liveness
//! monitoring, and queuing of outbound messages across outages.
//!
//! The transport is abstracted behind [`TransportFactory`] so the production
//! WebSocket transport and in-memory test transports share one connection
//! state machine.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod event;
pub mod heartbeat;
pub mod queue;
pub mod transport;

// Re-export main types
pub use config::ConnectionConfig;
pub use connection::{ConnectionState, ConnectionStats, SendStatus, SessionConnection};
pub use envelope::{message_types, Envelope};
pub use error::MedilinkError;
pub use event::{ConnectionEvent, EventStream, SessionEvent};
pub use queue::{MessageQueue, QueuedMessage};
pub use transport::{
    close_codes, is_reconnect_eligible, Transport, TransportEvent, TransportFactory,
    TransportHandle, WebSocketFactory,
};
