//! # Medilink - Resilient Session Streaming Client
//!
//! Medilink is the realtime layer of the video-capture workstation UI: it
//! keeps a live capture session's control channel alive over an unreliable
//! transport and degrades functionality gracefully when dependent subsystems
//! fail.
//!
//! ## Key Features
//!
//! - **Persistent duplex channel**: automatic reconnection with exponential
//!   backoff and jitter, heartbeat liveness monitoring, and message queuing
//!   across outages
//! - **Layered error recovery**: failures are classified into a closed
//!   category set, each with an ordered chain of degrade-or-retry actions
//! - **Failsafe degradation**: exhausted recovery disables the affected
//!   feature set and surfaces a degraded-mode notice instead of crashing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medilink::{ClientConfig, SessionClient};
//! # use std::sync::Arc;
//! # fn collaborators() -> (Arc<dyn medilink::MediaEngine>, Arc<dyn medilink::ThumbnailPipeline>, Arc<dyn medilink::HostBridge>) { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), medilink::MedilinkError> {
//!     let (engine, thumbnails, bridge) = collaborators();
//!     let (client, mut events) = SessionClient::builder(ClientConfig::default())
//!         .with_media_engine(engine)
//!         .with_thumbnails(thumbnails)
//!         .with_host_bridge(bridge)
//!         .build()?;
//!
//!     client.connect("rec-0042").await?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("client event: {:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use medilink_core::{
    close_codes, is_reconnect_eligible, message_types, ConnectionConfig, ConnectionEvent,
    ConnectionState, ConnectionStats, Envelope, EventStream, MedilinkError, SendStatus,
    SessionConnection, SessionEvent, Transport, TransportEvent, TransportFactory,
    TransportHandle, WebSocketFactory,
};

pub use medilink_recovery::{
    classify, default_chains, ErrorCategory, ErrorHistory, ErrorRecord, Failure,
    FailsafeController, FeatureFlagStore, FeatureFlags, HostBridge, MediaEngine,
    RecordOutcome, RecoveryAction, RecoveryDeps, RecoveryEngine, RecoveryEvent,
    RecoveryEventStream, ThumbnailPipeline,
};

// Public API modules
pub mod client;
pub mod config;

// Re-export main API types
pub use client::{ClientEvent, ClientEventStream, SessionClient, SessionClientBuilder};
pub use config::ClientConfig;
