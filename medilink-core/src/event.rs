//! Typed events emitted by a session connection

use crate::envelope::{message_types, Envelope};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Domain events carried inside the session envelope
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A recording segment finished writing
    SegmentCompleted {
        /// Segment metadata
        data: Value,
    },
    /// Recording state changed
    RecordingStatus {
        /// Status payload
        data: Value,
    },
    /// A thumbnail finished rendering
    ThumbnailReady {
        /// Thumbnail descriptor
        data: Value,
    },
    /// A timeline marker was added
    MarkerAdded {
        /// Marker descriptor
        data: Value,
    },
    /// The session endpoint reported an error
    ErrorReported {
        /// Error payload
        data: Value,
    },
    /// The session endpoint reported a warning
    Warning {
        /// Warning payload
        data: Value,
    },
    /// Session metadata snapshot
    SessionInfo {
        /// Session metadata
        data: Value,
    },
    /// Capture buffer fill level
    BufferStatus {
        /// Buffer status payload
        data: Value,
    },
    /// A message type this client does not recognize
    Unknown {
        /// The unrecognized type identifier
        kind: String,
        /// The payload, forwarded untouched
        data: Value,
    },
}

impl SessionEvent {
    /// Map a parsed envelope onto a typed event
    pub fn from_envelope(envelope: Envelope) -> Self {
        let Envelope { kind, data } = envelope;
        match kind.as_str() {
            message_types::SEGMENT_COMPLETED => Self::SegmentCompleted { data },
            message_types::RECORDING_STATUS => Self::RecordingStatus { data },
            message_types::THUMBNAIL_READY => Self::ThumbnailReady { data },
            message_types::MARKER_ADDED => Self::MarkerAdded { data },
            message_types::ERROR => Self::ErrorReported { data },
            message_types::WARNING => Self::Warning { data },
            message_types::SESSION_INFO => Self::SessionInfo { data },
            message_types::BUFFER_STATUS => Self::BufferStatus { data },
            _ => Self::Unknown { kind, data },
        }
    }

    /// The envelope type identifier for this event
    pub fn kind(&self) -> &str {
        match self {
            Self::SegmentCompleted { .. } => message_types::SEGMENT_COMPLETED,
            Self::RecordingStatus { .. } => message_types::RECORDING_STATUS,
            Self::ThumbnailReady { .. } => message_types::THUMBNAIL_READY,
            Self::MarkerAdded { .. } => message_types::MARKER_ADDED,
            Self::ErrorReported { .. } => message_types::ERROR,
            Self::Warning { .. } => message_types::WARNING,
            Self::SessionInfo { .. } => message_types::SESSION_INFO,
            Self::BufferStatus { .. } => message_types::BUFFER_STATUS,
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// The event payload
    pub fn data(&self) -> &Value {
        match self {
            Self::SegmentCompleted { data }
            | Self::RecordingStatus { data }
            | Self::ThumbnailReady { data }
            | Self::MarkerAdded { data }
            | Self::ErrorReported { data }
            | Self::Warning { data }
            | Self::SessionInfo { data }
            | Self::BufferStatus { data }
            | Self::Unknown { data, .. } => data,
        }
    }

    /// Re-wrap the event as an envelope value for forwarding
    pub fn to_envelope(&self) -> Value {
        json!({ "type": self.kind(), "data": self.data() })
    }
}

/// Connection lifecycle and traffic events
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The channel opened and the queue was drained
    Connected,
    /// The channel closed
    Disconnected {
        /// Close code from the peer or synthesized locally
        code: u16,
        /// Close reason, possibly empty
        reason: String,
    },
    /// The transport reported an error
    TransportError {
        /// Error description
        message: String,
    },
    /// Reconnection attempts are exhausted; a new `connect` call is required
    ConnectionFailed {
        /// Number of attempts made
        attempts: u32,
    },
    /// A domain message arrived from the session endpoint
    Session(SessionEvent),
}

impl ConnectionEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::Connected => "connected",
            ConnectionEvent::Disconnected { .. } => "disconnected",
            ConnectionEvent::TransportError { .. } => "error",
            ConnectionEvent::ConnectionFailed { .. } => "connection_failed",
            ConnectionEvent::Session(_) => "session",
        }
    }

    /// Check if this is a lifecycle event rather than forwarded traffic
    pub fn is_lifecycle_event(&self) -> bool {
        !matches!(self, ConnectionEvent::Session(_))
    }
}

/// Stream of connection events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl EventStream {
    /// Create a new event stream around a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<ConnectionEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<ConnectionEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Option<ConnectionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
