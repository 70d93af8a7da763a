//! Message envelope for the session channel
//!
//! Every frame on the channel is a JSON object `{ "type": ..., "data": ... }`.
//! Outbound payloads produced by callers are queued and transmitted verbatim;
//! only the liveness probe and the heartbeat reply are built here.

use crate::error::MedilinkError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Inbound and outbound message type identifiers
pub mod message_types {
    /// A recording segment finished writing
    pub const SEGMENT_COMPLETED: &str = "SegmentCompleted";
    /// Recording state changed
    pub const RECORDING_STATUS: &str = "RecordingStatus";
    /// A thumbnail finished rendering
    pub const THUMBNAIL_READY: &str = "ThumbnailReady";
    /// A timeline marker was added
    pub const MARKER_ADDED: &str = "MarkerAdded";
    /// Session-side error report
    pub const ERROR: &str = "Error";
    /// Session-side warning report
    pub const WARNING: &str = "Warning";
    /// Liveness probe from the session endpoint
    pub const HEARTBEAT: &str = "Heartbeat";
    /// Session metadata snapshot
    pub const SESSION_INFO: &str = "SessionInfo";
    /// Capture buffer fill level
    pub const BUFFER_STATUS: &str = "BufferStatus";
    /// Outbound liveness probe
    pub const PING: &str = "Ping";
    /// Outbound reply to an inbound heartbeat
    pub const HEARTBEAT_RESPONSE: &str = "HeartbeatResponse";
}

/// The `{ type, data }` wrapper around every inbound session message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type identifier
    #[serde(rename = "type")]
    pub kind: String,
    /// Message payload; defaults to null when absent
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Parse a raw text frame into an envelope
    pub fn parse(text: &str) -> Result<Self, MedilinkError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the outbound liveness probe
    pub fn ping() -> Value {
        json!({
            "type": message_types::PING,
            "timestamp": Utc::now().timestamp_millis(),
        })
    }

    /// Build the reply to an inbound heartbeat
    pub fn heartbeat_response() -> Value {
        json!({
            "type": message_types::HEARTBEAT_RESPONSE,
            "timestamp": Utc::now().timestamp_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_frame() {
        let envelope = Envelope::parse(r#"{"type":"RecordingStatus","data":{"active":true}}"#)
            .expect("valid frame");
        assert_eq!(envelope.kind, message_types::RECORDING_STATUS);
        assert_eq!(envelope.data["active"], true);
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let envelope = Envelope::parse(r#"{"type":"Heartbeat"}"#).expect("valid frame");
        assert_eq!(envelope.kind, message_types::HEARTBEAT);
        assert!(envelope.data.is_null());
    }

    #[test]
    fn rejects_non_envelope_frames() {
        assert!(Envelope::parse("not json at all").is_err());
        assert!(Envelope::parse(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn probe_carries_timestamp() {
        let ping = Envelope::ping();
        assert_eq!(ping["type"], message_types::PING);
        assert!(ping["timestamp"].as_i64().unwrap() > 0);

        let reply = Envelope::heartbeat_response();
        assert_eq!(reply["type"], message_types::HEARTBEAT_RESPONSE);
    }
}
