//! Error types for the medilink client

use thiserror::Error;

/// Main error type for medilink operations
#[derive(Error, Debug)]
pub enum MedilinkError {
    /// Client initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Invalid or missing session identifier
    #[error("Invalid session: {reason}")]
    InvalidSession {
        /// Reason the session identifier was rejected
        reason: String,
    },

    /// Transport-level error (open/send/close failures)
    #[error("Transport error: {reason}")]
    Transport {
        /// Reason for transport error
        reason: String,
    },

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collaborator subsystem (media engine, thumbnail pipeline) failed
    #[error("{subsystem} error: {reason}")]
    Collaborator {
        /// Collaborator subsystem that failed
        subsystem: String,
        /// Reason for the failure
        reason: String,
    },

    /// A recovery action could not complete
    #[error("Recovery action {action} failed: {reason}")]
    Recovery {
        /// Name of the recovery action
        action: String,
        /// Reason for the failure
        reason: String,
    },
}

impl MedilinkError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            MedilinkError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            MedilinkError::InvalidSession { .. } => "INVALID_SESSION".to_string(),
            MedilinkError::Transport { .. } => "TRANSPORT_ERROR".to_string(),
            MedilinkError::WebSocket(_) => "WEBSOCKET_ERROR".to_string(),
            MedilinkError::Serialization(_) => "SERIALIZATION_ERROR".to_string(),
            MedilinkError::Collaborator { .. } => "COLLABORATOR_ERROR".to_string(),
            MedilinkError::Recovery { .. } => "RECOVERY_FAILED".to_string(),
        }
    }
}
