//! Client configuration and defaults

use medilink_core::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for a [`SessionClient`](crate::SessionClient)
///
/// Serializable so the host shell can persist it with the rest of the
/// workstation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Session channel configuration
    pub connection: ConnectionConfig,
    /// Capacity of the bounded error history
    pub max_error_history: usize,
    /// Fixed delay used by the network wait-and-retry recovery step
    pub network_retry_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            max_error_history: 50,
            network_retry_delay: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_configuration() {
        let config = ClientConfig::default();
        assert_eq!(config.max_error_history, 50);
        assert_eq!(config.network_retry_delay, Duration::from_secs(5));
        assert_eq!(config.connection.max_queue_size, 100);
        assert_eq!(config.connection.heartbeat_timeout, Duration::from_secs(30));
    }

    #[test]
    fn round_trips_through_json() {
        let config = ClientConfig::default();
        let json = serde_json::to_string(&config).expect("serialize");
        let restored: ClientConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.max_error_history, config.max_error_history);
        assert_eq!(
            restored.connection.endpoint_base,
            config.connection.endpoint_base
        );
    }
}
