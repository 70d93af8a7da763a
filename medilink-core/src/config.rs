//! Connection configuration and defaults

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a session connection
///
/// Serializable so the host shell can persist it alongside the rest of the
/// workstation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base endpoint; the session id is appended as the final path segment
    pub endpoint_base: String,
    /// Reconnection attempts before giving up
    pub max_reconnect_attempts: u32,
    /// First reconnection delay; doubles per attempt
    pub base_reconnect_delay: Duration,
    /// Hard cap on the reconnection delay
    pub max_reconnect_delay: Duration,
    /// Upper bound of the random jitter added to each delay
    pub reconnect_jitter: Duration,
    /// Silence on the channel longer than this closes the connection as stale
    pub heartbeat_timeout: Duration,
    /// Maximum queued outbound messages while disconnected
    pub max_queue_size: usize,
    /// Queued messages older than this are dropped at drain time
    pub max_message_age: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint_base: "ws://127.0.0.1:9443/ws/session".to_string(),
            max_reconnect_attempts: 10,
            base_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            reconnect_jitter: Duration::from_millis(1000),
            heartbeat_timeout: Duration::from_secs(30),
            max_queue_size: 100,
            max_message_age: Duration::from_secs(60),
        }
    }
}

impl ConnectionConfig {
    /// Derive the channel endpoint for a session
    pub fn endpoint_for(&self, session_id: &str) -> String {
        format!("{}/{}", self.endpoint_base.trim_end_matches('/'), session_id)
    }

    /// Heartbeat tick period: half the stale threshold
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_timeout / 2
    }

    /// Delay before reconnection attempt `attempt` (1-based):
    /// `min(base * 2^(attempt-1) + jitter, max)`
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let base_ms = self.base_reconnect_delay.as_millis() as u64;
        let exponential = base_ms.saturating_mul(1_u64 << shift);
        let jitter_cap = self.reconnect_jitter.as_millis() as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };
        let capped = exponential
            .saturating_add(jitter)
            .min(self.max_reconnect_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jitterless() -> ConnectionConfig {
        ConnectionConfig {
            reconnect_jitter: Duration::ZERO,
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let config = jitterless();
        assert_eq!(config.reconnect_delay(1), Duration::from_millis(1_000));
        assert_eq!(config.reconnect_delay(2), Duration::from_millis(2_000));
        assert_eq!(config.reconnect_delay(3), Duration::from_millis(4_000));
        assert_eq!(config.reconnect_delay(4), Duration::from_millis(8_000));
    }

    #[test]
    fn delay_is_capped() {
        let config = jitterless();
        assert_eq!(config.reconnect_delay(6), Duration::from_millis(30_000));
        assert_eq!(config.reconnect_delay(30), Duration::from_millis(30_000));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let config = ConnectionConfig::default();
        for attempt in 1..=4 {
            let floor = Duration::from_millis(1_000 * (1 << (attempt - 1)));
            let ceiling = floor + Duration::from_millis(1_000);
            for _ in 0..50 {
                let delay = config.reconnect_delay(attempt);
                assert!(delay >= floor && delay <= ceiling, "delay {delay:?} outside bound");
            }
        }
    }

    #[test]
    fn delay_monotone_ignoring_jitter() {
        let config = jitterless();
        let mut previous = Duration::ZERO;
        for attempt in 1..=12 {
            let delay = config.reconnect_delay(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn endpoint_appends_session_segment() {
        let config = ConnectionConfig {
            endpoint_base: "ws://box.local/ws/session/".to_string(),
            ..ConnectionConfig::default()
        };
        assert_eq!(
            config.endpoint_for("rec-0042"),
            "ws://box.local/ws/session/rec-0042"
        );
    }
}
