//! Heartbeat liveness monitoring
//!
//! While a connection is open, a monitor task ticks at half the stale
//! threshold. Each tick either declares the channel stale (no inbound
//! traffic of any kind for longer than the threshold) and force-closes it
//! with a reconnect-eligible code, or sends a liveness probe. Any inbound
//! message counts as liveness, so chatty peers never need probe replies.

use crate::connection::{ConnectionInner, ConnectionState};
use crate::envelope::Envelope;
use crate::transport::close_codes;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

/// Periodic liveness monitor for an open connection
pub struct HeartbeatMonitor;

impl HeartbeatMonitor {
    /// Spawn the monitor task for a connection
    ///
    /// The task exits on its own when the connection leaves `Connected` or
    /// is dropped; the connection also aborts it on disconnect.
    pub(crate) fn spawn(timeout: Duration, connection: Weak<ConnectionInner>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(timeout / 2);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of an interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;

                let Some(connection) = connection.upgrade() else {
                    break;
                };
                if connection.state() != ConnectionState::Connected {
                    break;
                }

                let idle = connection.idle();
                if idle > timeout {
                    warn!("no traffic for {:?}, closing stale connection", idle);
                    // Run the close on its own task: it tears down this
                    // monitor, which must not cancel the close mid-flight.
                    tokio::spawn(async move {
                        connection
                            .force_close(close_codes::ABNORMAL, "liveness timeout")
                            .await;
                    });
                    break;
                }

                let _ = connection.send_value(Envelope::ping()).await;
                connection.record_heartbeat();
            }
            debug!("heartbeat monitor finished");
        })
    }
}
