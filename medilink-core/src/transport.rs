//! Transport layer for the session channel
//!
//! The connection state machine is written against the [`Transport`] and
//! [`TransportFactory`] traits so the production WebSocket transport and the
//! in-memory transports used by tests are interchangeable. A factory opens
//! one duplex channel and hands back a sink for outbound frames plus an event
//! stream for everything the peer side produces.

use crate::error::MedilinkError;
use async_trait::async_trait;
use futures::sink::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Close codes with protocol-defined or application-defined meaning
pub mod close_codes {
    /// Normal closure
    pub const NORMAL: u16 = 1000;
    /// Endpoint going away
    pub const GOING_AWAY: u16 = 1001;
    /// No status code present in the close frame
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close handshake
    pub const ABNORMAL: u16 = 1006;
    /// Capture session ended on the host side
    pub const SESSION_ENDED: u16 = 4000;
    /// Session authentication failed
    pub const AUTH_FAILED: u16 = 4001;
    /// Session identifier unknown to the endpoint
    pub const INVALID_SESSION: u16 = 4002;
}

/// Whether a close code permits automatic reconnection
///
/// Normal closure, going-away, no-status, and the application codes for
/// session-ended/auth-failed/invalid-session are deliberate terminations;
/// everything else is treated as an outage worth retrying.
pub fn is_reconnect_eligible(code: u16) -> bool {
    !matches!(
        code,
        close_codes::NORMAL
            | close_codes::GOING_AWAY
            | close_codes::NO_STATUS
            | close_codes::SESSION_ENDED
            | close_codes::AUTH_FAILED
            | close_codes::INVALID_SESSION
    )
}

/// Events produced by an open transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A text frame arrived from the peer
    Message(String),
    /// The channel closed
    Closed {
        /// Close code reported by the peer, or synthesized locally
        code: u16,
        /// Close reason, possibly empty
        reason: String,
    },
    /// The transport reported an error; a `Closed` event follows
    Error(String),
}

/// Outbound half of an open transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transmit one text frame
    async fn send(&mut self, text: String) -> Result<(), MedilinkError>;

    /// Close the channel, best effort
    async fn close(&mut self, code: u16, reason: &str);
}

/// Result of opening a transport: the outbound sink plus the inbound event stream
pub struct TransportHandle {
    /// Sink for outbound frames
    pub sink: Box<dyn Transport>,
    /// Stream of inbound transport events
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens duplex channels to a session endpoint
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Open a channel to `endpoint`
    async fn connect(&self, endpoint: &str) -> Result<TransportHandle, MedilinkError>;
}

/// Production WebSocket transport factory
#[derive(Debug, Default)]
pub struct WebSocketFactory;

#[async_trait]
impl TransportFactory for WebSocketFactory {
    async fn connect(&self, endpoint: &str) -> Result<TransportHandle, MedilinkError> {
        debug!("opening websocket to {}", endpoint);
        let (stream, _response) = connect_async(endpoint).await?;
        let (write, mut read) = stream.split();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut closed_sent = false;
            while let Some(item) = read.next().await {
                match item {
                    Ok(Message::Text(text)) => {
                        if event_tx.send(TransportEvent::Message(text)).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = match frame {
                            Some(frame) => (u16::from(frame.code), frame.reason.to_string()),
                            None => (close_codes::NO_STATUS, String::new()),
                        };
                        let _ = event_tx.send(TransportEvent::Closed { code, reason });
                        closed_sent = true;
                        break;
                    }
                    // Binary frames are not part of the session protocol;
                    // ping/pong is handled by the protocol layer itself.
                    Ok(_) => {}
                    Err(err) => {
                        warn!("websocket read error: {}", err);
                        let _ = event_tx.send(TransportEvent::Error(err.to_string()));
                        let _ = event_tx.send(TransportEvent::Closed {
                            code: close_codes::ABNORMAL,
                            reason: err.to_string(),
                        });
                        closed_sent = true;
                        break;
                    }
                }
            }
            if !closed_sent {
                // Stream ended without a close frame.
                let _ = event_tx.send(TransportEvent::Closed {
                    code: close_codes::ABNORMAL,
                    reason: String::new(),
                });
            }
            debug!("websocket read pump finished");
        });

        Ok(TransportHandle {
            sink: Box::new(WebSocketSink { write }),
            events: event_rx,
        })
    }
}

/// Outbound half of the WebSocket transport
struct WebSocketSink {
    write: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
}

#[async_trait]
impl Transport for WebSocketSink {
    async fn send(&mut self, text: String) -> Result<(), MedilinkError> {
        self.write
            .send(Message::Text(text))
            .await
            .map_err(|err| MedilinkError::Transport {
                reason: format!("failed to send frame: {}", err),
            })
    }

    async fn close(&mut self, code: u16, reason: &str) {
        // 1005/1006 are reserved and must not appear on the wire.
        let frame = match code {
            close_codes::NO_STATUS | close_codes::ABNORMAL => None,
            code => Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.to_string().into(),
            }),
        };
        if let Err(err) = self.write.send(Message::Close(frame)).await {
            debug!("close frame not delivered: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliberate_close_codes_suppress_reconnect() {
        for code in [1000, 1001, 1005, 4000, 4001, 4002] {
            assert!(!is_reconnect_eligible(code), "code {code} should suppress");
        }
    }

    #[test]
    fn outage_close_codes_are_eligible() {
        for code in [1002, 1006, 1011, 1012, 3000, 4005] {
            assert!(is_reconnect_eligible(code), "code {code} should be eligible");
        }
    }
}
