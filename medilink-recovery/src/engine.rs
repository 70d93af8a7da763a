//! Recovery engine and failsafe controller
//!
//! `handle` classifies a failure, walks the category's action chain in
//! order, and records every invocation in the bounded error history. The
//! chain stops at the first successful action. An exhausted chain, or a
//! category with no chain at all, activates the failsafe, which disables
//! the subsystem's umbrella feature flags and surfaces a degraded-mode
//! notice.

use crate::actions::RecoveryAction;
use crate::classifier::{classify, ErrorCategory};
use crate::failure::{ErrorHistory, ErrorRecord, Failure, RecordOutcome};
use crate::flags::FeatureFlagStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Notices emitted by the recovery engine
#[derive(Debug, Clone)]
pub enum RecoveryEvent {
    /// A recovery action restored the failing subsystem
    Recovered {
        /// Category that was recovered
        category: ErrorCategory,
        /// Name of the action that succeeded
        action: String,
    },
    /// All recovery for the category is exhausted; the feature set is
    /// disabled until explicitly reset
    DegradedMode {
        /// Category that entered degraded mode
        category: ErrorCategory,
    },
}

impl RecoveryEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            RecoveryEvent::Recovered { .. } => "recovered",
            RecoveryEvent::DegradedMode { .. } => "degraded_mode",
        }
    }
}

/// Stream of recovery notices for async iteration
#[derive(Debug)]
pub struct RecoveryEventStream {
    receiver: mpsc::UnboundedReceiver<RecoveryEvent>,
}

impl RecoveryEventStream {
    /// Create a new stream around a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<RecoveryEvent>) -> Self {
        Self { receiver }
    }

    /// Get the next notice from the stream
    pub async fn next(&mut self) -> Option<RecoveryEvent> {
        self.receiver.recv().await
    }

    /// Try to get the next notice without blocking
    pub fn try_next(&mut self) -> Option<RecoveryEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Disables feature umbrellas when recovery is exhausted
pub struct FailsafeController {
    flags: Arc<FeatureFlagStore>,
    events: mpsc::UnboundedSender<RecoveryEvent>,
}

impl FailsafeController {
    /// Create a controller writing to the given flag store and notice channel
    pub fn new(flags: Arc<FeatureFlagStore>, events: mpsc::UnboundedSender<RecoveryEvent>) -> Self {
        Self { flags, events }
    }

    /// Disable the failing subsystem's umbrella and surface the notice
    pub fn activate(&self, category: ErrorCategory, failure: &Failure, history: &ErrorHistory) {
        warn!(%category, "recovery exhausted, entering degraded mode");
        match category {
            ErrorCategory::ConnectionFailed | ErrorCategory::NetworkError => {
                self.flags.disable_realtime();
            }
            ErrorCategory::MediaEngineError | ErrorCategory::MediaPlaybackError => {
                self.flags.disable_media_engine();
            }
            ErrorCategory::ThumbnailFailed => {
                self.flags.disable_unified_thumbnails();
            }
            // Nothing can be attributed safely; notice only.
            ErrorCategory::Unknown => {}
        }
        history.push(ErrorRecord::failsafe(failure, category));
        let _ = self.events.send(RecoveryEvent::DegradedMode { category });
    }
}

/// Classifies failures and walks per-category recovery chains
pub struct RecoveryEngine {
    chains: HashMap<ErrorCategory, Vec<Arc<dyn RecoveryAction>>>,
    history: ErrorHistory,
    failsafe: FailsafeController,
    events: mpsc::UnboundedSender<RecoveryEvent>,
}

impl RecoveryEngine {
    /// Create an engine with an empty chain table
    pub fn new(
        flags: Arc<FeatureFlagStore>,
        max_history: usize,
    ) -> (Self, RecoveryEventStream) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = Self {
            chains: HashMap::new(),
            history: ErrorHistory::new(max_history),
            failsafe: FailsafeController::new(flags, event_tx.clone()),
            events: event_tx,
        };
        (engine, RecoveryEventStream::new(event_rx))
    }

    /// Install a category's chain; part of construction, the table is fixed
    /// once the engine is shared
    pub fn register_chain(
        &mut self,
        category: ErrorCategory,
        actions: Vec<Arc<dyn RecoveryAction>>,
    ) {
        self.chains.insert(category, actions);
    }

    /// Classify the failure and run its recovery chain
    ///
    /// Returns whether any action succeeded. On exhaustion (including a
    /// category with no chain) the failsafe has already activated by the
    /// time this returns.
    pub async fn handle(&self, failure: Failure) -> bool {
        let category = classify(&failure);
        info!(%category, message = %failure.message, "handling classified failure");
        self.history.push(ErrorRecord::classified(&failure, category));

        let chain = self.chains.get(&category).cloned().unwrap_or_default();
        let recovered = self.try_chain(&chain, &failure, category).await;
        if !recovered {
            self.failsafe.activate(category, &failure, &self.history);
        }
        recovered
    }

    async fn try_chain(
        &self,
        actions: &[Arc<dyn RecoveryAction>],
        failure: &Failure,
        category: ErrorCategory,
    ) -> bool {
        for action in actions {
            match action.attempt(failure).await {
                Ok(()) => {
                    info!(action = action.name(), %category, "recovery action succeeded");
                    self.history.push(ErrorRecord::action(
                        failure,
                        category,
                        action.name(),
                        RecordOutcome::ActionSucceeded,
                    ));
                    let _ = self.events.send(RecoveryEvent::Recovered {
                        category,
                        action: action.name().to_string(),
                    });
                    return true;
                }
                Err(err) => {
                    warn!(action = action.name(), %category, "recovery action failed: {}", err);
                    self.history.push(ErrorRecord::action(
                        failure,
                        category,
                        action.name(),
                        RecordOutcome::ActionFailed,
                    ));
                }
            }
        }
        false
    }

    /// Snapshot of the error history, most recent first
    pub fn history(&self) -> Vec<ErrorRecord> {
        self.history.snapshot()
    }
}
