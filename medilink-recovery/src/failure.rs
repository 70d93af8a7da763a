//! Failure reports and the bounded error history

use crate::classifier::ErrorCategory;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;

/// A raw failure signal from the connection or a collaborator subsystem
#[derive(Debug, Clone)]
pub struct Failure {
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
    /// Human-readable description; classification keys off this
    pub message: String,
    /// Machine code, when the reporting subsystem supplies one
    pub code: Option<String>,
    /// Free-form context attached by the reporter
    pub context: Option<Value>,
    /// Whether the reporter considers the failure critical
    pub critical: bool,
}

impl Failure {
    /// Create a failure report with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            code: None,
            context: None,
            critical: false,
        }
    }

    /// Attach a machine code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach free-form context
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Mark the failure as critical
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// What a history entry records about the failure's handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// The failure was classified and handed to its chain
    Classified,
    /// A recovery action reported success
    ActionSucceeded,
    /// A recovery action reported failure
    ActionFailed,
    /// The chain was exhausted and the failsafe activated
    Failsafe,
}

/// One immutable entry in the error history
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// The originating failure's message
    pub message: String,
    /// The originating failure's machine code
    pub code: Option<String>,
    /// The originating failure's context
    pub context: Option<Value>,
    /// Whether the originating failure was marked critical
    pub critical: bool,
    /// Category the failure classified into
    pub category: ErrorCategory,
    /// Recovery action this entry describes, when applicable
    pub action: Option<String>,
    /// What happened
    pub outcome: RecordOutcome,
}

impl ErrorRecord {
    /// Entry for a freshly classified failure
    pub fn classified(failure: &Failure, category: ErrorCategory) -> Self {
        Self::build(failure, category, None, RecordOutcome::Classified)
    }

    /// Entry for one recovery-action invocation
    pub fn action(
        failure: &Failure,
        category: ErrorCategory,
        action: &str,
        outcome: RecordOutcome,
    ) -> Self {
        Self::build(failure, category, Some(action.to_string()), outcome)
    }

    /// Entry for failsafe activation; never marked critical
    pub fn failsafe(failure: &Failure, category: ErrorCategory) -> Self {
        let mut record = Self::build(failure, category, None, RecordOutcome::Failsafe);
        record.critical = false;
        record
    }

    fn build(
        failure: &Failure,
        category: ErrorCategory,
        action: Option<String>,
        outcome: RecordOutcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            message: failure.message.clone(),
            code: failure.code.clone(),
            context: failure.context.clone(),
            critical: failure.critical,
            category,
            action,
            outcome,
        }
    }
}

/// Bounded, most-recent-first history of error records
#[derive(Debug)]
pub struct ErrorHistory {
    records: Mutex<VecDeque<ErrorRecord>>,
    capacity: usize,
}

impl ErrorHistory {
    /// Create a history holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Append a record, truncating the oldest past capacity
    pub fn push(&self, record: ErrorRecord) {
        let mut records = self.records.lock();
        records.push_front(record);
        records.truncate(self.capacity);
    }

    /// Snapshot of the history, most recent first
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
