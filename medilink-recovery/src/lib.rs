//! # Medilink Recovery
//!
//! Layered error recovery for the medilink streaming client. Raw failure
//! signals from the connection, the media engine, and the thumbnail pipeline
//! are classified into a closed category set; each category owns an ordered
//! chain of recovery actions that degrade or retry the affected subsystem.
//! When a chain is exhausted the failsafe controller disables the subsystem's
//! feature flags and surfaces a degraded-mode notice.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod actions;
pub mod classifier;
pub mod collaborators;
pub mod engine;
pub mod failure;
pub mod flags;

// Re-export main types
pub use actions::{default_chains, RecoveryAction, RecoveryDeps};
pub use classifier::{classify, ErrorCategory};
pub use collaborators::{HostBridge, MediaEngine, ThumbnailPipeline};
pub use engine::{
    FailsafeController, RecoveryEngine, RecoveryEvent, RecoveryEventStream,
};
pub use failure::{ErrorHistory, ErrorRecord, Failure, RecordOutcome};
pub use flags::{FeatureFlagStore, FeatureFlags};
