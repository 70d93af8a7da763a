//! Recovery actions and the default per-category chains
//!
//! Each action is one degrade-or-retry capability: it receives the failure,
//! does its work, and reports success or failure as a `Result`. Failures are
//! ordinary values to the engine, never aborts. The chain assembly at the
//! bottom fixes the order the engine walks per category.

use crate::classifier::ErrorCategory;
use crate::collaborators::{HostBridge, MediaEngine, ThumbnailPipeline};
use crate::failure::Failure;
use crate::flags::FeatureFlagStore;
use async_trait::async_trait;
use medilink_core::{MedilinkError, SessionConnection};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One step in a recovery chain
#[async_trait]
pub trait RecoveryAction: Send + Sync {
    /// Stable name used in history records and log lines
    fn name(&self) -> &'static str;

    /// Run the action against the failure; `Err` means this step failed and
    /// the chain moves on
    async fn attempt(&self, failure: &Failure) -> Result<(), MedilinkError>;
}

/// Handles every default action needs access to
pub struct RecoveryDeps {
    /// The session connection, for connectivity retries
    pub connection: Arc<SessionConnection>,
    /// The media streaming engine
    pub media_engine: Arc<dyn MediaEngine>,
    /// The thumbnail pipeline
    pub thumbnails: Arc<dyn ThumbnailPipeline>,
    /// The host-application bridge
    pub bridge: Arc<dyn HostBridge>,
    /// The shared feature flags
    pub flags: Arc<FeatureFlagStore>,
    /// Delay used by the network wait-and-retry step
    pub network_retry_delay: Duration,
}

struct RetryConnection {
    connection: Arc<SessionConnection>,
}

#[async_trait]
impl RecoveryAction for RetryConnection {
    fn name(&self) -> &'static str {
        "retry-connection"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        let session_id =
            self.connection
                .session_id()
                .ok_or_else(|| MedilinkError::InvalidSession {
                    reason: "no session to reconnect".to_string(),
                })?;
        self.connection.connect(&session_id).await
    }
}

struct PollingFallback {
    bridge: Arc<dyn HostBridge>,
}

#[async_trait]
impl RecoveryAction for PollingFallback {
    fn name(&self) -> &'static str {
        "polling-fallback"
    }

    async fn attempt(&self, failure: &Failure) -> Result<(), MedilinkError> {
        // Polling lives in the host UI layer; this side only flips it on.
        info!("switching host UI to polling fallback");
        let envelope = json!({
            "type": "StartPollingFallback",
            "data": { "reason": failure.message },
        });
        self.bridge.post_message(&envelope.to_string());
        Ok(())
    }
}

struct DisableRealtime {
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for DisableRealtime {
    fn name(&self) -> &'static str {
        "disable-realtime-updates"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.flags.disable_realtime();
        Ok(())
    }
}

struct RetryEngineInit {
    media_engine: Arc<dyn MediaEngine>,
}

#[async_trait]
impl RecoveryAction for RetryEngineInit {
    fn name(&self) -> &'static str {
        "retry-engine-init"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.media_engine.initialize().await
    }
}

struct LegacyEngineMode {
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for LegacyEngineMode {
    fn name(&self) -> &'static str {
        "legacy-engine-mode"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        info!("disabling engine integration, switching to legacy playback");
        self.flags.update(|flags| {
            flags.media_engine = false;
            flags.legacy_mode = true;
        });
        Ok(())
    }
}

struct RemoveEngineIntegration {
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for RemoveEngineIntegration {
    fn name(&self) -> &'static str {
        "remove-engine-integration"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.flags.update(|flags| {
            flags.media_engine = false;
            flags.legacy_mode = false;
            flags.basic_player = true;
        });
        Ok(())
    }
}

struct RebuildThumbnailCache {
    thumbnails: Arc<dyn ThumbnailPipeline>,
}

#[async_trait]
impl RecoveryAction for RebuildThumbnailCache {
    fn name(&self) -> &'static str {
        "rebuild-thumbnail-cache"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        debug!(cached = self.thumbnails.cache_size(), "clearing thumbnail cache");
        self.thumbnails.clear_cache().await?;
        self.thumbnails.rebuild().await
    }
}

struct FrameExtractionFallback {
    thumbnails: Arc<dyn ThumbnailPipeline>,
}

#[async_trait]
impl RecoveryAction for FrameExtractionFallback {
    fn name(&self) -> &'static str {
        "frame-extraction-thumbnails"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.thumbnails.enable_frame_extraction().await
    }
}

struct PlaceholderThumbnails {
    thumbnails: Arc<dyn ThumbnailPipeline>,
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for PlaceholderThumbnails {
    fn name(&self) -> &'static str {
        "placeholder-thumbnails"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.flags.disable_unified_thumbnails();
        self.thumbnails.enable_placeholders().await
    }
}

struct WaitAndRetry {
    connection: Arc<SessionConnection>,
    delay: Duration,
}

#[async_trait]
impl RecoveryAction for WaitAndRetry {
    fn name(&self) -> &'static str {
        "wait-and-retry"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        debug!(delay = ?self.delay, "waiting out transient network failure");
        tokio::time::sleep(self.delay).await;
        if self.connection.is_connected() {
            return Ok(());
        }
        let session_id =
            self.connection
                .session_id()
                .ok_or_else(|| MedilinkError::InvalidSession {
                    reason: "no session to reconnect".to_string(),
                })?;
        self.connection.connect(&session_id).await
    }
}

struct EnableOfflineMode {
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for EnableOfflineMode {
    fn name(&self) -> &'static str {
        "enable-offline-mode"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        info!("entering offline mode");
        self.flags.update(|flags| flags.offline_mode = true);
        Ok(())
    }
}

struct DisableNetworkFeatures {
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for DisableNetworkFeatures {
    fn name(&self) -> &'static str {
        "disable-network-features"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.flags.update(|flags| {
            flags.realtime_updates = false;
            flags.offline_mode = true;
        });
        Ok(())
    }
}

struct RecoverPlayback {
    media_engine: Arc<dyn MediaEngine>,
}

#[async_trait]
impl RecoveryAction for RecoverPlayback {
    fn name(&self) -> &'static str {
        "recover-playback"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.media_engine.recover_from_error().await
    }
}

struct ReloadMediaSource {
    media_engine: Arc<dyn MediaEngine>,
}

#[async_trait]
impl RecoveryAction for ReloadMediaSource {
    fn name(&self) -> &'static str {
        "reload-media-source"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        let url = self
            .media_engine
            .source_url()
            .ok_or_else(|| MedilinkError::Collaborator {
                subsystem: "media engine".to_string(),
                reason: "no source attached".to_string(),
            })?;
        self.media_engine.reload_source(&url).await
    }
}

struct BasicPlayerFallback {
    flags: Arc<FeatureFlagStore>,
}

#[async_trait]
impl RecoveryAction for BasicPlayerFallback {
    fn name(&self) -> &'static str {
        "basic-player-fallback"
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        info!("falling back to the basic player");
        self.flags.update(|flags| {
            flags.media_engine = false;
            flags.basic_player = true;
        });
        Ok(())
    }
}

/// Assemble the default recovery chains
///
/// Order matters: the engine walks each chain front to back and stops at the
/// first action that succeeds.
pub fn default_chains(
    deps: &RecoveryDeps,
) -> Vec<(ErrorCategory, Vec<Arc<dyn RecoveryAction>>)> {
    vec![
        (
            ErrorCategory::ConnectionFailed,
            vec![
                Arc::new(RetryConnection {
                    connection: deps.connection.clone(),
                }) as Arc<dyn RecoveryAction>,
                Arc::new(PollingFallback {
                    bridge: deps.bridge.clone(),
                }),
                Arc::new(DisableRealtime {
                    flags: deps.flags.clone(),
                }),
            ],
        ),
        (
            ErrorCategory::MediaEngineError,
            vec![
                Arc::new(RetryEngineInit {
                    media_engine: deps.media_engine.clone(),
                }) as Arc<dyn RecoveryAction>,
                Arc::new(LegacyEngineMode {
                    flags: deps.flags.clone(),
                }),
                Arc::new(RemoveEngineIntegration {
                    flags: deps.flags.clone(),
                }),
            ],
        ),
        (
            ErrorCategory::ThumbnailFailed,
            vec![
                Arc::new(RebuildThumbnailCache {
                    thumbnails: deps.thumbnails.clone(),
                }) as Arc<dyn RecoveryAction>,
                Arc::new(FrameExtractionFallback {
                    thumbnails: deps.thumbnails.clone(),
                }),
                Arc::new(PlaceholderThumbnails {
                    thumbnails: deps.thumbnails.clone(),
                    flags: deps.flags.clone(),
                }),
            ],
        ),
        (
            ErrorCategory::NetworkError,
            vec![
                Arc::new(WaitAndRetry {
                    connection: deps.connection.clone(),
                    delay: deps.network_retry_delay,
                }) as Arc<dyn RecoveryAction>,
                Arc::new(EnableOfflineMode {
                    flags: deps.flags.clone(),
                }),
                Arc::new(DisableNetworkFeatures {
                    flags: deps.flags.clone(),
                }),
            ],
        ),
        (
            ErrorCategory::MediaPlaybackError,
            vec![
                Arc::new(RecoverPlayback {
                    media_engine: deps.media_engine.clone(),
                }) as Arc<dyn RecoveryAction>,
                Arc::new(ReloadMediaSource {
                    media_engine: deps.media_engine.clone(),
                }),
                Arc::new(BasicPlayerFallback {
                    flags: deps.flags.clone(),
                }),
            ],
        ),
    ]
}
