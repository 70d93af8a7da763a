//! Feature flags gating degraded operation
//!
//! One [`FeatureFlagStore`] per client, injected into every component that
//! reads it. Single-writer discipline: only recovery actions and the
//! failsafe controller mutate the flags; everything else takes snapshots.
//! Degraded flags are never cleared automatically; only an explicit
//! reconnect or manual retry restores a feature path.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Feature availability snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    /// Live session updates over the realtime channel
    pub realtime_updates: bool,
    /// Adaptive-bitrate media engine integration
    pub media_engine: bool,
    /// Unified thumbnail pipeline
    pub unified_thumbnails: bool,
    /// Network-dependent features are suspended
    pub offline_mode: bool,
    /// Legacy (non-engine) playback path
    pub legacy_mode: bool,
    /// Minimal player without engine features
    pub basic_player: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            realtime_updates: true,
            media_engine: true,
            unified_thumbnails: true,
            offline_mode: false,
            legacy_mode: false,
            basic_player: false,
        }
    }
}

/// Shared, single-writer store for the feature flags
#[derive(Debug, Default)]
pub struct FeatureFlagStore {
    inner: RwLock<FeatureFlags>,
}

impl FeatureFlagStore {
    /// Read the current flags
    pub fn snapshot(&self) -> FeatureFlags {
        *self.inner.read()
    }

    /// Apply a mutation; reserved for recovery actions and the failsafe
    pub fn update(&self, mutate: impl FnOnce(&mut FeatureFlags)) {
        let mut flags = self.inner.write();
        mutate(&mut flags);
    }

    /// Disable live session updates
    pub fn disable_realtime(&self) {
        self.update(|flags| flags.realtime_updates = false);
    }

    /// Re-enable live session updates after an explicit retry
    pub fn restore_realtime(&self) {
        self.update(|flags| {
            flags.realtime_updates = true;
            flags.offline_mode = false;
        });
    }

    /// Disable the media engine, leaving the basic player available
    pub fn disable_media_engine(&self) {
        self.update(|flags| {
            flags.media_engine = false;
            flags.basic_player = true;
        });
    }

    /// Re-enable the media engine after an explicit retry
    pub fn restore_media_engine(&self) {
        self.update(|flags| {
            flags.media_engine = true;
            flags.legacy_mode = false;
            flags.basic_player = false;
        });
    }

    /// Disable the unified thumbnail pipeline
    pub fn disable_unified_thumbnails(&self) {
        self.update(|flags| flags.unified_thumbnails = false);
    }

    /// Re-enable the unified thumbnail pipeline after an explicit retry
    pub fn restore_unified_thumbnails(&self) {
        self.update(|flags| flags.unified_thumbnails = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_fully_enabled() {
        let flags = FeatureFlags::default();
        assert!(flags.realtime_updates);
        assert!(flags.media_engine);
        assert!(flags.unified_thumbnails);
        assert!(!flags.offline_mode);
        assert!(!flags.legacy_mode);
        assert!(!flags.basic_player);
    }

    #[test]
    fn disable_and_restore_round_trip() {
        let store = FeatureFlagStore::default();

        store.disable_media_engine();
        let degraded = store.snapshot();
        assert!(!degraded.media_engine);
        assert!(degraded.basic_player);

        store.restore_media_engine();
        assert_eq!(store.snapshot(), FeatureFlags::default());
    }

    #[test]
    fn restore_realtime_clears_offline_mode() {
        let store = FeatureFlagStore::default();
        store.update(|flags| {
            flags.realtime_updates = false;
            flags.offline_mode = true;
        });

        store.restore_realtime();
        let flags = store.snapshot();
        assert!(flags.realtime_updates);
        assert!(!flags.offline_mode);
    }
}
