//! Contracts for the external subsystems recovery drives
//!
//! The media engine, the thumbnail pipeline, and the host-application bridge
//! live outside this crate; recovery only needs the narrow call surfaces
//! below. Production implementations wrap the real subsystems; tests use
//! scripted stubs.

use async_trait::async_trait;
use medilink_core::MedilinkError;

/// Adaptive-bitrate media streaming engine
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// (Re)initialize the engine from scratch
    async fn initialize(&self) -> Result<(), MedilinkError>;

    /// Attempt in-place recovery from the current media error
    async fn recover_from_error(&self) -> Result<(), MedilinkError>;

    /// Tear down and re-attach the given source
    async fn reload_source(&self, url: &str) -> Result<(), MedilinkError>;

    /// Currently attached source, if any
    fn source_url(&self) -> Option<String>;
}

/// Thumbnail generation pipeline and its cache
#[async_trait]
pub trait ThumbnailPipeline: Send + Sync {
    /// Drop every cached thumbnail
    async fn clear_cache(&self) -> Result<(), MedilinkError>;

    /// Regenerate thumbnails through the normal unified path
    async fn rebuild(&self) -> Result<(), MedilinkError>;

    /// Switch to extracting thumbnails from video frames directly
    async fn enable_frame_extraction(&self) -> Result<(), MedilinkError>;

    /// Switch to static placeholder thumbnails
    async fn enable_placeholders(&self) -> Result<(), MedilinkError>;

    /// Number of cached thumbnails
    fn cache_size(&self) -> usize;
}

/// One-way bridge to the host application shell
pub trait HostBridge: Send + Sync {
    /// Deliver a serialized envelope to the host; fire-and-forget
    fn post_message(&self, payload: &str);
}
