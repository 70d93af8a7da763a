//! Keyword-based failure classification
//!
//! Classification is a best-effort heuristic: case-insensitive substring
//! tests over the failure's message and code, evaluated in a fixed priority
//! order so the first matching category wins. A message touching several
//! keyword sets resolves by priority alone. No match classifies as
//! [`ErrorCategory::Unknown`].

use crate::failure::Failure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// The session channel could not be kept alive
    ConnectionFailed,
    /// The media streaming engine failed
    MediaEngineError,
    /// The thumbnail pipeline failed
    ThumbnailFailed,
    /// General network failure outside the session channel
    NetworkError,
    /// Playback failed inside an otherwise healthy engine
    MediaPlaybackError,
    /// Nothing matched; handled by the failsafe alone
    Unknown,
}

impl ErrorCategory {
    /// Stable identifier used in notices and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCategory::MediaEngineError => "MEDIA_ENGINE_ERROR",
            ErrorCategory::ThumbnailFailed => "THUMBNAIL_FAILED",
            ErrorCategory::NetworkError => "NETWORK_ERROR",
            ErrorCategory::MediaPlaybackError => "MEDIA_PLAYBACK_ERROR",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CONNECTION_KEYWORDS: &[&str] = &["websocket", "socket", "connection", "connect"];
const ENGINE_KEYWORDS: &[&str] = &["engine", "manifest", "drm", "bitrate"];
const THUMBNAIL_KEYWORDS: &[&str] = &["thumbnail", "preview", "sprite"];
const NETWORK_KEYWORDS: &[&str] = &["network", "fetch", "offline", "dns", "timeout"];
const PLAYBACK_KEYWORDS: &[&str] = &["playback", "media", "video", "decode", "codec"];

/// Priority-ordered keyword tables; first match wins
const PRIORITY: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::ConnectionFailed, CONNECTION_KEYWORDS),
    (ErrorCategory::MediaEngineError, ENGINE_KEYWORDS),
    (ErrorCategory::ThumbnailFailed, THUMBNAIL_KEYWORDS),
    (ErrorCategory::NetworkError, NETWORK_KEYWORDS),
    (ErrorCategory::MediaPlaybackError, PLAYBACK_KEYWORDS),
];

/// Map a failure onto its category
///
/// Deterministic and total: the same message/code pair always yields the
/// same category, and exactly one category is returned.
pub fn classify(failure: &Failure) -> ErrorCategory {
    let mut haystack = failure.message.to_lowercase();
    if let Some(code) = &failure.code {
        haystack.push(' ');
        haystack.push_str(&code.to_lowercase());
    }
    for (category, keywords) in PRIORITY {
        if keywords.iter().any(|keyword| haystack.contains(keyword)) {
            return *category;
        }
    }
    ErrorCategory::Unknown
}
