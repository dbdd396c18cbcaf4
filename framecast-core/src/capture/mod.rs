//! Source acquisition and stream binding
//!
//! This module handles:
//! - Requesting a revocable media stream for a camera or screen source
//! - Classifying acquisition failures
//! - Binding streams to a render surface that gates sampling on readiness

pub mod surface;
pub mod synthetic;

pub use surface::{PlaybackSurface, RenderSurface};
pub use synthetic::{SyntheticSource, SyntheticStream};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{SourceKind, VideoFrame};

/// A live, revocable handle to a video source
///
/// Stopping a stream releases the underlying device or screen grant. A stopped
/// stream never becomes live again.
pub trait MediaStream: Send + Sync + std::fmt::Debug {
    /// Identifier for logging
    fn id(&self) -> &str;

    /// Kind of source this stream captures
    fn kind(&self) -> SourceKind;

    /// Native resolution, once the stream has produced metadata
    fn resolution(&self) -> Option<(u32, u32)>;

    /// Most recent decoded frame
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Stop every track of the stream
    fn stop(&self);

    /// Whether the stream is still delivering frames
    fn is_live(&self) -> bool;
}

/// Provider of media streams (camera devices, screen-share pickers)
///
/// `acquire` may suspend indefinitely while the user answers a permission
/// prompt or picker. It carries no cancellation token; callers abandon a
/// pending acquisition by disposing the session that requested it.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Request a video-only stream for the given source kind
    async fn acquire(&self, kind: SourceKind) -> Result<Arc<dyn MediaStream>, SourceError>;
}

/// Failure category reported by a media backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    /// Access refused by the user or the OS
    PermissionDenied,
    /// No matching device
    NotFound,
    /// Picker dismissed / request aborted
    Aborted,
    /// Anything else
    Other,
}

impl SourceErrorKind {
    /// Map a platform error name onto a failure category
    ///
    /// Accepts the names used by browser media APIs as well as plain words.
    pub fn from_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" | "permission-denied" => {
                Self::PermissionDenied
            }
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" | "not-found" => {
                Self::NotFound
            }
            "AbortError" | "aborted" | "cancelled" => Self::Aborted,
            _ => Self::Other,
        }
    }
}

/// Raw failure from a media backend, before classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct SourceError {
    /// Failure category
    pub kind: SourceErrorKind,
    /// Backend-provided message
    pub message: String,
}

impl SourceError {
    /// Create a new source error
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create a source error from a platform error name
    pub fn named(name: &str, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::from_name(name), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        assert_eq!(
            SourceErrorKind::from_name("NotAllowedError"),
            SourceErrorKind::PermissionDenied
        );
        assert_eq!(
            SourceErrorKind::from_name("PermissionDeniedError"),
            SourceErrorKind::PermissionDenied
        );
        assert_eq!(
            SourceErrorKind::from_name("DevicesNotFoundError"),
            SourceErrorKind::NotFound
        );
        assert_eq!(SourceErrorKind::from_name("AbortError"), SourceErrorKind::Aborted);
        assert_eq!(SourceErrorKind::from_name("TypeError"), SourceErrorKind::Other);
    }

    #[test]
    fn test_named_error() {
        let err = SourceError::named("NotFoundError", "Requested device not found");
        assert_eq!(err.kind, SourceErrorKind::NotFound);
        assert_eq!(err.message, "Requested device not found");
    }
}
