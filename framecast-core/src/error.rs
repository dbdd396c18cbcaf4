//! Error types for framecast

use thiserror::Error;

use crate::capture::{SourceError, SourceErrorKind};
use crate::types::SourceKind;

/// Result type alias using FramecastError
pub type Result<T> = std::result::Result<T, FramecastError>;

/// Main error type for framecast operations
#[derive(Debug, Error)]
pub enum FramecastError {
    /// The user or the OS refused access to the source
    #[error("{0} permission denied")]
    PermissionDenied(SourceKind),

    /// No capture device exists for the requested source
    #[error("No {0} found")]
    DeviceNotFound(SourceKind),

    /// The screen-share picker was dismissed
    #[error("Screen sharing cancelled by user")]
    UserCancelled,

    /// The render surface refused to start playback
    #[error("Could not play {source_kind} stream: {message}")]
    PlaybackFailed {
        source_kind: SourceKind,
        message: String,
    },

    /// A single sample could not be encoded
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Any other acquisition failure
    #[error("Could not access {source_kind}: {message}")]
    Unknown {
        source_kind: SourceKind,
        message: String,
    },

    /// The pipeline event loop has shut down
    #[error("Capture pipeline is not running")]
    PipelineClosed,

    /// Transport channel error (connect, bind, malformed messages)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FramecastError>,
    },
}

impl FramecastError {
    /// Create an encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailed(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify a failed acquisition for the given source kind
    pub fn from_acquisition(source_kind: SourceKind, err: &SourceError) -> Self {
        match err.kind {
            SourceErrorKind::PermissionDenied => Self::PermissionDenied(source_kind),
            SourceErrorKind::NotFound => Self::DeviceNotFound(source_kind),
            SourceErrorKind::Aborted => Self::UserCancelled,
            SourceErrorKind::Other => Self::Unknown {
                source_kind,
                message: err.message.clone(),
            },
        }
    }

    /// Wrap a playback-start failure for the given source kind
    pub fn from_playback(source_kind: SourceKind, err: &SourceError) -> Self {
        Self::PlaybackFailed {
            source_kind,
            message: err.message.clone(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error ends the capture session
    ///
    /// Encoding failures only drop the current sample.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::PermissionDenied(_)
            | Self::DeviceNotFound(_)
            | Self::UserCancelled
            | Self::PlaybackFailed { .. }
            | Self::Unknown { .. } => true,
            Self::EncodingFailed(_)
            | Self::PipelineClosed
            | Self::Transport(_)
            | Self::Config(_)
            | Self::Io(_) => false,
            Self::WithContext { source, .. } => source.is_session_fatal(),
        }
    }

    /// Message shown to the user when a session ends with this error
    pub fn user_message(&self) -> String {
        match self {
            Self::WithContext { source, .. } => source.user_message(),
            other => {
                let mut msg = other.to_string();
                if let Some(first) = msg.get(..1) {
                    let upper = first.to_uppercase();
                    msg.replace_range(..1, &upper);
                }
                msg.push('.');
                msg
            }
        }
    }

    /// A hint for resolving the error, if one applies
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied(SourceKind::Camera) => {
                Some("Allow camera access for this application in your system privacy settings")
            }
            Self::PermissionDenied(SourceKind::Screen) => {
                Some("Allow screen recording for this application in your system privacy settings")
            }
            Self::DeviceNotFound(_) => Some("Check that a camera is connected and not in use"),
            Self::UserCancelled => Some("Pick a screen, window or tab to share"),
            Self::PlaybackFailed { .. } => Some("The stream could not be played; try another source"),
            Self::Transport(_) => Some("Check that the peer is running and reachable"),
            Self::Config(_) => Some("Check ~/.config/framecast/config.toml for errors"),
            Self::WithContext { source, .. } => source.user_hint(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<serde_json::Error> for FramecastError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("Malformed message: {}", err))
    }
}

impl From<image::ImageError> for FramecastError {
    fn from(err: image::ImageError) -> Self {
        Self::EncodingFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_classification() {
        let denied = SourceError::new(SourceErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            FramecastError::from_acquisition(SourceKind::Camera, &denied),
            FramecastError::PermissionDenied(SourceKind::Camera)
        ));

        let other = SourceError::new(SourceErrorKind::Other, "device busy");
        match FramecastError::from_acquisition(SourceKind::Screen, &other) {
            FramecastError::Unknown {
                source_kind,
                message,
            } => {
                assert_eq!(source_kind, SourceKind::Screen);
                assert_eq!(message, "device busy");
            }
            e => panic!("unexpected {:?}", e),
        }
    }

    #[test]
    fn test_user_message() {
        assert_eq!(
            FramecastError::PermissionDenied(SourceKind::Camera).user_message(),
            "Camera permission denied."
        );
        assert_eq!(
            FramecastError::DeviceNotFound(SourceKind::Camera).user_message(),
            "No camera found."
        );
        assert_eq!(
            FramecastError::UserCancelled.user_message(),
            "Screen sharing cancelled by user."
        );
    }
}
