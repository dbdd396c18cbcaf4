//! Integration tests for error handling

use framecast_core::capture::{SourceError, SourceErrorKind};
use framecast_core::error::{FramecastError, ResultExt};
use framecast_core::types::SourceKind;

#[test]
fn test_error_context_chaining() {
    let base_error = FramecastError::transport("Connection refused");
    let with_context = base_error.with_context("Connecting to peer");

    let msg = format!("{}", with_context);
    assert!(msg.contains("Connecting to peer"));
    assert!(msg.contains("Connection refused"));
}

#[test]
fn test_error_context_preserves_hint() {
    let base_error = FramecastError::PermissionDenied(SourceKind::Screen);
    let hint_before = base_error.user_hint();

    let with_context = base_error.with_context("Starting capture");
    assert_eq!(with_context.user_hint(), hint_before);
    assert!(hint_before.is_some());
}

#[test]
fn test_context_preserves_user_message() {
    let err = FramecastError::DeviceNotFound(SourceKind::Camera).with_context("Acquiring");
    assert_eq!(err.user_message(), "No camera found.");
}

#[test]
fn test_result_ext_context() {
    let result: Result<(), FramecastError> = Err(FramecastError::config("bad quality"));
    let with_context = result.context("Loading settings");

    let msg = with_context.unwrap_err().to_string();
    assert!(msg.starts_with("Loading settings"));
    assert!(msg.contains("bad quality"));
}

#[test]
fn test_error_names_map_to_messages() {
    let cases = [
        ("NotAllowedError", SourceKind::Camera, "Camera permission denied."),
        ("SecurityError", SourceKind::Screen, "Screen permission denied."),
        ("NotFoundError", SourceKind::Camera, "No camera found."),
        ("OverconstrainedError", SourceKind::Screen, "No screen found."),
        ("AbortError", SourceKind::Screen, "Screen sharing cancelled by user."),
    ];

    for (name, kind, expected) in cases {
        let err = FramecastError::from_acquisition(kind, &SourceError::named(name, "x"));
        assert_eq!(err.user_message(), expected, "for {}", name);
    }
}

#[test]
fn test_unknown_error_carries_detail() {
    let source_err = SourceError::named("NotReadableError", "Could not start video source");
    let err = FramecastError::from_acquisition(SourceKind::Camera, &source_err);

    assert!(matches!(err, FramecastError::Unknown { .. }));
    assert_eq!(
        err.user_message(),
        "Could not access camera: Could not start video source."
    );
}

#[test]
fn test_session_fatal_classification() {
    assert!(FramecastError::UserCancelled.is_session_fatal());
    assert!(FramecastError::from_playback(
        SourceKind::Camera,
        &SourceError::new(SourceErrorKind::Other, "no metadata")
    )
    .is_session_fatal());
    assert!(!FramecastError::encoding("raster empty").is_session_fatal());
    assert!(!FramecastError::transport("peer gone").is_session_fatal());
    assert!(!FramecastError::PipelineClosed.is_session_fatal());
    assert!(FramecastError::PermissionDenied(SourceKind::Camera)
        .with_context("wrapped")
        .is_session_fatal());
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: FramecastError = io.into();
    assert!(matches!(err, FramecastError::Io(_)));
}
