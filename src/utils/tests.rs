use super::error::{RelayError, SendError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn test_normalize_level() {
    assert_eq!(logging::normalize_level("WARNING"), "warn");
    assert_eq!(logging::normalize_level(" debug "), "debug");
    assert_eq!(logging::normalize_level("verbose"), "info");
}

#[test]
fn test_batch_failed_display() {
    let err = RelayError::BatchFailed {
        ordinal: 2,
        sent: 7,
        source: SendError::Transport("reset by peer".to_string()),
    };
    assert_eq!(
        err.to_string(),
        "batch 2 aborted after 7 messages: broker transport error: reset by peer"
    );
}

#[test]
fn test_send_error_from_json() {
    let json_err = serde_json::from_str::<u8>("nope").unwrap_err();
    let err: SendError = json_err.into();
    assert!(matches!(err, SendError::Encode(_)));
}

#[test]
fn test_panicked_send_display() {
    let err = SendError::Panicked("gps broker exploded".to_string());
    assert_eq!(err.to_string(), "send panicked: gps broker exploded");
}
