//! Unit tests for error types.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use super::*;

#[rstest]
fn engine_error_message_carries_engine_text() {
    let error = JobError::Engine {
        message: "can't open input file".into(),
    };

    assert_eq!(error.to_string(), "prince error: can't open input file");
}

#[rstest]
#[case::closed(FrameError::Closed, true)]
#[case::short_read(
    FrameError::ShortRead {
        kind: "pdf".into(),
        expected: 10,
        source: Arc::new(io::Error::from(io::ErrorKind::UnexpectedEof)),
    },
    true
)]
#[case::broken_pipe(FrameError::io(io::Error::from(io::ErrorKind::BrokenPipe)), true)]
#[case::other_io(FrameError::io(io::Error::other("boom")), false)]
#[case::invalid_length(FrameError::InvalidLength { header: "pdf x".into() }, false)]
#[case::missing_terminator(FrameError::MissingTerminator { kind: "log".into() }, false)]
fn disconnects_are_recognised(#[case] error: FrameError, #[case] expected: bool) {
    assert_eq!(error.is_disconnect(), expected);
}

#[rstest]
fn engine_response_maps_to_engine_error() {
    let error = JobError::from_response(
        0,
        ResponseError::Engine {
            message: "bad".into(),
        },
    );

    assert!(matches!(error, JobError::Engine { ref message } if message == "bad"));
    assert!(!error.poisons_session());
}

#[rstest]
fn closed_stream_maps_to_session_lost() {
    let error = JobError::from_response(3, ResponseError::Frame(FrameError::Closed));

    assert!(matches!(error, JobError::SessionLost { session: 3, .. }));
    assert!(error.poisons_session());
}

#[rstest]
fn malformed_frame_keeps_framing_detail() {
    let error = JobError::from_response(
        1,
        ResponseError::Frame(FrameError::UnpairedDocument {
            found: "dat".into(),
        }),
    );

    assert!(matches!(error, JobError::Frame { session: 1, .. }));
    assert!(error.poisons_session());
    assert!(error.to_string().contains("'dat'"));
}

#[rstest]
#[case(Duration::from_millis(1500), "1500ms")]
#[case(Duration::from_secs(2), "2000ms")]
fn timeout_reports_milliseconds(#[case] timeout: Duration, #[case] expected: &str) {
    let message = JobError::timeout(timeout).to_string();

    assert!(
        message.contains(expected),
        "expected {expected} in message: {message}"
    );
}

#[rstest]
fn spawn_error_names_session_and_command() {
    let error = PoolError::Spawn {
        index: 2,
        source: SessionError::BinaryNotFound {
            command: "/opt/prince/bin/prince".into(),
            source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
        },
    };

    let message = error.to_string();
    assert!(message.contains("session 2"), "unexpected message: {message}");
    assert!(
        message.contains("/opt/prince/bin/prince"),
        "unexpected message: {message}"
    );
}

#[rstest]
fn greeting_timeout_names_session_and_deadline() {
    let error = SessionError::GreetingTimeout {
        session: 1,
        timeout_ms: 10_000,
    };

    assert_eq!(
        error.to_string(),
        "engine session 1 sent no greeting within 10000ms"
    );
}
