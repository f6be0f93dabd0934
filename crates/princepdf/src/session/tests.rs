//! Session tests driven by small shell-script engines.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use mockall::mock;
use princepdf_config::EngineConfig;
use rstest::{fixture, rstest};

use super::*;
use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::error::{JobError, SessionError};
use crate::job::{Input, Job};
use crate::protocol::FrameKind;

mock! {
    Sink {}
    impl DiagnosticSink for Sink {
        fn engine_greeting(&self, session: usize, greeting: &str);
        fn engine_log(&self, session: usize, log: &str);
        fn engine_stderr(&self, session: usize, line: &str);
    }
}

const GRACE: Duration = Duration::from_millis(500);

fn shell_engine(script: &str) -> EngineConfig {
    EngineConfig::new("sh", ["-c", script])
}

#[fixture]
fn diagnostics() -> Arc<dyn DiagnosticSink> {
    Arc::new(TracingDiagnostics::new())
}

#[fixture]
fn job() -> Job {
    Job::new(Input::from_src("doc.html")).with_file("doc.html", b"<p>hello</p>".to_vec())
}

fn ready_session(script: &str, diagnostics: Arc<dyn DiagnosticSink>) -> EngineSession {
    let mut session =
        EngineSession::spawn(0, &shell_engine(script), diagnostics).expect("spawn engine");
    session.greet().expect("read greeting");
    session
}

#[cfg(unix)]
#[rstest]
fn greeting_is_recorded_as_version(diagnostics: Arc<dyn DiagnosticSink>) {
    let mut session = ready_session("printf 'ver 9\\nPrince 9\\n'; read line", diagnostics);

    assert_eq!(session.version(), Some("Prince 9"));
    assert_eq!(session.state(), SessionState::Ready);

    session.end(GRACE);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.has_exited());
}

#[cfg(unix)]
#[rstest]
fn document_response_returns_pdf_and_reports_log(job: Job) {
    let (log_tx, log_rx) = mpsc::channel();
    let mut sink = MockSink::new();
    sink.expect_engine_greeting().return_const(());
    sink.expect_engine_stderr().return_const(());
    sink.expect_engine_log()
        .withf(|session, log| *session == 0 && log == "all good")
        .times(1)
        .returning(move |_, log| log_tx.send(log.to_owned()).expect("log receiver"));
    let mut session = ready_session(
        "printf 'ver 0\\n'; read header; printf 'pdf 5\\n%%PDF-\\nlog 8\\nall good\\n'; cat >/dev/null",
        Arc::new(sink),
    );

    let output = session.run(&job).expect("run job");

    assert_eq!(output.kind, FrameKind::Pdf);
    assert_eq!(output.data.as_deref(), Some(b"%PDF-".as_slice()));
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(log_rx.try_recv().expect("log delivered"), "all good");
    session.kill();
}

#[cfg(unix)]
#[rstest]
fn engine_error_keeps_session_ready(diagnostics: Arc<dyn DiagnosticSink>, job: Job) {
    let mut session = ready_session(
        "printf 'ver 0\\n'; read header; printf 'err 4\\nnope\\n'; cat >/dev/null",
        diagnostics,
    );

    let error = session.run(&job).expect_err("engine rejects job");

    assert!(matches!(error, JobError::Engine { ref message } if message == "nope"));
    assert!(session.is_ready());
    session.kill();
}

#[cfg(unix)]
#[rstest]
fn engine_exit_mid_job_loses_session(diagnostics: Arc<dyn DiagnosticSink>, job: Job) {
    let mut session = ready_session("printf 'ver 0\\n'; read header; exit 0", diagnostics);

    let error = session.run(&job).expect_err("engine disappears");

    assert!(matches!(error, JobError::SessionLost { session: 0, .. }));
    assert_eq!(session.state(), SessionState::Closed);
}

#[cfg(unix)]
#[rstest]
fn malformed_response_quarantines_session(diagnostics: Arc<dyn DiagnosticSink>, job: Job) {
    let mut session = ready_session(
        "printf 'ver 0\\n'; read header; printf 'pdf lots\\n'; cat >/dev/null",
        diagnostics,
    );

    let error = session.run(&job).expect_err("framing violation");

    assert!(matches!(error, JobError::Frame { session: 0, .. }));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.has_exited());
    assert!(matches!(
        session.run(&job),
        Err(JobError::SessionLost { .. })
    ));
}

#[cfg(unix)]
#[rstest]
fn stderr_lines_reach_the_sink() {
    let (line_tx, line_rx) = mpsc::channel();
    let mut sink = MockSink::new();
    sink.expect_engine_greeting().return_const(());
    sink.expect_engine_stderr()
        .returning(move |_, line| line_tx.send(line.to_owned()).expect("line receiver"));
    let mut session = ready_session(
        "echo 'licence file not found' >&2; printf 'ver 0\\n'; read line",
        Arc::new(sink),
    );

    let line = line_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("stderr forwarded");

    assert_eq!(line, "licence file not found");
    session.end(GRACE);
}

#[cfg(unix)]
#[rstest]
fn end_kills_engine_that_ignores_termination(diagnostics: Arc<dyn DiagnosticSink>) {
    let mut session = ready_session("printf 'ver 0\\n'; exec sleep 30", diagnostics);

    session.end(Duration::from_millis(100));

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.has_exited());
}

#[cfg(unix)]
#[rstest]
fn silent_engine_fails_greeting(diagnostics: Arc<dyn DiagnosticSink>) {
    let mut session =
        EngineSession::spawn(4, &shell_engine("exit 0"), diagnostics).expect("spawn engine");

    let error = session.greet().expect_err("no greeting");

    assert!(matches!(error, SessionError::Greeting { session: 4, .. }));
    assert_eq!(session.state(), SessionState::Closed);
}

#[cfg(unix)]
#[rstest]
fn engine_that_never_greets_is_killed_at_the_deadline(diagnostics: Arc<dyn DiagnosticSink>) {
    let config = shell_engine("exec sleep 30").with_greeting_timeout(Duration::from_millis(200));
    let mut session = EngineSession::spawn(5, &config, diagnostics).expect("spawn engine");
    let started = Instant::now();

    let error = session.greet().expect_err("greeting must time out");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        error,
        SessionError::GreetingTimeout {
            session: 5,
            timeout_ms: 200
        }
    ));
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.has_exited());
}

#[rstest]
fn missing_binary_is_reported(diagnostics: Arc<dyn DiagnosticSink>) {
    let config = EngineConfig::new("/nonexistent/princepdf/prince", ["--control"]);

    let result = EngineSession::spawn(0, &config, diagnostics);

    assert!(matches!(result, Err(SessionError::BinaryNotFound { .. })));
}
