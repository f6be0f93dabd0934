//! Session replacement, abandonment, and bounded shutdown.

use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use princepdf::job::{Input, Job};
use princepdf::{JobError, Pool, PoolError, SessionError};
use princepdf_config::{Config, EngineConfig, PoolConfig};
use rstest::rstest;
use tempfile::TempDir;

fn stub_config(args: &[&str]) -> Config {
    Config {
        engine: EngineConfig::new(env!("CARGO_BIN_EXE_stub-engine"), args.iter().copied()),
        pool: PoolConfig::default().with_shutdown_grace(Duration::from_millis(300)),
        ..Config::default()
    }
}

fn with_restarts(mut config: Config, max_restarts: u32, queue_capacity: usize) -> Config {
    config.pool.max_restarts = max_restarts;
    config.pool.queue_capacity = queue_capacity;
    config
}

/// Launches the stub engine the first time only; later launches run
/// `fallback` instead.
fn first_launch_only(marker: &Path, fallback: &str) -> Config {
    let script = format!(
        "if [ -e \"$1\" ]; then {fallback}; fi; touch \"$1\"; exec \"$0\" --control"
    );
    Config {
        engine: EngineConfig::new(
            "sh",
            [
                "-c".to_owned(),
                script,
                env!("CARGO_BIN_EXE_stub-engine").to_owned(),
                marker.display().to_string(),
            ],
        ),
        pool: PoolConfig::default().with_shutdown_grace(Duration::from_millis(300)),
        ..Config::default()
    }
}

fn crash_job() -> Job {
    Job::new(Input::from_src("crash"))
}

fn page_job() -> Job {
    Job::new(Input::from_src("page.html")).with_file("page.html", b"<p>page</p>".to_vec())
}

#[rstest]
fn stop_completes_when_engine_ignores_termination() {
    let pool = Pool::new(&stub_config(&["--control", "--hang-on-end"]));
    pool.start().expect("start pool");
    pool.submit(page_job()).expect("render");

    let started = Instant::now();
    pool.stop().expect("stop pool");

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "stop took {:?}",
        started.elapsed()
    );
    assert!(!pool.is_running());
}

#[rstest]
fn crashed_engine_is_replaced() {
    let pool = Pool::new(&stub_config(&["--control"]));
    pool.start().expect("start pool");

    let error = pool
        .submit(Job::new(Input::from_src("crash")))
        .expect_err("engine crashes");
    let pdf = pool.submit(page_job()).expect("replacement session renders");

    assert!(matches!(error, JobError::SessionLost { session: 0, .. }));
    assert!(pdf.ends_with(b"<p>page</p>"));
    pool.stop().expect("stop pool");
}

#[rstest]
fn desynchronised_engine_is_quarantined_and_replaced() {
    let dir = TempDir::new().expect("temp dir");
    let marker = dir.path().join("garbage-sent");
    let marker_arg = marker.display().to_string();
    let pool = Pool::new(&stub_config(&["--control", "--garbage-once", &marker_arg]));
    pool.start().expect("start pool");

    let error = pool.submit(page_job()).expect_err("malformed response");
    let pdf = pool.submit(page_job()).expect("replacement session renders");

    assert!(
        matches!(error, JobError::Frame { .. } | JobError::SessionLost { .. }),
        "unexpected error: {error}"
    );
    assert!(marker.exists());
    assert!(pdf.ends_with(b"<p>page</p>"));
    pool.stop().expect("stop pool");
}

#[rstest]
fn abandoned_job_kills_its_engine() {
    let pool = Pool::new(&stub_config(&["--control", "--delay-ms", "10000"]));
    pool.start().expect("start pool");

    let started = Instant::now();
    let error = pool
        .submit_with_timeout(Job::new(Input::from_src("slow")), Duration::from_millis(300))
        .expect_err("deadline passes");
    let waited = started.elapsed();
    let pdf = pool
        .submit_with_timeout(page_job(), Duration::from_secs(10))
        .expect("replacement session renders");

    assert!(matches!(error, JobError::Timeout { timeout_ms: 300 }));
    assert!(waited < Duration::from_secs(5), "waited {waited:?}");
    assert!(pdf.ends_with(b"<p>page</p>"));
    pool.stop().expect("stop pool");
}

#[rstest]
fn engine_that_never_greets_fails_start() {
    let pool = Pool::new(&stub_config(&["--no-such-flag"]));

    let error = pool.start().expect_err("start must fail");

    assert!(matches!(
        error,
        PoolError::Spawn {
            index: 0,
            source: SessionError::Greeting { .. },
        }
    ));
    assert!(!pool.is_running());
}

#[rstest]
fn crashing_jobs_do_not_exhaust_the_restart_budget() {
    let pool = Pool::new(&with_restarts(stub_config(&["--control"]), 1, 1));
    pool.start().expect("start pool");

    for _ in 0..3 {
        let error = pool.submit(crash_job()).expect_err("engine crashes");
        assert!(matches!(error, JobError::SessionLost { session: 0, .. }));
    }
    let pdf = pool
        .submit_with_timeout(page_job(), Duration::from_secs(10))
        .expect("pool still serves");

    assert!(pdf.ends_with(b"<p>page</p>"));
    pool.stop().expect("stop pool");
}

#[cfg(unix)]
#[rstest]
fn worker_retires_after_consecutive_failed_replacements() {
    let dir = TempDir::new().expect("temp dir");
    let config = with_restarts(first_launch_only(&dir.path().join("launched"), "exit 3"), 2, 1);
    let pool = Pool::new(&config);
    pool.start().expect("start pool");

    let crashed = pool.submit(crash_job()).expect_err("engine crashes");
    let after = pool
        .submit_with_timeout(page_job(), Duration::from_secs(10))
        .expect_err("no engine left");

    assert!(matches!(crashed, JobError::SessionLost { session: 0, .. }));
    assert!(
        matches!(
            after,
            JobError::PoolClosed | JobError::SessionLost { session: 0, .. }
        ),
        "unexpected error: {after}"
    );
    pool.stop().expect("stop pool");
}

#[rstest]
fn queued_job_is_answered_when_the_last_worker_retires() {
    let config = with_restarts(stub_config(&["--control", "--delay-ms", "3000"]), 0, 2);
    let pool = Arc::new(Pool::new(&config));
    pool.start().expect("start pool");

    let abandoned = {
        let submitting = Arc::clone(&pool);
        thread::spawn(move || {
            submitting
                .submit_with_timeout(Job::new(Input::from_src("slow")), Duration::from_millis(400))
        })
    };
    thread::sleep(Duration::from_millis(100));
    let (outcome_tx, outcome_rx) = mpsc::channel();
    {
        let submitting = Arc::clone(&pool);
        thread::spawn(move || {
            let _ = outcome_tx.send(submitting.submit(page_job()));
        });
    }

    let queued = outcome_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("queued job must be answered");
    let first = abandoned.join().expect("submitting thread");

    assert!(matches!(first, Err(JobError::Timeout { timeout_ms: 400 })));
    assert!(
        matches!(queued, Err(JobError::SessionLost { session: 0, .. })),
        "unexpected outcome: {queued:?}"
    );
    assert!(matches!(pool.submit(page_job()), Err(JobError::PoolClosed)));
    pool.stop().expect("stop pool");
}

#[cfg(unix)]
#[rstest]
fn stop_kills_a_replacement_that_never_greets() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = first_launch_only(&dir.path().join("launched"), "exec sleep 30");
    config.engine = config.engine.with_greeting_timeout(Duration::from_secs(60));
    let pool = Pool::new(&config);
    pool.start().expect("start pool");
    pool.submit(crash_job()).expect_err("engine crashes");

    let started = Instant::now();
    pool.stop().expect("stop pool");

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "stop took {:?}",
        started.elapsed()
    );
}
