//! End-to-end test support for the princepdf engine pool.
//!
//! The crate ships `stub-engine`, a stand-in for `prince --control` that
//! speaks the same control protocol through [`princepdf::EngineTransport`].
//! It does not render anything: a document response is the literal prefix
//! `%PDF-stub` followed by the job header and every resource, so tests can
//! check which job a response belongs to.
//!
//! Behaviour is selected per job by the input source:
//!
//! - `fail`: answer with an `err` frame.
//! - `crash`: exit without answering.
//! - `slow`: wait `--delay-ms` before answering.
//!
//! and per process by flags (`--hang-on-end`, `--garbage-once`).

mod recording;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use princepdf::error::FrameError;
use princepdf::protocol::{EngineTransport, FrameKind};

pub use recording::{DiagnosticEvent, RecordingSink};

/// Prefix of every stub document.
pub const STUB_PDF_PREFIX: &[u8] = b"%PDF-stub\n";

/// Greeting sent when the stub starts.
pub const STUB_GREETING: &str = "stub-engine 1.0";

/// Command-line options of the stub engine.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "stub-engine")]
pub struct StubOptions {
    /// Accepted for compatibility with the real engine's invocation.
    #[arg(long)]
    pub control: bool,
    /// Ignore the termination frame and keep running.
    #[arg(long)]
    pub hang_on_end: bool,
    /// Answer the first job with a malformed frame unless this file exists,
    /// creating it.
    #[arg(long, value_name = "MARKER")]
    pub garbage_once: Option<PathBuf>,
    /// Delay applied to jobs whose source is `slow`.
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,
}

/// How a served session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubExit {
    /// The client sent the termination frame or closed the stream.
    Ended,
    /// A `crash` job asked the stub to disappear.
    Crashed,
    /// The stub broke the framing on purpose.
    Desynchronised,
}

/// Serves the control protocol until the client ends the session.
///
/// # Errors
///
/// Returns a [`FrameError`] when the client's frames are malformed or the
/// streams fail.
pub fn serve<R, W, E>(
    options: &StubOptions,
    reader: R,
    writer: W,
    stderr: &mut E,
) -> Result<StubExit, FrameError>
where
    R: BufRead,
    W: Write,
    E: Write,
{
    let _ = writeln!(stderr, "stub engine starting");
    let mut transport = EngineTransport::new(reader, writer);
    transport.send_frame(&FrameKind::Other("ver".into()), STUB_GREETING.as_bytes())?;

    loop {
        let frame = match transport.receive_frame() {
            Ok(frame) => frame,
            Err(FrameError::Closed) => return Ok(StubExit::Ended),
            Err(error) => return Err(error),
        };
        match frame.kind {
            FrameKind::End => {
                if options.hang_on_end {
                    let _ = writeln!(stderr, "ignoring termination frame");
                    loop {
                        thread::sleep(Duration::from_secs(3600));
                    }
                }
                return Ok(StubExit::Ended);
            }
            FrameKind::Job => {
                let resources = read_resources(&mut transport, &frame.payload)?;
                if let Some(exit) = answer(options, &mut transport, &frame.payload, &resources)? {
                    return Ok(exit);
                }
            }
            other => {
                let message = format!("unexpected '{other}' frame");
                transport.send_frame(&FrameKind::Error, message.as_bytes())?;
            }
        }
    }
}

fn read_resources<R: BufRead, W: Write>(
    transport: &mut EngineTransport<R, W>,
    header: &[u8],
) -> Result<Vec<Vec<u8>>, FrameError> {
    let count = serde_json::from_slice::<serde_json::Value>(header)
        .ok()
        .and_then(|value| value.get("job-resource-count").and_then(serde_json::Value::as_u64))
        .unwrap_or(0);
    let mut resources = Vec::new();
    for _ in 0..count {
        let frame = transport.receive_frame()?;
        if frame.kind != FrameKind::Data {
            return Err(FrameError::Io(Arc::new(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected 'dat' frame, received '{}'", frame.kind),
            ))));
        }
        resources.push(frame.payload);
    }
    Ok(resources)
}

fn source_of(header: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(header).ok()?;
    value
        .get("input")?
        .get("src")?
        .as_str()
        .map(str::to_owned)
}

fn answer<R: BufRead, W: Write>(
    options: &StubOptions,
    transport: &mut EngineTransport<R, W>,
    header: &[u8],
    resources: &[Vec<u8>],
) -> Result<Option<StubExit>, FrameError> {
    if let Some(marker) = &options.garbage_once
        && !marker.exists()
        && std::fs::write(marker, b"").is_ok()
    {
        transport.send_frame(&FrameKind::Pdf, b"")?;
        transport.send_frame(&FrameKind::Other("oops".into()), b"")?;
        return Ok(Some(StubExit::Desynchronised));
    }

    match source_of(header).as_deref() {
        Some("fail") => {
            transport.send_frame(&FrameKind::Error, b"stub failure: fail")?;
            return Ok(None);
        }
        Some("crash") => return Ok(Some(StubExit::Crashed)),
        Some("slow") => thread::sleep(Duration::from_millis(options.delay_ms)),
        _ => {}
    }

    let mut document = STUB_PDF_PREFIX.to_vec();
    document.extend_from_slice(header);
    for resource in resources {
        document.push(b'\n');
        document.extend_from_slice(resource);
    }
    transport.send_frame(&FrameKind::Pdf, &document)?;
    let log = format!("rendered {} resources", resources.len());
    transport.send_frame(&FrameKind::Log, log.as_bytes())?;
    Ok(None)
}
