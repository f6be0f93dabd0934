//! CLI entrypoint for the princepdf renderer.
//!
//! The binary delegates to [`princepdf_cli::run`], which resolves
//! configuration, starts the engine pool, and renders the requested job.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    princepdf_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
