//! Stand-in for `prince --control` used by the end-to-end tests.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use princepdf_e2e::{StubExit, StubOptions, serve};

fn main() -> ExitCode {
    let options = StubOptions::parse();
    let stdin = io::stdin().lock();
    let stdout = io::stdout().lock();
    match serve(&options, stdin, stdout, &mut io::stderr()) {
        Ok(StubExit::Ended) => ExitCode::SUCCESS,
        Ok(StubExit::Crashed | StubExit::Desynchronised) => ExitCode::from(3),
        Err(error) => {
            let _ = writeln!(io::stderr(), "stub engine: {error}");
            ExitCode::FAILURE
        }
    }
}
