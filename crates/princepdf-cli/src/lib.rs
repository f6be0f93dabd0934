//! Command-line renderer for the princepdf engine pool.
//!
//! The runtime resolves configuration, installs telemetry, starts a pool of
//! engine sessions, renders one job, and stops the pool again. It is
//! exercised both from the binary entrypoint and from tests, where the
//! output streams are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use princepdf::Pool;
use tracing::{info, warn};

mod cli;
mod config;
mod errors;
mod job_input;
mod telemetry;

use cli::{Cli, CliCommand, RenderArgs};
use errors::CliError;

/// Log target for CLI operations.
const CLI_TARGET: &str = "princepdf_cli";

/// Runs the renderer with `args`, writing documents sent to `-` to `stdout`
/// and failures to `stderr`.
#[must_use]
pub fn run<I, T, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };
    match execute(cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "princepdf: {error}");
            ExitCode::FAILURE
        }
    }
}

fn report_usage<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    if error.use_stderr() {
        let _ = write!(stderr, "{error}");
        ExitCode::from(2)
    } else {
        let _ = write!(stdout, "{error}");
        ExitCode::SUCCESS
    }
}

fn execute<W: Write>(cli: Cli, stdout: &mut W) -> Result<(), CliError> {
    let mut config = config::resolve(&cli)?;
    telemetry::initialise(&config)?;
    let CliCommand::Render(args) = cli.command;
    if let Some(ms) = args.timeout_ms {
        config.pool.submit_timeout_ms = Some(ms);
    }
    render(&config, &args, stdout)
}

fn render<W: Write>(
    config: &princepdf_config::Config,
    args: &RenderArgs,
    stdout: &mut W,
) -> Result<(), CliError> {
    let job = job_input::build_job(args)?;
    let pool = Pool::new(config);
    pool.start()?;
    let outcome = pool.submit(job);
    if let Err(error) = pool.stop() {
        warn!(target: CLI_TARGET, error = %error, "failed to stop engine pool");
    }

    let pdf = outcome?;
    job_input::write_output(&args.output, &pdf, stdout)?;
    info!(
        target: CLI_TARGET,
        output = %args.output.display(),
        bytes = pdf.len(),
        "document written"
    );
    Ok(())
}
