//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use princepdf_config::LogFormat;

/// Command-line interface for the princepdf renderer.
#[derive(Parser, Debug)]
#[command(name = "princepdf", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// JSON configuration file layered over the built-in defaults.
    #[arg(long, env = "PRINCEPDF_CONFIG_PATH", global = true, value_name = "PATH")]
    pub(crate) config_path: Option<PathBuf>,
    /// Engine executable.
    #[arg(long, env = "PRINCEPDF_ENGINE", global = true, value_name = "COMMAND")]
    pub(crate) engine: Option<PathBuf>,
    /// Engine argument; repeat to pass several. Replaces the configured list.
    #[arg(long = "engine-arg", global = true, value_name = "ARG", allow_hyphen_values = true)]
    pub(crate) engine_args: Vec<String>,
    /// Number of engine sessions.
    #[arg(long, env = "PRINCEPDF_SESSIONS", global = true)]
    pub(crate) sessions: Option<usize>,
    /// `tracing` filter expression.
    #[arg(long, env = "PRINCEPDF_LOG_FILTER", global = true, value_name = "FILTER")]
    pub(crate) log_filter: Option<String>,
    /// Log output format (`json` or `compact`).
    #[arg(long, env = "PRINCEPDF_LOG_FORMAT", global = true, value_name = "FORMAT")]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands of the renderer.
#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Renders one job to a PDF file.
    Render(RenderArgs),
}

/// Arguments of the `render` subcommand.
#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Job description in the engine's JSON job format.
    #[arg(long, value_name = "JOB.json")]
    pub(crate) job: Option<PathBuf>,
    /// File made available to the job under its file name; repeatable.
    #[arg(long = "file", value_name = "PATH")]
    pub(crate) files: Vec<PathBuf>,
    /// Input source, overriding the job's `input.src`.
    #[arg(long, value_name = "REF")]
    pub(crate) src: Option<String>,
    /// Destination of the rendered PDF; `-` writes to standard output.
    #[arg(long, short, value_name = "OUT.pdf")]
    pub(crate) output: PathBuf,
    /// Deadline for the job in milliseconds.
    #[arg(long, value_name = "MS")]
    pub(crate) timeout_ms: Option<u64>,
}
