//! Configuration layering for the renderer.
//!
//! Precedence, lowest first: built-in defaults, the JSON file named by
//! `--config-path`, then environment variables and flags (clap resolves
//! those two together).

use princepdf_config::Config;

use crate::cli::Cli;
use crate::errors::CliError;

/// Resolves the effective configuration for `cli`.
pub(crate) fn resolve(cli: &Cli) -> Result<Config, CliError> {
    let mut config = cli
        .config_path
        .as_ref()
        .map_or_else(|| Ok(Config::default()), Config::load_from_path)?;
    apply_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(engine) = &cli.engine {
        config.engine.command.clone_from(engine);
    }
    if !cli.engine_args.is_empty() {
        config.engine.args.clone_from(&cli.engine_args);
    }
    if let Some(sessions) = cli.sessions {
        config.pool.sessions = sessions;
    }
    if let Some(filter) = &cli.log_filter {
        config.log_filter.clone_from(filter);
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
}
