//! Configuration resolution from process arguments

use std::ffi::OsString;

use clap::{CommandFactory, FromArgMatches};

use crate::agent::Config;
use crate::cli::{AgentArgs, ServerArgs, cli_to_config};
use crate::error::{ConfigError, Result};
use crate::server::ServerConfig;

fn parse_args<A, I, T>(args: I, version: &str) -> Result<A>
where
    A: CommandFactory + FromArgMatches,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = A::command()
        .version(version.to_string())
        .try_get_matches_from(args)?;
    Ok(A::from_arg_matches(&matches)?)
}

/// Resolve the agent configuration
///
/// A `--config` file takes precedence over shorthand flags. Defaults are
/// applied last, so the returned configuration always has diagnostics.
///
/// # Errors
///
/// `ConfigError::NoConfiguration` when neither a file nor a shorthand flag is
/// given; `ConfigError::Cli` for bad flags, `--help` and `--version`.
pub fn get<I, T>(args: I, version: &str) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: AgentArgs = parse_args(args, version)?;

    let mut config = match (&args.config, args.request()) {
        (Some(path), _) => Config::from_file(path)?,
        (None, Some(request)) => cli_to_config(&request),
        (None, None) => return Err(ConfigError::NoConfiguration),
    };

    config.set_default()?;
    Ok(config)
}

/// Resolve the server configuration
///
/// # Errors
///
/// `ConfigError::MissingConfigFlag` without `--config`; load and validation
/// errors from the file otherwise.
pub fn get_server<I, T>(args: I, version: &str) -> Result<ServerConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: ServerArgs = parse_args(args, version)?;
    let path = args.config.ok_or(ConfigError::MissingConfigFlag)?;

    let mut config = ServerConfig::from_file(path)?;
    config.set_default()?;
    Ok(config)
}
