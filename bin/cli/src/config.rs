//! Configuration loading for the CLI.
//!
//! Settings come from an optional file (format chosen by extension) and are
//! overridden by `GATEHOUSE__*` environment variables, e.g.
//! `GATEHOUSE__CLIENT_ID` or `GATEHOUSE__HOME_REDIRECT_DELAY_MS`.

use gatehouse_identity::AuthConfig;
use std::path::Path;

/// Prefix of environment variables read as configuration.
pub const ENV_PREFIX: &str = "GATEHOUSE";

/// Loads configuration from `file` and the process environment.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a value has the wrong type.
pub fn load(file: Option<&Path>) -> Result<AuthConfig, config::ConfigError> {
    load_with(file, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn load_with(
    file: Option<&Path>,
    env: config::Environment,
) -> Result<AuthConfig, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(file) = file {
        builder = builder.add_source(config::File::from(file));
    }
    builder.add_source(env).build()?.try_deserialize()
}
