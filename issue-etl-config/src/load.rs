use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the YAML configuration files.
const CONFIGURATION_DIR: &str = "configuration";

const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix of environment variables overriding file values.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys, e.g. `APP_SOURCE__PROJECT` sets `source.project`.
const ENV_SEPARATOR: &str = "__";

/// Errors raised while locating or reading configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("`{0}` is not a supported environment, use `prod`, `staging` or `dev`")]
    UnsupportedEnvironment(String),

    #[error("Failed to determine the current directory: {0}")]
    CurrentDir(#[from] std::io::Error),

    #[error("Failed to read configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Loads configuration from `./configuration` for the environment named by `APP_ENVIRONMENT`.
///
/// Sources are layered in this order, later ones winning:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`
/// 3. `APP_`-prefixed environment variables, with `__` separating nested keys
pub fn load_config<T>() -> Result<T, LoadError>
where
    T: DeserializeOwned,
{
    let configuration_directory = std::env::current_dir()?.join(CONFIGURATION_DIR);
    let environment = Environment::load()?;

    load_config_from(&configuration_directory, environment)
}

/// Same as [`load_config`] with an explicit directory and environment.
pub fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadError>
where
    T: DeserializeOwned,
{
    let environment_file: PathBuf = directory.join(format!("{environment}.yaml"));

    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = config::Config::builder()
        .add_source(config::File::from(directory.join(BASE_CONFIG_FILE)))
        .add_source(config::File::from(environment_file).required(false))
        // E.g. `APP_DESTINATION__BIG_QUERY__TABLE_ID=issues` sets the BigQuery table id.
        .add_source(environment_source)
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}
