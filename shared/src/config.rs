//! Layered configuration sources.
//!
//! Values come from an optional YAML file, overridden by a `.env` file,
//! overridden in turn by the process environment. Environment variable names
//! are lowercased, so `DRTS_API` fills the `drts_api` key.

use ::config::{Config, Environment, File, FileFormat, Map};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
}

/// Collects variables from a `.env` file overlaid with `process`.
///
/// Without an explicit path the `.env` file is searched for in the working
/// directory and its parents. A missing file is not an error; a malformed one is.
pub fn environment<I>(dotenv: Option<&Path>, process: I) -> Result<Map<String, String>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let found = match dotenv {
        Some(path) => dotenvy::from_path_iter(path),
        None => dotenvy::dotenv_iter(),
    };

    let mut vars: Map<String, String> = match found {
        Ok(iter) => iter.collect::<Result<_, _>>()?,
        Err(e) if e.not_found() => Map::new(),
        Err(e) => return Err(e.into()),
    };
    vars.extend(process);

    Ok(vars)
}

/// Process environment variables; names or values that are not valid UTF-8 are skipped
pub fn process_environment() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

/// Builds the layered source from an optional YAML file and `vars`.
///
/// Empty variables are treated as unset.
pub fn layered(file: Option<&Path>, vars: Map<String, String>) -> Result<Config, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
    }

    let config = builder
        .add_source(Environment::default().ignore_empty(true).source(Some(vars)))
        .build()?;

    Ok(config)
}
