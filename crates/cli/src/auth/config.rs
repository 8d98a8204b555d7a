//! Configuration file loading

use anyhow::{Context, Result};
use filemaker_client::ConfigChain;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = directories::ProjectDirs::from("com", "filemaker", "fmx")
        .context("Could not determine config directory")?
        .config_dir()
        .to_path_buf();

    Ok(config_dir)
}

/// Get the config file path
pub fn config_file_path() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// Parse a `[base]` / `[profiles.<name>]` document
pub fn parse_config(contents: &str) -> Result<ConfigChain> {
    toml::from_str(contents).context("Failed to parse config")
}

/// Load the configuration from `path`, or from the default location.
///
/// A missing default file yields an empty chain; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<ConfigChain> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = config_file_path()?;
            if !default.exists() {
                return Ok(ConfigChain::default());
            }
            default
        }
    };

    let contents = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

    parse_config(&contents).with_context(|| format!("Invalid config file: {:?}", config_path))
}
