use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::{sanitize_config, Config};

const CONFIG_DIRECTORY_NAME: &str = "tunebridge";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this system")]
    NoConfigDirectory,
    #[error("failed to access config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn system_config_template_text() -> &'static str {
    include_str!("../config/config.system.toml")
}

/// `<config dir>/tunebridge/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|root| root.join(CONFIG_DIRECTORY_NAME).join(CONFIG_FILENAME))
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Reads the config at `path`, writing the commented default template first
/// when the file does not exist yet.
///
/// A file that fails to parse is reported and replaced by defaults for this
/// run; it is never overwritten.
pub fn load_or_create_config(path: &Path) -> Result<Config, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        std::fs::write(path, system_config_template_text()).map_err(io_error)?;
    }

    let config_content = std::fs::read_to_string(path).map_err(io_error)?;
    Ok(sanitize_config(parse_config(&config_content, path)))
}

fn parse_config(content: &str, path: &Path) -> Config {
    match toml::from_str::<Config>(content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config {} ({}). Using defaults.",
                path.display(),
                err
            );
            Config::default()
        }
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    expand_home_with(path, dirs::home_dir().as_deref())
}

fn expand_home_with(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}

/// `None` for an empty setting, else the home-expanded path.
pub fn configured_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(expand_home(value))
    }
}
