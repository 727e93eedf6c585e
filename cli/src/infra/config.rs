//! Loading the configuration set from a YAML file on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::config::{ConfigFile, DEFAULT_CONFIG_PATH, ProvisionConfig, parse_env_lines};
use crate::domain::error::ConfigError;

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "HOSTPREP_CONFIG";

/// Where the config file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by `--config` or `HOSTPREP_CONFIG`; must exist.
    Explicit(PathBuf),
    /// The default location; a missing file means "all defaults".
    Default(PathBuf),
}

impl ConfigSource {
    /// Pick the config path from the flag, then the environment, then the
    /// default location.
    #[must_use]
    pub fn select(flag: Option<&Path>) -> Self {
        if let Some(path) = flag {
            return Self::Explicit(path.to_path_buf());
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(val) if !val.is_empty() => Self::Explicit(PathBuf::from(val)),
            _ => Self::Default(PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(p) | Self::Default(p) => p,
        }
    }
}

/// Read and parse the config file without resolving it.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] for a missing explicit file, or an error
/// if the file cannot be read or parsed.
pub fn load_file(source: &ConfigSource) -> Result<ConfigFile> {
    let path = source.path();
    if !path.exists() {
        return match source {
            ConfigSource::Explicit(p) => Err(ConfigError::NotFound(p.clone()).into()),
            ConfigSource::Default(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Ok(ConfigFile::default())
            }
        };
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
}

/// Load, merge and validate the configuration set.
///
/// A relative `env_source` is resolved against the config file's directory.
///
/// # Errors
///
/// Returns an error if the file or the sourced variable file cannot be read,
/// or if validation fails.
pub fn load(source: &ConfigSource) -> Result<ProvisionConfig> {
    let file = load_file(source)?;
    let sourced = match &file.env_source {
        None => Vec::new(),
        Some(env_source) => {
            let env_path = match source.path().parent() {
                Some(dir) if env_source.is_relative() => dir.join(env_source),
                _ => env_source.clone(),
            };
            let text = std::fs::read_to_string(&env_path)
                .with_context(|| format!("cannot read env_source {}", env_path.display()))?;
            parse_env_lines(&env_path.display().to_string(), &text)?
        }
    };
    let config = ProvisionConfig::resolve(file, sourced)
        .with_context(|| format!("invalid configuration in {}", source.path().display()))?;
    Ok(config)
}
