//! Domain types and validators for the provisioning configuration set.
//!
//! Pure functions only: no I/O, no async, no filesystem access. The YAML
//! file is deserialized into [`ConfigFile`] (every field optional) and then
//! resolved once into the immutable [`ProvisionConfig`] that every step
//! receives by reference.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostprep/hostprep.yaml";
pub const DEFAULT_LOG_FILE: &str = "/var/log/hostprep.log";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_APP_USER: &str = "app";
pub const DEFAULT_ADMIN_USER: &str = "ubuntu";
pub const DEFAULT_PROCESS_NAME: &str = "app";
pub const DEFAULT_ENTRY_POINT: &str = "server.js";
pub const DEFAULT_BACKEND_PORT: u16 = 3000;
pub const DEFAULT_CACHE_PORT: u16 = 80;
pub const DEFAULT_CACHE_MEMORY: &str = "256m";
pub const DEFAULT_NODE_MAJOR: u32 = 20;
pub const DEFAULT_GIT_HOST: &str = "github.com";
pub const DEFAULT_CACHE_DEFAULT_FILE: &str = "/etc/default/varnish";
pub const DEFAULT_CACHE_VCL_FILE: &str = "/etc/varnish/default.vcl";

// ── Instance count ───────────────────────────────────────────────────────────

/// Number of application processes the supervisor starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceCount {
    /// A fixed number of processes.
    Fixed(NonZeroU32),
    /// One process per CPU core.
    Max,
}

impl Default for InstanceCount {
    fn default() -> Self {
        Self::Fixed(NonZeroU32::MIN)
    }
}

impl fmt::Display for InstanceCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Max => f.write_str("max"),
        }
    }
}

impl std::str::FromStr for InstanceCount {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("max") {
            return Ok(Self::Max);
        }
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self::Fixed)
            .ok_or_else(|| ConfigError::InvalidInstances(s.to_string()))
    }
}

impl Serialize for InstanceCount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ── File schema ──────────────────────────────────────────────────────────────

/// On-disk schema of `hostprep.yaml`. Every field is optional; defaults and
/// derived paths are applied by [`ProvisionConfig::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub instances: Option<serde_yaml::Value>,
    pub app_user: Option<String>,
    pub admin_user: Option<String>,
    pub app_home: Option<PathBuf>,
    pub app_dir: Option<PathBuf>,
    pub repo_dir: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub deploy_script: Option<PathBuf>,
    pub deploy_key: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub process_name: Option<String>,
    pub entry_point: Option<String>,
    pub backend_port: Option<u16>,
    pub cache_port: Option<u16>,
    pub cache_memory: Option<String>,
    pub node_major: Option<u32>,
    pub git_host: Option<String>,
    pub cache_default_file: Option<PathBuf>,
    pub cache_vcl_file: Option<PathBuf>,
    pub env_source: Option<PathBuf>,
    pub environment: BTreeMap<String, serde_yaml::Value>,
}

// ── Resolved configuration ───────────────────────────────────────────────────

/// The configuration set for one run. Built once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionConfig {
    pub repo_url: String,
    pub branch: String,
    pub instances: InstanceCount,
    pub app_user: String,
    pub admin_user: String,
    pub app_home: PathBuf,
    pub app_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub env_file: PathBuf,
    pub deploy_script: PathBuf,
    pub deploy_key: PathBuf,
    pub log_file: PathBuf,
    pub process_name: String,
    pub entry_point: String,
    pub backend_port: u16,
    pub cache_port: u16,
    pub cache_memory: String,
    pub node_major: u32,
    pub git_host: String,
    pub cache_default_file: PathBuf,
    pub cache_vcl_file: PathBuf,
    /// Entries written to the environment file, sorted by key.
    pub environment: BTreeMap<String, String>,
}

impl ProvisionConfig {
    /// Resolve a parsed config file into the immutable configuration set.
    ///
    /// `sourced` holds the entries of the external variable file named by
    /// `env_source`, already parsed. Entries under `environment` in the YAML
    /// file win over sourced ones.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a value is missing or malformed.
    pub fn resolve(file: ConfigFile, sourced: Vec<(String, String)>) -> Result<Self, ConfigError> {
        let app_user = file.app_user.unwrap_or_else(|| DEFAULT_APP_USER.to_string());
        let app_home = file
            .app_home
            .unwrap_or_else(|| PathBuf::from("/home").join(&app_user));
        let app_dir = file.app_dir.unwrap_or_else(|| app_home.join("app"));
        let repo_dir = file.repo_dir.unwrap_or_else(|| app_dir.join("current"));
        let env_file = file.env_file.unwrap_or_else(|| app_dir.join(".env"));
        let deploy_script = file
            .deploy_script
            .unwrap_or_else(|| app_home.join("deploy.sh"));
        let deploy_key = file
            .deploy_key
            .unwrap_or_else(|| app_home.join(".ssh").join("id_ed25519"));

        let instances = match file.instances {
            None => InstanceCount::default(),
            Some(value) => scalar_to_string(&value)
                .ok_or_else(|| ConfigError::InvalidInstances(format!("{value:?}")))?
                .parse()?,
        };

        let mut environment: BTreeMap<String, String> = sourced.into_iter().collect();
        for (key, value) in file.environment {
            let value = scalar_to_string(&value).unwrap_or_default();
            environment.insert(key, value);
        }

        let config = Self {
            repo_url: file.repo_url.unwrap_or_default(),
            branch: file.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            instances,
            app_user,
            admin_user: file
                .admin_user
                .unwrap_or_else(|| DEFAULT_ADMIN_USER.to_string()),
            app_home,
            app_dir,
            repo_dir,
            env_file,
            deploy_script,
            deploy_key,
            log_file: file
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            process_name: file
                .process_name
                .unwrap_or_else(|| DEFAULT_PROCESS_NAME.to_string()),
            entry_point: file
                .entry_point
                .unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string()),
            backend_port: file.backend_port.unwrap_or(DEFAULT_BACKEND_PORT),
            cache_port: file.cache_port.unwrap_or(DEFAULT_CACHE_PORT),
            cache_memory: file
                .cache_memory
                .unwrap_or_else(|| DEFAULT_CACHE_MEMORY.to_string()),
            node_major: file.node_major.unwrap_or(DEFAULT_NODE_MAJOR),
            git_host: file.git_host.unwrap_or_else(|| DEFAULT_GIT_HOST.to_string()),
            cache_default_file: file
                .cache_default_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DEFAULT_FILE)),
            cache_vcl_file: file
                .cache_vcl_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_VCL_FILE)),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the resolved values.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo_url.trim().is_empty() {
            return Err(ConfigError::MissingRepoUrl);
        }
        for (field, value) in [
            ("branch", &self.branch),
            ("app_user", &self.app_user),
            ("admin_user", &self.admin_user),
            ("process_name", &self.process_name),
            ("entry_point", &self.entry_point),
            ("git_host", &self.git_host),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField { field });
            }
        }
        for (field, path) in [
            ("app_home", &self.app_home),
            ("app_dir", &self.app_dir),
            ("repo_dir", &self.repo_dir),
            ("env_file", &self.env_file),
            ("deploy_script", &self.deploy_script),
            ("deploy_key", &self.deploy_key),
            ("log_file", &self.log_file),
            ("cache_default_file", &self.cache_default_file),
            ("cache_vcl_file", &self.cache_vcl_file),
        ] {
            if !path.is_absolute() {
                return Err(ConfigError::RelativePath {
                    field,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    /// The app account's `.ssh` directory.
    #[must_use]
    pub fn app_ssh_dir(&self) -> PathBuf {
        self.app_home.join(".ssh")
    }

    /// Home directory of the administrative account.
    #[must_use]
    pub fn admin_home(&self) -> PathBuf {
        if self.admin_user == "root" {
            PathBuf::from("/root")
        } else {
            Path::new("/home").join(&self.admin_user)
        }
    }

    /// `user:group` pair for chown; the app account's group shares its name.
    #[must_use]
    pub fn app_owner(&self) -> String {
        format!("{0}:{0}", self.app_user)
    }
}

/// Parse the contents of a sourced `KEY=VALUE` variable file.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is
/// accepted, and one layer of matching single or double quotes is stripped.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvLine`] for a line without `=`.
pub fn parse_env_lines(source_name: &str, text: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut entries = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::InvalidEnvLine {
                source_name: source_name.to_string(),
                line: idx + 1,
                content: raw.to_string(),
            });
        };
        entries.push((key.trim().to_string(), unquote(value.trim()).to_string()));
    }
    Ok(entries)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
