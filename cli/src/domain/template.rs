//! Typed rendering of generated artifacts: the deploy script and the two
//! cache daemon config files.
//!
//! Templates are embedded at compile time and rendered with Tera. Parameters
//! are validated before rendering so that an empty value or a value that
//! would escape shell quoting never reaches the output.

use serde::Serialize;
use tera::{Context, Tera};

use crate::domain::config::ProvisionConfig;
use crate::domain::error::TemplateError;

const DEPLOY_SCRIPT: (&str, &str) = ("deploy.sh", include_str!("../../templates/deploy.sh.tera"));
const CACHE_OPTIONS: (&str, &str) = (
    "cache-options",
    include_str!("../../templates/cache-options.tera"),
);
const CACHE_VCL: (&str, &str) = ("default.vcl", include_str!("../../templates/default.vcl.tera"));

/// Permission mode of the generated deploy script.
pub const DEPLOY_SCRIPT_MODE: u32 = 0o755;

/// Characters that would break out of a double-quoted shell string.
const SHELL_UNSAFE: &[char] = &['"', '$', '`', '\\', '\n', '\r'];

// ── Parameters ───────────────────────────────────────────────────────────────

/// Values substituted into the deploy script.
#[derive(Debug, Clone, Serialize)]
pub struct DeployScriptParams {
    pub repo_url: String,
    pub branch: String,
    pub instances: String,
    pub env_file: String,
    pub repo_dir: String,
    pub process_name: String,
    pub entry_point: String,
}

impl DeployScriptParams {
    #[must_use]
    pub fn from_config(cfg: &ProvisionConfig) -> Self {
        Self {
            repo_url: cfg.repo_url.clone(),
            branch: cfg.branch.clone(),
            instances: cfg.instances.to_string(),
            env_file: cfg.env_file.display().to_string(),
            repo_dir: cfg.repo_dir.display().to_string(),
            process_name: cfg.process_name.clone(),
            entry_point: cfg.entry_point.clone(),
        }
    }

    fn validate(&self) -> Result<(), TemplateError> {
        let fields = [
            ("repo_url", &self.repo_url),
            ("branch", &self.branch),
            ("instances", &self.instances),
            ("env_file", &self.env_file),
            ("repo_dir", &self.repo_dir),
            ("process_name", &self.process_name),
            ("entry_point", &self.entry_point),
        ];
        for (field, value) in fields {
            require(field, value)?;
        }
        Ok(())
    }
}

/// Values substituted into the cache daemon configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CacheParams {
    pub cache_port: u16,
    pub backend_port: u16,
    pub cache_memory: String,
    pub vcl_file: String,
}

impl CacheParams {
    #[must_use]
    pub fn from_config(cfg: &ProvisionConfig) -> Self {
        Self {
            cache_port: cfg.cache_port,
            backend_port: cfg.backend_port,
            cache_memory: cfg.cache_memory.clone(),
            vcl_file: cfg.cache_vcl_file.display().to_string(),
        }
    }

    fn validate(&self) -> Result<(), TemplateError> {
        require("cache_memory", &self.cache_memory)?;
        require("vcl_file", &self.vcl_file)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), TemplateError> {
    if value.trim().is_empty() {
        return Err(TemplateError::MissingField(field));
    }
    if value.contains(SHELL_UNSAFE) {
        return Err(TemplateError::UnsafeValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Render the deploy script.
///
/// # Errors
///
/// Returns a [`TemplateError`] if a parameter is empty or unsafe, or if the
/// template references a value that was not supplied.
pub fn render_deploy_script(params: &DeployScriptParams) -> Result<String, TemplateError> {
    params.validate()?;
    render(DEPLOY_SCRIPT, params)
}

/// Render the cache daemon startup options file.
///
/// # Errors
///
/// Returns a [`TemplateError`] if a parameter is empty or rendering fails.
pub fn render_cache_options(params: &CacheParams) -> Result<String, TemplateError> {
    params.validate()?;
    render(CACHE_OPTIONS, params)
}

/// Render the cache backend definition (single backend on localhost).
///
/// # Errors
///
/// Returns a [`TemplateError`] if a parameter is empty or rendering fails.
pub fn render_cache_vcl(params: &CacheParams) -> Result<String, TemplateError> {
    params.validate()?;
    render(CACHE_VCL, params)
}

fn render(template: (&'static str, &str), params: &impl Serialize) -> Result<String, TemplateError> {
    let (name, source) = template;
    let render_err = |e: &tera::Error| TemplateError::Render {
        name,
        message: error_chain(e),
    };

    let mut tera = Tera::default();
    tera.add_raw_template(name, source)
        .map_err(|e| render_err(&e))?;
    let context = Context::from_serialize(params).map_err(|e| render_err(&e))?;
    tera.render(name, &context).map_err(|e| render_err(&e))
}

/// Tera nests the useful message (e.g. "Variable `x` not found") in the
/// source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
