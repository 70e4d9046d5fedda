//! Application configuration for docbinder.
//!
//! User config lives at `~/.docbinder/docbinder.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocbinderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docbinder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docbinder";

// ---------------------------------------------------------------------------
// Config structs (matching docbinder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote service settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Compilation defaults.
    #[serde(default)]
    pub compile: CompileSection,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the knowledge-base API.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://app.getoutline.com/api".into()
}
fn default_api_key_env() -> String {
    "OUTLINE_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[compile]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileSection {
    /// Maximum concurrent document fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for CompileSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            output: default_output(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}
fn default_output() -> String {
    "outline_compilation.html".into()
}

// ---------------------------------------------------------------------------
// Compile config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one compilation run.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Validated API base URL.
    pub api_url: Url,
    /// Bearer token.
    pub api_key: String,
    /// Collection to compile.
    pub collection_id: String,
    /// Where the CLI writes the assembled HTML.
    pub output: PathBuf,
    /// Maximum concurrent document fetches (at least 1).
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl CompileConfig {
    /// Check the invariants the core relies on: non-empty credentials and
    /// identifiers, and a usable concurrency level.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(DocbinderError::config("API key is empty"));
        }
        if self.collection_id.trim().is_empty() {
            return Err(DocbinderError::config("collection id is empty"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(DocbinderError::config("output path is empty"));
        }
        if self.concurrency == 0 {
            return Err(DocbinderError::config("concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Parse an API base URL and require an http(s) scheme.
pub fn validate_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| DocbinderError::config(format!("invalid API URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DocbinderError::config(format!(
            "API URL must use http or https, got '{other}'"
        ))),
    }
}

/// Resolve the API key: an explicit value wins, otherwise the env var named
/// in `[api].api_key_env` is read.
pub fn resolve_api_key(config: &AppConfig, explicit: Option<&str>) -> Result<String> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    let var_name = &config.api.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DocbinderError::config(format!(
            "API key not found. Pass --api-key or set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docbinder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocbinderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docbinder/docbinder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocbinderError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocbinderError::config(format!("failed to parse {}: {e}", path.display()))
    })
}
