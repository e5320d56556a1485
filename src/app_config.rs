//! Config for mailtidy (API endpoint, credentials, retry policy, doctor window).
//!
//! Reads `<root>/mailtidy.toml`, falling back to {user_config_dir}/mailtidy/config.toml.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gmail::client::DEFAULT_API_BASE;
use crate::migration::retry::RetryPolicy;
use crate::resolve;
use crate::util::run_shell;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    pub api_base: String,
    pub access_token: String,
    pub access_token_cmd: String,
    pub timeout_secs: u64,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            access_token: String::new(),
            access_token_cmd: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff_secs: 15,
            max_backoff_secs: 60,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts.max(1),
            initial_backoff: Duration::from_secs(self.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorConfig {
    pub lookback_hours: i64,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self { lookback_hours: 72 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gmail: GmailConfig,
    pub retry: RetryConfig,
    pub doctor: DoctorConfig,
}

/// Return the OS-native mailtidy config directory.
pub fn app_config_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "mailtidy") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        resolve::home_dir().join(".config").join("mailtidy")
    }
}

/// Parse a config file.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

/// Load config from the workspace, then the user config dir, else defaults.
pub fn load(root: &Path) -> Result<AppConfig> {
    let local = root.join(resolve::CONFIG_TOML);
    if local.exists() {
        return load_from(&local);
    }
    let global = app_config_dir().join("config.toml");
    if global.exists() {
        return load_from(&global);
    }
    Ok(AppConfig::default())
}

/// Resolve the bearer token: MAILTIDY_ACCESS_TOKEN, inline value, then access_token_cmd.
pub fn resolve_access_token(config: &GmailConfig) -> Result<String> {
    if let Ok(env) = std::env::var("MAILTIDY_ACCESS_TOKEN") {
        if !env.trim().is_empty() {
            return Ok(env.trim().to_string());
        }
    }
    if !config.access_token.is_empty() {
        return Ok(config.access_token.clone());
    }
    if !config.access_token_cmd.is_empty() {
        let (stdout, stderr, code) = run_shell(&config.access_token_cmd)?;
        if code != 0 {
            bail!("access_token_cmd failed (exit {}): {}", code, stderr.trim());
        }
        let token = stdout.trim().to_string();
        if token.is_empty() {
            bail!("access_token_cmd printed an empty token");
        }
        return Ok(token);
    }
    bail!(
        "No Gmail access token configured.\n\
         Set MAILTIDY_ACCESS_TOKEN, or access_token / access_token_cmd under [gmail] in {}",
        resolve::CONFIG_TOML
    )
}
