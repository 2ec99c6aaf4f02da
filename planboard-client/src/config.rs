/// Configuration for the planboard client.
/// Reads client.json from ~/.config/planboard/client.json (or platform equivalent),
/// then applies environment overrides.
use planboard_core::config::TerminalTitles;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "PLANBOARD_API_URL";
pub const ENV_CHAT_MODEL: &str = "PLANBOARD_CHAT_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub terminal_titles: TerminalTitles,
}

fn default_api_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            chat_model: default_chat_model(),
            request_timeout_secs: default_request_timeout_secs(),
            terminal_titles: TerminalTitles::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(model) = lookup(ENV_CHAT_MODEL).filter(|v| !v.trim().is_empty()) {
            self.chat_model = model.trim().to_string();
        }
    }

    /// API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Default config path: ~/.config/planboard/client.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planboard")
        .join("client.json")
}

/// Load config from path. Returns default if file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> ClientConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[planboard.config] Failed to parse config {}: {}", path.display(), e);
            ClientConfig::default()
        }),
        Err(_) => {
            log::info!("[planboard.config] No config at {}, using defaults", path.display());
            ClientConfig::default()
        }
    }
}

/// Load `.env` (if any), the config file, then environment overrides.
pub fn resolve(path: Option<&Path>) -> ClientConfig {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("[planboard.config] Failed to read .env: {}", e);
        }
    }
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let mut config = load_config(&path);
    config.apply_overrides(|key| std::env::var(key).ok());
    config
}
