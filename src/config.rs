//! Environment-driven client configuration.

/// Where the voting service lives and which language bundle to load first.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL for REST calls, without trailing slash.
    pub api_base: String,
    /// WebSocket endpoint for the live results channel.
    pub ws_url: String,
    /// Initial language for the translation bundle.
    pub lang: String,
}

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080/ws";
pub const DEFAULT_LANG: &str = "en";

impl Config {
    /// Load config from environment variables, falling back to the local
    /// development defaults. Empty values count as unset.
    pub fn from_env() -> Self {
        let api_base = env_or("POLLBOX_API_BASE", DEFAULT_API_BASE);
        let ws_url = env_or("POLLBOX_WS_URL", DEFAULT_WS_URL);
        let lang = env_or("POLLBOX_LANG", DEFAULT_LANG);
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            ws_url,
            lang,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}
