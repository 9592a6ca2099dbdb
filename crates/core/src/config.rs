use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_flag(key: &str) -> bool {
    env_or(key, "false") == "true"
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub sources: SourcesConfig,
    pub slack: SlackConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            runtime: RuntimeConfig::from_env(),
            sources: SourcesConfig::from_env(),
            slack: SlackConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  runtime:  headless={}, single_shot={}, debug={}, tick_secs={}",
            self.runtime.headless,
            self.runtime.single_shot,
            self.runtime.debug,
            self.runtime.tick_secs,
        );
        tracing::info!(
            "  sources:  file={}, remote={}",
            self.sources.list_file.display(),
            self.sources.remote_url.as_deref().unwrap_or("(none)"),
        );
        tracing::info!(
            "  store:    path={}",
            self.runtime.store_file.display(),
        );
        tracing::info!(
            "  slack:    channel={}, configured={}, users={}",
            self.slack.channel,
            self.slack.is_configured(),
            self.slack.users.len(),
        );
    }
}

// ── Runtime flags ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// No desktop notifications or browser launches; listener list is
    /// fetched from the remote URL instead of the local file.
    pub headless: bool,
    /// Run exactly one tick at t=0, flush the store, exit.
    pub single_shot: bool,
    /// Default for per-listener debug logging.
    pub debug: bool,
    /// Logical tick step in seconds.
    pub tick_secs: u64,
    /// Path of the persisted value store.
    pub store_file: PathBuf,
}

impl RuntimeConfig {
    fn from_env() -> Self {
        Self {
            headless: env_flag("HEADLESS"),
            single_shot: env_flag("FUNCTION"),
            debug: env_flag("DEBUG"),
            tick_secs: env_u64("TICK_SECS", 10),
            store_file: PathBuf::from(env_or("STORE_FILE", "store.json")),
        }
    }
}

// ── Listener sources ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Local newline-separated source list.
    pub list_file: PathBuf,
    /// Remote source list, used in headless mode.
    pub remote_url: Option<String>,
}

impl SourcesConfig {
    fn from_env() -> Self {
        Self {
            list_file: PathBuf::from(env_or("LISTENERS_FILE", "listeners.txt")),
            remote_url: env_opt("LISTENERS_URL"),
        }
    }
}

// ── Slack ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    pub token: Option<String>,
    pub channel: String,
    /// Recipient name → Slack user id. Always contains the implicit
    /// `channel` entry so the default recipient resolves.
    pub users: HashMap<String, String>,
}

impl SlackConfig {
    fn from_env() -> Self {
        Self {
            token: env_opt("SLACK_TOKEN"),
            channel: env_or("SLACK_CHANNEL", "general"),
            users: parse_users(&env_or("USERS", "")),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

/// Parse the `USERS` env format: comma-separated `name:id` pairs.
///
/// Malformed entries (no colon, empty name) are skipped with a warning.
/// The implicit `channel:channel` entry is always present.
fn parse_users(raw: &str) -> HashMap<String, String> {
    let mut users = HashMap::new();
    users.insert("channel".to_string(), "channel".to_string());

    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.split_once(':') {
            Some((name, id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
                users.insert(name.trim().to_string(), id.trim().to_string());
            }
            _ => {
                tracing::warn!(entry = %entry, "skipping malformed USERS entry");
            }
        }
    }

    users
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_users_basic() {
        let users = parse_users("alice:U123,bob:U456");
        assert_eq!(users["alice"], "U123");
        assert_eq!(users["bob"], "U456");
        assert_eq!(users["channel"], "channel");
    }

    #[test]
    fn parse_users_empty_keeps_channel() {
        let users = parse_users("");
        assert_eq!(users.len(), 1);
        assert_eq!(users["channel"], "channel");
    }

    #[test]
    fn parse_users_skips_malformed() {
        let users = parse_users("alice:U123,nocolon,:noid,noname:");
        assert_eq!(users.len(), 2);
        assert_eq!(users["alice"], "U123");
    }

    #[test]
    fn parse_users_trims_whitespace() {
        let users = parse_users(" alice : U123 , bob:U456 ");
        assert_eq!(users["alice"], "U123");
        assert_eq!(users["bob"], "U456");
    }
}
