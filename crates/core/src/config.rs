use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

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

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, keeping the default (with a warning) when the
/// value is malformed.
fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("Ignoring {}={:?}: not a valid value", key, v);
            default
        }),
        None => default,
    }
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        Some(other) => {
            warn!("Ignoring {}={:?}: expected true/false", key, other);
            default
        }
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub store: StoreConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCBENCH_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOCBENCH_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        Self {
            store: StoreConfig::from_env_profiled(&p),
            profile: p,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  store:  app={}, auth={}, disk_use={}",
            self.store.app_name,
            self.store.username.is_some(),
            self.store.allow_disk_use
        );
        tracing::info!(
            "  timeouts: connect={}ms, server_selection={}ms",
            self.store.connect_timeout_ms,
            self.store.server_selection_timeout_ms
        );
    }
}

// ── Document store ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub app_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub server_selection_timeout_ms: u64,
    /// Let the engine spill large intermediate sets to disk.
    pub allow_disk_use: bool,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "MONGO_HOST", "localhost"),
            port: profiled_env_parse(p, "MONGO_PORT", 27017),
            app_name: profiled_env_or(p, "MONGO_APP_NAME", "docbench"),
            username: profiled_env_opt(p, "MONGO_USERNAME"),
            password: profiled_env_opt(p, "MONGO_PASSWORD"),
            connect_timeout_ms: profiled_env_parse(p, "MONGO_CONNECT_TIMEOUT_MS", 10_000),
            server_selection_timeout_ms: profiled_env_parse(
                p,
                "MONGO_SERVER_SELECTION_TIMEOUT_MS",
                10_000,
            ),
            allow_disk_use: profiled_env_bool(p, "DOCBENCH_ALLOW_DISK_USE", true),
        }
    }

    /// Point the config at an explicit address (command-line host/port win over env).
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Address-only URI. Credentials are handed to the driver separately so
    /// reserved characters in them never need escaping.
    pub fn connection_string(&self) -> String {
        format!("mongodb://{}:{}/", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────
