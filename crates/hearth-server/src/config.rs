//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use hearth_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_TYPING_WINDOW_MS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: unset (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Typing records older than this many milliseconds are hidden.
    /// Env: `TYPING_WINDOW_MS`
    /// Default: `3000`
    pub typing_window_ms: i64,

    /// Whether `/demo/seed` is served.
    /// Env: `DEMO_SEED_ENABLED` (true/false)
    /// Default: `true`
    pub demo_seed_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            typing_window_ms: DEFAULT_TYPING_WINDOW_MS,
            demo_seed_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("TYPING_WINDOW_MS") {
            match val.parse::<i64>() {
                Ok(ms) if ms > 0 => config.typing_window_ms = ms,
                _ => tracing::warn!(value = %val, "Invalid TYPING_WINDOW_MS, using default"),
            }
        }

        if let Some(val) = lookup("DEMO_SEED_ENABLED") {
            config.demo_seed_enabled = val != "false" && val != "0";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.typing_window_ms, 3_000);
        assert!(config.database_path.is_none());
        assert!(config.demo_seed_enabled);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/hearth.db"),
            ("TYPING_WINDOW_MS", "5000"),
            ("DEMO_SEED_ENABLED", "false"),
        ]));
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/hearth.db")));
        assert_eq!(config.typing_window_ms, 5_000);
        assert!(!config.demo_seed_enabled);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_ADDR", "not an addr"),
            ("TYPING_WINDOW_MS", "-4"),
            ("DATABASE_PATH", "  "),
        ]));
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.typing_window_ms, 3_000);
        assert!(config.database_path.is_none());
    }
}
