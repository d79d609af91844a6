use bronto_common::error::{BrontoError, BrontoResult};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "https://api.bronto.com/v4";
pub const DEFAULT_START_DATE: &str = "2017-01-01T00:00:00-00:00";

/// Where bookmarks are persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StateBackend {
    Postgres(String),
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TapConfig {
    pub api_token: String,
    pub endpoint: String,
    pub default_start_date: String,
    pub streams: Vec<String>,
    pub catalog_path: Option<PathBuf>,
    pub state_backend: StateBackend,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl TapConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> BrontoResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let state_backend = match (opt_var("DATABASE_URL"), opt_var("BRONTO_STATE_PATH")) {
            (Some(url), _) => StateBackend::Postgres(url),
            (None, Some(path)) => StateBackend::File(PathBuf::from(path)),
            (None, None) => StateBackend::Memory,
        };

        Ok(Self {
            api_token: get_var("BRONTO_API_TOKEN")?,
            endpoint: get_var_or("BRONTO_ENDPOINT", DEFAULT_ENDPOINT),
            default_start_date: get_var_or("BRONTO_DEFAULT_START_DATE", DEFAULT_START_DATE),
            streams: parse_csv("BRONTO_STREAMS", "inbound_activity")?,
            catalog_path: opt_var("BRONTO_CATALOG_PATH").map(PathBuf::from),
            state_backend,
            max_retries: parse_var("BRONTO_MAX_RETRIES", 3)?,
            timeout_secs: parse_var("BRONTO_TIMEOUT_SECS", 60)?,
        })
    }
}

fn get_var(key: &str) -> BrontoResult<String> {
    env::var(key).map_err(|_| BrontoError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn opt_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> BrontoResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match opt_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| BrontoError::Config(format!("invalid {key}: {e}"))),
        None => Ok(default),
    }
}

/// Parse a comma-separated list from an env var, falling back to `default`.
/// Fails if the var is set but every entry is blank.
fn parse_csv(key: &str, default: &str) -> BrontoResult<Vec<String>> {
    let raw = get_var_or(key, default);

    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return Err(BrontoError::Config(format!(
            "{key} is set but contains no stream names"
        )));
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "BRONTO_API_TOKEN",
        "BRONTO_ENDPOINT",
        "BRONTO_DEFAULT_START_DATE",
        "BRONTO_STREAMS",
        "BRONTO_CATALOG_PATH",
        "BRONTO_STATE_PATH",
        "DATABASE_URL",
        "BRONTO_MAX_RETRIES",
        "BRONTO_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn config_from_env_uses_defaults() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("BRONTO_API_TOKEN", "token-123");

        let cfg = TapConfig::from_env().expect("should parse config");
        assert_eq!(cfg.api_token, "token-123");
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.default_start_date, DEFAULT_START_DATE);
        assert_eq!(cfg.streams, vec!["inbound_activity"]);
        assert_eq!(cfg.state_backend, StateBackend::Memory);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.timeout_secs, 60);

        clear_env();
    }

    #[test]
    fn config_from_env_fails_without_token() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();

        let err = TapConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("BRONTO_API_TOKEN"), "got: {err}");
    }

    #[test]
    fn database_url_wins_over_state_path() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("BRONTO_API_TOKEN", "t");
        env::set_var("BRONTO_STATE_PATH", "/tmp/state.json");
        env::set_var("DATABASE_URL", "postgres://localhost/bronto");

        let cfg = TapConfig::from_env().expect("should parse config");
        assert_eq!(
            cfg.state_backend,
            StateBackend::Postgres("postgres://localhost/bronto".to_owned())
        );

        env::remove_var("DATABASE_URL");
        let cfg = TapConfig::from_env().expect("should parse config");
        assert_eq!(
            cfg.state_backend,
            StateBackend::File(PathBuf::from("/tmp/state.json"))
        );

        clear_env();
    }

    #[test]
    fn streams_are_trimmed() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("BRONTO_API_TOKEN", "t");
        env::set_var("BRONTO_STREAMS", " inbound_activity , outbound_activity,");

        let cfg = TapConfig::from_env().expect("should parse config");
        assert_eq!(cfg.streams, vec!["inbound_activity", "outbound_activity"]);

        clear_env();
    }

    #[test]
    fn blank_streams_fail() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("BRONTO_API_TOKEN", "t");
        env::set_var("BRONTO_STREAMS", " , ");

        let err = TapConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("no stream names"), "got: {err}");

        clear_env();
    }

    #[test]
    fn invalid_retries_fail() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("BRONTO_API_TOKEN", "t");
        env::set_var("BRONTO_MAX_RETRIES", "lots");

        let err = TapConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("BRONTO_MAX_RETRIES"), "got: {err}");

        clear_env();
    }
}
