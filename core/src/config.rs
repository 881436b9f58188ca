//! Client configuration.
//!
//! # Design
//! `Config` is plain data apart from the per-action log level overrides,
//! which live behind an `RwLock` so they can be adjusted through a shared
//! client while other threads are invoking actions.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.uspeedo.com/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;

/// Verbosity used to filter the events emitted for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Whether an event at `event` passes a threshold of `self`.
    pub fn allows(self, event: LogLevel) -> bool {
        event >= self
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Settings shared by every action a client invokes.
#[derive(Debug)]
pub struct Config {
    /// URL of the backend API; every action is posted here.
    pub base_url: String,
    /// Appended to the library's own user agent, e.g. `"Terraform/0.10.1"`.
    pub user_agent: String,
    /// Upper bound for a single request.
    pub timeout: Duration,
    /// Additional attempts after a network failure or timeout. 0 disables
    /// retrying.
    pub max_retries: u32,
    /// Largest response body `HttpTransport` reads, in bytes.
    pub max_body_size: u64,
    /// Threshold used for actions without an override.
    pub log_level: LogLevel,
    action_levels: RwLock<HashMap<String, LogLevel>>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_level: LogLevel::Warn,
            action_levels: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// The log threshold for `action`: its override if one was set,
    /// otherwise `log_level`.
    pub fn action_level(&self, action: &str) -> LogLevel {
        self.action_levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(action)
            .copied()
            .unwrap_or(self.log_level)
    }

    pub fn set_action_level(&self, action: &str, level: LogLevel) {
        self.action_levels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(action.to_string(), level);
    }

    /// The `User-Agent` header value: the library's own identifier followed
    /// by `user_agent`, if any.
    pub fn full_user_agent(&self) -> String {
        let base = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
        if self.user_agent.is_empty() {
            base.to_string()
        } else {
            format!("{base} {}", self.user_agent)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let levels = self
            .action_levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
            max_retries: self.max_retries,
            max_body_size: self.max_body_size,
            log_level: self.log_level,
            action_levels: RwLock::new(levels),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::new();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_retries, 0);
        assert_eq!(cfg.max_body_size, 10 * 1024 * 1024);
        assert_eq!(cfg.log_level, LogLevel::Warn);
        assert!(cfg.user_agent.is_empty());
    }

    #[test]
    fn action_level_falls_back_to_default() {
        let cfg = Config::new().with_log_level(LogLevel::Info);
        assert_eq!(cfg.action_level("AnyAction"), LogLevel::Info);
    }

    #[test]
    fn action_level_override_wins() {
        let cfg = Config::new();
        cfg.set_action_level("SendMessage", LogLevel::Debug);
        assert_eq!(cfg.action_level("SendMessage"), LogLevel::Debug);
        assert_eq!(cfg.action_level("Other"), LogLevel::Warn);

        cfg.set_action_level("SendMessage", LogLevel::Error);
        assert_eq!(cfg.action_level("SendMessage"), LogLevel::Error);
    }

    #[test]
    fn clone_snapshots_overrides() {
        let cfg = Config::new();
        cfg.set_action_level("A", LogLevel::Debug);
        let copy = cfg.clone();
        cfg.set_action_level("B", LogLevel::Debug);
        assert_eq!(copy.action_level("A"), LogLevel::Debug);
        assert_eq!(copy.action_level("B"), LogLevel::Warn);
    }

    #[test]
    fn overrides_can_change_while_shared() {
        let cfg = Arc::new(Config::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cfg = Arc::clone(&cfg);
                std::thread::spawn(move || {
                    let action = format!("Action{i}");
                    cfg.set_action_level(&action, LogLevel::Error);
                    cfg.action_level(&action)
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), LogLevel::Error);
        }
    }

    #[test]
    fn user_agent_suffix_is_appended() {
        let plain = Config::new().full_user_agent();
        assert!(plain.starts_with("action-client/"));
        assert!(!plain.contains(' '));

        let suffixed = Config::new().with_user_agent("Terraform/0.10.1").full_user_agent();
        assert_eq!(suffixed, format!("{plain} Terraform/0.10.1"));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let cfg = Config::new().with_base_url("http://localhost:3000/");
        assert_eq!(cfg.base_url, "http://localhost:3000");
    }

    #[test]
    fn log_level_parses_and_orders() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!(" debug ".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Warn.allows(LogLevel::Error));
        assert!(!LogLevel::Warn.allows(LogLevel::Info));
        assert_eq!(LogLevel::Info.to_string(), "info");
    }

    #[test]
    fn log_level_serde_is_lowercase() {
        let json = serde_json::to_string(&LogLevel::Error).unwrap();
        assert_eq!(json, "\"error\"");
        let back: LogLevel = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(back, LogLevel::Debug);
    }
}
