//! Process configuration from the environment
//!
//! An optional `.env` file is loaded first; variables already set in the
//! environment take precedence over it.

use crate::agent::DEFAULT_MAX_STEPS;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(300);

/// Load `KEY=value` pairs from the first `.env` found into the environment.
///
/// Looks in the current directory, then the crate root. Returns the file
/// that was loaded, if any.
///
/// Mutates the process environment: call it from `main` before the async
/// runtime starts any threads.
pub fn load_dotenv() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from(".env"),
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env"),
    ];

    for path in candidates {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            let updates = dotenv_updates(&contents, |key| std::env::var_os(key).is_some());
            for (key, value) in updates {
                std::env::set_var(key, value);
            }
            return Some(path);
        }
    }
    None
}

/// Pairs from `contents` that are not already set
fn dotenv_updates(contents: &str, is_set: impl Fn(&str) -> bool) -> Vec<(String, String)> {
    parse_dotenv(contents)
        .into_iter()
        .filter(|(key, _)| !is_set(key))
        .collect()
}

/// Parse `.env` contents. Blank lines and `#` comments are skipped, an
/// optional `export ` prefix is accepted and matching quotes are stripped.
pub fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("TRAVEL_AGENT_HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parsed(&lookup, "TRAVEL_AGENT_PORT").unwrap_or(defaults.port),
        }
    }
}

/// Per-turn limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on one whole agent call
    pub turn_timeout: Duration,
    /// LLM rounds the agent may take in one turn
    pub max_steps: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            turn_timeout: parsed::<u64>(&lookup, "TRAVEL_AGENT_TURN_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map_or(defaults.turn_timeout, Duration::from_secs),
            max_steps: parsed::<usize>(&lookup, "TRAVEL_AGENT_MAX_STEPS")
                .filter(|steps| *steps > 0)
                .unwrap_or(defaults.max_steps),
        }
    }
}
