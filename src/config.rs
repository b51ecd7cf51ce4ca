use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEARCH_PATH: &str = "/api/files/search";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub search_path: String,
    pub session_cookie: Option<String>,
    pub debounce: Duration,
    pub limit: u32,
    pub threshold: f32,
    pub request_timeout: Duration,
    pub dev_bind_addr: String,
    pub dev_catalog_path: Option<String>,
    pub dev_session_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: "http://localhost:8080".to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            session_cookie: None,
            debounce: Duration::from_millis(300),
            limit: 8,
            threshold: 0.3,
            request_timeout: Duration::from_millis(10_000),
            dev_bind_addr: "127.0.0.1:8080".to_string(),
            dev_catalog_path: None,
            dev_session_token: None,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the environment.
    pub fn load() -> Result<Config> {
        dotenv().ok();
        Self::from_env().context("invalid search configuration")
    }

    /// Build a config from the process environment. Missing keys take their
    /// defaults; present but malformed numeric keys are an error.
    pub fn from_env() -> Result<Config> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            api_base: get("PORTAL_API_BASE").unwrap_or(defaults.api_base),
            search_path: get("PORTAL_SEARCH_PATH").unwrap_or(defaults.search_path),
            session_cookie: get("PORTAL_SESSION_COOKIE"),
            debounce: get_parsed::<u64>(&get, "SEARCH_DEBOUNCE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            limit: get_parsed(&get, "SEARCH_LIMIT")?.unwrap_or(defaults.limit),
            threshold: get_parsed(&get, "SEARCH_THRESHOLD")?.unwrap_or(defaults.threshold),
            request_timeout: get_parsed::<u64>(&get, "SEARCH_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            dev_bind_addr: get("DEV_BIND_ADDR").unwrap_or(defaults.dev_bind_addr),
            dev_catalog_path: get("DEV_CATALOG_PATH"),
            dev_session_token: get("DEV_SESSION_TOKEN"),
        })
    }
}

fn get_parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {raw:?}"))
        })
        .transpose()
}
