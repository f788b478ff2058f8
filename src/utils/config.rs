use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TABLE_DATA_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://127.0.0.1:8000`
    pub api_url: Url,
    /// Versioning segment prepended to every endpoint path (may be empty)
    pub api_prefix: String,
    /// Fixed deadline applied to every call
    pub timeout: Duration,
    pub table_data_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default API url is valid"),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            table_data_limit: DEFAULT_TABLE_DATA_LIMIT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so callers (and tests)
    /// are not tied to the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("TOUCHLINK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(&api_url)
            .with_context(|| format!("TOUCHLINK_API_URL is not a valid URL: {}", api_url))?;

        let api_prefix = normalize_prefix(
            &lookup("TOUCHLINK_API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string()),
        );

        let timeout_secs = match lookup("TOUCHLINK_API_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("TOUCHLINK_API_TIMEOUT_SECS must be an integer, got {:?}", raw))?;
                if secs == 0 {
                    bail!("TOUCHLINK_API_TIMEOUT_SECS must be greater than zero");
                }
                secs
            }
            None => DEFAULT_TIMEOUT_SECS,
        };

        let table_data_limit = match lookup("TOUCHLINK_TABLE_DATA_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("TOUCHLINK_TABLE_DATA_LIMIT must be an integer, got {:?}", raw))?,
            None => DEFAULT_TABLE_DATA_LIMIT,
        };

        Ok(ClientConfig {
            api_url,
            api_prefix,
            timeout: Duration::from_secs(timeout_secs),
            table_data_limit,
        })
    }
}

/// Leading slash, no trailing slash; blank means unprefixed.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
