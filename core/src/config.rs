//! Client configuration loaded from the environment.

use std::time::Duration;

use crate::error::ApiError;

pub const ENV_BASE_URL: &str = "MEMOBASE_URL";
pub const ENV_API_KEY: &str = "MEMOBASE_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "MEMOBASE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Overall per-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout: None,
        }
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ApiError::Config(format!("{key} is not set")))
        };
        let base_url = required(ENV_BASE_URL)?;
        let api_key = required(ENV_API_KEY)?;
        let timeout = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| {
                        ApiError::Config(format!(
                            "{ENV_TIMEOUT_SECS} must be whole seconds, got {raw:?}"
                        ))
                    })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };
        Ok(Self {
            base_url,
            api_key,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn loads_required_values() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8019"),
            (ENV_API_KEY, "secret"),
        ]))
        .unwrap();
        assert_eq!(config, ClientConfig::new("http://localhost:8019", "secret"));
    }

    #[test]
    fn parses_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8019"),
            (ENV_API_KEY, "secret"),
            (ENV_TIMEOUT_SECS, "30"),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "http://localhost:8019")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(ref msg) if msg.contains(ENV_API_KEY)));
    }

    #[test]
    fn bad_timeout_is_config_error() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8019"),
            (ENV_API_KEY, "secret"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
