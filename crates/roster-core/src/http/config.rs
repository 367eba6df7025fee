//! Client configuration and backend origin resolution

use crate::error::{Error, Result};
use crate::http::retry::{ReauthPolicy, RetryPolicy};
use serde::{Deserialize, Serialize};
use url::Url;

/// Production backend used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str =
    "https://rosterapp-481614-service-641848433310.europe-west3.run.app";

/// Environment variable overriding the backend origin
pub const BACKEND_URL_ENV: &str = "ROSTER_BACKEND_BASE_URL";

/// Configuration for the API client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin; falls back to the environment, then the default
    pub base_url: Option<String>,
    /// Request timeout in seconds, enforced by the HTTP client
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Retry policy for transport failures
    pub retry_policy: RetryPolicy,
    /// Behaviour after the backend rejects the credential
    pub reauth_policy: ReauthPolicy,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retry_policy: RetryPolicy::default(),
            reauth_policy: ReauthPolicy::default(),
            user_agent: format!("roster-core/{}", crate::VERSION),
        }
    }
}

impl ClientConfig {
    /// Set an explicit backend origin
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_reauth_policy(mut self, policy: ReauthPolicy) -> Self {
        self.reauth_policy = policy;
        self
    }

    pub fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Backend origin without a trailing slash
    ///
    /// Precedence: explicit `base_url`, then [`BACKEND_URL_ENV`], then
    /// [`DEFAULT_BACKEND_URL`]. Empty values are ignored.
    pub fn resolve_base_url(&self) -> Result<String> {
        let candidate = self
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                std::env::var(BACKEND_URL_ENV)
                    .ok()
                    .filter(|url| !url.trim().is_empty())
            })
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        normalize_base_url(&candidate)
    }
}

/// Validate an origin and strip trailing slashes
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');

    let parsed = Url::parse(trimmed).map_err(|e| Error::Configuration {
        message: format!("Invalid backend URL '{}'", raw),
        source: Some(e.into()),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration(format!(
            "Backend URL '{}' must use http or https",
            raw
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.retry_policy.max_retries, 3);
        assert_eq!(config.reauth_policy, ReauthPolicy::Propagate);
        assert!(config.user_agent.starts_with("roster-core/"));
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = ClientConfig::default().with_base_url("http://localhost:8080/");
        assert_eq!(config.resolve_base_url().unwrap(), "http://localhost:8080");
    }

    #[test]
    fn test_strips_every_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1//").unwrap(),
            "https://api.example.com/v1"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        let err = normalize_base_url("not a url").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_rejects_other_schemes() {
        let err = normalize_base_url("ftp://files.example.com").unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = ClientConfig::default().with_base_url("   ");
        let resolved = config.resolve_base_url().unwrap();
        assert!(!resolved.trim().is_empty());
        assert!(!resolved.ends_with('/'));
    }

    #[test]
    fn test_default_backend_is_valid() {
        assert_eq!(normalize_base_url(DEFAULT_BACKEND_URL).unwrap(), DEFAULT_BACKEND_URL);
    }
}
