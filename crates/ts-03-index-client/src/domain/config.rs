//! Index client configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default message index.
pub const DEFAULT_API_URL: &str = "https://api3.aleph.im";

/// Default scheduler.
pub const DEFAULT_SCHEDULER_URL: &str = "https://scheduler.api.aleph.cloud";

/// Endpoints and HTTP limits for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Message index base URL, no trailing slash
    pub api_url: String,

    /// Scheduler base URL, no trailing slash
    pub scheduler_url: String,

    /// Whole-request timeout
    pub request_timeout: Duration,

    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,

    /// Page size used when enumerating messages
    pub page_size: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            scheduler_url: DEFAULT_SCHEDULER_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            page_size: 50,
        }
    }
}

impl IndexConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TS_API_URL`: Message index (default: https://api3.aleph.im)
    /// - `TS_SCHEDULER_URL`: Scheduler (default: https://scheduler.api.aleph.cloud)
    /// - `TS_HTTP_TIMEOUT_SECS`: Request timeout (default: 30)
    /// - `TS_HTTP_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 10)
    /// - `TS_PAGE_SIZE`: Messages per page (default: 50)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_url: env::var("TS_API_URL")
                .map(|v| trim_url(&v))
                .unwrap_or(defaults.api_url),

            scheduler_url: env::var("TS_SCHEDULER_URL")
                .map(|v| trim_url(&v))
                .unwrap_or(defaults.scheduler_url),

            request_timeout: env_secs("TS_HTTP_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),

            connect_timeout: env_secs("TS_HTTP_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),

            page_size: env::var("TS_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.page_size),
        }
    }

    /// Same configuration pointed at other hosts (test servers, mirrors).
    pub fn with_urls(api_url: &str, scheduler_url: &str) -> Self {
        Self {
            api_url: trim_url(api_url),
            scheduler_url: trim_url(scheduler_url),
            ..Self::default()
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn env_secs(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert_eq!(config.api_url, "https://api3.aleph.im");
        assert_eq!(config.scheduler_url, "https://scheduler.api.aleph.cloud");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_with_urls_strips_trailing_slash() {
        let config = IndexConfig::with_urls("http://127.0.0.1:4000/", "http://127.0.0.1:4001//");
        assert_eq!(config.api_url, "http://127.0.0.1:4000");
        assert_eq!(config.scheduler_url, "http://127.0.0.1:4001");
    }
}
