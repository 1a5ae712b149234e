//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

/// Cached sessions outlive a restart for this long by default
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Client configuration for connecting to the CityWatch API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Bearer token to start with (skips sign-in)
    pub token: Option<String>,

    /// How long a locally cached session stays usable
    pub session_ttl: Duration,

    /// Where the cached session blob is kept; `None` keeps nothing on disk
    pub session_path: Option<PathBuf>,

    /// Quiet period before a search keystroke triggers a query
    pub search_debounce: Duration,

    /// Issues per page in the browser
    pub page_size: u32,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            token: None,
            session_ttl: DEFAULT_SESSION_TTL,
            session_path: None,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    /// Zero is treated as one
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.page_size, 6);
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert_eq!(config.session_ttl, Duration::from_secs(604_800));
        assert!(config.session_path.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://api.city.test")
            .with_token("t")
            .with_page_size(0)
            .with_session_path("/tmp/session.json");
        assert_eq!(config.token.as_deref(), Some("t"));
        assert_eq!(config.page_size, 1);
        assert!(config.session_path.is_some());

        let config = ClientConfig::default()
            .with_timeout(Duration::from_secs(3))
            .with_session_ttl(Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.session_ttl, Duration::from_secs(60));
    }
}
