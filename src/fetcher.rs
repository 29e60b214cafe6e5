use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use tracing::debug;

use crate::error::{Result, ScrapeError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Source of directory page bodies.
pub trait PageFetcher {
    fn fetch(&self, url: &Url) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Plain HTTP GET, one request per page, no retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScrapeError::InvalidRequest(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| ScrapeError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::fetch(url.as_str(), format!("HTTP {status}")));
        }

        response
            .text()
            .map_err(|e| ScrapeError::fetch(url.as_str(), e))
    }
}

/// Serves page bodies from memory and remembers what was asked for.
#[derive(Debug, Default)]
pub struct StaticPages {
    pages: HashMap<String, String>,
    requested: RefCell<Vec<String>>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: &str, body: impl Into<String>) {
        let key = Url::parse(url)
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        self.pages.insert(key, body.into());
    }

    /// URLs fetched so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl PageFetcher for StaticPages {
    fn fetch(&self, url: &Url) -> Result<String> {
        self.requested.borrow_mut().push(url.to_string());
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ScrapeError::fetch(url.as_str(), "HTTP 404 Not Found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pages_serves_and_records() {
        let pages = StaticPages::new().with_page("https://example.com/a", "<html>a</html>");

        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://example.com/b").unwrap();

        assert_eq!(pages.fetch(&a).unwrap(), "<html>a</html>");
        assert!(matches!(pages.fetch(&b), Err(ScrapeError::Fetch { .. })));
        assert_eq!(
            pages.requested(),
            vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()]
        );
    }

    #[test]
    fn test_http_fetcher_builds_with_defaults() {
        assert!(HttpFetcher::new(&FetcherConfig::default()).is_ok());
    }
}
