//! HTTP fetch client for manifest resources.
//!
//! Unlike a scraping pipeline, the serving policies must see non-2xx
//! responses as values rather than errors: a failed page is surfaced to the
//! caller uncached. Only transport-level failures (DNS, connect, timeout,
//! body read) become `Error::Network`.

use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

use appshell_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "appshell/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "appshell/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// A fetched resource: status and body, ok or not.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// The URL requested.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response body bytes.
    pub body: Bytes,
    /// Time taken to fetch in milliseconds.
    pub fetch_ms: u64,
}

impl FetchedResource {
    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert into a cache entry keyed by the request URL.
    pub fn into_cached(self) -> appshell_core::CachedResponse {
        appshell_core::CachedResponse {
            key: self.url,
            status: self.status,
            content_type: self.content_type,
            body: self.body.to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Seam over the network so policies are testable with a fake fetcher.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync {
    /// Perform a GET request.
    async fn get(&self, url: &str) -> Result<FetchedResource, Error>;

    /// Perform a GET request that bypasses intermediary HTTP caches.
    ///
    /// Used for install-time staging so shell files always come from the
    /// newest deploy.
    async fn get_fresh(&self, url: &str) -> Result<FetchedResource, Error>;
}

/// Reqwest-backed fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn request(&self, url: &str, bypass_cache: bool) -> Result<FetchedResource, Error> {
        let start = Instant::now();

        let mut request = self.http.get(url);
        if bypass_cache {
            request = request.header(header::CACHE_CONTROL, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("network error: {}", e)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::Network(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::Network(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, status, fetch_ms, body.len());

        Ok(FetchedResource { url: url.to_string(), status, content_type, body, fetch_ms })
    }
}

#[async_trait::async_trait]
impl Fetch for FetchClient {
    async fn get(&self, url: &str) -> Result<FetchedResource, Error> {
        self.request(url, false).await
    }

    async fn get_fresh(&self, url: &str) -> Result<FetchedResource, Error> {
        self.request(url, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "appshell/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_resource_is_ok_range() {
        let mut resource = FetchedResource {
            url: "https://app.example.com/a.js".into(),
            status: 200,
            content_type: None,
            body: Bytes::new(),
            fetch_ms: 1,
        };
        assert!(resource.is_ok());
        resource.status = 299;
        assert!(resource.is_ok());
        resource.status = 304;
        assert!(!resource.is_ok());
        resource.status = 404;
        assert!(!resource.is_ok());
    }

    #[test]
    fn test_into_cached_keys_by_url() {
        let resource = FetchedResource {
            url: "https://app.example.com/a.js".into(),
            status: 200,
            content_type: Some("application/javascript".into()),
            body: Bytes::from_static(b"js"),
            fetch_ms: 1,
        };
        let entry = resource.into_cached();
        assert_eq!(entry.key, "https://app.example.com/a.js");
        assert_eq!(entry.body, b"js");
        assert!(entry.is_ok());
    }
}
