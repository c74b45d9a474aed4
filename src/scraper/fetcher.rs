//! HTTP request executor
//!
//! This module performs single outbound page fetches:
//! - Building the HTTP client with the configured identity headers
//! - Turning non-2xx responses into `HttpStatus` errors
//! - Classifying connection problems and timeouts as transient
//!
//! It never retries; the source scraper decides what to retry.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::{IngestError, Result};

/// Fetches the body of a page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body
    ///
    /// # Errors
    ///
    /// * `IngestError::HttpStatus` - The server answered with a non-2xx status
    /// * `IngestError::Timeout` / `IngestError::Network` - Transient failures
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Builds an HTTP client with the configured identity
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`PageFetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

/// Maps a reqwest error onto the transient error kinds
fn classify_error(url: &str, error: reqwest::Error) -> IngestError {
    if error.is_timeout() {
        IngestError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        IngestError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else if error.is_builder() {
        IngestError::Client(error)
    } else {
        IngestError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> HttpConfig {
        HttpConfig {
            user_agent: "TestSifter/1.0".to_string(),
            ..HttpConfig::default()
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success_sends_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs"))
            .and(header("user-agent", "TestSifter/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
        let body = fetcher
            .fetch(&format!("{}/jobs", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        match err {
            IngestError::HttpStatus {
                status,
                status_text,
                ..
            } => {
                assert_eq!(status, 503);
                assert_eq!(status_text, "Service Unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!IngestError::HttpStatus {
            url: String::new(),
            status: 503,
            status_text: String::new()
        }
        .is_transient());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transient() {
        // Bind and immediately release a port so nothing listens on it
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let fetcher = HttpFetcher::new(&create_test_config()).unwrap();
        let err = fetcher
            .fetch(&format!("http://127.0.0.1:{}/", port))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {err:?}");
    }
}
