//! Image download over HTTP.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid image URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("image at {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// Where the service gets image bytes from.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Downloads images with a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpImageSource {
    client: Client,
    max_bytes: usize,
}

impl HttpImageSource {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("facematchd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = parse_image_url(url)?;
        let transport = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Transport { url: url.to_string(), source }
            }
        };

        let mut response = self.client.get(parsed).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }

        let too_large = || FetchError::TooLarge { url: url.to_string(), limit: self.max_bytes };
        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong; enforce the cap while streaming.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url, bytes = body.len(), "image downloaded");
        Ok(body)
    }
}

fn parse_image_url(url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl { url: url.to_string(), reason };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(max_bytes: usize) -> HttpImageSource {
        HttpImageSource::new(Duration::from_millis(500), max_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let bytes = source(1024).fetch(&format!("{}/a.jpg", server.uri())).await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing.jpg", server.uri());
        let err = source(1024).fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: StatusCode::NOT_FOUND, .. }));
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains(&url));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let err = source(16).fetch(&format!("{}/big.png", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = source(1024).fetch(&format!("{}/slow.jpg", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = source(1024).fetch(&format!("http://127.0.0.1:{port}/a.jpg")).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_invalid_urls() {
        let src = source(1024);
        for url in ["", "not a url", "ftp://example.com/a.jpg", "file:///etc/passwd"] {
            let err = src.fetch(url).await.unwrap_err();
            assert!(matches!(err, FetchError::InvalidUrl { .. }), "{url}: {err:?}");
        }
    }
}
