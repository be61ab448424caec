//! HTTP transport seam for the dupfind service.
//!
//! # Overview
//!
//! Every component that talks to the server does so through the
//! [`Transport`] trait: three JSON-in/JSON-out verbs, no socket handling
//! anywhere else in the crate. [`HttpTransport`] is the one production
//! implementation, built on a shared `reqwest` client with a configured
//! timeout. Tests substitute their own implementations to script
//! responses and failures.
//!
//! Request targets are joined against the configured base URL, so both
//! path hrefs (`/files/a.jpg`) and absolute hrefs served by the API work:
//! an absolute href replaces the base entirely.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Longest response-body excerpt carried in a status error.
const BODY_SNIPPET_MAX: usize = 200;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request target could not be built from the base URL.
    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The request could not be issued or completed (connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("invalid JSON in response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// The request URL associated with this error.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Request { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. } => url,
        }
    }

    /// The HTTP status code, when the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// JSON request interface consumed by the pager, the delete synchronizer,
/// and resource-bound remote actions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET request with query parameters appended to the target.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError>;

    /// Issue a PUT request with a JSON body.
    async fn put(&self, path: &str, body: &Value) -> Result<Value, TransportError>;

    /// Issue a DELETE request.
    async fn delete(&self, path: &str) -> Result<Value, TransportError>;
}

/// Production transport over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport for the given server with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url).map_err(|source| TransportError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Request {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    /// Join a path or absolute href against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|source| TransportError::InvalidUrl {
                url: path.to_string(),
                source,
            })
    }

    /// Classify the response and decode its JSON body.
    ///
    /// An empty body on success decodes as JSON null; delete responses
    /// are acknowledged without requiring a document.
    async fn decode(url: Url, response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: snippet(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|source| TransportError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TransportError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let url = self.endpoint(path)?;

        log::debug!("PUT {}", url);
        let response = self
            .client
            .put(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn delete(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.endpoint(path)?;

        log::debug!("DELETE {}", url);
        let response = self
            .client
            .delete(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }
}

/// Trim a response body down to an error-message-sized excerpt.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= BODY_SNIPPET_MAX {
        return trimmed.to_string();
    }
    let mut end = BODY_SNIPPET_MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&server.base_url(), Duration::from_secs(2))
            .expect("failed to build transport")
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = HttpTransport::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let body = "x".repeat(BODY_SNIPPET_MAX * 2);
        let cut = snippet(&body);
        assert!(cut.ends_with("..."));
        assert!(cut.len() < body.len());

        assert_eq!(snippet("  short  "), "short");
    }

    #[tokio::test]
    async fn test_get_appends_query_parameters() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/clusters/duplicates")
                .query_param("page", "1")
                .query_param("page_size", "50");
            then.status(200).json_body(json!({"count": 0}));
        });

        let transport = transport_for(&server);
        let body = transport
            .get(
                "/clusters/duplicates",
                &[("page", "1".to_string()), ("page_size", "50".to_string())],
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_classified() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/clusters/duplicates");
            then.status(503).body("overloaded");
        });

        let transport = transport_for(&server);
        let err = transport
            .get("/clusters/duplicates", &[])
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_delete_tolerates_empty_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/files/a.jpg");
            then.status(200);
        });

        let transport = transport_for(&server);
        let body = transport.delete("/files/a.jpg").await.unwrap();

        mock.assert();
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/clusters/duplicates");
            then.status(200).body("{not json");
        });

        let transport = transport_for(&server);
        let err = transport
            .get("/clusters/duplicates", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Decode { .. }));
        assert!(err.status().is_none());
    }

    #[tokio::test]
    async fn test_put_sends_json_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/files/a.jpg")
                .json_body(json!({"selected": true}));
            then.status(200).json_body(json!({"ok": true}));
        });

        let transport = transport_for(&server);
        let body = transport
            .put("/files/a.jpg", &json!({"selected": true}))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_absolute_href_replaces_base() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/files/elsewhere.jpg");
            then.status(200).json_body(json!({}));
        });

        // Base points at a host that is never contacted.
        let transport =
            HttpTransport::new("http://192.0.2.1:9", Duration::from_secs(2)).unwrap();
        let absolute = format!("{}/files/elsewhere.jpg", server.base_url());
        transport.delete(&absolute).await.unwrap();

        mock.assert();
    }
}
