//! HTTP transport abstraction for the API client.
//!
//! The client talks to the network through the `HttpTransport` trait so the
//! refresh-and-retry protocol can be exercised in tests with a scripted
//! transport. `ReqwestTransport` is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

/// HTTP request timeout in seconds.
/// The upstream service can be slow to answer detail calls; 30s fails fast
/// enough for a polling integration.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A fully read HTTP response: status plus body text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn with_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Parse the body as JSON, mapping parse failures to `InvalidResponse`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {e}")))
    }
}

/// Transport seam between the API client and the network.
///
/// Transport-level failures (DNS, connection reset, timeout) surface as
/// `ApiError::Network`, never as an authentication failure.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ApiError>;
}

/// Production transport backed by `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = self.client.request(method, url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Token {
        access: String,
    }

    #[test]
    fn test_json_parses_body() {
        let response = HttpResponse::ok(r#"{"access":"abc"}"#);
        let token: Token = response.json().expect("valid body should parse");
        assert_eq!(token.access, "abc");
    }

    #[test]
    fn test_json_maps_parse_failure_to_invalid_response() {
        let response = HttpResponse::ok("not json");
        let err = response.json::<Token>().expect_err("parse should fail");
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert!(!err.is_authentication());
    }
}
