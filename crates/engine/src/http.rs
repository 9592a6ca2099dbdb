//! HTTP transport contract.
//!
//! The executor only ever sees this narrow interface; the real
//! transport is [`ReqwestClient`], tests substitute mocks.

use async_trait::async_trait;

use crate::request::ResolvedRequest;

/// Transport-level failure. Response status is not an error at this
/// layer — callers inspect [`HttpResponse::status`].
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status falls in the accepted 200–399 window.
    pub fn is_acceptable(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// The request contract consumed by fetch and curl steps.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: &ResolvedRequest) -> Result<HttpResponse, HttpError>;
}

/// Reqwest-backed transport (connection pooling via the shared client).
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, request: &ResolvedRequest) -> Result<HttpResponse, HttpError> {
        let method: reqwest::Method = request
            .method
            .parse()
            .map_err(|_| HttpError::InvalidRequest(format!("bad method `{}`", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptable_status_window() {
        assert!(HttpResponse { status: 200, body: String::new() }.is_acceptable());
        assert!(HttpResponse { status: 302, body: String::new() }.is_acceptable());
        assert!(!HttpResponse { status: 404, body: String::new() }.is_acceptable());
        assert!(!HttpResponse { status: 199, body: String::new() }.is_acceptable());
        assert!(!HttpResponse { status: 500, body: String::new() }.is_acceptable());
    }
}
