//! Transport seam between the core and its networking collaborator.
//!
//! The core fetches request payloads and posts responses as raw bytes; it
//! never retries. Failures carry a `retryable` flag classified from the HTTP
//! status so the external caller can apply its own retry policy.

use anyhow::Context;
use async_trait::async_trait;
use http::{Request, Response, StatusCode};

/// Generic HTTP client.
///
/// A trait is used here so to facilitate native HTTP/TLS when compiled for
/// mobile applications.
#[async_trait]
pub trait AsyncHttpClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> anyhow::Result<Response<Vec<u8>>>;
}

/// A networking failure, classified for the caller's retry policy.
#[derive(Debug, thiserror::Error)]
#[error("request to `{url}` failed{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct NetworkError {
    pub url: String,
    pub status: Option<StatusCode>,
    pub message: String,
    /// Whether retrying with the same inputs could plausibly succeed:
    /// server errors and timeouts are retryable, client errors are not.
    pub retryable: bool,
}

impl NetworkError {
    /// Classify a non-2xx response.
    pub fn from_status(url: impl Into<String>, status: StatusCode, body: &[u8]) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            message: String::from_utf8_lossy(body).into_owned(),
            retryable: is_retryable(status),
        }
    }

    /// A transport-level failure with no response, e.g. a timeout.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            message: message.into(),
            retryable: true,
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

pub(crate) fn base_request() -> http::request::Builder {
    Request::builder().header("Prefer", "VerifiedIdWallet-0.1")
}

#[derive(Debug)]
pub struct ReqwestClient(reqwest::Client);

impl AsRef<reqwest::Client> for ReqwestClient {
    fn as_ref(&self) -> &reqwest::Client {
        &self.0
    }
}

impl ReqwestClient {
    pub fn new() -> anyhow::Result<Self> {
        reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("unable to build http_client")
            .map(Self)
    }
}

#[async_trait]
impl AsyncHttpClient for ReqwestClient {
    async fn execute(&self, request: Request<Vec<u8>>) -> anyhow::Result<Response<Vec<u8>>> {
        let response = self
            .0
            .execute(request.try_into().context("unable to convert request")?)
            .await
            .context("http request failed")?;

        let mut builder = Response::builder()
            .status(response.status())
            .version(response.version());

        builder
            .headers_mut()
            .context("unable to set headers")?
            .extend(response.headers().clone());

        builder
            .body(
                response
                    .bytes()
                    .await
                    .context("failed to extract response body")?
                    .to_vec(),
            )
            .context("unable to construct response")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }

    #[test]
    fn network_error_carries_flag() {
        let err = NetworkError::from_status(
            "https://issuer.example.com/contract",
            StatusCode::BAD_GATEWAY,
            b"upstream down",
        );
        assert!(err.retryable);

        let err = NetworkError::from_status(
            "https://issuer.example.com/contract",
            StatusCode::FORBIDDEN,
            b"nope",
        );
        assert!(!err.retryable);

        assert!(NetworkError::transport("https://x.example", "timed out").retryable);
    }
}
