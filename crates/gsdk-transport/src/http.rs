//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpResponse, Transport, TransportError};

/// How long one heartbeat exchange may take before it is abandoned.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`Transport`] that PATCHes JSON to the agent over plain HTTP.
///
/// Every request carries `Content-Type: application/json; charset=utf-8`
/// and `Accept: application/json`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Builds a transport whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        tracing::debug!(?timeout, "HTTP transport ready");
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn patch(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .patch(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=utf-8",
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.to_owned(),
                }
            } else {
                TransportError::InvalidResponse(e.to_string())
            }
        })?;

        tracing::trace!(url, status, len = body.len(), "heartbeat exchange done");
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
            content_length,
        })
    }
}

fn request_error(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_owned(),
        }
    } else {
        TransportError::RequestFailed {
            url: url.to_owned(),
            reason: error.to_string(),
        }
    }
}
