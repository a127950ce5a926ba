//! Errors returned by the Alist and Bilibili clients
//!
//! Both vendors wrap their payload in a `{code, message, data}` envelope and
//! answer HTTP 200 for most failures, so a request can fail at three layers:
//! transport, HTTP status, or the envelope's own code.

use thiserror::Error;

/// Upper bound on any body read from a vendor. DASH manifests and
/// caption files are the largest payloads and stay far below it.
pub const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProviderClientError {
    /// The request never got a response
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    /// Envelope code other than success (Alist 200, Bilibili 0)
    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Alist rejected the credentials of a binding
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A host or token that cannot be sent as a header
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Response body of {size} bytes exceeds {MAX_BODY_BYTES}")]
    ResponseTooLarge { size: u64 },
}

/// Read a whole body, refusing anything over [`MAX_BODY_BYTES`].
pub async fn bytes_with_limit(response: reqwest::Response) -> Result<Vec<u8>, ProviderClientError> {
    if let Some(size) = response.content_length().filter(|&len| len > MAX_BODY_BYTES) {
        return Err(ProviderClientError::ResponseTooLarge { size });
    }
    let bytes = response.bytes().await?;
    let size = bytes.len() as u64;
    if size > MAX_BODY_BYTES {
        return Err(ProviderClientError::ResponseTooLarge { size });
    }
    Ok(bytes.to_vec())
}

/// Decode a size-limited JSON body.
pub async fn json_with_limit<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderClientError> {
    let bytes = bytes_with_limit(response).await?;
    serde_json::from_slice(&bytes).map_err(Into::into)
}

/// Turn a 4xx/5xx status into [`ProviderClientError::Http`].
pub fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ProviderClientError> {
    let status = resp.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(ProviderClientError::Http {
            status,
            url: resp.url().to_string(),
        });
    }
    Ok(resp)
}

impl From<reqwest::Error> for ProviderClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ProviderClientError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}
