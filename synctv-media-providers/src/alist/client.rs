//! Alist HTTP Client
//!
//! Pure HTTP client for the Alist API.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT},
    Client,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::types::{AlistResp, FsGetResp, FsListResp, FsOtherResp, LoginData, MeResp};
use crate::error::{check_response, json_with_limit, ProviderClientError};

/// Salt Alist appends before hashing a password for `/api/auth/login/hash`.
const PASSWORD_SALT: &str = "-https://github.com/alist-org/alist";

/// Shared HTTP client for all Alist requests (connection pooling).
/// Redirects are disabled so a host cannot bounce requests elsewhere.
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build Alist shared HTTP client")
});

/// Hash a plaintext password the way Alist expects for hashed login.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(PASSWORD_SALT.as_bytes());
    hex::encode(hasher.finalize())
}

/// Alist HTTP Client
///
/// Provides methods for interacting with the Alist API:
/// - Authentication (`login`, `login_hashed`, `me`)
/// - File operations (`fs/get`, `fs/list`, `fs/other`)
#[derive(Clone)]
pub struct AlistClient {
    host: String,
    token: Option<String>,
    client: Client,
}

impl AlistClient {
    /// Create a new Alist client (reuses shared connection pool)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            token: None,
            client: SHARED_CLIENT.clone(),
        }
    }

    /// Create a new Alist client with token. An empty token means anonymous.
    pub fn with_token(host: impl Into<String>, token: impl Into<String>) -> Self {
        let token = token.into();
        let mut client = Self::new(host);
        if !token.is_empty() {
            client.token = Some(token);
        }
        client
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn build_headers(&self) -> Result<HeaderMap, ProviderClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(ORIGIN, HeaderValue::from_str(&self.host)?);
        headers.insert(REFERER, HeaderValue::from_str(&format!("{}/", self.host))?);

        if let Some(ref token) = self.token {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(token)?);
        }

        Ok(headers)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T, ProviderClientError> {
        let url = format!("{}{endpoint}", self.host);
        debug!(host = %self.host, endpoint, "Alist request");
        let response = self
            .client
            .post(&url)
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .await?;
        Self::unwrap_resp(endpoint, response).await
    }

    async fn unwrap_resp<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderClientError> {
        let response = check_response(response)?;
        let resp: AlistResp<T> = json_with_limit(response).await?;

        if resp.code != 200 {
            warn!(endpoint, code = resp.code, message = %resp.message, "Alist API error");
            return Err(ProviderClientError::Api {
                code: resp.code as i64,
                message: resp.message,
            });
        }

        resp.data
            .ok_or_else(|| ProviderClientError::Parse(format!("Missing data in {endpoint} response")))
    }

    /// Login with a plaintext password. Returns the session token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ProviderClientError> {
        self.login_hashed(username, &hash_password(password)).await
    }

    /// Login with a password already hashed by [`hash_password`].
    pub async fn login_hashed(
        &self,
        username: &str,
        hashed_password: &str,
    ) -> Result<String, ProviderClientError> {
        let body = json!({
            "username": username,
            "password": hashed_password,
        });
        let data: LoginData = self
            .post("/api/auth/login/hash", body)
            .await
            .map_err(|e| match e {
                ProviderClientError::Api { message, .. } => ProviderClientError::Auth(message),
                other => other,
            })?;
        Ok(data.token)
    }

    /// Get current user information. Works anonymously when the guest
    /// account is enabled on the server.
    pub async fn me(&self) -> Result<MeResp, ProviderClientError> {
        let url = format!("{}/api/me", self.host);
        let response = self
            .client
            .get(&url)
            .headers(self.build_headers()?)
            .send()
            .await?;
        Self::unwrap_resp("/api/me", response).await
    }

    /// Get file/folder information
    pub async fn fs_get(&self, path: &str, password: &str) -> Result<FsGetResp, ProviderClientError> {
        let body = json!({
            "path": path,
            "password": password,
        });
        self.post("/api/fs/get", body).await
    }

    /// List directory contents (page is 1-indexed)
    pub async fn fs_list(
        &self,
        path: &str,
        password: &str,
        page: u64,
        per_page: u64,
        refresh: bool,
    ) -> Result<FsListResp, ProviderClientError> {
        let body = json!({
            "path": path,
            "password": password,
            "page": page,
            "per_page": per_page,
            "refresh": refresh,
        });
        self.post("/api/fs/list", body).await
    }

    /// Call a storage-specific method, e.g. `video_preview`
    pub async fn fs_other(
        &self,
        path: &str,
        password: &str,
        method: &str,
    ) -> Result<FsOtherResp, ProviderClientError> {
        let body = json!({
            "path": path,
            "password": password,
            "method": method,
        });
        self.post("/api/fs/other", body).await
    }
}
