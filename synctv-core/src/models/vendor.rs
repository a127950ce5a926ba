//! Per-user vendor account bindings

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::id::UserId;

/// Derive the stable server id of an Alist host: first 16 hex chars of `sha256(host)`.
#[must_use]
pub fn alist_server_id(host: &str) -> String {
    let digest = Sha256::digest(host.trim_end_matches('/').as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(16);
    id
}

/// An Alist server a user has bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlistVendor {
    pub user_id: UserId,
    pub server_id: String,
    pub backend: String,
    pub host: String,
    /// Empty for anonymous (guest) access.
    pub username: String,
    /// Already salted and hashed for `/api/auth/login/hash`.
    #[serde(default, skip_serializing)]
    pub hashed_password: String,
}

impl AlistVendor {
    /// Build a binding from a plaintext password, hashing it immediately.
    #[must_use]
    pub fn new(user_id: UserId, backend: &str, host: &str, username: &str, password: &str) -> Self {
        let host = host.trim_end_matches('/').to_string();
        let hashed_password = if username.is_empty() {
            String::new()
        } else {
            synctv_media_providers::alist::hash_password(password)
        };
        Self {
            user_id,
            server_id: alist_server_id(&host),
            backend: backend.to_string(),
            host,
            username: username.to_string(),
            hashed_password,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

/// A Bilibili account a user has bound (login cookies)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilibiliVendor {
    pub user_id: UserId,
    pub backend: String,
    pub cookies: HashMap<String, String>,
}
