use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use super::VendorRepository;
use crate::{
    models::{AlistVendor, BilibiliVendor, UserId},
    Error, Result,
};

/// PostgreSQL-backed vendor binding repository
///
/// Tables: `alist_vendors (user_id, server_id, backend, host, username, hashed_password)`
/// keyed by `(user_id, server_id)`, and `bilibili_vendors (user_id, backend, cookies JSONB)`
/// keyed by `user_id`.
#[derive(Clone)]
pub struct PgVendorRepository {
    pool: PgPool,
}

impl PgVendorRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VendorRepository for PgVendorRepository {
    async fn get_alist_vendor(&self, user_id: &UserId, server_id: &str) -> Result<AlistVendor> {
        let row = sqlx::query(
            "SELECT user_id, server_id, backend, host, username, hashed_password
             FROM alist_vendors
             WHERE user_id = $1 AND server_id = $2",
        )
        .bind(user_id.as_str())
        .bind(server_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("alist vendor {server_id}")))?;

        Ok(AlistVendor {
            user_id: UserId::from_string(row.try_get("user_id")?),
            server_id: row.try_get("server_id")?,
            backend: row.try_get("backend")?,
            host: row.try_get("host")?,
            username: row.try_get("username")?,
            hashed_password: row.try_get("hashed_password")?,
        })
    }

    async fn get_bilibili_vendor(&self, user_id: &UserId) -> Result<BilibiliVendor> {
        let row = sqlx::query(
            "SELECT user_id, backend, cookies
             FROM bilibili_vendors
             WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("bilibili vendor".to_string()))?;

        let cookies: JsonValue = row.try_get("cookies")?;
        let cookies: HashMap<String, String> = serde_json::from_value(cookies)?;

        Ok(BilibiliVendor {
            user_id: UserId::from_string(row.try_get("user_id")?),
            backend: row.try_get("backend")?,
            cookies,
        })
    }
}
