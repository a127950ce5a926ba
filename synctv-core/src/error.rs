use thiserror::Error;

/// Crate-wide error.
///
/// `Clone` so a cache leader can hand the exact same error to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Vendor error: {0}")]
    Vendor(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable short name of the variant, for handlers mapping errors to responses.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Vendor(_) => "vendor",
            Self::Resolution(_) => "resolution",
            Self::Serialization(_) => "serialization",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // PostgreSQL check_violation / not_null_violation
                Some("23514") => Self::InvalidInput("Constraint check failed".to_string()),
                Some("23502") => Self::InvalidInput("Required field is missing".to_string()),
                _ => Self::Database(err.to_string()),
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<synctv_media_providers::ProviderClientError> for Error {
    fn from(err: synctv_media_providers::ProviderClientError) -> Self {
        Self::Vendor(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Resolution(format!("manifest: {err}"))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("refresh task failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
