use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid value for '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Store timeout: {0}")]
    StoreTimeout(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("No {resource} with the id of {id}")]
    NotFound { resource: String, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), reason: reason.into() }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into(), id: id.into() }
    }

    /// HTTP status the response layer should use for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound { .. } | Self::NoSuchCollection(_) => 404,
            Self::Conflict(_) => 409,
            Self::StoreUnavailable(_) => 503,
            Self::StoreTimeout(_) => 504,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Toml(_) => 500,
        }
    }

    /// Store failures may be retried by the caller; the engine never retries on its own.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreTimeout(_) | Self::StoreUnavailable(_))
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        let code = self.status_code();
        code >= 400 && code < 500
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
