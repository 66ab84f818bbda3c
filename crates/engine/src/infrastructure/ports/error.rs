//! Error types for port operations.

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Entity not found - includes entity type and ID for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Database operation failed - includes operation name for tracing.
    #[error("Database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Narrative provider failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// HTTP 429
    #[error("Provider rate limited: {0}")]
    RateLimited(String),
    /// HTTP 5xx / 529
    #[error("Provider overloaded: {0}")]
    Overloaded(String),
    /// HTTP 401 / 403. Never retried, never cascaded.
    #[error("Provider rejected credentials: {0}")]
    AuthFailure(String),
    /// Other 4xx: this model refused the request
    #[error("Provider rejected request: {0}")]
    Rejected(String),
    /// Transport failure (connect, timeout, body read)
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Every configured model failed
    #[error("No provider available after trying {attempted:?}: {last}")]
    Unavailable { attempted: Vec<String>, last: String },
}

impl LlmError {
    /// Maps a non-success HTTP status to the error taxonomy.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let detail = format!("HTTP {status}: {body}");
        match status {
            429 => Self::RateLimited(detail),
            401 | 403 => Self::AuthFailure(detail),
            500 | 502 | 503 | 504 | 529 => Self::Overloaded(detail),
            400..=499 => Self::Rejected(detail),
            _ => Self::RequestFailed(detail),
        }
    }

    /// Worth retrying against the same model.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Overloaded(_) | Self::RequestFailed(_) | Self::InvalidResponse(_)
        )
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailure(_))
    }
}
