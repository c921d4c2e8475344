use crate::models::{EntityStatus, StatusAction};

/// Where an error is shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Next to the offending form field; the call was never issued.
    Inline,
    /// As the page body, e.g. a record that no longer exists.
    Page,
    /// As a transient toast; previous data stays on screen.
    Notification,
    /// Not shown. Raised only when a caller bypasses the action gating.
    Suppressed,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: cannot {action} a record that is {status}")]
    InvalidTransition {
        status: EntityStatus,
        action: StatusAction,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ServiceError::SerializationError(err.to_string());
        }
        match err.status() {
            Some(status) if status.as_u16() == 404 => ServiceError::NotFound(err.to_string()),
            Some(status) => ServiceError::ServerError {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => ServiceError::NetworkError(err.to_string()),
        }
    }
}

impl ServiceError {
    pub fn not_found(kind: crate::models::EntityKind, key: &str) -> Self {
        ServiceError::NotFound(format!("{} {} not found", kind.label(), key))
    }

    /// Single source of truth for how each error reaches the operator.
    pub fn surface(&self) -> ErrorSurface {
        match self {
            Self::ValidationError(_) => ErrorSurface::Inline,
            Self::NotFound(_) => ErrorSurface::Page,
            Self::InvalidTransition { .. } => ErrorSurface::Suppressed,
            Self::InvalidOperation(_)
            | Self::NetworkError(_)
            | Self::ServerError { .. }
            | Self::SerializationError(_)
            | Self::ConfigError(_)
            | Self::Other(_) => ErrorSurface::Notification,
        }
    }

    /// Message carried by an error toast. Internal failures get a generic text.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(_) => {
                let fields = self.invalid_fields();
                format!("Please check the following fields: {}", fields.join(", "))
            }
            Self::NotFound(msg) | Self::InvalidOperation(msg) => msg.clone(),
            Self::ServerError { message, .. } => message.clone(),
            Self::NetworkError(_) => "Unable to reach the server".to_string(),
            Self::SerializationError(_) => "Unexpected response from server".to_string(),
            Self::ConfigError(_) | Self::Other(_) => "Internal error".to_string(),
            Self::InvalidTransition { .. } => self.to_string(),
        }
    }

    /// Sorted names of the fields that failed validation.
    pub fn invalid_fields(&self) -> Vec<String> {
        match self {
            Self::ValidationError(errors) => {
                let mut fields: Vec<String> =
                    errors.field_errors().keys().map(|f| f.to_string()).collect();
                fields.sort();
                fields
            }
            _ => Vec::new(),
        }
    }

    /// Whether re-issuing the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(_) => true,
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
