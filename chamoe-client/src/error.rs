use chamoe_types::ValidationError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by controllers and the session context.
///
/// Every variant is a value handed back to the UI layer; none of them is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("View is not ready")]
    NotReady,

    #[error("View was closed before the request finished")]
    Disposed,

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Map a failed read to the display taxonomy
    pub fn from_fetch(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(what) => ClientError::NotFound(what),
            GatewayError::Forbidden(msg) | GatewayError::Unauthorized(msg) => {
                ClientError::Permission(msg)
            }
            other => ClientError::Fetch(other.to_string()),
        }
    }

    /// Map a failed write to the display taxonomy
    pub fn from_submission(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(what) => ClientError::NotFound(what),
            GatewayError::Forbidden(msg) | GatewayError::Unauthorized(msg) => {
                ClientError::Permission(msg)
            }
            other => ClientError::Submission(other.to_string()),
        }
    }

    /// Message shown to the user for this error
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => format!("Validation Error: {}", e),
            ClientError::NotFound(_) => "Not Found: This content no longer exists.".to_string(),
            ClientError::Permission(_) => {
                "Permission Error: You are not allowed to do that. Try signing in again.".to_string()
            }
            ClientError::Auth(msg) => format!("Authentication Error: {}", msg),
            ClientError::Fetch(_) => {
                "Network Error: Could not load content. Check your connection and retry.".to_string()
            }
            ClientError::Submission(_) => {
                "Network Error: Could not send. Your changes were not saved, please retry.".to_string()
            }
            ClientError::SubmissionInFlight => "Please wait, still sending...".to_string(),
            ClientError::InvalidOperation(msg) => format!("Error: {}", msg),
            ClientError::NotReady => "Still loading, please wait.".to_string(),
            ClientError::Disposed => String::new(),
            ClientError::Storage(msg) => format!("Storage Error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_mapping() {
        assert_eq!(
            ClientError::from_fetch(GatewayError::NotFound("post 9".to_string())),
            ClientError::NotFound("post 9".to_string())
        );
        assert!(matches!(
            ClientError::from_fetch(GatewayError::Network("reset".to_string())),
            ClientError::Fetch(_)
        ));
        assert!(matches!(
            ClientError::from_submission(GatewayError::Api("500".to_string())),
            ClientError::Submission(_)
        ));
        assert!(matches!(
            ClientError::from_submission(GatewayError::Forbidden("no".to_string())),
            ClientError::Permission(_)
        ));
    }

    #[test]
    fn test_validation_message() {
        let err = ClientError::from(ValidationError::Empty);
        assert_eq!(err.user_message(), "Validation Error: content is empty");
    }
}
