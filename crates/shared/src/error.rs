use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }
}

/// The loan service rejected an operation with a structured error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} rejected by loan service: {message}")]
pub struct ApiException {
    pub operation: String,
    pub message: String,
}

impl ApiException {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Builds an exception from the first reported error, if any.
    pub fn from_errors(operation: &str, errors: &[ApiError]) -> Option<Self> {
        errors
            .first()
            .map(|first| Self::new(operation, first.message.clone()))
    }
}

impl From<ApiException> for ApiError {
    fn from(value: ApiException) -> Self {
        Self::new(value.message)
    }
}
