//! Structured error types for task operations.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    MissingRequiredField,
    InvalidFieldValue,
    InvalidId,
    NoFieldsToUpdate,

    // Not found errors
    TaskNotFound,

    // Internal errors
    DatabaseError,
}

/// Errors returned by the task repository and surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Bad input. Always raised before anything is written.
    #[error("{message}")]
    Validation {
        code: ErrorCode,
        field: Option<String>,
        message: String,
    },

    #[error("Task not found: {0}")]
    NotFound(i64),

    /// Any failure from SQLite. The detail is logged, never sent to clients.
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl TaskError {
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::InvalidFieldValue,
            field: Some(field.to_string()),
            message: reason.into(),
        }
    }

    pub fn missing_field(field: &str) -> Self {
        Self::Validation {
            code: ErrorCode::MissingRequiredField,
            field: Some(field.to_string()),
            message: format!("{} is required", field),
        }
    }

    pub fn invalid_id(raw: &str) -> Self {
        Self::Validation {
            code: ErrorCode::InvalidId,
            field: Some("id".to_string()),
            message: format!("Invalid task id: {:?}", raw),
        }
    }

    pub fn no_fields() -> Self {
        Self::validation(ErrorCode::NoFieldsToUpdate, "No data to update")
    }

    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        Self::Storage(err.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound(_) => ErrorCode::TaskNotFound,
            Self::Storage(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Client-facing body. Storage failures are reduced to a generic message.
    pub fn to_body(&self) -> ErrorBody {
        let message = match self {
            Self::Storage(_) => "Internal storage error".to_string(),
            other => other.to_string(),
        };
        ErrorBody {
            code: self.code(),
            message,
            field: self.field().map(str::to_string),
        }
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.into())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.into())
    }
}

/// Serialized error payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Result type for task operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_is_not_exposed() {
        let err = TaskError::from(rusqlite::Error::InvalidQuery);
        let body = err.to_body();
        assert_eq!(body.code, ErrorCode::DatabaseError);
        assert_eq!(body.message, "Internal storage error");
        assert!(err.to_string().contains("storage failure"));
    }

    #[test]
    fn validation_body_carries_field() {
        let body = TaskError::invalid_value("text", "too long").to_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "INVALID_FIELD_VALUE");
        assert_eq!(json["field"], "text");
        assert_eq!(json["message"], "too long");
    }

    #[test]
    fn not_found_omits_field() {
        let json = serde_json::to_value(TaskError::NotFound(7).to_body()).unwrap();
        assert_eq!(json["code"], "TASK_NOT_FOUND");
        assert!(json.get("field").is_none());
        assert_eq!(json["message"], "Task not found: 7");
    }
}
