//! Unified error types for the EIP-712 path engine
//!
//! Engine rejections and collaborator failures (schema parsing, reference
//! encoding, configuration) all flow through [`Eip712Error`] so the protocol
//! layer sees a single error surface.

use serde::{Deserialize, Serialize};

/// Errors raised by the path engine and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Array size mismatch (expected {expected}, got {got})")]
    ArrayShapeMismatch { expected: u8, got: u8 },

    #[error("Did not find a matching array type")]
    NoMatchingArrayField,

    #[error("Path depth limit reached ({max})")]
    DepthExceeded { max: usize },

    #[error("Array depth limit reached ({max})")]
    ArrayDepthExceeded { max: usize },

    #[error("Hash context arena exhausted")]
    OutOfMemory,

    #[error("No active path session")]
    NotInitialized,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid primary type: {0}")]
    InvalidPrimaryType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Eip712Error {
    /// Stable category used in machine-readable output
    pub fn code(&self) -> ErrorCode {
        match self {
            Eip712Error::UnknownType(_) => ErrorCode::UnknownType,
            Eip712Error::InvalidSchema(_) => ErrorCode::InvalidSchema,
            Eip712Error::ArrayShapeMismatch { .. } => ErrorCode::ArrayShapeMismatch,
            Eip712Error::NoMatchingArrayField => ErrorCode::NoMatchingArrayField,
            Eip712Error::DepthExceeded { .. } => ErrorCode::DepthExceeded,
            Eip712Error::ArrayDepthExceeded { .. } => ErrorCode::ArrayDepthExceeded,
            Eip712Error::OutOfMemory => ErrorCode::OutOfMemory,
            Eip712Error::NotInitialized => ErrorCode::NotInitialized,
            Eip712Error::InvalidJson(_) => ErrorCode::JsonError,
            Eip712Error::InvalidType(_) | Eip712Error::InvalidPrimaryType(_) => {
                ErrorCode::InvalidSchema
            }
            Eip712Error::MissingField(_)
            | Eip712Error::InvalidValue { .. }
            | Eip712Error::InvalidAddress(_)
            | Eip712Error::EncodingError(_) => ErrorCode::InvalidInput,
            Eip712Error::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }

    /// Whether the error is a traversal rejection that aborts the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::ArrayShapeMismatch
                | ErrorCode::NoMatchingArrayField
                | ErrorCode::InvalidSchema
                | ErrorCode::UnknownType
                | ErrorCode::OutOfMemory
        )
    }
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Schema errors
    UnknownType,
    InvalidSchema,

    // Traversal errors
    ArrayShapeMismatch,
    NoMatchingArrayField,
    DepthExceeded,
    ArrayDepthExceeded,
    NotInitialized,

    // Resource errors
    OutOfMemory,

    // Input errors
    InvalidInput,
    JsonError,
    InvalidConfig,
}

/// Serializable error report, as printed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&Eip712Error> for ErrorReport {
    fn from(e: &Eip712Error) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// Result type alias for engine operations
pub type Eip712Result<T> = Result<T, Eip712Error>;

impl From<serde_json::Error> for Eip712Error {
    fn from(e: serde_json::Error) -> Self {
        Eip712Error::InvalidJson(e.to_string())
    }
}

impl From<hex::FromHexError> for Eip712Error {
    fn from(e: hex::FromHexError) -> Self {
        Eip712Error::EncodingError(format!("invalid hex: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_serialization() {
        let err = Eip712Error::ArrayShapeMismatch { expected: 2, got: 3 };
        let report = ErrorReport::from(&err);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("array_shape_mismatch"));
        assert!(json.contains("expected 2, got 3"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Eip712Error::NoMatchingArrayField.is_fatal());
        assert!(Eip712Error::OutOfMemory.is_fatal());
        assert!(!Eip712Error::NotInitialized.is_fatal());
        assert!(!Eip712Error::DepthExceeded { max: 4 }.is_fatal());
    }

    #[test]
    fn test_from_json_error() {
        let err: Eip712Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), ErrorCode::JsonError);
    }
}
