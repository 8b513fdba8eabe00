//! Error types for nestguard
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API.
//! Errors raised while authorizing a record never escape
//! [`NestedAuthorizer::authorize`](crate::authorizer::NestedAuthorizer::authorize):
//! they are recorded on the returned [`AccessResult`](crate::authorizer::AccessResult).

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures while authorizing a single record
#[derive(Error, Debug)]
pub enum AuthorizeError {
    #[error("invalid input json; unable to mask: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error("Masking failed: {0}")]
    Masking(#[from] MaskingError),

    #[error("unable to determine access for resource '{resource}'")]
    DecisionUnavailable { resource: String },

    #[error("Row filter failed: {0}")]
    RowFilter(#[from] RowFilterError),
}

impl AuthorizeError {
    pub fn decision_unavailable(resource: impl Into<String>) -> Self {
        Self::DecisionUnavailable {
            resource: resource.into(),
        }
    }
}

/// Value masking errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskingError {
    #[error("{kind} requires a mask type, none was given")]
    MissingDirective { kind: &'static str },

    #[error("{kind} doesn't support mask type: {directive}")]
    UnsupportedDirective {
        kind: &'static str,
        directive: String,
    },

    #[error("unable to determine field type: {value}")]
    UndeterminedType { value: String },

    #[error("unable to extract {kind} from custom mask value '{value}'")]
    InvalidCustomValue { kind: &'static str, value: String },

    #[error(
        "Unable to mask year, unsupported date format: '{value}'. See documentation for supported date formats."
    )]
    UnsupportedDateFormat { value: String },
}

/// Row-filter expression errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowFilterError {
    #[error("invalid filter expression at offset {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("invalid regex '{pattern}' in filter expression: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl RowFilterError {
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type alias for record authorization steps
pub type AuthorizeResult<T> = std::result::Result<T, AuthorizeError>;

/// Result type alias for masking operations
pub type MaskResult<T> = std::result::Result<T, MaskingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masking_error_names_type_and_directive() {
        let err = MaskingError::UnsupportedDirective {
            kind: "number",
            directive: "MASK_HASH".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("number"));
        assert!(msg.contains("MASK_HASH"));
    }

    #[test]
    fn test_authorize_error_from_masking() {
        let err: AuthorizeError = MaskingError::UndeterminedType {
            value: "null".into(),
        }
        .into();
        assert!(matches!(err, AuthorizeError::Masking(_)));
    }

    #[test]
    fn test_invalid_input_from_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AuthorizeError = parse_err.into();
        assert!(matches!(err, AuthorizeError::InvalidInput(_)));
        assert!(err.to_string().contains("invalid input json"));
    }

    #[test]
    fn test_decision_unavailable_names_resource() {
        let err = AuthorizeError::decision_unavailable("schema#field");
        assert!(err.to_string().contains("schema#field"));
    }
}
