use thiserror::Error;

/// Errors from parsing an external identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("empty identifier")]
    Empty,
    #[error("invalid identifier '{value}': {reason}")]
    Malformed { value: String, reason: String },
    #[error("nil identifier")]
    Nil,
}

/// A required field is missing or out of range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Errors from reading query options out of a request's query string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("invalid '{key}': {source}")]
    Identifier {
        key: String,
        #[source]
        source: IdentifierError,
    },
    #[error("invalid '{key}': '{value}' is not an integer")]
    Integer { key: String, value: String },
    #[error("invalid '{key}': unknown continent type {value}")]
    ContinentType { key: String, value: i64 },
}
