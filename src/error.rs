//! Error types for basicdb

use thiserror::Error;

/// Errors that can occur anywhere in the core query/storage engine.
#[derive(Error, Debug)]
pub enum BasicDbError {
    #[error("conditional check failed")]
    ConditionalCheckFailed,

    #[error("invalid query expression: {message}")]
    InvalidQueryExpression { message: String },

    #[error("invalid sort expression: {key} is not referenced in the WHERE clause")]
    InvalidSortExpression { key: String },

    #[error("attribute does not exist: {attribute}")]
    AttributeDoesNotExist { attribute: String },

    #[error("expectation given for multi-valued attribute: {attribute}")]
    MultiValuedAttribute { attribute: String },

    #[error("unknown action: {action}")]
    UnknownAction { action: String },

    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("backend I/O error")]
    Io(#[source] std::io::Error),

    #[error("internal invariant violation: {message}")]
    Internal { message: String },
}

impl BasicDbError {
    /// The HTTP status code this error maps to, per the error table in the spec.
    pub fn http_status(&self) -> u16 {
        match self {
            BasicDbError::ConditionalCheckFailed => 409,
            BasicDbError::InvalidQueryExpression { .. } => 400,
            BasicDbError::InvalidSortExpression { .. } => 400,
            BasicDbError::AttributeDoesNotExist { .. } => 404,
            BasicDbError::MultiValuedAttribute { .. } => 409,
            BasicDbError::UnknownAction { .. } => 500,
            BasicDbError::MissingParameter { .. } => 400,
            BasicDbError::Io(_) => 500,
            BasicDbError::Internal { .. } => 500,
        }
    }

    /// The root XML element name used for the error envelope.
    pub fn element_name(&self) -> &'static str {
        match self {
            BasicDbError::ConditionalCheckFailed => "ConditionalCheckFailed",
            BasicDbError::InvalidQueryExpression { .. } => "InvalidQueryExpression",
            BasicDbError::InvalidSortExpression { .. } => "InvalidSortExpression",
            BasicDbError::AttributeDoesNotExist { .. } => "AttributeDoesNotExist",
            BasicDbError::MultiValuedAttribute { .. } => "MultiValuedAttribute",
            BasicDbError::UnknownAction { .. } => "UnknownAction",
            BasicDbError::MissingParameter { .. } => "MissingParameter",
            BasicDbError::Io(_) => "InternalError",
            BasicDbError::Internal { .. } => "InternalError",
        }
    }
}

impl From<std::io::Error> for BasicDbError {
    fn from(err: std::io::Error) -> Self {
        BasicDbError::Io(err)
    }
}

impl From<quick_xml::Error> for BasicDbError {
    fn from(err: quick_xml::Error) -> Self {
        BasicDbError::Internal {
            message: format!("xml encode error: {err}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, BasicDbError>;
