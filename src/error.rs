//! Error types for loading schema documents and exercising operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading or normalizing a schema document.
///
/// Always fatal to a run: no partial model is ever built from a document that
/// failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse and configuration errors (exit code 2)
    #[error("cannot load {url}: built without the `remote` feature")]
    RemoteDisabled { url: String },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema document: {message}")]
    InvalidDocument { message: String },

    #[error("unresolved reference: {reference}")]
    UnresolvedRef { reference: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// A declared parameter is missing the metadata needed to template it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameterError {
    #[error("parameter name is empty")]
    EmptyName,

    #[error("parameter has no name")]
    MissingName,

    #[error("parameter '{name}' has no type")]
    MissingType { name: String },

    #[error("parameter '{name}' has unknown type \"{type_name}\"")]
    UnknownType { name: String, type_name: String },

    #[error("parameter '{name}' is an array without primitive items")]
    UnsupportedItems { name: String },

    #[error("parameter '{name}' has unknown location \"{location}\"")]
    UnknownLocation { name: String, location: String },
}

/// Caller-supplied values disagree with an operation's declared parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterMismatchError {
    #[error("unknown parameter '{name}'")]
    Unknown { name: String },

    #[error("missing required parameter '{name}'")]
    Missing { name: String },

    #[error("invalid value for parameter '{name}': {message}")]
    InvalidValue { name: String, message: String },
}

/// Failure to issue a single request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Mismatch(#[from] ParameterMismatchError),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// A credential cannot be built for a security scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("unknown security scheme '{name}'")]
    UnknownScheme { name: String },

    #[error("security scheme '{name}' of type \"{kind}\" is not supported")]
    Unsupported { name: String, kind: String },
}

/// A response did not match what the document declares for the operation.
#[derive(Debug, Clone, Error)]
pub enum ValidationMismatch {
    #[error("unexpected status {status}, expected one of: {}", expected.join(", "))]
    UnexpectedStatus { status: u16, expected: Vec<String> },

    #[error("response body for status {status} failed validation with {} error(s)", errors.len())]
    BodyMismatch {
        status: u16,
        errors: Vec<SchemaError>,
    },

    #[error("response schema for status {status} is invalid: {message}")]
    InvalidResponseSchema { status: u16, message: String },
}

/// Errors that stop a whole run before any operation is exercised.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Client(#[from] RequestError),
}

impl RunError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Load(e) => e.exit_code(),
            RunError::Client(_) => 2,
        }
    }
}

/// Single body validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
