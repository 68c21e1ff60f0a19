//! Error types for OpenLABEL documents.

use thiserror::Error;

/// Main error type for OpenLABEL operations.
#[derive(Error, Debug)]
pub enum OpenLabelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame interval: start {start} > end {end}")]
    InvalidInterval { start: u64, end: u64 },

    #[error("Invalid value shape: {0}")]
    InvalidValueShape(String),

    #[error("Unknown {kind}: {uid}")]
    UnknownElement { kind: String, uid: String },

    #[error("Unknown ontology: {0}")]
    UnknownOntology(String),

    #[error("Unknown coordinate system: {0}")]
    UnknownCoordinateSystem(String),

    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("UID mode already fixed: {0}")]
    ModeAlreadyFixed(String),

    #[error("Duplicate UID: {0}")]
    DuplicateUid(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Schema violation at {path}: {reason}")]
    SchemaViolation { path: String, reason: String },
}

/// Discriminant of [`OpenLabelError`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    InvalidInterval,
    InvalidValueShape,
    UnknownElement,
    UnknownOntology,
    UnknownCoordinateSystem,
    UnknownStream,
    ModeAlreadyFixed,
    DuplicateUid,
    ParseError,
    SchemaViolation,
}

impl OpenLabelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidInterval { .. } => ErrorKind::InvalidInterval,
            Self::InvalidValueShape(_) => ErrorKind::InvalidValueShape,
            Self::UnknownElement { .. } => ErrorKind::UnknownElement,
            Self::UnknownOntology(_) => ErrorKind::UnknownOntology,
            Self::UnknownCoordinateSystem(_) => ErrorKind::UnknownCoordinateSystem,
            Self::UnknownStream(_) => ErrorKind::UnknownStream,
            Self::ModeAlreadyFixed(_) => ErrorKind::ModeAlreadyFixed,
            Self::DuplicateUid(_) => ErrorKind::DuplicateUid,
            Self::ParseError(_) => ErrorKind::ParseError,
            Self::SchemaViolation { .. } => ErrorKind::SchemaViolation,
        }
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::InvalidValueShape(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn unknown(kind: impl Into<String>, uid: impl ToString) -> Self {
        Self::UnknownElement {
            kind: kind.into(),
            uid: uid.to_string(),
        }
    }

    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for OpenLABEL operations.
pub type Result<T> = std::result::Result<T, OpenLabelError>;
