use std::{fmt, io, path::StripPrefixError};

use http::status::StatusCode;
use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ExoError {
    #[error("Markup codec error: {0}")]
    Codec(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("Graph invariant violated: {0}")]
    Invariant(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Malformed path '{path}' at byte {position}: expected {expected}")]
    MalformedPath {
        path: String,
        position: usize,
        expected: String,
    },
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Unsupported graph query: {0}")]
    Unsupported(String),
}

impl ExoError {
    pub fn not_found(what: &str, key: impl fmt::Display) -> ExoError {
        ExoError::NotFound(format!("{what} '{key}'"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ExoError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExoError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExoError::Custom(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExoError::Invariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExoError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExoError::MalformedPath { .. } => StatusCode::BAD_REQUEST,
            ExoError::NotFound(_) => StatusCode::NOT_FOUND,
            ExoError::PermissionDenied => StatusCode::FORBIDDEN,
            ExoError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExoError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExoError::NotFound(_))
    }
}

impl From<StripPrefixError> for ExoError {
    fn from(src: StripPrefixError) -> ExoError {
        ExoError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for ExoError {
    fn from(src: toml::de::Error) -> ExoError {
        ExoError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ExoError {
    fn from(src: toml::ser::Error) -> ExoError {
        ExoError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for ExoError {
    fn from(src: JsonError) -> ExoError {
        ExoError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for ExoError {
    fn from(src: uuid::Error) -> ExoError {
        ExoError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<io::Error> for ExoError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => ExoError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => ExoError::PermissionDenied,
            _ => ExoError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for ExoError {
    fn from(x: walkdir::Error) -> Self {
        match x.into_io_error() {
            Some(io_error) => ExoError::from(io_error),
            None => ExoError::Io("directory walk failed (filesystem loop)".to_string()),
        }
    }
}

impl From<fmt::Error> for ExoError {
    fn from(x: fmt::Error) -> Self {
        ExoError::Codec(format!("{x}"))
    }
}

impl From<RegexError> for ExoError {
    fn from(x: RegexError) -> Self {
        ExoError::Serialization(format!("Regex parse failed: {x}"))
    }
}
