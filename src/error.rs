//! Error types and handling for the PDF rewrite library
//! Created: 2025-06-03 11:31:05 UTC
//! Author: kartik4905

use std::{io, result::Result as StdResult};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom result type for rewrite operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for rewrite operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Bad path, corrupt file or wrong password
    #[error("Source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("Missing required credential: {0}")]
    MissingRequiredCredential(String),

    #[error("Malformed transport encoding: {0}")]
    EncodingMalformed(String),

    #[error("Source document has no pages")]
    EmptyDocument,

    #[error("PDF codec error: {0}")]
    Codec(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Serialisable classification of an [`Error`], carried by failed outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    SourceUnreadable,
    MissingRequiredCredential,
    EncodingMalformed,
    Codec,
    Config,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SourceUnreadable(_) | Error::EmptyDocument => ErrorKind::SourceUnreadable,
            Error::MissingRequiredCredential(_) => ErrorKind::MissingRequiredCredential,
            Error::EncodingMalformed(_) => ErrorKind::EncodingMalformed,
            Error::Codec(_) | Error::Serialization(_) => ErrorKind::Codec,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Wraps any displayable codec failure
    pub fn codec<E: std::fmt::Display>(e: E) -> Self {
        Error::Codec(e.to_string())
    }

    pub fn unreadable<E: std::fmt::Display>(e: E) -> Self {
        Error::SourceUnreadable(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
