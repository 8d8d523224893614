// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, EncodeError},
    format_version::FormatVersion,
    pattern::PatternError,
    Checksum,
};

/// Represents errors that can occur in the index
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Serialization failed
    Encode(EncodeError),

    /// Deserialization failed
    Decode(DecodeError),

    /// Invalid or unparsable data format version
    InvalidVersion(FormatVersion),

    /// Invalid checksum value
    ChecksumMismatch {
        /// Checksum that was stored in the file
        expected: Checksum,

        /// Checksum that was computed over the file contents
        got: Checksum,
    },

    /// Malformed query pattern
    Pattern(PatternError),

    /// The verification regex could not be compiled
    Regex(regex::Error),

    /// The requested operation is not supported by the chosen strategy
    Unsupported(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GapMatchError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<PatternError> for Error {
    fn from(value: PatternError) -> Self {
        Self::Pattern(value)
    }
}

impl From<regex::Error> for Error {
    fn from(value: regex::Error) -> Self {
        Self::Regex(value)
    }
}

/// Index result
pub type Result<T> = std::result::Result<T, Error>;
