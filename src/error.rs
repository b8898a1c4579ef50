use std::io;

use thiserror::Error;

use crate::bytestring::ByteString;

pub type Result<T> = std::result::Result<T, DecodingError>;

/// A decode failure and the byte offset it was detected at.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DecodingError {
    #[error("Unknown entity found at offset {offset}")]
    UnknownEntity { offset: usize },

    #[error("Non-numeric or empty integer entity at offset {offset}")]
    InvalidInteger { offset: usize },

    #[error("Integer entity at offset {offset} does not fit in 64 bits")]
    IntegerOverflow { offset: usize },

    #[error("Unterminated integer entity at offset {offset}")]
    UnterminatedInteger { offset: usize },

    #[error("Illegal zero-padding at offset {offset}")]
    IllegalZeroPadding { offset: usize },

    #[error("Unterminated string length declaration at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Unexpected end of string entity at offset {offset}")]
    UnexpectedEndOfString { offset: usize },

    #[error("Unterminated list definition at offset {offset}")]
    UnterminatedList { offset: usize },

    #[error("Unterminated dictionary definition at offset {offset}")]
    UnterminatedDictionary { offset: usize },

    #[error("Invalid dictionary key at offset {offset}")]
    InvalidDictionaryKey { offset: usize },

    #[error("Duplicate dictionary key '{key}' at offset {offset}")]
    DuplicateDictionaryKey { key: ByteString, offset: usize },

    #[error("Found multiple entities outside list or dict definitions at offset {offset}")]
    TrailingData { offset: usize },

    #[error("Nesting deeper than {max_depth} levels at offset {offset}")]
    NestingTooDeep { max_depth: usize, offset: usize },

    #[error("Invalid read of {length} bytes at offset {offset}")]
    InvalidRange { offset: usize, length: usize },

    #[error("I/O error ({kind}) at offset {offset}")]
    Io { kind: io::ErrorKind, offset: usize },
}

impl DecodingError {
    pub fn offset(&self) -> usize {
        match *self {
            DecodingError::UnknownEntity { offset }
            | DecodingError::InvalidInteger { offset }
            | DecodingError::IntegerOverflow { offset }
            | DecodingError::UnterminatedInteger { offset }
            | DecodingError::IllegalZeroPadding { offset }
            | DecodingError::UnterminatedString { offset }
            | DecodingError::UnexpectedEndOfString { offset }
            | DecodingError::UnterminatedList { offset }
            | DecodingError::UnterminatedDictionary { offset }
            | DecodingError::InvalidDictionaryKey { offset }
            | DecodingError::DuplicateDictionaryKey { offset, .. }
            | DecodingError::TrailingData { offset }
            | DecodingError::NestingTooDeep { offset, .. }
            | DecodingError::InvalidRange { offset, .. }
            | DecodingError::Io { offset, .. } => offset,
        }
    }

    pub(crate) fn io(err: &io::Error, offset: usize) -> Self {
        DecodingError::Io { kind: err.kind(), offset }
    }
}
