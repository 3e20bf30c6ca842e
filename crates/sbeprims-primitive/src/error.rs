use std::fmt;

use crate::types::PrimitiveType;

/// Classification shared by every error type in the workspace.
///
/// Higher layers wrap or translate lower-layer errors, but the kind survives
/// so callers (and the CLI exit-code mapping) can branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value does not fit its declared primitive width or constraints.
    Range,
    /// A schema definition is inconsistent.
    Validation,
    /// A persisted IR stream is corrupt or incompatible.
    Format,
    /// An encode target is too small.
    BufferOverflow,
    /// A decode source is truncated.
    BufferUnderflow,
    /// A section was accessed out of wire order.
    Sequence,
    /// An unknown template, schema or name was requested.
    Lookup,
    /// Reading or writing a persisted artifact failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Range => "range",
            ErrorKind::Validation => "validation",
            ErrorKind::Format => "format",
            ErrorKind::BufferOverflow => "buffer-overflow",
            ErrorKind::BufferUnderflow => "buffer-underflow",
            ErrorKind::Sequence => "sequence",
            ErrorKind::Lookup => "lookup",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while encoding or decoding primitive values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PrimitiveError {
    /// The value does not fit the target primitive type.
    #[error("value {value} out of range for {ty}")]
    Range { ty: PrimitiveType, value: String },

    /// Writing would pass the end of the buffer.
    #[error("buffer overflow: {len} bytes at offset {offset} exceed capacity {capacity}")]
    BufferOverflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Reading would pass the end of the buffer.
    #[error("buffer underflow: {len} bytes at offset {offset} exceed available {available}")]
    BufferUnderflow {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// The primitive type name is not recognized.
    #[error("unknown primitive type '{0}'")]
    UnknownType(String),
}

impl PrimitiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrimitiveError::Range { .. } => ErrorKind::Range,
            PrimitiveError::BufferOverflow { .. } => ErrorKind::BufferOverflow,
            PrimitiveError::BufferUnderflow { .. } => ErrorKind::BufferUnderflow,
            PrimitiveError::UnknownType(_) => ErrorKind::Validation,
        }
    }

    pub(crate) fn range(ty: PrimitiveType, value: impl fmt::Display) -> Self {
        PrimitiveError::Range {
            ty,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrimitiveError>;
