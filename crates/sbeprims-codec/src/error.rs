use sbeprims_ir::IrError;
use sbeprims_primitive::{ErrorKind, PrimitiveError};

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A value does not fit its field, or a decode limit was exceeded.
    #[error("range error: {0}")]
    Range(String),

    /// Encoding would write past the end of the buffer.
    #[error("buffer overflow: {len} bytes at offset {offset} exceed capacity {capacity}")]
    BufferOverflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// The buffer ends before a fixed field or section.
    #[error("buffer underflow: {len} bytes at offset {offset} exceed available {available}")]
    BufferUnderflow {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// A section was accessed out of wire order.
    #[error("sequence error: {0}")]
    Sequence(String),

    /// The schema has no message with this template id.
    #[error("unknown template id {0}")]
    UnknownTemplate(u16),

    /// The message header names a different schema.
    #[error("message schema id {actual} does not match IR schema id {expected}")]
    SchemaMismatch { expected: u16, actual: u16 },

    /// A name (field, group, var-data, enum value or set choice) is not
    /// defined in the scope it was used.
    #[error("unknown name '{name}' in {scope}")]
    UnknownName { scope: String, name: String },

    /// IR lookup failed.
    #[error(transparent)]
    Ir(#[from] IrError),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::Range(_) => ErrorKind::Range,
            CodecError::BufferOverflow { .. } => ErrorKind::BufferOverflow,
            CodecError::BufferUnderflow { .. } => ErrorKind::BufferUnderflow,
            CodecError::Sequence(_) => ErrorKind::Sequence,
            CodecError::UnknownTemplate(_)
            | CodecError::SchemaMismatch { .. }
            | CodecError::UnknownName { .. } => ErrorKind::Lookup,
            CodecError::Ir(err) => err.kind(),
        }
    }

    pub(crate) fn unknown_name(scope: impl Into<String>, name: impl Into<String>) -> Self {
        CodecError::UnknownName {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl From<PrimitiveError> for CodecError {
    fn from(err: PrimitiveError) -> Self {
        match err {
            PrimitiveError::BufferOverflow {
                offset,
                len,
                capacity,
            } => CodecError::BufferOverflow {
                offset,
                len,
                capacity,
            },
            PrimitiveError::BufferUnderflow {
                offset,
                len,
                available,
            } => CodecError::BufferUnderflow {
                offset,
                len,
                available,
            },
            other => CodecError::Range(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sbeprims_primitive::{get, PrimitiveType, ByteOrder};

    #[test]
    fn primitive_errors_keep_their_kind() {
        let err: CodecError = get(&[0u8; 2], 1, PrimitiveType::UInt32, ByteOrder::LittleEndian)
            .unwrap_err()
            .into();
        assert!(matches!(
            err,
            CodecError::BufferUnderflow {
                offset: 1,
                len: 4,
                available: 2
            }
        ));
        assert_eq!(err.kind(), ErrorKind::BufferUnderflow);

        let err: CodecError = sbeprims_primitive::PrimitiveValue::from_i64(PrimitiveType::UInt8, -1)
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn lookup_errors_share_a_kind() {
        assert_eq!(CodecError::UnknownTemplate(3).kind(), ErrorKind::Lookup);
        assert_eq!(
            CodecError::SchemaMismatch {
                expected: 1,
                actual: 2
            }
            .kind(),
            ErrorKind::Lookup
        );
        assert_eq!(CodecError::Ir(IrError::UnknownSchema(4)).kind(), ErrorKind::Lookup);
    }
}
