use sbeprims_codec::CodecError;
use sbeprims_ir::IrError;
use sbeprims_primitive::ErrorKind;

/// Errors that can occur while decoding on the fly or converting JSON.
#[derive(Debug, thiserror::Error)]
pub enum OtfError {
    /// Decoding failed: bounds, limits, or header lookup.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// IR lookup failed.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// No registered schema claims the message header at `offset`.
    #[error("no registered schema matches the message at offset {offset}")]
    NoMatchingSchema { offset: usize },

    /// A JSON document does not match the message layout.
    #[error("invalid JSON for {scope}: {reason}")]
    Json { scope: String, reason: String },
}

impl OtfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OtfError::Codec(err) => err.kind(),
            OtfError::Ir(err) => err.kind(),
            OtfError::NoMatchingSchema { .. } => ErrorKind::Lookup,
            OtfError::Json { .. } => ErrorKind::Range,
        }
    }

    pub(crate) fn json(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        OtfError::Json {
            scope: scope.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OtfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_source() {
        assert_eq!(
            OtfError::from(CodecError::UnknownTemplate(3)).kind(),
            ErrorKind::Lookup
        );
        assert_eq!(OtfError::from(IrError::UnknownSchema(1)).kind(), ErrorKind::Lookup);
        assert_eq!(OtfError::NoMatchingSchema { offset: 0 }.kind(), ErrorKind::Lookup);
        assert_eq!(OtfError::json("M", "bad").kind(), ErrorKind::Range);
    }
}
