use sbeprims_primitive::ErrorKind;

/// A schema definition (or decoded IR) is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Two messages share a template id.
    #[error("duplicate template id {id} ({first} and {second})")]
    DuplicateTemplateId {
        id: u16,
        first: String,
        second: String,
    },

    /// Two items in one scope share a name.
    #[error("duplicate name '{name}' in {scope}")]
    DuplicateName { scope: String, name: String },

    /// A field or member references a type that does not exist.
    #[error("unresolved type '{name}' referenced by {referenced_by}")]
    UnresolvedType { name: String, referenced_by: String },

    /// A composite references itself, directly or indirectly.
    #[error("type '{0}' references itself")]
    CyclicType(String),

    /// Two fields occupy overlapping bytes.
    #[error("field '{field}' at offset {offset} overlaps '{previous}' (ends at {previous_end}) in {scope}")]
    OffsetOverlap {
        scope: String,
        field: String,
        offset: usize,
        previous: String,
        previous_end: usize,
    },

    /// A field extends past its block length.
    #[error("field '{field}' ends at {end}, past block length {block_length} in {scope}")]
    ExceedsBlockLength {
        scope: String,
        field: String,
        end: usize,
        block_length: usize,
    },

    /// An item was placed before an item of a newer version.
    #[error(
        "'{name}' (since version {since_version}) precedes '{conflicting}' (since version {conflicting_since}) in {scope}"
    )]
    VersionConflict {
        scope: String,
        name: String,
        since_version: u16,
        conflicting: String,
        conflicting_since: u16,
    },

    /// An item claims a version newer than the schema itself.
    #[error("'{name}' since version {since_version} exceeds schema version {schema_version} in {scope}")]
    VersionAboveSchema {
        scope: String,
        name: String,
        since_version: u16,
        schema_version: u16,
    },

    /// A header, dimension, length or enum encoding uses an unsupported type.
    #[error("invalid encoding in {scope}: {reason}")]
    InvalidEncoding { scope: String, reason: String },

    /// A literal, constant or limit is malformed or out of range.
    #[error("invalid value in {scope}: {reason}")]
    InvalidValue { scope: String, reason: String },

    /// Types or groups nest deeper than the configured limit.
    #[error("{scope} nests deeper than {max} levels")]
    NestingTooDeep { scope: String, max: usize },
}

/// Errors produced while building, persisting or looking up IR.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// The schema is inconsistent.
    #[error("schema validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The schema definition document could not be parsed.
    #[error("invalid schema definition: {0}")]
    Definition(#[from] serde_json::Error),

    /// The persisted IR stream is corrupt or incompatible.
    #[error("invalid IR stream: {0}")]
    Format(String),

    /// No IR is registered for the schema id.
    #[error("no schema registered with id {0}")]
    UnknownSchema(u16),

    /// The schema has no message with the template id.
    #[error("schema {schema_id} has no message with template id {template_id}")]
    UnknownTemplate { schema_id: u16, template_id: u16 },

    /// An IR file or directory could not be loaded.
    #[error("failed to load IR: {0}")]
    LoadFailed(String),

    /// An I/O error occurred while reading or writing IR files.
    #[error("IR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IrError::Validation(_) | IrError::Definition(_) => ErrorKind::Validation,
            IrError::Format(_) | IrError::LoadFailed(_) => ErrorKind::Format,
            IrError::UnknownSchema(_) | IrError::UnknownTemplate { .. } => ErrorKind::Lookup,
            IrError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, IrError>;
