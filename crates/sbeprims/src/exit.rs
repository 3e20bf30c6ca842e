use std::fmt;
use std::io;

use sbeprims_codec::CodecError;
use sbeprims_ir::IrError;
use sbeprims_otf::OtfError;
use sbeprims_primitive::ErrorKind;

pub const SUCCESS: i32 = 0;
#[allow(dead_code)]
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NOT_FOUND: i32 = 66;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn kind_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Range
        | ErrorKind::Format
        | ErrorKind::BufferOverflow
        | ErrorKind::BufferUnderflow
        | ErrorKind::Sequence => DATA_INVALID,
        ErrorKind::Validation => USAGE,
        ErrorKind::Lookup => NOT_FOUND,
        ErrorKind::Io => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound => NOT_FOUND,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn ir_error(context: &str, err: IrError) -> CliError {
    match err {
        IrError::Io(source) => io_error(context, source),
        other => CliError::new(kind_code(other.kind()), format!("{context}: {other}")),
    }
}

pub fn codec_error(context: &str, err: CodecError) -> CliError {
    match err {
        CodecError::Ir(err) => ir_error(context, err),
        other => CliError::new(kind_code(other.kind()), format!("{context}: {other}")),
    }
}

pub fn otf_error(context: &str, err: OtfError) -> CliError {
    match err {
        OtfError::Codec(err) => codec_error(context, err),
        OtfError::Ir(err) => ir_error(context, err),
        other => CliError::new(kind_code(other.kind()), format!("{context}: {other}")),
    }
}
