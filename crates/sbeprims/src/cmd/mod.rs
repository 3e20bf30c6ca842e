use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use sbeprims_ir::{read_ir_file, BuilderConfig, Ir, SchemaBuilder, SchemaDef};
use tracing::debug;

use crate::exit::{io_error, ir_error, CliResult};
use crate::output::OutputFormat;

pub mod compile;
pub mod decode;
pub mod encode;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a schema definition into a persisted IR file.
    Compile(CompileArgs),
    /// List messages, fields, offsets and block lengths of a schema.
    Inspect(InspectArgs),
    /// Encode a message described in JSON.
    Encode(EncodeArgs),
    /// Decode messages to JSON without generated code.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Compile(args) => compile::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Schema definition document (JSON).
    pub definition: PathBuf,
    /// Output IR file.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
    /// Reject fields deprecated at or below the schema version.
    #[arg(long)]
    pub reject_deprecated: bool,
    /// Maximum composite and group nesting.
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// IR file, or a schema definition document (`.json`).
    pub ir: PathBuf,
    /// Only show this message (name or template id).
    #[arg(long, short = 'm')]
    pub message: Option<String>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// IR file, or a schema definition document (`.json`).
    #[arg(long)]
    pub ir: PathBuf,
    /// Template id of the message to encode.
    #[arg(long, short = 't')]
    pub template: u16,
    /// Message value as inline JSON.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub json: Option<String>,
    /// Read the message value from a JSON file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Output file for the encoded message.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
    /// Encode as an older schema version. Default: the schema version.
    #[arg(long, value_name = "N")]
    pub acting_version: Option<u16>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// IR file, schema definition document (`.json`), or a directory of IR
    /// files to pick from by schema id.
    #[arg(long)]
    pub ir: PathBuf,
    /// Encoded message file.
    pub input: PathBuf,
    /// Offset of the first message header.
    #[arg(long, default_value = "0")]
    pub offset: usize,
    /// Keep decoding consecutive messages until the input ends.
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Load an IR file, or build one from a definition document.
pub fn load_ir(path: &Path) -> CliResult<Ir> {
    if path.extension().is_some_and(|ext| ext == "json") {
        return build_definition(path, BuilderConfig::default());
    }
    read_ir_file(path).map_err(|err| ir_error(&format!("load {}", path.display()), err))
}

pub fn build_definition(path: &Path, config: BuilderConfig) -> CliResult<Ir> {
    let context = format!("build {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|err| io_error(&context, err))?;
    let def = SchemaDef::from_json(&text).map_err(|err| ir_error(&context, err))?;
    let ir = SchemaBuilder::new(config)
        .build(&def)
        .map_err(|err| ir_error(&context, err))?;
    debug!(path = %path.display(), schema_id = ir.schema_id(), "built schema from definition");
    Ok(ir)
}
