//! Schema intermediate representation (IR) for SBE-style binary messages.
//!
//! The IR is the fully resolved, language-independent description of a message
//! schema: every type reference resolved, every offset and block length
//! computed. It is built once, either from a [`SchemaDef`] through
//! [`SchemaBuilder`] or from its persisted binary form through
//! [`decode_ir`], and is immutable afterwards.
//!
//! - [`def`]: serde-deserializable schema definitions (the builder's input)
//! - [`ir`]: the frozen IR and its lookup API
//! - [`builder`]: definition resolution and validation
//! - [`codec`]: the persisted binary IR stream
//! - [`registry`]: schema-id keyed collection of loaded IRs

pub mod builder;
pub mod codec;
pub mod config;
pub mod def;
pub mod error;
pub mod ir;
pub mod registry;
mod validate;

pub use builder::SchemaBuilder;
pub use codec::{
    decode_ir, decode_ir_with_config, encode_ir, encode_ir_to_vec, read_ir_file, write_ir_file,
    FORMAT_VERSION, MAGIC, STREAM_HEADER_SIZE,
};
pub use config::{BuilderConfig, IrCodecConfig, RegistryConfig};
pub use def::{
    DataDef, DimensionDef, FieldDef, GroupDef, HeaderDef, Literal, MessageDef, SchemaDef, TypeDef,
};
pub use error::{IrError, Result, ValidationError};
pub use ir::{
    Block, Choice, CompositeType, Constant, DimensionLayout, EncodedType, Encoding, EnumType,
    Field, Group, HeaderLayout, Ir, Message, SetType, ValidValue, VarData,
};
pub use registry::{IrRegistry, IR_FILE_EXTENSION};
