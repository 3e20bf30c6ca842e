//! Message encode/decode runtime driven by sbeprims IR.
//!
//! Two ways in:
//! - the cursor API ([`MessageEncoder`], [`MessageDecoder`]) works on
//!   pre-resolved `&Field`/`&Group`/`&VarData` references, never allocates,
//!   and borrows var-data straight out of the buffer
//! - the value API ([`encode_message`], [`decode_message`]) converts whole
//!   messages to and from owned [`MessageValue`]s
//!
//! Both honor schema evolution: anything newer than the acting version is
//! omitted on encode and decodes as null, and trailing bytes written by newer
//! encoders are skipped.

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod message;
pub mod section;
pub mod value;
pub mod walker;

pub use config::DecoderConfig;
pub use decoder::{BlockDecoder, GroupDecoder, MessageDecoder};
pub use encoder::{GroupEncoder, MessageEncoder};
pub use error::{CodecError, Result};
pub use header::MessageHeader;
pub use message::{
    decode_message, decode_message_as, decode_message_with_config, encode_message, encoded_size,
};
pub use section::Section;
pub use value::{BlockValue, EnumValue, FieldValue, MessageValue};
pub use walker::{constant_value, elements, offset_of, Dimension, Element, Walker};
