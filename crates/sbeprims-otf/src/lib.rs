//! On-the-fly decoding of sbeprims messages.
//!
//! [`OtfDecoder`] walks a message using only the IR, with no generated or
//! pre-resolved code, and reports every field, group and var-data section to
//! a [`Visitor`] in wire order. It applies the same bounds, version and skip
//! rules as the cursor decoder in `sbeprims-codec`, since both share its
//! walker.
//!
//! [`JsonVisitor`] is a ready-made visitor that collects messages as JSON.

pub mod config;
pub mod decoder;
pub mod error;
pub mod json;
pub mod visitor;

pub use config::OtfConfig;
pub use decoder::{decode_with_registry, OtfDecoder};
pub use error::{OtfError, Result};
pub use json::{block_from_json, message_from_json, JsonVisitor};
pub use visitor::Visitor;
