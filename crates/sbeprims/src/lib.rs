//! Schema-driven binary message encoding with permissive licensing.
//!
//! sbeprims encodes and decodes fixed-layout binary messages described by a
//! schema, directly against caller-owned buffers.
//!
//! # Crate Structure
//!
//! - [`primitive`]: Fixed-width primitive encodings and the shared error kind
//! - [`ir`]: Schema IR, its builder, its persisted form and a registry
//! - [`codec`]: Message encode/decode runtime (cursor and value APIs)
//! - [`otf`]: On-the-fly decoding through a visitor

/// Re-export primitive types.
pub mod primitive {
    pub use sbeprims_primitive::*;
}

/// Re-export IR types.
pub mod ir {
    pub use sbeprims_ir::*;
}

/// Re-export codec types.
pub mod codec {
    pub use sbeprims_codec::*;
}

/// Re-export on-the-fly decoder types.
pub mod otf {
    pub use sbeprims_otf::*;
}

pub use sbeprims_primitive::ErrorKind;
