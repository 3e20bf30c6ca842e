//! Fixed-width primitive encodings for schema-driven binary messages.
//!
//! This is the lowest layer of sbeprims. Every field on the wire is ultimately
//! one of the primitive types defined here:
//! - Signed/unsigned integers of 8, 16, 32 and 64 bits
//! - IEEE 754 `float` and `double`
//! - Single-byte `char`
//! - Fixed-length arrays of any of the above (raw byte arrays for `char`/`uint8`)
//!
//! Values are written at caller-chosen offsets into caller-owned buffers, in the
//! byte order declared by the schema. Nothing here allocates.

pub mod buffer;
pub mod error;
pub mod types;
pub mod value;

pub use buffer::{get, get_bytes, get_uint, put, put_bytes, put_uint};
pub use error::{ErrorKind, PrimitiveError, Result};
pub use types::{ByteOrder, Presence, PrimitiveType};
pub use value::PrimitiveValue;
