//! Bounds-checked primitive access over caller-owned buffers.
//!
//! Every write checks the full extent before touching the buffer, so a failed
//! write leaves the buffer unchanged.

use crate::error::{PrimitiveError, Result};
use crate::types::{ByteOrder, PrimitiveType};
use crate::value::PrimitiveValue;

fn write_extent(buf_len: usize, offset: usize, len: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= buf_len => Ok(end),
        _ => Err(PrimitiveError::BufferOverflow {
            offset,
            len,
            capacity: buf_len,
        }),
    }
}

fn read_extent(buf_len: usize, offset: usize, len: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= buf_len => Ok(end),
        _ => Err(PrimitiveError::BufferUnderflow {
            offset,
            len,
            available: buf_len,
        }),
    }
}

/// Write `value` at `offset`. Returns the number of bytes written.
pub fn put(
    buf: &mut [u8],
    offset: usize,
    value: &PrimitiveValue,
    order: ByteOrder,
) -> Result<usize> {
    let size = value.primitive_type().size();
    let end = write_extent(buf.len(), offset, size)?;
    value.write_to(&mut buf[offset..end], order);
    Ok(size)
}

/// Read a value of type `ty` at `offset`.
pub fn get(
    buf: &[u8],
    offset: usize,
    ty: PrimitiveType,
    order: ByteOrder,
) -> Result<PrimitiveValue> {
    let end = read_extent(buf.len(), offset, ty.size())?;
    Ok(PrimitiveValue::read_from(ty, &buf[offset..end], order))
}

/// Copy raw bytes at `offset`.
pub fn put_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<usize> {
    let end = write_extent(buf.len(), offset, bytes.len())?;
    buf[offset..end].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Borrow `len` raw bytes at `offset` without copying.
pub fn get_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = read_extent(buf.len(), offset, len)?;
    Ok(&buf[offset..end])
}

/// Write an unsigned count or length using the integer type `ty`.
///
/// Used for header, dimension and length-prefix fields.
pub fn put_uint(
    buf: &mut [u8],
    offset: usize,
    ty: PrimitiveType,
    value: u64,
    order: ByteOrder,
) -> Result<usize> {
    let encoded = PrimitiveValue::from_u64(ty, value)?;
    put(buf, offset, &encoded, order)
}

/// Read an unsigned count or length stored as integer type `ty`.
pub fn get_uint(buf: &[u8], offset: usize, ty: PrimitiveType, order: ByteOrder) -> Result<u64> {
    let value = get(buf, offset, ty, order)?;
    value.as_u64().ok_or_else(|| PrimitiveError::Range {
        ty,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_little_endian() {
        let mut buf = [0u8; 8];
        let written = put(
            &mut buf,
            2,
            &PrimitiveValue::UInt32(0x0102_0304),
            ByteOrder::LittleEndian,
        )
        .unwrap();
        assert_eq!(written, 4);
        assert_eq!(&buf[2..6], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(
            get(&buf, 2, PrimitiveType::UInt32, ByteOrder::LittleEndian).unwrap(),
            PrimitiveValue::UInt32(0x0102_0304)
        );
    }

    #[test]
    fn put_get_big_endian() {
        let mut buf = [0u8; 2];
        put(&mut buf, 0, &PrimitiveValue::Int16(-2), ByteOrder::BigEndian).unwrap();
        assert_eq!(buf, [0xFF, 0xFE]);
        assert_eq!(
            get(&buf, 0, PrimitiveType::Int16, ByteOrder::BigEndian).unwrap(),
            PrimitiveValue::Int16(-2)
        );
    }

    #[test]
    fn overflow_leaves_buffer_untouched() {
        let mut buf = [0xAAu8; 7];
        let err =
            put(&mut buf, 0, &PrimitiveValue::UInt64(1), ByteOrder::LittleEndian).unwrap_err();
        assert_eq!(
            err,
            PrimitiveError::BufferOverflow {
                offset: 0,
                len: 8,
                capacity: 7
            }
        );
        assert_eq!(buf, [0xAA; 7]);
    }

    #[test]
    fn underflow_is_reported() {
        let buf = [0u8; 3];
        assert!(matches!(
            get(&buf, 0, PrimitiveType::Float, ByteOrder::LittleEndian),
            Err(PrimitiveError::BufferUnderflow { .. })
        ));
        assert!(matches!(
            get_bytes(&buf, usize::MAX, 2),
            Err(PrimitiveError::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn raw_bytes_are_zero_copy() {
        let mut buf = [0u8; 6];
        put_bytes(&mut buf, 1, b"ABC").unwrap();
        let view = get_bytes(&buf, 1, 3).unwrap();
        assert_eq!(view, b"ABC");
        assert!(std::ptr::eq(view.as_ptr(), buf[1..].as_ptr()));
    }

    #[test]
    fn uint_helpers_range_check() {
        let mut buf = [0u8; 4];
        assert!(matches!(
            put_uint(&mut buf, 0, PrimitiveType::UInt8, 300, ByteOrder::LittleEndian),
            Err(PrimitiveError::Range { .. })
        ));
        put_uint(&mut buf, 0, PrimitiveType::UInt16, 300, ByteOrder::LittleEndian).unwrap();
        assert_eq!(
            get_uint(&buf, 0, PrimitiveType::UInt16, ByteOrder::LittleEndian).unwrap(),
            300
        );
        put(&mut buf, 0, &PrimitiveValue::Int8(-1), ByteOrder::LittleEndian).unwrap();
        assert!(get_uint(&buf, 0, PrimitiveType::Int8, ByteOrder::LittleEndian).is_err());
    }
}
