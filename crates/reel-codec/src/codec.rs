//! Little-endian primitives shared by every message.
//!
//! Writers append to a `Vec<u8>`. Readers consume from the front of a
//! `&mut &[u8]` cursor and borrow string fields straight out of the input,
//! so a decoded view never copies. There is no alignment padding and no
//! self-describing schema beyond the message header.

use crate::error::CodecError;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

/// Write a little-endian u16.
pub fn write_u16_le(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian i32.
pub fn write_i32_le(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian i64.
pub fn write_i64_le(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a little-endian u64.
pub fn write_u64_le(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
///
/// An empty string is written as a zero length with no bytes.
pub fn write_var_str(buf: &mut Vec<u8>, field: &'static str, s: &str) -> Result<(), CodecError> {
    let length = u32::try_from(s.len()).map_err(|_| CodecError::FieldTooLong {
        field,
        length: s.len(),
    })?;
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Encoded size of a length-prefixed string.
pub fn var_str_length(s: &str) -> usize {
    4 + s.len()
}

// ── Primitive readers ───────────────────────────────────────────

/// Split `n` bytes off the front of the cursor.
pub fn take<'a>(r: &mut &'a [u8], n: usize) -> Result<&'a [u8], CodecError> {
    let input: &'a [u8] = *r;
    if input.len() < n {
        return Err(CodecError::Truncated {
            needed: n,
            available: input.len(),
        });
    }
    let (head, tail) = input.split_at(n);
    *r = tail;
    Ok(head)
}

fn take_array<const N: usize>(r: &mut &[u8]) -> Result<[u8; N], CodecError> {
    let bytes = take(r, N)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Read a single byte.
pub fn read_u8(r: &mut &[u8]) -> Result<u8, CodecError> {
    Ok(take_array::<1>(r)?[0])
}

/// Read a little-endian u16.
pub fn read_u16_le(r: &mut &[u8]) -> Result<u16, CodecError> {
    Ok(u16::from_le_bytes(take_array(r)?))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut &[u8]) -> Result<i32, CodecError> {
    Ok(i32::from_le_bytes(take_array(r)?))
}

/// Read a little-endian i64.
pub fn read_i64_le(r: &mut &[u8]) -> Result<i64, CodecError> {
    Ok(i64::from_le_bytes(take_array(r)?))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut &[u8]) -> Result<u64, CodecError> {
    Ok(u64::from_le_bytes(take_array(r)?))
}

/// Read a length-prefixed UTF-8 string, borrowing it from the input.
pub fn read_var_str<'a>(r: &mut &'a [u8], field: &'static str) -> Result<&'a str, CodecError> {
    let length = u32::from_le_bytes(take_array(r)?) as usize;
    let bytes = take(r, length)?;
    std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { field })
}

// ── Fixed-offset access ─────────────────────────────────────────

/// Read a little-endian i32 at `offset`.
pub fn get_i32_at(buf: &[u8], offset: usize) -> Result<i32, CodecError> {
    let mut r = buf.get(offset..).unwrap_or_default();
    read_i32_le(&mut r)
}

/// Read a little-endian i64 at `offset`.
pub fn get_i64_at(buf: &[u8], offset: usize) -> Result<i64, CodecError> {
    let mut r = buf.get(offset..).unwrap_or_default();
    read_i64_le(&mut r)
}

/// Read a little-endian u64 at `offset`.
pub fn get_u64_at(buf: &[u8], offset: usize) -> Result<u64, CodecError> {
    let mut r = buf.get(offset..).unwrap_or_default();
    read_u64_le(&mut r)
}

fn put_at(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<(), CodecError> {
    let available = buf.len().saturating_sub(offset);
    match buf.get_mut(offset..offset + bytes.len()) {
        Some(dst) => {
            dst.copy_from_slice(bytes);
            Ok(())
        }
        None => Err(CodecError::Truncated {
            needed: bytes.len(),
            available,
        }),
    }
}

/// Overwrite a little-endian i32 at `offset`.
pub fn put_i32_at(buf: &mut [u8], offset: usize, v: i32) -> Result<(), CodecError> {
    put_at(buf, offset, &v.to_le_bytes())
}

/// Overwrite a little-endian i64 at `offset`.
pub fn put_i64_at(buf: &mut [u8], offset: usize, v: i64) -> Result<(), CodecError> {
    put_at(buf, offset, &v.to_le_bytes())
}

/// Overwrite a single byte at `offset`.
pub fn put_u8_at(buf: &mut [u8], offset: usize, v: u8) -> Result<(), CodecError> {
    put_at(buf, offset, &[v])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn roundtrip_i64(v in any::<i64>()) {
            let mut buf = Vec::new();
            write_i64_le(&mut buf, v);
            let got = read_i64_le(&mut buf.as_slice()).unwrap();
            prop_assert_eq!(v, got);
        }

        #[test]
        fn roundtrip_string(s in "[a-zA-Z0-9:?=|_]{0,64}") {
            let mut buf = Vec::new();
            write_var_str(&mut buf, "s", &s).unwrap();
            prop_assert_eq!(buf.len(), var_str_length(&s));
            let got = read_var_str(&mut buf.as_slice(), "s").unwrap();
            prop_assert_eq!(s.as_str(), got);
        }
    }

    #[test]
    fn empty_string_is_zero_length_field() {
        let mut buf = Vec::new();
        write_var_str(&mut buf, "s", "").unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
    }

    #[test]
    fn short_read_reports_truncation() {
        let buf = [1u8, 2, 3];
        let err = read_i32_le(&mut buf.as_slice()).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                needed: 4,
                available: 3
            }
        );
    }

    #[test]
    fn string_length_past_end_is_truncation() {
        let mut buf = Vec::new();
        write_i32_le(&mut buf, 10);
        buf.extend_from_slice(b"abc");
        assert!(matches!(
            read_var_str(&mut buf.as_slice(), "s"),
            Err(CodecError::Truncated { needed: 10, available: 3 })
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut buf = Vec::new();
        write_i32_le(&mut buf, 2);
        buf.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(
            read_var_str(&mut buf.as_slice(), "channel"),
            Err(CodecError::InvalidUtf8 { field: "channel" })
        );
    }

    #[test]
    fn fixed_offset_access() {
        let mut buf = vec![0u8; 16];
        put_i64_at(&mut buf, 8, -1).unwrap();
        put_i32_at(&mut buf, 0, 42).unwrap();
        assert_eq!(get_i64_at(&buf, 8).unwrap(), -1);
        assert_eq!(get_i32_at(&buf, 0).unwrap(), 42);
        assert!(put_i64_at(&mut buf, 12, 0).is_err());
        assert!(get_i64_at(&buf, 20).is_err());
    }
}
