//! Unsigned LEB128 varints with canonical-encoding enforcement.
//!
//! Reads reject three malformed shapes: a stream ending mid-varint, bits set
//! beyond the representable range in the maximum-length byte, and overlong
//! encodings (a multi-byte encoding whose final byte is zero).

use crate::error::{Result, SiloError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VARINT32_LEN: usize = 5;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT64_LEN: usize = 10;

/// Writes a varint encoding of `value` to the buffer.
#[inline]
pub fn write_vu64(value: u64, buffer: &mut BytesMut) {
    let mut val = value;
    while val >= 0x80 {
        buffer.put_u8((val as u8) | 0x80);
        val >>= 7;
    }
    buffer.put_u8(val as u8);
}

/// Writes a varint encoding of `value` to the buffer.
#[inline]
pub fn write_vu32(value: u32, buffer: &mut BytesMut) {
    write_vu64(u64::from(value), buffer);
}

/// Reads the next varint encoded u64.
#[inline]
pub fn read_vu64(buf: &mut Bytes) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        if !buf.has_remaining() {
            return Err(SiloError::Corruption("Truncated varint".to_string()));
        }

        let byte = buf.get_u8();

        if shift == 7 * (MAX_VARINT64_LEN as u32 - 1) {
            // Last possible byte of a 64-bit varint: only bit 0 may be set.
            if byte >= 2 {
                return Err(SiloError::Corruption(
                    "Varint exceeds 64 bits".to_string(),
                ));
            }
            if byte == 0 {
                return Err(SiloError::Corruption("Overlong varint".to_string()));
            }
            return Ok(result | ((byte as u64) << shift));
        }

        result |= ((byte & 0x7F) as u64) << shift;

        if byte & 0x80 == 0 {
            if byte == 0 && shift > 0 {
                return Err(SiloError::Corruption("Overlong varint".to_string()));
            }
            return Ok(result);
        }

        shift += 7;
    }
}

/// Reads the next varint encoded u32.
#[inline]
pub fn read_vu32(buf: &mut Bytes) -> Result<u32> {
    let mut result: u32 = 0;
    let mut shift: u32 = 0;

    loop {
        if !buf.has_remaining() {
            return Err(SiloError::Corruption("Truncated varint".to_string()));
        }

        let byte = buf.get_u8();

        if shift == 7 * (MAX_VARINT32_LEN as u32 - 1) {
            // Last possible byte of a 32-bit varint: only bits 0..4 may be set.
            if byte >= 0x10 {
                return Err(SiloError::Corruption(
                    "Varint exceeds 32 bits".to_string(),
                ));
            }
            if byte == 0 {
                return Err(SiloError::Corruption("Overlong varint".to_string()));
            }
            return Ok(result | ((byte as u32) << shift));
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            if byte == 0 && shift > 0 {
                return Err(SiloError::Corruption("Overlong varint".to_string()));
            }
            return Ok(result);
        }

        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_varint_round_trip() {
        let mut writable = BytesMut::new();

        write_vu64(0, &mut writable);
        write_vu64(42, &mut writable);
        write_vu64(1787569, &mut writable);
        write_vu64(u64::MAX, &mut writable);
        write_vu32(u32::MAX, &mut writable);

        let mut frozen = writable.freeze();

        assert_eq!(read_vu64(&mut frozen).unwrap(), 0);
        assert_eq!(read_vu64(&mut frozen).unwrap(), 42);
        assert_eq!(read_vu64(&mut frozen).unwrap(), 1787569);
        assert_eq!(read_vu64(&mut frozen).unwrap(), u64::MAX);
        assert_eq!(read_vu32(&mut frozen).unwrap(), u32::MAX);
        assert!(!frozen.has_remaining());
    }

    #[test]
    pub fn test_read_truncated() {
        let mut writable = BytesMut::new();

        for _ in 0..5 {
            writable.put_u8(0x50 | 0x80);
        }

        let mut frozen = writable.freeze();

        assert_eq!(
            read_vu64(&mut frozen).err().unwrap().to_string(),
            "File corruption: Truncated varint".to_string()
        );
    }

    #[test]
    pub fn test_read_out_of_range() {
        // Ten continuation-less bytes with bit 1 set in the tenth.
        let mut writable = BytesMut::new();
        for _ in 0..9 {
            writable.put_u8(0xFF);
        }
        writable.put_u8(0x02);

        let mut frozen = writable.freeze();

        assert_eq!(
            read_vu64(&mut frozen).err().unwrap().to_string(),
            "File corruption: Varint exceeds 64 bits".to_string()
        );
    }

    #[test]
    pub fn test_read_overlong() {
        // 0x80 0x00 encodes 0 in two bytes; the canonical encoding is 0x00.
        let mut writable = BytesMut::new();
        writable.put_u8(0x80);
        writable.put_u8(0x00);

        let mut frozen = writable.freeze();

        assert_eq!(
            read_vu64(&mut frozen).err().unwrap().to_string(),
            "File corruption: Overlong varint".to_string()
        );
    }

    #[test]
    pub fn test_read_overlong_max_length() {
        // Ten bytes whose final byte is zero.
        let mut writable = BytesMut::new();
        for _ in 0..9 {
            writable.put_u8(0x80);
        }
        writable.put_u8(0x00);

        let mut frozen = writable.freeze();

        assert_eq!(
            read_vu64(&mut frozen).err().unwrap().to_string(),
            "File corruption: Overlong varint".to_string()
        );
    }

    #[test]
    pub fn test_vu32_range() {
        // 0xFF 0xFF 0xFF 0xFF 0x1F sets a bit above the 32-bit range.
        let mut writable = BytesMut::new();
        for _ in 0..4 {
            writable.put_u8(0xFF);
        }
        writable.put_u8(0x1F);

        let mut frozen = writable.freeze();

        assert_eq!(
            read_vu32(&mut frozen).err().unwrap().to_string(),
            "File corruption: Varint exceeds 32 bits".to_string()
        );
    }
}
