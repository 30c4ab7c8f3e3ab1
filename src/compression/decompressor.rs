// Copyright 2025
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Decoding of framed chunk payloads.

use crate::compression::core::CompressionType;
use crate::error::{Result, SiloError};
use crate::varint::read_vu64;
use bytes::Bytes;

/// Decodes a chunk payload encoded by [`crate::compression::Compressor`].
///
/// For `None` the payload is returned as-is. For a codec, the leading varint
/// carries the uncompressed byte count; decoding fails on a truncated or
/// malformed varint, a codec error, or a decoded length that disagrees with
/// the varint.
pub fn decode_payload(compression_type: CompressionType, src: Bytes) -> Result<Bytes> {
    match compression_type {
        CompressionType::None => Ok(src),
        ctype => {
            let mut framed = src;
            let uncompressed_len = read_vu64(&mut framed)?;
            let expected = usize::try_from(uncompressed_len).map_err(|_| {
                SiloError::Overflow(format!(
                    "Decoded payload length {} exceeds addressable memory",
                    uncompressed_len
                ))
            })?;

            let decoded = match ctype {
                #[cfg(feature = "brotli")]
                CompressionType::Brotli => {
                    crate::compression::brotli::decompress(&framed, expected)?
                }
                #[cfg(feature = "zstd")]
                CompressionType::Zstd => crate::compression::zstd::decompress(&framed, expected)?,
                #[allow(unreachable_patterns)]
                other => return Err(SiloError::UnsupportedCompressionType(other.as_byte())),
            };

            Ok(Bytes::from(decoded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::compressor::Compressor;
    use crate::compression::core::CompressorOptions;
    use bytes::BytesMut;

    fn encode(options: CompressorOptions, payload: &[u8]) -> Bytes {
        let mut compressor = Compressor::new(options).unwrap();
        compressor.write(payload);
        let mut dest = BytesMut::new();
        compressor.finish(&mut dest).unwrap();
        dest.freeze()
    }

    #[test]
    fn test_none_is_identity() {
        let payload = Bytes::from_static(b"uncompressed bytes");
        let decoded = decode_payload(CompressionType::None, payload.clone()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_round_trip() {
        let payload = b"records records records records".repeat(100);
        let framed = encode(CompressorOptions::zstd(3), &payload);

        let decoded = decode_payload(CompressionType::Zstd, framed).unwrap();
        assert_eq!(&decoded[..], &payload[..]);
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn test_brotli_round_trip() {
        let payload = b"records records records records".repeat(100);
        let framed = encode(CompressorOptions::brotli(6), &payload);

        let decoded = decode_payload(CompressionType::Brotli, framed).unwrap();
        assert_eq!(&decoded[..], &payload[..]);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_truncated_varint_rejected() {
        // A lone continuation byte is not a complete varint.
        let framed = Bytes::from_static(&[0x80]);
        assert!(decode_payload(CompressionType::Zstd, framed).is_err());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_length_mismatch_rejected() {
        let payload = b"some payload bytes some payload bytes".repeat(10);
        let framed = encode(CompressorOptions::zstd(3), &payload);

        // Rewrite the leading varint to claim a different uncompressed size.
        let mut tampered = BytesMut::new();
        crate::varint::write_vu64(payload.len() as u64 + 1, &mut tampered);
        let mut original = framed;
        crate::varint::read_vu64(&mut original).unwrap();
        tampered.extend_from_slice(&original);

        assert!(decode_payload(CompressionType::Zstd, tampered.freeze()).is_err());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_garbage_codec_stream_rejected() {
        let mut framed = BytesMut::new();
        crate::varint::write_vu64(100, &mut framed);
        framed.extend_from_slice(b"this is not a valid zstd frame");

        assert!(decode_payload(CompressionType::Zstd, framed.freeze()).is_err());
    }
}
