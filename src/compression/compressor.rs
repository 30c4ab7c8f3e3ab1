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

//! The accumulating payload compressor.

use crate::compression::core::{CompressionType, CompressorOptions};
use crate::error::{Result, SiloError};
use crate::varint::write_vu64;
use bytes::BytesMut;

/// Accumulates a chunk payload and emits its framed encoding.
///
/// The compressor is open while owned; [`Compressor::finish`] consumes it,
/// writing either the accumulated bytes verbatim (`None`) or a varint of the
/// uncompressed byte count followed by the codec's compressed blob. A codec
/// failure consumes the compressor too; the destination contents are then
/// unspecified and the chunk must not be written.
pub struct Compressor {
    options: CompressorOptions,
    uncompressed: BytesMut,
}

impl Compressor {
    /// Creates a compressor, validating the options against the codec.
    pub fn new(options: CompressorOptions) -> Result<Self> {
        options.validate()?;
        let uncompressed = BytesMut::with_capacity(options.size_hint as usize);
        Ok(Self {
            options,
            uncompressed,
        })
    }

    /// Appends payload bytes.
    pub fn write(&mut self, data: &[u8]) {
        self.uncompressed.extend_from_slice(data);
    }

    /// Number of uncompressed bytes accumulated so far.
    pub fn len(&self) -> u64 {
        self.uncompressed.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.uncompressed.is_empty()
    }

    /// Encodes the accumulated bytes into `dest` and closes the compressor.
    pub fn finish(self, dest: &mut BytesMut) -> Result<()> {
        match self.options.compression_type {
            CompressionType::None => {
                dest.extend_from_slice(&self.uncompressed);
                Ok(())
            }
            #[cfg(feature = "brotli")]
            CompressionType::Brotli => {
                let compressed = crate::compression::brotli::compress(
                    &self.uncompressed,
                    self.options.compression_level,
                    self.options.window_log,
                    self.uncompressed.len() as u64,
                )?;
                write_vu64(self.uncompressed.len() as u64, dest);
                dest.extend_from_slice(&compressed);
                Ok(())
            }
            #[cfg(feature = "zstd")]
            CompressionType::Zstd => {
                let compressed = crate::compression::zstd::compress(
                    &self.uncompressed,
                    self.options.compression_level,
                    self.options.window_log,
                )?;
                write_vu64(self.uncompressed.len() as u64, dest);
                dest.extend_from_slice(&compressed);
                Ok(())
            }
            #[allow(unreachable_patterns)]
            other => Err(SiloError::UnsupportedCompressionType(other.as_byte())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::read_vu64;

    #[test]
    fn test_none_passes_through() {
        let mut compressor = Compressor::new(CompressorOptions::none()).unwrap();
        compressor.write(b"first ");
        compressor.write(b"second");
        assert_eq!(compressor.len(), 12);

        let mut dest = BytesMut::new();
        compressor.finish(&mut dest).unwrap();
        assert_eq!(&dest[..], b"first second");
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_zstd_framing_carries_uncompressed_length() {
        let payload = b"framed payload framed payload framed payload".repeat(50);

        let mut compressor = Compressor::new(CompressorOptions::zstd(3)).unwrap();
        compressor.write(&payload);

        let mut dest = BytesMut::new();
        compressor.finish(&mut dest).unwrap();

        let mut framed = dest.freeze();
        let uncompressed_len = read_vu64(&mut framed).unwrap();
        assert_eq!(uncompressed_len, payload.len() as u64);
        assert!(framed.len() < payload.len());
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn test_brotli_framing_carries_uncompressed_length() {
        let payload = b"framed payload framed payload framed payload".repeat(50);

        let mut compressor = Compressor::new(CompressorOptions::brotli(6)).unwrap();
        compressor.write(&payload);

        let mut dest = BytesMut::new();
        compressor.finish(&mut dest).unwrap();

        let mut framed = dest.freeze();
        let uncompressed_len = read_vu64(&mut framed).unwrap();
        assert_eq!(uncompressed_len, payload.len() as u64);
        assert!(framed.len() < payload.len());
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn test_empty_payload_framing() {
        let compressor = Compressor::new(CompressorOptions::zstd(1)).unwrap();

        let mut dest = BytesMut::new();
        compressor.finish(&mut dest).unwrap();

        let mut framed = dest.freeze();
        assert_eq!(read_vu64(&mut framed).unwrap(), 0);
    }

    #[test]
    fn test_rejects_invalid_options() {
        assert!(Compressor::new(CompressorOptions::zstd(99)).is_err());
    }
}
