//! Uniform chunk-payload compression.
//!
//! Chunk payloads are stored either verbatim or as a varint of the
//! uncompressed byte count followed by a codec's framed blob. The
//! [`Compressor`] produces that framing; [`decode_payload`] verifies and
//! undoes it.

pub mod compressor;
pub mod core;
pub mod decompressor;

#[cfg(feature = "brotli")]
pub(crate) mod brotli;
#[cfg(feature = "zstd")]
pub(crate) mod zstd;

pub use compressor::Compressor;
pub use core::{CompressionType, CompressorOptions};
pub use decompressor::decode_payload;
