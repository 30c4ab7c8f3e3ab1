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

//! Chunk headers and the chunk value object.
//!
//! A chunk header is 40 bytes:
//! - header_hash (8 bytes) — hash of the rest of the header
//! - data_size (8 bytes) — size of data (excluding intervening block headers)
//! - data_hash (8 bytes) — hash of data
//! - chunk_type (1 byte) — determines how to interpret data
//! - num_records (7 bytes) — number of records after decoding
//! - decoded_data_size (8 bytes) — sum of record sizes after decoding

use crate::error::{Result, SiloError};
use crate::hash::highway_hash;
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

/// The size of a chunk header in bytes.
pub const CHUNK_HEADER_SIZE: u64 = 40;

/// The largest value representable in the 7-byte num_records field.
pub const MAX_NUM_RECORDS: u64 = (1 << 56) - 1;

/// Enumeration of the canonical chunk types.
///
/// Each chunk type is represented by a single byte in the chunk header.
/// Any other byte value is treated as corruption by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// File signature chunk (0x73, 's'); the first chunk of every file.
    FileSignature = 0x73,
    /// File metadata chunk (0x6d, 'm').
    FileMetadata = 0x6d,
    /// Padding chunk (0x70, 'p'); zero-filled, carries no records.
    Padding = 0x70,
    /// Simple chunk with records (0x72, 'r').
    Simple = 0x72,
    /// Transposed chunk with records (0x74, 't').
    Transpose = 0x74,
}

impl ChunkType {
    /// Convert the ChunkType enum to its byte representation.
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Convert a byte to ChunkType, if valid.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x73 => Some(ChunkType::FileSignature),
            0x6d => Some(ChunkType::FileMetadata),
            0x70 => Some(ChunkType::Padding),
            0x72 => Some(ChunkType::Simple),
            0x74 => Some(ChunkType::Transpose),
            _ => None,
        }
    }
}

/// A chunk header.
///
/// The stored header hash is not a field; it is computed during
/// serialization and verified during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Size of chunk data (excluding block headers).
    pub data_size: u64,
    /// Hash of the chunk data.
    pub data_hash: u64,
    /// Type of the chunk.
    pub chunk_type: ChunkType,
    /// Number of records in the chunk.
    pub num_records: u64,
    /// Total size of decoded records.
    pub decoded_data_size: u64,
}

impl ChunkHeader {
    /// The in-file size of this chunk: header plus payload, excluding block
    /// headers.
    pub fn chunk_size(&self) -> u64 {
        CHUNK_HEADER_SIZE + self.data_size
    }

    /// Serializes the header, computing the leading hash over the remaining
    /// 32 bytes.
    ///
    /// Fails with [`SiloError::Overflow`] if `num_records` does not fit in
    /// its 7-byte field.
    pub fn to_bytes(&self) -> Result<[u8; CHUNK_HEADER_SIZE as usize]> {
        if self.num_records > MAX_NUM_RECORDS {
            return Err(SiloError::Overflow(format!(
                "num_records ({}) exceeds maximum allowed value ({})",
                self.num_records, MAX_NUM_RECORDS
            )));
        }

        let mut bytes = [0u8; CHUNK_HEADER_SIZE as usize];

        LittleEndian::write_u64(&mut bytes[8..16], self.data_size);
        LittleEndian::write_u64(&mut bytes[16..24], self.data_hash);
        // chunk_type and num_records share 8 bytes: the type byte followed by
        // num_records in 7 little-endian bytes.
        bytes[24] = self.chunk_type.as_byte();
        for i in 0..7 {
            bytes[25 + i] = ((self.num_records >> (i * 8)) & 0xFF) as u8;
        }
        LittleEndian::write_u64(&mut bytes[32..40], self.decoded_data_size);

        let header_hash = highway_hash(&bytes[8..40]);
        LittleEndian::write_u64(&mut bytes[0..8], header_hash);

        Ok(bytes)
    }

    /// Parses a header, verifying the stored hash over the trailing 32 bytes
    /// and rejecting unknown chunk types.
    pub fn parse(bytes: &[u8; CHUNK_HEADER_SIZE as usize]) -> Result<Self> {
        let stored_header_hash = LittleEndian::read_u64(&bytes[0..8]);
        let computed_header_hash = highway_hash(&bytes[8..40]);

        if computed_header_hash != stored_header_hash {
            return Err(SiloError::ChunkHeaderHashMismatch);
        }

        let data_size = LittleEndian::read_u64(&bytes[8..16]);
        let data_hash = LittleEndian::read_u64(&bytes[16..24]);

        let chunk_type_byte = bytes[24];
        let chunk_type = match ChunkType::from_byte(chunk_type_byte) {
            Some(ct) => ct,
            None => return Err(SiloError::UnknownChunkType(chunk_type_byte)),
        };

        let mut num_records: u64 = 0;
        for i in 0..7 {
            num_records |= (bytes[25 + i] as u64) << (i * 8);
        }

        let decoded_data_size = LittleEndian::read_u64(&bytes[32..40]);

        Ok(ChunkHeader {
            data_size,
            data_hash,
            chunk_type,
            num_records,
            decoded_data_size,
        })
    }
}

/// A chunk: a header plus the payload it describes.
///
/// Chunks are value objects; the payload is opaque at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub header: ChunkHeader,
    pub data: Bytes,
}

impl Chunk {
    /// Creates a chunk over `data`, computing the payload size and hash.
    pub fn new(chunk_type: ChunkType, data: Bytes, num_records: u64, decoded_data_size: u64) -> Self {
        let header = ChunkHeader {
            data_size: data.len() as u64,
            data_hash: highway_hash(&data),
            chunk_type,
            num_records,
            decoded_data_size,
        };
        Chunk { header, data }
    }

    /// Creates the file signature chunk: an empty chunk identifying the
    /// format, written at offset 0 of every file.
    pub fn file_signature() -> Self {
        Chunk::new(ChunkType::FileSignature, Bytes::new(), 0, 0)
    }

    /// Creates a zero-filled padding chunk with `data_size` payload bytes.
    pub fn padding(data_size: u64) -> Self {
        Chunk::new(
            ChunkType::Padding,
            Bytes::from(vec![0u8; data_size as usize]),
            0,
            0,
        )
    }
}
