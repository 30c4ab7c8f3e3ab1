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

//! Serialization of the 24-byte block header.

use crate::blocks::geometry::BLOCK_HEADER_SIZE;
use crate::error::{Result, SiloError};
use crate::hash::highway_hash;
use byteorder::{ByteOrder, LittleEndian};

/// A block header, present at every block boundary of a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Distance from the start of the chunk straddling (or starting at) this
    /// boundary backwards to the boundary. Zero iff a chunk starts exactly
    /// here.
    pub previous_chunk: u64,

    /// Distance from this boundary forwards to the next chunk boundary, or
    /// zero when that boundary lies at least a block away.
    pub next_chunk: u64,
}

impl BlockHeader {
    /// Serializes the header, computing the leading hash over the pointer
    /// fields.
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE as usize] {
        let mut bytes = [0u8; BLOCK_HEADER_SIZE as usize];

        LittleEndian::write_u64(&mut bytes[8..16], self.previous_chunk);
        LittleEndian::write_u64(&mut bytes[16..24], self.next_chunk);

        let header_hash = highway_hash(&bytes[8..24]);
        LittleEndian::write_u64(&mut bytes[0..8], header_hash);

        bytes
    }

    /// Parses a header, verifying the stored hash against the pointer fields.
    pub fn parse(bytes: &[u8; BLOCK_HEADER_SIZE as usize]) -> Result<Self> {
        let stored_header_hash = LittleEndian::read_u64(&bytes[0..8]);
        let computed_header_hash = highway_hash(&bytes[8..24]);

        if computed_header_hash != stored_header_hash {
            return Err(SiloError::BlockHeaderHashMismatch);
        }

        Ok(BlockHeader {
            previous_chunk: LittleEndian::read_u64(&bytes[8..16]),
            next_chunk: LittleEndian::read_u64(&bytes[16..24]),
        })
    }
}
