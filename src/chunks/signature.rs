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

//! The canonical file signature.

use crate::chunks::header::{ChunkHeader, ChunkType};
use crate::error::{Result, SiloError};

/// The serialized signature chunk header (40 bytes).
///
/// Every file starts (after the block header at offset 0) with exactly these
/// bytes: a chunk header with type FileSignature, zero data size, zero
/// records and zero decoded size. The leading 8 bytes are its header hash,
/// bytes 16..24 the hash of the empty payload.
pub const FILE_SIGNATURE_HEADER: [u8; 40] = [
    0x91, 0xba, 0xc2, 0x3c, 0x92, 0x87, 0xe1, 0xa9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xe1, 0x9f, 0x13, 0xc0, 0xe9, 0xb1, 0xc3, 0x72, 0x73, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Validates the field values of a parsed signature chunk header.
///
/// The header hash has already been checked by parsing; this checks that the
/// fields carry the signature's fixed values.
pub fn validate_signature(header: &ChunkHeader) -> Result<()> {
    if header.chunk_type != ChunkType::FileSignature
        || header.data_size != 0
        || header.num_records != 0
        || header.decoded_data_size != 0
    {
        return Err(SiloError::InvalidFileSignature);
    }
    Ok(())
}
