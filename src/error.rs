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

//! Error types for the framed storage core.

use std::io;
use thiserror::Error;

/// The main error type for silo operations.
#[derive(Debug, Error)]
pub enum SiloError {
    /// An I/O error from the underlying byte source or sink. Not recoverable
    /// at this layer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not begin with a valid signature chunk.
    #[error("Invalid file signature")]
    InvalidFileSignature,

    /// A block header hash does not match its contents.
    #[error("Block header hash mismatch")]
    BlockHeaderHashMismatch,

    /// A chunk header hash does not match its contents.
    #[error("Chunk header hash mismatch")]
    ChunkHeaderHashMismatch,

    /// The chunk payload hash does not match the chunk header.
    #[error("Chunk data hash mismatch")]
    ChunkDataHashMismatch,

    /// The file is corrupt: malformed varints, inconsistent block header
    /// pointers, invalid compression framing.
    #[error("File corruption: {0}")]
    Corruption(String),

    /// The chunk type byte is not one of the canonical values.
    #[error("Unknown chunk type: {0}")]
    UnknownChunkType(u8),

    /// The compression type byte is not recognized, or the codec was not
    /// compiled in.
    #[error("Unsupported compression type: {0}")]
    UnsupportedCompressionType(u8),

    /// The file ends in the middle of a chunk.
    #[error("Truncated file: {0}")]
    Truncated(String),

    /// A position was used where no chunk can begin.
    #[error("Invalid chunk boundary: {0}")]
    InvalidChunkBoundary(u64),

    /// A requested length exceeds implementation limits.
    #[error("Overflow: {0}")]
    Overflow(String),

    /// API misuse: operating on a closed or failed reader/writer, or
    /// recovering a healthy one.
    #[error("{0}")]
    InvalidState(String),

    /// A general error occurred.
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for silo operations.
pub type Result<T> = std::result::Result<T, SiloError>;
