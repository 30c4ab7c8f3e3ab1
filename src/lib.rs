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

//! Silo is a Rust implementation of the Riegeli container format's framed
//! storage core.
//!
//! Files are sequences of chunks (a 40-byte self-hashed header plus an opaque
//! payload) striped across fixed 64 KiB blocks. Every block boundary carries
//! a hash-protected 24-byte header pointing backwards and forwards to chunk
//! boundaries, which gives readers random access by position and the ability
//! to resynchronise after localized corruption. Chunk payloads may be stored
//! verbatim or compressed (Brotli or Zstd) behind a uniform framing that
//! records the uncompressed size.
//!
//! The main entry points are [`writer::ChunkWriter`] and
//! [`reader::ChunkReader`]; [`compression::Compressor`] and
//! [`compression::decode_payload`] handle payload encoding.

pub mod blocks;
pub mod chunks;
pub mod compression;
pub mod constants;
pub mod error;
pub mod hash;
pub mod reader;
pub mod varint;
pub mod writer;


// Re-exports for a cleaner API
pub use chunks::{Chunk, ChunkHeader, ChunkType};
pub use error::{Result, SiloError};
pub use reader::{ChunkReader, RecoveryKind};
pub use writer::{ChunkWriter, ChunkWriterConfig};
