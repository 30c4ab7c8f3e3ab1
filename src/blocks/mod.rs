//! Block-level layout of silo files.
//!
//! A file is divided into fixed-size 64 KiB blocks. Every block boundary
//! (including offset 0) carries a 24-byte block header; chunk bytes flow
//! across the remainder of each block.
//!
//! ```text
//! +---------------+----------------+----------------+
//! |  header_hash  | previous_chunk |   next_chunk   |
//! |    (8 bytes)  |    (8 bytes)   |    (8 bytes)   |
//! +---------------+----------------+----------------+
//! ```
//!
//! - `header_hash`: HighwayHash of the remaining 16 bytes
//! - `previous_chunk`: distance backwards to the start of the chunk
//!   straddling (or starting at) this boundary; 0 iff a chunk starts here
//! - `next_chunk`: distance forwards to the next chunk boundary, or 0 when
//!   that boundary is at least a block away

pub mod geometry;
pub mod header;

pub use geometry::{
    chunk_end, distance_without_overhead, is_block_boundary, is_possible_chunk_boundary,
    remaining_in_block, remaining_in_block_header, BLOCK_HEADER_SIZE, BLOCK_SIZE,
    USABLE_BLOCK_SIZE,
};
pub use header::BlockHeader;
