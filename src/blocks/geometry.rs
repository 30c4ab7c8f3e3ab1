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

//! Pure arithmetic over file offsets with the fixed block size.

/// The size of a block in bytes. Fixed by the format.
pub const BLOCK_SIZE: u64 = 1 << 16;

/// The size of a block header in bytes.
/// Always 24 bytes: 8 for header_hash, 8 for previous_chunk, 8 for next_chunk.
pub const BLOCK_HEADER_SIZE: u64 = 24;

/// The number of chunk bytes a block carries after its header.
pub const USABLE_BLOCK_SIZE: u64 = BLOCK_SIZE - BLOCK_HEADER_SIZE;

/// Checks if a position falls on a block boundary.
///
/// Block boundaries occur at multiples of [`BLOCK_SIZE`], which includes
/// position 0 (files always start with a block header).
pub fn is_block_boundary(pos: u64) -> bool {
    pos % BLOCK_SIZE == 0
}

/// Calculate how many bytes remain until the next block boundary.
///
/// Returns [`BLOCK_SIZE`] when `pos` is itself a boundary.
pub fn remaining_in_block(pos: u64) -> u64 {
    BLOCK_SIZE - pos % BLOCK_SIZE
}

/// Calculate how many block header bytes remain to be read at `pos`.
///
/// Non-zero exactly when `pos` falls inside the 24-byte header region at the
/// start of a block.
pub fn remaining_in_block_header(pos: u64) -> u64 {
    let offset = pos % BLOCK_SIZE;
    if offset < BLOCK_HEADER_SIZE {
        BLOCK_HEADER_SIZE - offset
    } else {
        0
    }
}

/// Checks whether a chunk can begin at `pos`.
///
/// A chunk may begin at a block boundary (the block header precedes its
/// bytes) or anywhere past the header region of its block, but never inside
/// the header region itself.
pub fn is_possible_chunk_boundary(pos: u64) -> bool {
    let offset = pos % BLOCK_SIZE;
    offset == 0 || offset >= BLOCK_HEADER_SIZE
}

/// Total block header bytes in the file range `[0, pos)`.
fn overhead_before(pos: u64) -> u64 {
    (pos / BLOCK_SIZE) * BLOCK_HEADER_SIZE + std::cmp::min(pos % BLOCK_SIZE, BLOCK_HEADER_SIZE)
}

/// Number of non-block-header bytes in the file range `[begin, end)`.
pub fn distance_without_overhead(begin: u64, end: u64) -> u64 {
    debug_assert!(begin <= end);
    (end - begin) - (overhead_before(end) - overhead_before(begin))
}

/// Computes the file position where a chunk ends.
///
/// `chunk_size` counts the chunk header plus payload, excluding block
/// headers. The chunk end accounts for every block header in the chunk's
/// extent, including the one at `chunk_begin` when the chunk starts exactly
/// at a block boundary:
///
/// ```text
/// overhead_blocks = (chunk_size + (chunk_begin + USABLE_BLOCK_SIZE - 1) % BLOCK_SIZE)
///                     / USABLE_BLOCK_SIZE
/// chunk_end = chunk_begin + chunk_size + overhead_blocks * BLOCK_HEADER_SIZE
/// ```
pub fn chunk_end(chunk_begin: u64, chunk_size: u64) -> u64 {
    let overhead_blocks =
        (chunk_size + (chunk_begin + USABLE_BLOCK_SIZE - 1) % BLOCK_SIZE) / USABLE_BLOCK_SIZE;

    chunk_begin + chunk_size + overhead_blocks * BLOCK_HEADER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_boundaries() {
        assert!(is_block_boundary(0));
        assert!(is_block_boundary(BLOCK_SIZE));
        assert!(is_block_boundary(7 * BLOCK_SIZE));
        assert!(!is_block_boundary(1));
        assert!(!is_block_boundary(BLOCK_SIZE - 1));
    }

    #[test]
    fn test_remaining_in_block() {
        assert_eq!(remaining_in_block(0), BLOCK_SIZE);
        assert_eq!(remaining_in_block(1), BLOCK_SIZE - 1);
        assert_eq!(remaining_in_block(BLOCK_SIZE - 1), 1);
        assert_eq!(remaining_in_block(BLOCK_SIZE + 100), BLOCK_SIZE - 100);
    }

    #[test]
    fn test_remaining_in_block_header() {
        assert_eq!(remaining_in_block_header(0), 24);
        assert_eq!(remaining_in_block_header(5), 19);
        assert_eq!(remaining_in_block_header(23), 1);
        assert_eq!(remaining_in_block_header(24), 0);
        assert_eq!(remaining_in_block_header(BLOCK_SIZE), 24);
        assert_eq!(remaining_in_block_header(BLOCK_SIZE + 30), 0);
    }

    #[test]
    fn test_possible_chunk_boundaries() {
        assert!(is_possible_chunk_boundary(0));
        assert!(!is_possible_chunk_boundary(1));
        assert!(!is_possible_chunk_boundary(23));
        assert!(is_possible_chunk_boundary(24));
        assert!(is_possible_chunk_boundary(100));
        assert!(is_possible_chunk_boundary(BLOCK_SIZE));
        assert!(!is_possible_chunk_boundary(BLOCK_SIZE + 10));
    }

    #[test]
    fn test_distance_without_overhead() {
        // Whole first block: 24 header bytes of overhead.
        assert_eq!(distance_without_overhead(0, BLOCK_SIZE), USABLE_BLOCK_SIZE);
        // Range inside one block touches no header.
        assert_eq!(distance_without_overhead(100, 200), 100);
        // Crossing one boundary subtracts one header.
        assert_eq!(
            distance_without_overhead(BLOCK_SIZE - 10, BLOCK_SIZE + 34),
            20
        );
        // A range ending inside a header region counts the partial header.
        assert_eq!(distance_without_overhead(0, 10), 0);
        assert_eq!(distance_without_overhead(0, 30), 6);
    }

    #[test]
    fn test_chunk_end_within_block() {
        // A 10-byte chunk in the middle of a block crosses nothing.
        assert_eq!(chunk_end(30, 10), 40);
        // A chunk ending exactly at a boundary owns no header there.
        assert_eq!(chunk_end(BLOCK_SIZE - 40, 40), BLOCK_SIZE);
    }

    #[test]
    fn test_chunk_end_at_boundary() {
        // A chunk starting at a boundary pays for that block's header.
        assert_eq!(chunk_end(0, 40), 64);
        assert_eq!(chunk_end(BLOCK_SIZE, 10), BLOCK_SIZE + 34);
    }

    #[test]
    fn test_chunk_end_crossing_blocks() {
        // 70040 bytes starting at 64 cross the boundary at BLOCK_SIZE once.
        assert_eq!(chunk_end(64, 70040), 64 + 70040 + 24);
        // A chunk spanning several blocks pays one header per boundary
        // crossed (here 65536, 131072 and 196608).
        let size = 3 * BLOCK_SIZE;
        let end = chunk_end(64, size);
        assert_eq!(end, 64 + size + 3 * BLOCK_HEADER_SIZE);
    }
}
