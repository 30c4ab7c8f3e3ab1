//! Hashing for silo files.

use crate::constants::HIGHWAY_HASH_KEY;
use highway::{HighwayHash, HighwayHasher, Key};

/// Calculate the HighwayHash of a sequence of bytes.
///
/// The format uses HighwayHash-64 with a fixed key for block headers, chunk
/// headers and chunk payloads. Header hashes are this function applied to the
/// header bytes after the first 8 (the slot storing the hash itself).
pub fn highway_hash(data: &[u8]) -> u64 {
    let mut hasher = HighwayHasher::new(Key(HIGHWAY_HASH_KEY));
    hasher.append(data);
    hasher.finalize64()
}
