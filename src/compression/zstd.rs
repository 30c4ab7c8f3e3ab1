//! Zstd codec backend.
//!
//! One-shot compression and decompression through the zstd bulk API with
//! pre-sized buffers.

use crate::error::{Result, SiloError};

/// Compresses `data` in one shot.
pub(crate) fn compress(data: &[u8], level: i32, window_log: u32) -> Result<Vec<u8>> {
    let max_compressed_size = zstd::zstd_safe::compress_bound(data.len());
    let mut buffer = Vec::with_capacity(max_compressed_size);

    let written = if window_log == 0 {
        buffer.resize(max_compressed_size, 0);
        zstd::bulk::compress_to_buffer(data, &mut buffer, level)
            .map_err(|e| SiloError::Other(format!("Zstd compression failed: {}", e)))?
    } else {
        let mut compressor = zstd::bulk::Compressor::new(level)
            .map_err(|e| SiloError::Other(format!("Zstd compressor init failed: {}", e)))?;
        compressor
            .set_parameter(zstd::zstd_safe::CParameter::WindowLog(window_log))
            .map_err(|e| SiloError::Other(format!("Zstd window log rejected: {}", e)))?;
        compressor
            .compress_to_buffer(data, &mut buffer)
            .map_err(|e| SiloError::Other(format!("Zstd compression failed: {}", e)))?
    };

    buffer.truncate(written);
    Ok(buffer)
}

/// Decompresses `data`, which must decode to exactly `expected_output_size`
/// bytes.
pub(crate) fn decompress(data: &[u8], expected_output_size: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(expected_output_size);
    buffer.resize(expected_output_size, 0);

    let actual_size = zstd::bulk::decompress_to_buffer(data, &mut buffer)
        .map_err(|e| SiloError::Corruption(format!("Zstd decompression failed: {}", e)))?;

    if actual_size != expected_output_size {
        return Err(SiloError::Corruption(format!(
            "Zstd decompression size mismatch: expected {}, got {}",
            expected_output_size, actual_size
        )));
    }

    buffer.truncate(actual_size);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let data = b"A payload with some repetition repetition repetition".repeat(20);

        let compressed = compress(&data, 3, 0).unwrap();
        assert!(compressed.len() < data.len());

        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_round_trip_with_window_log() {
        let data = vec![7u8; 10_000];

        let compressed = compress(&data, 5, 20).unwrap();
        let decompressed = decompress(&compressed, data.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_decompress_rejects_wrong_size() {
        let data = b"short payload";
        let compressed = compress(data, 3, 0).unwrap();

        assert!(decompress(&compressed, data.len() + 1).is_err());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(decompress(b"not a zstd stream", 64).is_err());
    }
}
