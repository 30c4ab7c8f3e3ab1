//! Brotli codec backend.
//!
//! One-shot compression and decompression over in-memory slices.

use crate::error::{Result, SiloError};

/// Compresses `data` in one shot.
pub(crate) fn compress(
    data: &[u8],
    level: i32,
    window_log: u32,
    size_hint: u64,
) -> Result<Vec<u8>> {
    let mut params = brotli::enc::BrotliEncoderParams::default();
    params.quality = level;
    if window_log != 0 {
        params.lgwin = window_log as i32;
    }
    params.size_hint = size_hint as usize;

    let mut input = data;
    let mut output = Vec::new();
    brotli::BrotliCompress(&mut input, &mut output, &params)
        .map_err(|e| SiloError::Other(format!("Brotli compression failed: {}", e)))?;

    Ok(output)
}

/// Decompresses `data`, which must decode to exactly `expected_output_size`
/// bytes.
pub(crate) fn decompress(data: &[u8], expected_output_size: usize) -> Result<Vec<u8>> {
    let mut input = data;
    let mut output = Vec::with_capacity(expected_output_size);
    brotli::BrotliDecompress(&mut input, &mut output)
        .map_err(|e| SiloError::Corruption(format!("Brotli decompression failed: {}", e)))?;

    if output.len() != expected_output_size {
        return Err(SiloError::Corruption(format!(
            "Brotli decompression size mismatch: expected {}, got {}",
            expected_output_size,
            output.len()
        )));
    }

    Ok(output)
}
