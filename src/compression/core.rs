use crate::error::{Result, SiloError};

/// The compression applied to a chunk payload.
///
/// The byte values are part of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Brotli,
    Zstd,
}

impl CompressionType {
    pub fn as_byte(&self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Brotli => b'b',
            CompressionType::Zstd => b'z',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CompressionType::None),
            b'b' => Some(CompressionType::Brotli),
            b'z' => Some(CompressionType::Zstd),
            _ => None,
        }
    }
}

/// Options for a [`crate::compression::Compressor`].
#[derive(Debug, Clone)]
pub struct CompressorOptions {
    /// Codec to apply.
    pub compression_type: CompressionType,

    /// Codec-specific level (zstd: 1..=22, brotli: 0..=11). Ignored for
    /// `None`.
    pub compression_level: i32,

    /// Codec window size as log2, 0 for the codec default (zstd: 10..=27,
    /// brotli: 10..=24).
    pub window_log: u32,

    /// Expected uncompressed size, used to pre-size buffers. Purely a hint.
    pub size_hint: u64,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self {
            compression_type: CompressionType::None,
            compression_level: 0,
            window_log: 0,
            size_hint: 0,
        }
    }
}

impl CompressorOptions {
    /// Options for storing payloads verbatim.
    pub fn none() -> Self {
        Self::default()
    }

    /// Options for Brotli compression at the given level.
    pub fn brotli(level: i32) -> Self {
        Self {
            compression_type: CompressionType::Brotli,
            compression_level: level,
            ..Self::default()
        }
    }

    /// Options for Zstd compression at the given level.
    pub fn zstd(level: i32) -> Self {
        Self {
            compression_type: CompressionType::Zstd,
            compression_level: level,
            ..Self::default()
        }
    }

    /// Sets the codec window log.
    pub fn with_window_log(mut self, window_log: u32) -> Self {
        self.window_log = window_log;
        self
    }

    /// Sets the expected uncompressed size.
    pub fn with_size_hint(mut self, size_hint: u64) -> Self {
        self.size_hint = size_hint;
        self
    }

    /// Checks level and window ranges for the selected codec.
    pub fn validate(&self) -> Result<()> {
        match self.compression_type {
            CompressionType::None => Ok(()),
            CompressionType::Zstd => {
                if !(1..=22).contains(&self.compression_level) {
                    return Err(SiloError::Other(format!(
                        "Invalid zstd compression level: {}. Must be between 1 and 22.",
                        self.compression_level
                    )));
                }
                if self.window_log != 0 && !(10..=27).contains(&self.window_log) {
                    return Err(SiloError::Other(format!(
                        "Invalid zstd window log: {}. Must be between 10 and 27.",
                        self.window_log
                    )));
                }
                Ok(())
            }
            CompressionType::Brotli => {
                if !(0..=11).contains(&self.compression_level) {
                    return Err(SiloError::Other(format!(
                        "Invalid brotli compression level: {}. Must be between 0 and 11.",
                        self.compression_level
                    )));
                }
                if self.window_log != 0 && !(10..=24).contains(&self.window_log) {
                    return Err(SiloError::Other(format!(
                        "Invalid brotli window log: {}. Must be between 10 and 24.",
                        self.window_log
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_type_bytes() {
        for ctype in [
            CompressionType::None,
            CompressionType::Brotli,
            CompressionType::Zstd,
        ] {
            assert_eq!(CompressionType::from_byte(ctype.as_byte()), Some(ctype));
        }
        assert!(CompressionType::from_byte(b'x').is_none());
    }

    #[test]
    fn test_option_validation() {
        assert!(CompressorOptions::none().validate().is_ok());
        assert!(CompressorOptions::zstd(3).validate().is_ok());
        assert!(CompressorOptions::zstd(0).validate().is_err());
        assert!(CompressorOptions::zstd(23).validate().is_err());
        assert!(CompressorOptions::brotli(11).validate().is_ok());
        assert!(CompressorOptions::brotli(12).validate().is_err());
        assert!(CompressorOptions::zstd(3).with_window_log(20).validate().is_ok());
        assert!(CompressorOptions::zstd(3).with_window_log(9).validate().is_err());
        assert!(CompressorOptions::brotli(6).with_window_log(25).validate().is_err());
    }
}
