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

//! Writer for framed record-container files.
//!
//! The [`ChunkWriter`] owns a byte sink for its lifetime and appends chunks
//! to it, weaving a 24-byte block header into the stream at every 64 KiB
//! block boundary. The first chunk of a new file is always the file
//! signature.

use std::io::{Result as IoResult, Seek, Write};

use bytes::{Bytes, BytesMut};

use crate::blocks::geometry::{
    self, chunk_end, is_block_boundary, is_possible_chunk_boundary, BLOCK_SIZE, USABLE_BLOCK_SIZE,
};
use crate::blocks::header::BlockHeader;
use crate::chunks::header::{Chunk, CHUNK_HEADER_SIZE};
use crate::error::{Result, SiloError};

/// A wrapper around any `Write + Seek` sink that tracks the current position.
///
/// This tracks the current position automatically as writes occur,
/// eliminating the need to call `stream_position()` frequently or manually
/// maintain a position counter.
pub struct WritePositionTracker<Sink: Write + Seek> {
    /// The underlying sink to write to
    sink: Sink,

    /// The current position in the sink
    position: u64,
}

impl<Sink: Write + Seek> WritePositionTracker<Sink> {
    /// Create a new WritePositionTracker wrapping the given sink.
    pub fn new(mut sink: Sink) -> IoResult<Self> {
        let position = sink.stream_position()?;

        Ok(Self { sink, position })
    }

    /// Returns the current position in the sink.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<Sink: Write + Seek> Write for WritePositionTracker<Sink> {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        let bytes_written = self.sink.write(buf)?;
        self.position += bytes_written as u64;
        Ok(bytes_written)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.sink.flush()
    }
}

/// Configuration options for [`ChunkWriter`].
#[derive(Debug, Clone)]
pub struct ChunkWriterConfig {
    /// Number of appended chunks to accumulate in memory before writing them
    /// to the sink. 1 writes every chunk eagerly.
    pub buffered_chunks: usize,
}

impl Default for ChunkWriterConfig {
    fn default() -> Self {
        Self { buffered_chunks: 1 }
    }
}

impl ChunkWriterConfig {
    /// Creates a config buffering up to `buffered_chunks` chunks.
    pub fn with_buffered_chunks(buffered_chunks: usize) -> Result<Self> {
        if buffered_chunks == 0 {
            return Err(SiloError::Other(
                "buffered_chunks must be at least 1".to_string(),
            ));
        }
        Ok(Self { buffered_chunks })
    }
}

enum WriterStatus {
    Open,
    Failed(String),
    Closed,
}

/// Writer for chunks, striping them across fixed-size blocks.
///
/// Every block boundary the output crosses receives a block header whose
/// `previous_chunk` points back to the start of the chunk being written and
/// whose `next_chunk` points forward to its end (0 when the end is at least a
/// block away). Because both pointers derive from the chunk in flight,
/// buffering is purely an I/O batching choice; staged chunks already occupy
/// their final offsets.
///
/// # Usage
///
/// ```no_run
/// use silo::chunks::{Chunk, ChunkType};
/// use silo::writer::ChunkWriter;
/// use bytes::Bytes;
/// use std::fs::File;
///
/// let file = File::create("example.silo").unwrap();
/// let mut writer = ChunkWriter::new(file).unwrap();
///
/// let chunk = Chunk::new(ChunkType::Simple, Bytes::from_static(b"data"), 1, 4);
/// writer.append(&chunk).unwrap();
/// writer.close().unwrap();
/// ```
pub struct ChunkWriter<Sink: Write + Seek> {
    /// The underlying sink, wrapped in a position tracker.
    sink: WritePositionTracker<Sink>,

    /// Logical end position: where the next appended chunk begins. Runs
    /// ahead of the sink position while chunks are staged.
    pos: u64,

    /// Serialized chunks not yet written to the sink.
    staged: Vec<(u64, Bytes)>,

    config: ChunkWriterConfig,

    status: WriterStatus,
}

impl<Sink: Write + Seek> ChunkWriter<Sink> {
    /// Creates a writer for a new file and writes the file signature.
    ///
    /// The sink must be positioned at offset 0.
    pub fn new(sink: Sink) -> Result<Self> {
        Self::with_config(sink, ChunkWriterConfig::default())
    }

    /// Creates a writer for a new file with a custom configuration.
    pub fn with_config(sink: Sink, config: ChunkWriterConfig) -> Result<Self> {
        if config.buffered_chunks == 0 {
            return Err(SiloError::Other(
                "buffered_chunks must be at least 1".to_string(),
            ));
        }

        let sink = WritePositionTracker::new(sink)?;
        if sink.position() != 0 {
            return Err(SiloError::InvalidState(format!(
                "New files start at offset 0, not {}; use for_append to resume",
                sink.position()
            )));
        }

        let mut writer = Self {
            sink,
            pos: 0,
            staged: Vec::new(),
            config,
            status: WriterStatus::Open,
        };
        writer.append(&Chunk::file_signature())?;
        Ok(writer)
    }

    /// Creates a writer that appends to an existing file.
    ///
    /// The sink must be positioned at the end of the last complete chunk,
    /// which is necessarily a possible chunk boundary. No signature is
    /// written.
    pub fn for_append(sink: Sink) -> Result<Self> {
        Self::for_append_with_config(sink, ChunkWriterConfig::default())
    }

    /// Creates an appending writer with a custom configuration.
    pub fn for_append_with_config(sink: Sink, config: ChunkWriterConfig) -> Result<Self> {
        if config.buffered_chunks == 0 {
            return Err(SiloError::Other(
                "buffered_chunks must be at least 1".to_string(),
            ));
        }

        let sink = WritePositionTracker::new(sink)?;
        let pos = sink.position();
        if !is_possible_chunk_boundary(pos) {
            return Err(SiloError::InvalidChunkBoundary(pos));
        }

        Ok(Self {
            sink,
            pos,
            staged: Vec::new(),
            config,
            status: WriterStatus::Open,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        match &self.status {
            WriterStatus::Open => Ok(()),
            WriterStatus::Failed(msg) => {
                Err(SiloError::InvalidState(format!("Writer failed: {}", msg)))
            }
            WriterStatus::Closed => Err(SiloError::InvalidState("Writer is closed".to_string())),
        }
    }

    /// The logical end position of the file: where the next chunk begins.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Appends one chunk.
    ///
    /// The chunk's header must describe its payload (`data_size` matching the
    /// payload length). Depending on the configured buffering the chunk is
    /// written immediately or staged until [`ChunkWriter::flush`].
    pub fn append(&mut self, chunk: &Chunk) -> Result<()> {
        self.ensure_open()?;

        if chunk.header.data_size != chunk.data.len() as u64 {
            return Err(SiloError::InvalidState(format!(
                "Chunk header data_size ({}) does not match payload length ({})",
                chunk.header.data_size,
                chunk.data.len()
            )));
        }

        let header_bytes = chunk.header.to_bytes()?;

        let chunk_begin = self.pos;
        let mut serialized =
            BytesMut::with_capacity(CHUNK_HEADER_SIZE as usize + chunk.data.len());
        serialized.extend_from_slice(&header_bytes);
        serialized.extend_from_slice(&chunk.data);

        let end = chunk_end(chunk_begin, serialized.len() as u64);
        self.staged.push((chunk_begin, serialized.freeze()));
        self.pos = end;

        if self.staged.len() >= self.config.buffered_chunks {
            self.write_staged()?;
        }
        Ok(())
    }

    /// Appends a zero-filled padding chunk so that the next chunk begins
    /// exactly at a block boundary.
    ///
    /// Does nothing when already aligned. When fewer bytes remain in the
    /// current block than a chunk header needs, the padding extends through
    /// the next boundary to the one after it.
    pub fn pad_to_block_boundary(&mut self) -> Result<()> {
        self.ensure_open()?;

        let remaining = geometry::remaining_in_block(self.pos);
        if remaining == BLOCK_SIZE {
            return Ok(());
        }

        let mut length = remaining;
        if length < CHUNK_HEADER_SIZE {
            length += USABLE_BLOCK_SIZE;
        }

        let chunk = Chunk::padding(length - CHUNK_HEADER_SIZE);
        self.append(&chunk)
    }

    /// Writes all staged chunks to the sink and flushes it.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.write_staged()?;
        if let Err(e) = self.sink.flush() {
            let err = SiloError::Io(e);
            self.status = WriterStatus::Failed(err.to_string());
            return Err(err);
        }
        Ok(())
    }

    /// Flushes and closes the writer. Closing an already closed or failed
    /// writer is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.status {
            WriterStatus::Closed | WriterStatus::Failed(_) => {
                self.status = WriterStatus::Closed;
                return Ok(());
            }
            WriterStatus::Open => {}
        }
        self.flush()?;
        self.status = WriterStatus::Closed;
        Ok(())
    }

    fn write_staged(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        for (chunk_begin, bytes) in staged {
            self.write_chunk_bytes(chunk_begin, &bytes)?;
        }
        Ok(())
    }

    /// Writes one serialized chunk, interrupting at every block boundary to
    /// emit a block header.
    fn write_chunk_bytes(&mut self, chunk_begin: u64, bytes: &[u8]) -> Result<()> {
        let end = chunk_end(chunk_begin, bytes.len() as u64);

        let mut written = 0usize;
        while written < bytes.len() {
            let pos = self.sink.position();

            if is_block_boundary(pos) {
                let distance_to_end = end - pos;
                let header = BlockHeader {
                    previous_chunk: pos - chunk_begin,
                    next_chunk: if distance_to_end < BLOCK_SIZE {
                        distance_to_end
                    } else {
                        0
                    },
                };
                self.sink_write_all(&header.to_bytes())?;
                continue;
            }

            let writable = std::cmp::min(
                geometry::remaining_in_block(pos),
                (bytes.len() - written) as u64,
            ) as usize;
            self.sink_write_all(&bytes[written..written + writable])?;
            written += writable;
        }

        Ok(())
    }

    fn sink_write_all(&mut self, buf: &[u8]) -> Result<()> {
        if let Err(e) = self.sink.write_all(buf) {
            let err = SiloError::Io(e);
            self.status = WriterStatus::Failed(err.to_string());
            return Err(err);
        }
        Ok(())
    }
}

impl<Sink: Write + Seek> Drop for ChunkWriter<Sink> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::geometry::BLOCK_HEADER_SIZE;
    use crate::chunks::header::ChunkType;
    use crate::chunks::signature::FILE_SIGNATURE_HEADER;
    use std::io::{Cursor, SeekFrom};

    fn simple_chunk(payload: &[u8], num_records: u64) -> Chunk {
        Chunk::new(
            ChunkType::Simple,
            Bytes::copy_from_slice(payload),
            num_records,
            payload.len() as u64,
        )
    }

    #[test]
    fn test_new_file_starts_with_block_header_and_signature() {
        let mut buf = Vec::new();
        {
            let mut writer = ChunkWriter::new(Cursor::new(&mut buf)).unwrap();
            writer.close().unwrap();
        }

        assert_eq!(buf.len(), 64);

        let mut block_header_bytes = [0u8; BLOCK_HEADER_SIZE as usize];
        block_header_bytes.copy_from_slice(&buf[0..24]);
        let block_header = BlockHeader::parse(&block_header_bytes).unwrap();
        assert_eq!(block_header.previous_chunk, 0);
        assert_eq!(block_header.next_chunk, 64);

        assert_eq!(&buf[24..64], &FILE_SIGNATURE_HEADER);
    }

    #[test]
    fn test_block_header_emitted_at_boundary() {
        let mut buf = Vec::new();
        {
            let mut writer = ChunkWriter::new(Cursor::new(&mut buf)).unwrap();
            writer.append(&simple_chunk(&vec![0x55u8; 70000], 1)).unwrap();
            writer.close().unwrap();
        }

        // signature ends at 64; the chunk occupies [64, 70128) crossing one
        // boundary.
        assert_eq!(buf.len(), 70128);

        let mut header_bytes = [0u8; BLOCK_HEADER_SIZE as usize];
        header_bytes.copy_from_slice(&buf[65536..65560]);
        let header = BlockHeader::parse(&header_bytes).unwrap();
        assert_eq!(header.previous_chunk, 65536 - 64);
        assert_eq!(header.next_chunk, 70128 - 65536);
    }

    #[test]
    fn test_next_chunk_zero_when_end_beyond_block() {
        let mut buf = Vec::new();
        {
            let mut writer = ChunkWriter::new(Cursor::new(&mut buf)).unwrap();
            // Ends more than a block past the first boundary it crosses.
            writer
                .append(&simple_chunk(&vec![1u8; 2 * BLOCK_SIZE as usize], 1))
                .unwrap();
            writer.close().unwrap();
        }

        let mut header_bytes = [0u8; BLOCK_HEADER_SIZE as usize];
        header_bytes.copy_from_slice(&buf[65536..65560]);
        let header = BlockHeader::parse(&header_bytes).unwrap();
        assert_eq!(header.previous_chunk, 65536 - 64);
        assert_eq!(header.next_chunk, 0);
    }

    #[test]
    fn test_buffered_writer_produces_identical_bytes() {
        let chunks: Vec<Chunk> = (0..6)
            .map(|i| simple_chunk(&vec![i as u8 + 1; 20000 * (i + 1)], 3))
            .collect();

        let mut eager = Vec::new();
        {
            let mut writer = ChunkWriter::new(Cursor::new(&mut eager)).unwrap();
            for chunk in &chunks {
                writer.append(chunk).unwrap();
            }
            writer.close().unwrap();
        }

        let mut buffered = Vec::new();
        {
            let config = ChunkWriterConfig::with_buffered_chunks(4).unwrap();
            let mut writer =
                ChunkWriter::with_config(Cursor::new(&mut buffered), config).unwrap();
            for chunk in &chunks {
                writer.append(chunk).unwrap();
            }
            writer.close().unwrap();
        }

        assert_eq!(eager, buffered);
    }

    #[test]
    fn test_pad_to_block_boundary() {
        let mut buf = Vec::new();
        {
            let mut writer = ChunkWriter::new(Cursor::new(&mut buf)).unwrap();
            writer.append(&simple_chunk(b"unaligned", 1)).unwrap();
            writer.pad_to_block_boundary().unwrap();
            assert_eq!(writer.pos() % BLOCK_SIZE, 0);
            // Padding again is a no-op.
            writer.pad_to_block_boundary().unwrap();
            assert_eq!(writer.pos(), BLOCK_SIZE);
            writer.close().unwrap();
        }
        assert_eq!(buf.len(), BLOCK_SIZE as usize);
    }

    #[test]
    fn test_append_after_close_fails() {
        let mut buf = Vec::new();
        let mut writer = ChunkWriter::new(Cursor::new(&mut buf)).unwrap();
        writer.close().unwrap();

        let result = writer.append(&simple_chunk(b"late", 1));
        assert!(matches!(result, Err(SiloError::InvalidState(_))));
        // Closing again stays fine.
        writer.close().unwrap();
    }

    #[test]
    fn test_rejects_mismatched_header() {
        let mut buf = Vec::new();
        let mut writer = ChunkWriter::new(Cursor::new(&mut buf)).unwrap();

        let mut chunk = simple_chunk(b"payload", 1);
        chunk.header.data_size += 1;

        assert!(matches!(
            writer.append(&chunk),
            Err(SiloError::InvalidState(_))
        ));
    }

    #[test]
    fn test_for_append_rejects_impossible_boundary() {
        let mut buf = vec![0u8; 30];
        let mut cursor = Cursor::new(&mut buf);
        cursor.seek(SeekFrom::Start(10)).unwrap();

        assert!(matches!(
            ChunkWriter::for_append(cursor),
            Err(SiloError::InvalidChunkBoundary(10))
        ));
    }
}
