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

//! Verified chunk reader with corruption recovery.
//!
//! The [`ChunkReader`] owns a byte source and pulls chunks from it in
//! strictly increasing file-offset order, verifying every block header, chunk
//! header and payload hash on the way. Corruption does not terminate the
//! reader: each failure carries a recovery descriptor, and
//! [`ChunkReader::recover`] resynchronises to the next verifiable chunk
//! boundary by following block header pointers, after which reading resumes.
//!
//! End of file is never an error: operations report it as `Ok(None)` /
//! `Ok(false)` while the reader stays healthy. A file that ends in the middle
//! of a chunk is only reported when the reader is closed.
//!
//! # Usage
//!
//! ```no_run
//! use silo::reader::ChunkReader;
//! use std::fs::File;
//!
//! # fn example() -> silo::error::Result<()> {
//! let file = File::open("example.silo")?;
//! let mut reader = ChunkReader::new(file)?;
//!
//! while let Some(chunk) = reader.read_chunk()? {
//!     println!("chunk with {} records", chunk.header.num_records);
//! }
//! reader.close()?;
//! # Ok(())
//! # }
//! ```

use std::cmp::min;
use std::io::{Read, Result as IoResult, Seek, SeekFrom};

use bytes::BytesMut;
use log::{debug, error, info, warn};

use crate::blocks::geometry::{
    chunk_end, distance_without_overhead, is_block_boundary, is_possible_chunk_boundary,
    remaining_in_block, remaining_in_block_header, BLOCK_HEADER_SIZE, BLOCK_SIZE,
};
use crate::blocks::header::BlockHeader;
use crate::chunks::header::{Chunk, ChunkHeader, CHUNK_HEADER_SIZE};
use crate::chunks::signature::validate_signature;
use crate::error::{Result, SiloError};
use crate::hash::highway_hash;

/// A wrapper around any `Read + Seek` source that tracks the current position.
///
/// This tracks the current position automatically as reads and seeks occur,
/// eliminating the need to call `stream_position()` frequently or manually
/// maintain a position counter.
pub struct ReadPositionTracker<Source: Read + Seek> {
    /// The underlying source to read from
    source: Source,

    /// The current position in the source
    position: u64,
}

impl<Source: Read + Seek> ReadPositionTracker<Source> {
    /// Create a new ReadPositionTracker wrapping the given source.
    pub fn new(mut source: Source) -> IoResult<Self> {
        let position = source.stream_position()?;

        Ok(Self { source, position })
    }

    /// Returns the current position in the source.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Seeks to an absolute position, skipping the syscall when already
    /// there.
    pub fn seek_to(&mut self, pos: u64) -> IoResult<()> {
        if pos != self.position {
            self.seek(SeekFrom::Start(pos))?;
        }
        Ok(())
    }

    /// Returns the total size of the source, preserving the current position.
    pub fn size(&mut self) -> IoResult<u64> {
        let size = self.source.seek(SeekFrom::End(0))?;
        self.source.seek(SeekFrom::Start(self.position))?;
        Ok(size)
    }

    /// Reads until `buf` is full or the source is exhausted; returns the
    /// number of bytes read.
    pub fn read_full(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}

impl<Source: Read + Seek> Read for ReadPositionTracker<Source> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let bytes_read = self.source.read(buf)?;
        self.position += bytes_read as u64;
        Ok(bytes_read)
    }
}

impl<Source: Read + Seek> Seek for ReadPositionTracker<Source> {
    fn seek(&mut self, pos: SeekFrom) -> IoResult<u64> {
        let new_pos = self.source.seek(pos)?;
        self.position = new_pos;
        Ok(new_pos)
    }

    fn stream_position(&mut self) -> IoResult<u64> {
        Ok(self.position)
    }
}

/// How a failed reader can resynchronise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryKind {
    /// The next chunk boundary's location is unknown: advance to the next
    /// block boundary and follow its pointers.
    FindChunk,

    /// The chunk header was trustworthy, so the next chunk's position is
    /// known even though the payload was corrupt.
    HaveChunk,

    /// The reader was closed over a partial chunk; recovery only reports the
    /// skipped byte count.
    ReportSkippedBytes,
}

#[derive(Debug, Clone, Copy)]
struct Recovery {
    kind: RecoveryKind,
    pos: u64,
}

enum ReaderStatus {
    Open,
    Failed(String),
    Closed,
}

/// Explicit steps of the resynchronisation loop.
enum RecoveryStep {
    Classify,
    SeekResync,
    ReadHeader,
    Done,
}

/// Reader for chunks striped across fixed-size blocks.
///
/// `pos` always names the start of the current chunk. Header and payload
/// reads are resumable: how much of the 40-byte chunk header has been
/// consumed is derived from the byte source position via
/// [`distance_without_overhead`], so a read interrupted by end of file
/// continues where it left off once more bytes appear.
pub struct ChunkReader<Source: Read + Seek> {
    /// The underlying source, wrapped in a position tracker.
    source: ReadPositionTracker<Source>,

    /// Start of the current chunk.
    pos: u64,

    /// Raw bytes of the current chunk header, filled incrementally.
    header_buf: [u8; CHUNK_HEADER_SIZE as usize],

    /// The parsed and verified chunk header, once complete.
    header: Option<ChunkHeader>,

    /// Payload bytes accumulated for the current chunk.
    data: BytesMut,

    /// Raw bytes of the most recent block header, filled incrementally.
    block_header_buf: [u8; BLOCK_HEADER_SIZE as usize],

    /// The most recently parsed block header.
    block_header: BlockHeader,

    status: ReaderStatus,

    recovery: Option<Recovery>,

    /// Whether the last read attempt stopped inside a chunk at end of file.
    chunk_is_incomplete: bool,

    /// Record index of the current chunk's first record, when known.
    /// Invalidated by seeks and recoveries to unknown territory.
    record_base: Option<u64>,
}

impl<Source: Read + Seek> ChunkReader<Source> {
    /// Creates a reader over a byte source.
    ///
    /// The source's position becomes the reader's initial chunk boundary;
    /// when it is no possible chunk boundary the reader starts out failed
    /// with `FindChunk` recovery applicable.
    pub fn new(source: Source) -> Result<Self> {
        let source = ReadPositionTracker::new(source)?;
        let pos = source.position();

        let mut reader = Self {
            source,
            pos,
            header_buf: [0u8; CHUNK_HEADER_SIZE as usize],
            header: None,
            data: BytesMut::new(),
            block_header_buf: [0u8; BLOCK_HEADER_SIZE as usize],
            block_header: BlockHeader::default(),
            status: ReaderStatus::Open,
            recovery: None,
            chunk_is_incomplete: false,
            record_base: if pos == 0 { Some(0) } else { None },
        };

        if !is_possible_chunk_boundary(pos) {
            let err = SiloError::InvalidChunkBoundary(pos);
            reader.recovery = Some(Recovery {
                kind: RecoveryKind::FindChunk,
                pos,
            });
            reader.status = ReaderStatus::Failed(err.to_string());
        }

        Ok(reader)
    }

    /// The start position of the current chunk.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Whether the reader is open and not failed.
    pub fn healthy(&self) -> bool {
        matches!(self.status, ReaderStatus::Open)
    }

    /// The pending recovery, if the reader is failed recoverably.
    pub fn recovery_kind(&self) -> Option<RecoveryKind> {
        self.recovery.map(|r| r.kind)
    }

    fn ensure_open(&self) -> Result<()> {
        match &self.status {
            ReaderStatus::Open => Ok(()),
            ReaderStatus::Failed(msg) => Err(SiloError::InvalidState(format!(
                "Reader failed: {}; call recover() to resynchronise",
                msg
            ))),
            ReaderStatus::Closed => Err(SiloError::InvalidState("Reader is closed".to_string())),
        }
    }

    fn fail(&mut self, err: SiloError) -> SiloError {
        error!("chunk reader failed: {}", err);
        self.status = ReaderStatus::Failed(err.to_string());
        err
    }

    fn fail_recoverable(
        &mut self,
        kind: RecoveryKind,
        recoverable_pos: u64,
        err: SiloError,
    ) -> SiloError {
        warn!(
            "chunk reader failed at {} ({:?} recovery from {}): {}",
            self.pos, kind, recoverable_pos, err
        );
        self.recovery = Some(Recovery {
            kind,
            pos: recoverable_pos,
        });
        self.status = ReaderStatus::Failed(err.to_string());
        err
    }

    fn reset_chunk(&mut self) {
        self.header = None;
        self.data.clear();
    }

    /// Marks the current chunk incomplete when the source ended after its
    /// beginning. Returns `false` for use as an EOF-ish result.
    fn note_incomplete(&mut self) -> bool {
        if self.source.position() > self.pos {
            self.chunk_is_incomplete = true;
        }
        false
    }

    fn source_seek(&mut self, pos: u64) -> Result<()> {
        match self.source.seek_to(pos) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(SiloError::Io(e))),
        }
    }

    /// Reads the remainder of a block header when positioned inside one.
    ///
    /// Returns `Ok(false)` on a clean end of file. A hash mismatch fails the
    /// reader with `FindChunk` recovery pointing just past the corrupt
    /// header.
    fn read_block_header(&mut self) -> Result<bool> {
        let remaining = remaining_in_block_header(self.source.position()) as usize;
        if remaining == 0 {
            return Ok(true);
        }

        let start = BLOCK_HEADER_SIZE as usize - remaining;
        let n = match self
            .source
            .read_full(&mut self.block_header_buf[start..])
        {
            Ok(n) => n,
            Err(e) => return Err(self.fail(SiloError::Io(e))),
        };
        if n < remaining {
            return Ok(self.note_incomplete());
        }

        match BlockHeader::parse(&self.block_header_buf) {
            Ok(header) => {
                self.block_header = header;
                Ok(true)
            }
            Err(e) => {
                let recoverable_pos = self.source.position();
                Err(self.fail_recoverable(RecoveryKind::FindChunk, recoverable_pos, e))
            }
        }
    }

    /// Verifies that a block header just read at `boundary` agrees about
    /// where the current chunk begins.
    fn verify_previous_chunk(&mut self, boundary: u64) -> Result<()> {
        let expected = boundary - self.pos;
        if self.block_header.previous_chunk != expected {
            let err = SiloError::Corruption(format!(
                "Chunk boundary is {} but block header at {} implies previous_chunk {} (expected {})",
                self.pos, boundary, self.block_header.previous_chunk, expected
            ));
            let recoverable_pos = self.source.position();
            return Err(self.fail_recoverable(RecoveryKind::FindChunk, recoverable_pos, err));
        }
        Ok(())
    }

    /// Reads and verifies the rest of the current chunk header.
    ///
    /// Returns `Ok(false)` when the source ends first.
    fn read_chunk_header(&mut self) -> Result<bool> {
        loop {
            let pos_before = self.source.position();
            if !self.read_block_header()? {
                return Ok(false);
            }
            if is_block_boundary(pos_before) {
                self.verify_previous_chunk(pos_before)?;
            }

            let header_read = distance_without_overhead(self.pos, self.source.position()) as usize;
            let remaining = CHUNK_HEADER_SIZE as usize - header_read;
            let length_to_read = min(
                remaining as u64,
                remaining_in_block(self.source.position()),
            ) as usize;

            let n = match self
                .source
                .read_full(&mut self.header_buf[header_read..header_read + length_to_read])
            {
                Ok(n) => n,
                Err(e) => return Err(self.fail(SiloError::Io(e))),
            };
            if n < length_to_read {
                return Ok(self.note_incomplete());
            }
            if length_to_read >= remaining {
                break;
            }
        }

        match ChunkHeader::parse(&self.header_buf) {
            Ok(header) => {
                if self.pos == 0 {
                    if let Err(e) = validate_signature(&header) {
                        let recoverable_pos = self.source.position();
                        return Err(self.fail_recoverable(
                            RecoveryKind::FindChunk,
                            recoverable_pos,
                            e,
                        ));
                    }
                }
                self.header = Some(header);
                Ok(true)
            }
            Err(e) => {
                let recoverable_pos = self.source.position();
                Err(self.fail_recoverable(RecoveryKind::FindChunk, recoverable_pos, e))
            }
        }
    }

    /// Ensures the file begins with a valid signature chunk.
    ///
    /// `Ok(false)` means the file is empty or too short to tell.
    pub fn check_file_format(&mut self) -> Result<bool> {
        Ok(self.pull_chunk_header()?.is_some())
    }

    /// Reads enough bytes to populate and verify the current chunk header.
    ///
    /// Returns `Ok(None)` on a clean end of file. At offset 0 the signature
    /// field values are verified in addition to the header hash.
    pub fn pull_chunk_header(&mut self) -> Result<Option<ChunkHeader>> {
        self.ensure_open()?;
        self.chunk_is_incomplete = false;

        if self.source.position() < self.pos {
            self.source_seek(self.pos)?;
        }

        if self.header.is_none() {
            // If the source ran ahead of an unverified header (a seek landed
            // back on this chunk), start the header read over.
            let header_read = distance_without_overhead(self.pos, self.source.position());
            if header_read >= CHUNK_HEADER_SIZE {
                self.source_seek(self.pos)?;
            }
            if !self.read_chunk_header()? {
                return Ok(None);
            }
        }

        Ok(self.header.clone())
    }

    /// Reads the current chunk: header, payload, and every hash in between.
    ///
    /// On success the reader advances to the next chunk. `Ok(None)` reports a
    /// clean end of file (possibly mid-chunk; see [`ChunkReader::close`]).
    pub fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let header = match self.pull_chunk_header()? {
            Some(header) => header,
            None => return Ok(None),
        };

        while (self.data.len() as u64) < header.data_size {
            let pos_before = self.source.position();
            if !self.read_block_header()? {
                return Ok(None);
            }
            if is_block_boundary(pos_before) {
                self.verify_previous_chunk(pos_before)?;
            }

            let want = min(
                header.data_size - self.data.len() as u64,
                remaining_in_block(self.source.position()),
            );
            let n = self.read_payload(want)?;
            if (n as u64) < want {
                self.note_incomplete();
                return Ok(None);
            }
        }

        let end = chunk_end(self.pos, header.chunk_size());

        let computed_data_hash = highway_hash(&self.data);
        if computed_data_hash != header.data_hash {
            // The header hash was correct, so the next chunk is believed to
            // be present right after this one.
            return Err(self.fail_recoverable(
                RecoveryKind::HaveChunk,
                end,
                SiloError::ChunkDataHashMismatch,
            ));
        }

        let data = self.data.split().freeze();
        if let Some(base) = self.record_base {
            self.record_base = Some(base.saturating_add(header.num_records));
        }
        self.pos = end;
        self.header = None;

        Ok(Some(Chunk { header, data }))
    }

    /// Reads up to `want` payload bytes into the accumulation buffer.
    fn read_payload(&mut self, want: u64) -> Result<usize> {
        let to_read = want as usize;
        if to_read == 0 {
            return Ok(0);
        }

        let old_len = self.data.len();
        self.data.resize(old_len + to_read, 0);

        let n = match self.source.read_full(&mut self.data[old_len..old_len + to_read]) {
            Ok(n) => n,
            Err(e) => {
                self.data.truncate(old_len);
                return Err(self.fail(SiloError::Io(e)));
            }
        };
        if n < to_read {
            self.data.truncate(old_len + n);
        }
        Ok(n)
    }

    /// Repositions to an explicit chunk boundary.
    ///
    /// Seeking to a position where no chunk can begin fails with `FindChunk`
    /// recovery; seeking to a position that merely holds no chunk makes the
    /// next read fail the same way.
    pub fn seek(&mut self, new_pos: u64) -> Result<()> {
        self.ensure_open()?;
        self.pos = new_pos;
        self.reset_chunk();
        self.chunk_is_incomplete = false;
        self.record_base = if new_pos == 0 { Some(0) } else { None };

        self.source_seek(new_pos)?;

        if !is_possible_chunk_boundary(new_pos) {
            return Err(self.fail_recoverable(
                RecoveryKind::FindChunk,
                new_pos,
                SiloError::InvalidChunkBoundary(new_pos),
            ));
        }
        Ok(())
    }

    /// Positions to the first chunk beginning at or after the file offset
    /// `new_pos`.
    ///
    /// Jumps near the target through block header pointers instead of
    /// scanning the whole file. `Ok(false)` means the file ends before such a
    /// chunk.
    pub fn seek_to_chunk_after(&mut self, new_pos: u64) -> Result<bool> {
        self.ensure_open()?;
        self.reset_chunk();
        self.chunk_is_incomplete = false;

        let mut block_begin = new_pos - new_pos % BLOCK_SIZE;
        if block_begin > 0 {
            // Clip to the last block header the file actually contains.
            let size = match self.source.size() {
                Ok(size) => size,
                Err(e) => return Err(self.fail(SiloError::Io(e))),
            };
            let max_block_begin = size.saturating_sub(BLOCK_HEADER_SIZE);
            block_begin = min(
                block_begin,
                max_block_begin - max_block_begin % BLOCK_SIZE,
            );
        }

        let mut jump_to_block = self.pos > new_pos;
        if !jump_to_block {
            // The current chunk begins at or before the target; when it also
            // reaches block_begin, scanning forwards beats seeking back.
            if self.pos == new_pos {
                return Ok(true);
            }
            match self.pull_chunk_header()? {
                None => return Ok(false),
                Some(header) => {
                    let end = chunk_end(self.pos, header.chunk_size());
                    if end < block_begin {
                        jump_to_block = true;
                    } else {
                        self.advance_to(end, header.num_records);
                    }
                }
            }
        }

        if jump_to_block {
            self.pos = block_begin;
            self.record_base = if block_begin == 0 { Some(0) } else { None };
            self.reset_chunk();
            self.source_seek(block_begin)?;
            if !self.read_block_header()? {
                return Ok(false);
            }

            loop {
                if self.block_header.previous_chunk == 0 {
                    // A chunk boundary coincides with the block boundary.
                    break;
                }
                if self.block_header.next_chunk != 0 {
                    let implied = match block_begin.checked_add(self.block_header.next_chunk) {
                        Some(pos) => pos,
                        None => {
                            return Err(self.fail(SiloError::Overflow(format!(
                                "Block header at {} implies a chunk boundary beyond the offset range",
                                block_begin
                            ))))
                        }
                    };
                    if !is_possible_chunk_boundary(implied) {
                        let err = SiloError::Corruption(format!(
                            "Block header at {} implies an invalid chunk boundary: {}",
                            block_begin, implied
                        ));
                        let recoverable_pos = self.source.position();
                        return Err(self.fail_recoverable(
                            RecoveryKind::FindChunk,
                            recoverable_pos,
                            err,
                        ));
                    }
                    self.pos = implied;
                    break;
                }

                // The straddling chunk runs at least a block further; look at
                // the next boundary.
                block_begin = match block_begin.checked_add(BLOCK_SIZE) {
                    Some(pos) => pos,
                    None => {
                        return Err(self.fail(SiloError::Overflow(
                            "Block scan ran beyond the offset range".to_string(),
                        )))
                    }
                };
                self.pos = block_begin;
                self.source_seek(block_begin)?;
                if !self.read_block_header()? {
                    return Ok(false);
                }
            }
        }

        loop {
            if self.pos >= new_pos {
                return Ok(true);
            }
            match self.pull_chunk_header()? {
                None => return Ok(false),
                Some(header) => {
                    let end = chunk_end(self.pos, header.chunk_size());
                    self.advance_to(end, header.num_records);
                }
            }
        }
    }

    /// Positions to the chunk whose records cover the global record index
    /// `record_index`.
    ///
    /// Record indices count every record in the file in order; chunks without
    /// records (signature, padding, metadata) are skipped over. Block header
    /// pointers speak in file offsets, so this walks chunk headers linearly,
    /// continuing from the current chunk when its record base is known and
    /// restarting from the head otherwise. `Ok(false)` means the file holds
    /// no record with that index.
    pub fn seek_to_chunk_containing(&mut self, record_index: u64) -> Result<bool> {
        self.ensure_open()?;
        self.chunk_is_incomplete = false;

        let mut first_record = match self.record_base {
            Some(base) if base <= record_index => base,
            _ => {
                self.seek(0)?;
                0
            }
        };

        loop {
            let header = match self.pull_chunk_header()? {
                None => return Ok(false),
                Some(header) => header,
            };

            if record_index < first_record.saturating_add(header.num_records) {
                self.record_base = Some(first_record);
                return Ok(true);
            }

            first_record = first_record.saturating_add(header.num_records);
            let end = chunk_end(self.pos, header.chunk_size());
            self.record_base = Some(first_record);
            self.pos = end;
            self.reset_chunk();
        }
    }

    fn advance_to(&mut self, end: u64, num_records: u64) {
        if let Some(base) = self.record_base {
            self.record_base = Some(base.saturating_add(num_records));
        }
        self.pos = end;
        self.reset_chunk();
    }

    /// Resynchronises a failed reader and returns the number of bytes
    /// skipped.
    ///
    /// For `HaveChunk` the reader moves straight past the corrupt chunk. For
    /// `FindChunk` it advances to the next block boundary and follows that
    /// header's pointers to a plausible chunk start, hopping further blocks
    /// while pointers are absent or nonsensical; corruption encountered on
    /// the way re-enters the loop instead of terminating. Reaching end of
    /// file completes recovery too: the next read then reports a healthy end
    /// of file.
    pub fn recover(&mut self) -> Result<u64> {
        if self.recovery.is_none() {
            return Err(SiloError::InvalidState(
                "Recover called but no recovery is applicable".to_string(),
            ));
        }

        let mut skipped: u64 = 0;
        let mut step = RecoveryStep::Classify;

        loop {
            step = match step {
                RecoveryStep::Classify => {
                    let recovery = match self.recovery.take() {
                        Some(recovery) => recovery,
                        None => {
                            return Err(SiloError::InvalidState(
                                "Recovery descriptor disappeared mid-recovery".to_string(),
                            ))
                        }
                    };
                    debug!(
                        "recovering: {:?} from {} (chunk at {})",
                        recovery.kind, recovery.pos, self.pos
                    );

                    let mut target = recovery.pos;
                    if recovery.kind == RecoveryKind::FindChunk {
                        target = match target.checked_add(remaining_in_block(target)) {
                            Some(target) => target,
                            None => {
                                return Err(self.fail(SiloError::Overflow(
                                    "Resync target beyond the offset range".to_string(),
                                )))
                            }
                        };
                    }
                    skipped = skipped.saturating_add(target.saturating_sub(self.pos));

                    match recovery.kind {
                        RecoveryKind::ReportSkippedBytes => {
                            self.status = ReaderStatus::Closed;
                            RecoveryStep::Done
                        }
                        RecoveryKind::HaveChunk => {
                            self.status = ReaderStatus::Open;
                            self.pos = target;
                            self.reset_chunk();
                            self.record_base = None;
                            RecoveryStep::Done
                        }
                        RecoveryKind::FindChunk => {
                            self.status = ReaderStatus::Open;
                            self.pos = target;
                            self.reset_chunk();
                            self.record_base = None;
                            RecoveryStep::SeekResync
                        }
                    }
                }

                RecoveryStep::SeekResync => {
                    self.source_seek(self.pos)?;
                    RecoveryStep::ReadHeader
                }

                RecoveryStep::ReadHeader => match self.read_block_header() {
                    Ok(true) => {
                        if self.block_header.previous_chunk == 0 {
                            // A chunk starts exactly at this boundary.
                            RecoveryStep::Done
                        } else {
                            let next = if self.block_header.next_chunk == 0 {
                                BLOCK_SIZE
                            } else {
                                self.block_header.next_chunk
                            };
                            skipped = skipped.saturating_add(next);
                            self.pos = match self.pos.checked_add(next) {
                                Some(pos) => pos,
                                None => {
                                    return Err(self.fail(SiloError::Overflow(
                                        "Resync target beyond the offset range".to_string(),
                                    )))
                                }
                            };
                            if self.block_header.next_chunk == 0
                                || !is_possible_chunk_boundary(self.pos)
                            {
                                RecoveryStep::SeekResync
                            } else {
                                RecoveryStep::Done
                            }
                        }
                    }
                    // Clean end of file: recovered, subsequent reads report
                    // EOF.
                    Ok(false) => RecoveryStep::Done,
                    Err(e) => {
                        if self.recovery.is_some() {
                            RecoveryStep::Classify
                        } else {
                            return Err(e);
                        }
                    }
                },

                RecoveryStep::Done => {
                    info!(
                        "recovery complete: resuming at {}, {} bytes skipped",
                        self.pos, skipped
                    );
                    return Ok(skipped);
                }
            };
        }
    }

    /// Closes the reader.
    ///
    /// Fails when a chunk was in progress at end of file, leaving
    /// `ReportSkippedBytes` recovery applicable so the caller can learn the
    /// partial length. Closing again afterwards (or closing a failed reader)
    /// succeeds without doing anything.
    pub fn close(&mut self) -> Result<()> {
        if matches!(self.status, ReaderStatus::Closed) {
            return Ok(());
        }

        self.recovery = None;
        let was_open = matches!(self.status, ReaderStatus::Open);

        if was_open && self.chunk_is_incomplete {
            let skipped_length = self.source.position().saturating_sub(self.pos);
            let err = SiloError::Truncated(format!(
                "Incomplete chunk at {} with length {}",
                self.pos, skipped_length
            ));
            self.chunk_is_incomplete = false;
            self.reset_chunk();
            self.pos = 0;
            self.recovery = Some(Recovery {
                kind: RecoveryKind::ReportSkippedBytes,
                pos: skipped_length,
            });
            self.status = ReaderStatus::Failed(err.to_string());
            return Err(err);
        }

        self.chunk_is_incomplete = false;
        self.status = ReaderStatus::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_at_impossible_boundary_starts_failed() {
        let bytes = vec![0u8; 100];
        let mut cursor = Cursor::new(bytes);
        cursor.seek(SeekFrom::Start(10)).unwrap();

        let mut reader = ChunkReader::new(cursor).unwrap();
        assert!(!reader.healthy());
        assert_eq!(reader.recovery_kind(), Some(RecoveryKind::FindChunk));

        // Operations short-circuit until recover() is called.
        assert!(matches!(
            reader.read_chunk(),
            Err(SiloError::InvalidState(_))
        ));
    }

    #[test]
    fn test_empty_source_is_clean_eof() {
        let mut reader = ChunkReader::new(Cursor::new(Vec::new())).unwrap();
        assert!(!reader.check_file_format().unwrap());
        assert!(reader.read_chunk().unwrap().is_none());
        assert!(reader.healthy());
        reader.close().unwrap();
    }

    #[test]
    fn test_recover_on_healthy_reader_is_an_error() {
        let mut reader = ChunkReader::new(Cursor::new(Vec::new())).unwrap();
        assert!(matches!(
            reader.recover(),
            Err(SiloError::InvalidState(_))
        ));
    }

    #[test]
    fn test_garbage_at_offset_zero_fails_with_find_chunk() {
        let bytes = vec![0u8; 128];
        let mut reader = ChunkReader::new(Cursor::new(bytes)).unwrap();

        assert!(reader.check_file_format().is_err());
        assert_eq!(reader.recovery_kind(), Some(RecoveryKind::FindChunk));
    }
}
