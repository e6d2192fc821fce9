//! Block-list backed, seekable, growable byte buffer.
//!
//! A [`ChunkedBuffer`] stores its contents as a list of fixed-size blocks
//! instead of one contiguous allocation, so growing a large buffer never
//! copies the bytes already written. Only the last block may be shorter
//! than the block size.
//!
//! ## Cursor
//!
//! The buffer keeps a single logical cursor (`position`) together with a
//! physical cursor `(block, offset)`. Every block but the last has exactly
//! `block_size` bytes, so the two always satisfy
//! `position == block * block_size + offset`.
//!
//! ## Limits
//!
//! Lengths and positions are capped at [`MAX_LENGTH`] (`2^31 - 1`). Anything
//! beyond that is reported as [`BufferError::OutOfRange`].

mod growth;

pub use growth::{MIN_GROWTH, grown_capacity};

use std::fmt;
use std::io::{self, SeekFrom};

use tracing::{debug, trace};

use crate::error::BufferError;

/// Default allocation granularity (80 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 81920;

/// Largest logical length a buffer may reach.
pub const MAX_LENGTH: usize = i32::MAX as usize;

/// What `close()` does to a buffer.
///
/// Decided once when the buffer is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// `close()` releases the blocks.
    #[default]
    Releasable,
    /// `close()` is a no-op; the blocks live until the owner drops the buffer.
    Pinned,
}

/// Construction parameters for [`ChunkedBuffer::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOptions {
    pub initial_capacity: usize,
    pub block_size: usize,
    pub retention: Retention,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            retention: Retention::Releasable,
        }
    }
}

impl BufferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.retention = Retention::Pinned;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Writable,
    ReadOnly,
    Closed,
}

/// Physical position: block index and byte offset inside that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct BlockCursor {
    block: usize,
    offset: usize,
}

impl BlockCursor {
    fn pair(self) -> (usize, usize) {
        (self.block, self.offset)
    }
}

/// In-memory byte buffer made of fixed-size blocks.
pub struct ChunkedBuffer {
    blocks: Vec<Vec<u8>>,
    length: usize,
    capacity: usize,
    block_size: usize,
    position: usize,
    cursor: BlockCursor,
    state: State,
    retention: Retention,
}

impl Default for ChunkedBuffer {
    fn default() -> Self {
        Self::empty(DEFAULT_BLOCK_SIZE, Retention::Releasable)
    }
}

impl fmt::Debug for ChunkedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedBuffer")
            .field("length", &self.length)
            .field("capacity", &self.capacity)
            .field("block_size", &self.block_size)
            .field("blocks", &self.blocks.len())
            .field("position", &self.position)
            .field("state", &self.state)
            .field("retention", &self.retention)
            .finish()
    }
}

impl ChunkedBuffer {
    /// Create an empty buffer with the default block size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with `capacity` bytes allocated up front.
    pub fn with_capacity(capacity: usize) -> Result<Self, BufferError> {
        Self::open(BufferOptions::new().initial_capacity(capacity))
    }

    /// Create a buffer from explicit options.
    ///
    /// # Errors
    ///
    /// [`BufferError::OutOfRange`] if the block size is zero or the initial
    /// capacity exceeds [`MAX_LENGTH`].
    pub fn open(options: BufferOptions) -> Result<Self, BufferError> {
        if options.block_size == 0 {
            return Err(BufferError::out_of_range("block size", 0));
        }
        if options.initial_capacity > MAX_LENGTH {
            return Err(BufferError::out_of_range(
                "capacity",
                options.initial_capacity as i128,
            ));
        }

        let mut buffer = Self::empty(options.block_size, options.retention);
        buffer.allocate(options.initial_capacity);
        Ok(buffer)
    }

    fn empty(block_size: usize, retention: Retention) -> Self {
        Self {
            blocks: Vec::new(),
            length: 0,
            capacity: 0,
            block_size,
            position: 0,
            cursor: BlockCursor::default(),
            state: State::Writable,
            retention,
        }
    }

    /// Release all blocks and mark the buffer closed.
    ///
    /// Does nothing on a pinned buffer. Calling it twice is harmless.
    pub fn close(&mut self) {
        if self.retention == Retention::Pinned {
            trace!("close ignored on pinned buffer");
            return;
        }
        if self.state == State::Closed {
            return;
        }

        debug!(
            length = self.length,
            capacity = self.capacity,
            "releasing buffer"
        );
        self.blocks = Vec::new();
        self.length = 0;
        self.capacity = 0;
        self.position = 0;
        self.cursor = BlockCursor::default();
        self.state = State::Closed;
    }

    /// Make the buffer read-only. Reads and seeks keep working.
    pub fn seal(&mut self) -> Result<(), BufferError> {
        self.ensure_open()?;
        self.state = State::ReadOnly;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.state != State::Closed
    }

    pub fn is_writable(&self) -> bool {
        self.state == State::Writable
    }

    pub fn is_pinned(&self) -> bool {
        self.retention == Retention::Pinned
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total bytes currently allocated across all blocks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of logically valid bytes.
    pub fn len(&self) -> Result<usize, BufferError> {
        self.ensure_open()?;
        Ok(self.length)
    }

    pub fn is_empty(&self) -> Result<bool, BufferError> {
        Ok(self.len()? == 0)
    }

    /// Current logical cursor.
    pub fn position(&self) -> Result<usize, BufferError> {
        self.ensure_open()?;
        Ok(self.position)
    }

    /// Map a logical position to `(block index, offset within block)`.
    pub fn locate(&self, position: usize) -> (usize, usize) {
        (position / self.block_size, position % self.block_size)
    }

    /// Copy up to `count` bytes from the cursor into `dst[offset..]`.
    ///
    /// Returns the number of bytes copied, which is 0 at end of data.
    ///
    /// # Errors
    ///
    /// - [`BufferError::Closed`] if the buffer was closed
    /// - [`BufferError::OutOfRange`] if `offset` is past the end of `dst`
    /// - [`BufferError::ArgumentInvalid`] if `dst[offset..]` is shorter than `count`
    pub fn read_into(
        &mut self,
        dst: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<usize, BufferError> {
        self.ensure_open()?;
        check_region(dst.len(), offset, count)?;

        let n = self.length.saturating_sub(self.position).min(count);
        if n == 0 {
            return Ok(0);
        }

        let at = self.cursor.pair();
        self.copy_out(at, &mut dst[offset..offset + n]);
        self.advance(n);
        Ok(n)
    }

    /// Read one byte, or `None` at end of data.
    pub fn read_byte(&mut self) -> Result<Option<u8>, BufferError> {
        self.ensure_open()?;
        if self.position >= self.length {
            return Ok(None);
        }

        let byte = self.blocks[self.cursor.block][self.cursor.offset];
        self.advance(1);
        Ok(Some(byte))
    }

    /// Copy `src[offset..offset + count]` to the cursor.
    ///
    /// If the cursor sits past the current length, the gap is zero-filled.
    ///
    /// # Errors
    ///
    /// - [`BufferError::Closed`] if the buffer was closed
    /// - [`BufferError::NotWritable`] if the buffer was sealed
    /// - [`BufferError::OutOfRange`] for a bad `offset` or if the new length
    ///   would exceed [`MAX_LENGTH`]
    /// - [`BufferError::ArgumentInvalid`] if `src[offset..]` is shorter than `count`
    pub fn write_from(
        &mut self,
        src: &[u8],
        offset: usize,
        count: usize,
    ) -> Result<(), BufferError> {
        self.ensure_writable()?;
        check_region(src.len(), offset, count)?;
        if count == 0 {
            return Ok(());
        }

        let end = self.position.saturating_add(count);
        if end > self.length {
            self.extend_length(end)?;
        }

        let at = self.cursor.pair();
        self.copy_in(at, &src[offset..offset + count]);
        self.advance(count);
        Ok(())
    }

    /// Write one byte at the cursor, with the same growth rules as
    /// [`write_from`](Self::write_from).
    pub fn write_byte(&mut self, byte: u8) -> Result<(), BufferError> {
        self.ensure_writable()?;
        if self.position >= self.length {
            self.extend_length(self.position + 1)?;
        }

        self.blocks[self.cursor.block][self.cursor.offset] = byte;
        self.advance(1);
        Ok(())
    }

    /// Move the cursor and return the new position.
    ///
    /// Seeking past the end is allowed; a later write fills the gap with
    /// zeros.
    pub fn seek(&mut self, target: SeekFrom) -> Result<u64, BufferError> {
        self.ensure_open()?;

        let position = match target {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(n) => self.position as i128 + n as i128,
            SeekFrom::End(n) => self.length as i128 + n as i128,
        };
        if position < 0 || position > MAX_LENGTH as i128 {
            return Err(BufferError::out_of_range("seek target", position));
        }

        self.move_to(position as usize);
        Ok(position as u64)
    }

    /// Truncate or extend the logical length.
    ///
    /// Extending zero-fills the new bytes. Truncating keeps the capacity. The
    /// cursor is clamped to the new length.
    pub fn set_length(&mut self, new_length: usize) -> Result<(), BufferError> {
        self.ensure_writable()?;

        if new_length > self.length {
            self.extend_length(new_length)?;
        } else {
            self.length = new_length;
        }

        if self.position > new_length {
            self.move_to(new_length);
        }
        Ok(())
    }

    /// Copy the whole logical content into a contiguous vector.
    pub fn to_vec(&self) -> Result<Vec<u8>, BufferError> {
        self.to_vec_range(0, self.length)
    }

    /// Copy `count` bytes starting at `offset` into a contiguous vector.
    ///
    /// The cursor does not move.
    pub fn to_vec_range(&self, offset: usize, count: usize) -> Result<Vec<u8>, BufferError> {
        self.ensure_open()?;
        if offset.checked_add(count).is_none_or(|end| end > self.length) {
            return Err(BufferError::out_of_range(
                "range end",
                offset as i128 + count as i128,
            ));
        }

        let mut out = vec![0u8; count];
        if count > 0 {
            self.copy_out(self.locate(offset), &mut out);
        }
        Ok(out)
    }

    fn ensure_open(&self) -> Result<(), BufferError> {
        match self.state {
            State::Closed => Err(BufferError::Closed),
            _ => Ok(()),
        }
    }

    fn ensure_writable(&self) -> Result<(), BufferError> {
        match self.state {
            State::Closed => Err(BufferError::Closed),
            State::ReadOnly => Err(BufferError::NotWritable),
            State::Writable => Ok(()),
        }
    }

    fn move_to(&mut self, position: usize) {
        let (block, offset) = self.locate(position);
        self.position = position;
        self.cursor = BlockCursor { block, offset };
    }

    fn advance(&mut self, count: usize) {
        let offset = self.cursor.offset + count;
        self.position += count;
        self.cursor = BlockCursor {
            block: self.cursor.block + offset / self.block_size,
            offset: offset % self.block_size,
        };
        debug_assert_eq!(self.cursor.pair(), self.locate(self.position));
    }

    /// Grow the logical length, clearing bytes a previous truncation may have
    /// left behind.
    fn extend_length(&mut self, new_length: usize) -> Result<(), BufferError> {
        if new_length > MAX_LENGTH {
            return Err(BufferError::out_of_range("length", new_length as i128));
        }

        let stale_end = new_length.min(self.capacity);
        if self.length < stale_end {
            self.fill_zero(self.length, stale_end);
        }
        self.ensure_capacity(new_length);
        self.length = new_length;
        Ok(())
    }

    fn ensure_capacity(&mut self, needed: usize) -> bool {
        if needed <= self.capacity {
            return false;
        }

        let new_capacity = grown_capacity(self.capacity, needed, self.block_size);
        debug!(
            from = self.capacity,
            to = new_capacity,
            needed,
            "growing buffer"
        );
        self.allocate(new_capacity);
        true
    }

    /// Append zeroed storage until `capacity == new_capacity`.
    ///
    /// A short tail block is topped up to the block size first so that only
    /// the last block is ever partial. Partial blocks reserve a full block up
    /// front, so topping one up never moves its bytes.
    fn allocate(&mut self, new_capacity: usize) {
        let mut remaining = new_capacity.saturating_sub(self.capacity);
        if remaining == 0 {
            return;
        }

        if let Some(tail) = self.blocks.last_mut() {
            let extra = (self.block_size - tail.len()).min(remaining);
            debug_assert!(tail.capacity() >= tail.len() + extra);
            tail.resize(tail.len() + extra, 0);
            remaining -= extra;
        }

        self.blocks.reserve(remaining.div_ceil(self.block_size));
        while remaining > 0 {
            let size = remaining.min(self.block_size);
            self.blocks.push(zeroed_block(size, self.block_size));
            remaining -= size;
        }
        self.capacity = new_capacity;
    }

    fn fill_zero(&mut self, start: usize, end: usize) {
        let (mut block, mut offset) = self.locate(start);
        let mut remaining = end - start;

        while remaining > 0 {
            let chunk = &mut self.blocks[block][offset..];
            let n = chunk.len().min(remaining);
            chunk[..n].fill(0);
            remaining -= n;
            block += 1;
            offset = 0;
        }
    }

    fn copy_out(&self, (mut block, mut offset): (usize, usize), dst: &mut [u8]) {
        let mut done = 0;

        while done < dst.len() {
            let chunk = &self.blocks[block][offset..];
            let n = chunk.len().min(dst.len() - done);
            dst[done..done + n].copy_from_slice(&chunk[..n]);
            done += n;
            block += 1;
            offset = 0;
        }
    }

    fn copy_in(&mut self, (mut block, mut offset): (usize, usize), src: &[u8]) {
        let mut done = 0;

        while done < src.len() {
            let chunk = &mut self.blocks[block][offset..];
            let n = chunk.len().min(src.len() - done);
            chunk[..n].copy_from_slice(&src[done..done + n]);
            done += n;
            block += 1;
            offset = 0;
        }
    }

    #[cfg(test)]
    fn block_lengths(&self) -> Vec<usize> {
        self.blocks.iter().map(Vec::len).collect()
    }
}

/// A zeroed block of `len` bytes with room for a full `block_size`.
fn zeroed_block(len: usize, block_size: usize) -> Vec<u8> {
    if len == block_size {
        return vec![0u8; len];
    }
    let mut block = Vec::with_capacity(block_size);
    block.resize(len, 0);
    block
}

fn check_region(len: usize, offset: usize, count: usize) -> Result<(), BufferError> {
    if offset > len {
        return Err(BufferError::out_of_range("offset", offset as i128));
    }
    if len - offset < count {
        return Err(BufferError::ArgumentInvalid { len, offset, count });
    }
    Ok(())
}

impl io::Write for ChunkedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_from(buf, 0, buf.len())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Every write lands in memory immediately.
        Ok(())
    }
}
