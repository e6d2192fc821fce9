use std::io::{self, Read, Seek, SeekFrom};

use crate::buffer::ChunkedBuffer;
use crate::error::BufferError;

/// Whether a [`StreamView`] may release its buffer.
enum Handle<'a> {
    Borrowed(&'a mut ChunkedBuffer),
    Owned(ChunkedBuffer),
}

/// Forward-reading byte stream over a [`ChunkedBuffer`].
///
/// A view either borrows its buffer or owns it; this is fixed when the view is
/// built. Closing a borrowing view never touches the buffer. There is no
/// mark/reset: readers that need to look back must seek explicitly.
pub struct StreamView<'a> {
    handle: Handle<'a>,
}

impl<'a> StreamView<'a> {
    /// Wrap a buffer the caller keeps owning. The buffer is rewound to 0.
    pub fn borrowing(buffer: &'a mut ChunkedBuffer) -> Result<Self, BufferError> {
        Self::rewound(Handle::Borrowed(buffer))
    }

    fn rewound(handle: Handle<'a>) -> Result<Self, BufferError> {
        let mut view = Self { handle };
        view.rewind()?;
        Ok(view)
    }

    fn buffer(&self) -> &ChunkedBuffer {
        match &self.handle {
            Handle::Borrowed(buffer) => &**buffer,
            Handle::Owned(buffer) => buffer,
        }
    }

    fn buffer_mut(&mut self) -> &mut ChunkedBuffer {
        match &mut self.handle {
            Handle::Borrowed(buffer) => &mut **buffer,
            Handle::Owned(buffer) => buffer,
        }
    }

    pub fn is_owning(&self) -> bool {
        matches!(self.handle, Handle::Owned(_))
    }

    /// Bytes left between the cursor and the end of data.
    pub fn available(&self) -> Result<usize, BufferError> {
        let buffer = self.buffer();
        Ok(buffer.len()?.saturating_sub(buffer.position()?))
    }

    pub fn len(&self) -> Result<usize, BufferError> {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> Result<bool, BufferError> {
        self.buffer().is_empty()
    }

    pub fn position(&self) -> Result<usize, BufferError> {
        self.buffer().position()
    }

    pub fn rewind(&mut self) -> Result<(), BufferError> {
        self.buffer_mut().seek(SeekFrom::Start(0)).map(|_| ())
    }

    pub fn read_byte(&mut self) -> Result<Option<u8>, BufferError> {
        self.buffer_mut().read_byte()
    }

    /// Read up to `count` bytes into `dst[offset..]`.
    ///
    /// Returns `None` once the stream is exhausted and `count` is nonzero.
    pub fn read_into(
        &mut self,
        dst: &mut [u8],
        offset: usize,
        count: usize,
    ) -> Result<Option<usize>, BufferError> {
        let n = self.buffer_mut().read_into(dst, offset, count)?;
        if n == 0 && count != 0 && self.available()? == 0 {
            return Ok(None);
        }
        Ok(Some(n))
    }

    pub fn read_chunk(&mut self, dst: &mut [u8]) -> Result<Option<usize>, BufferError> {
        let count = dst.len();
        self.read_into(dst, 0, count)
    }

    /// Move the cursor forward by `n` bytes and return how far it moved.
    pub fn skip(&mut self, n: u64) -> Result<u64, BufferError> {
        let delta = i64::try_from(n).map_err(|_| BufferError::out_of_range("skip", n as i128))?;
        let before = self.position()? as u64;
        let after = self.buffer_mut().seek(SeekFrom::Current(delta))?;
        Ok(after - before)
    }

    /// Close the view; an owning view also closes its buffer.
    pub fn close(&mut self) {
        if let Handle::Owned(buffer) = &mut self.handle {
            buffer.close();
        }
    }
}

impl StreamView<'static> {
    /// Wrap a buffer and take ownership of it. The buffer is rewound to 0.
    pub fn owning(buffer: ChunkedBuffer) -> Result<Self, BufferError> {
        Self::rewound(Handle::Owned(buffer))
    }

    /// Give the buffer back; `None` for a borrowing view.
    pub fn into_buffer(self) -> Option<ChunkedBuffer> {
        match self.handle {
            Handle::Owned(buffer) => Some(buffer),
            Handle::Borrowed(_) => None,
        }
    }
}

impl Read for StreamView<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_chunk(buf)?.unwrap_or(0))
    }
}

impl Seek for StreamView<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.buffer_mut().seek(pos)?)
    }
}
