//! Archive held entirely in memory.

use std::io::{self, Read, Write};
use std::path::Path;

use tracing::info;

use crate::buffer::{BufferOptions, ChunkedBuffer};
use crate::error::ScanError;
use crate::io::{self as bufio, DEFAULT_CHUNK_SIZE};
use crate::zip::{self, ZipFileEntry};

/// A zip payload read fully into a [`ChunkedBuffer`] and sealed.
///
/// This is the handle collaborators hold: build it once from a stream or a
/// file, then ask it for entries as often as needed. The buffer is freed when
/// the source is dropped.
#[derive(Debug)]
pub struct ArchiveSource {
    buffer: ChunkedBuffer,
}

impl ArchiveSource {
    /// Read `reader` to the end with default buffer settings.
    pub fn from_reader<R: Read>(reader: R) -> io::Result<Self> {
        Self::from_reader_with(reader, BufferOptions::new(), DEFAULT_CHUNK_SIZE)
    }

    pub fn from_reader_with<R: Read>(
        mut reader: R,
        options: BufferOptions,
        chunk_size: usize,
    ) -> io::Result<Self> {
        let buffer = bufio::ingest(&mut reader, options, chunk_size)?;
        Self::sealed(buffer)
    }

    /// Read the file at `path`.
    pub fn open(path: &Path, options: BufferOptions) -> io::Result<Self> {
        let buffer = bufio::read_file(path, options)?;
        Self::sealed(buffer)
    }

    /// Wrap an already-filled buffer. The buffer is sealed against writes.
    pub fn from_buffer(buffer: ChunkedBuffer) -> io::Result<Self> {
        Self::sealed(buffer)
    }

    fn sealed(mut buffer: ChunkedBuffer) -> io::Result<Self> {
        buffer.seal()?;
        info!(
            bytes = buffer.len()?,
            blocks = buffer.block_count(),
            "archive buffered"
        );
        Ok(Self { buffer })
    }

    pub fn len(&self) -> usize {
        self.buffer.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn buffer(&self) -> &ChunkedBuffer {
        &self.buffer
    }

    pub fn into_buffer(self) -> ChunkedBuffer {
        self.buffer
    }

    /// Data of the first signing-certificate entry.
    pub fn certificate_data(&mut self) -> Result<Option<Vec<u8>>, ScanError> {
        zip::certificate_data(&mut self.buffer)
    }

    /// Data of the entry named exactly `path`.
    pub fn file_data(&mut self, path: &str) -> Result<Option<Vec<u8>>, ScanError> {
        zip::file_data(&mut self.buffer, path)
    }

    pub fn entries(&mut self) -> Result<Vec<ZipFileEntry>, ScanError> {
        zip::list_entries(&mut self.buffer)
    }

    /// Copy the raw archive bytes into `sink`.
    pub fn write_to<W: Write>(&mut self, mut sink: W) -> io::Result<u64> {
        bufio::drain(&mut self.buffer, &mut sink, DEFAULT_CHUNK_SIZE)
    }

    /// Append the raw archive bytes to the file at `path`.
    pub fn append_to_file(&mut self, path: &Path) -> io::Result<u64> {
        bufio::append_to_file(&mut self.buffer, path)
    }
}
