use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::debug;

use super::StreamView;
use crate::buffer::{BufferOptions, ChunkedBuffer, DEFAULT_BLOCK_SIZE};

/// Default chunk size for [`copy`]; matches the buffer block size.
pub const DEFAULT_CHUNK_SIZE: usize = DEFAULT_BLOCK_SIZE;

/// Copy everything from `source` into `sink` in chunks of at most
/// `chunk_size` bytes, then flush `sink` once.
///
/// Any read or write error aborts the copy. Returns the number of bytes
/// copied.
pub fn copy<R, W>(source: &mut R, sink: &mut W, chunk_size: usize) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "chunk size must be nonzero",
        ));
    }

    let mut chunk = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&chunk[..n])?;
        total += n as u64;
    }

    sink.flush()?;
    Ok(total)
}

/// Read `source` to the end into a fresh buffer.
pub fn ingest<R: Read + ?Sized>(
    source: &mut R,
    options: BufferOptions,
    chunk_size: usize,
) -> io::Result<ChunkedBuffer> {
    let mut buffer = ChunkedBuffer::open(options)?;
    let total = copy(source, &mut buffer, chunk_size)?;
    debug!(
        bytes = total,
        blocks = buffer.block_count(),
        "ingested stream"
    );
    Ok(buffer)
}

/// Copy the full contents of `buffer` into `sink`.
///
/// The buffer's cursor ends up at the end of data.
pub fn drain<W: Write + ?Sized>(
    buffer: &mut ChunkedBuffer,
    sink: &mut W,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut view = StreamView::borrowing(buffer)?;
    copy(&mut view, sink, chunk_size)
}

/// Load a whole file into a fresh buffer, pre-sized to the file length.
pub fn read_file(path: &Path, options: BufferOptions) -> io::Result<ChunkedBuffer> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();
    let options = match usize::try_from(size) {
        Ok(size) if size > options.initial_capacity => options.initial_capacity(size),
        _ => options,
    };
    ingest(&mut file, options, DEFAULT_CHUNK_SIZE)
}

/// Append the full contents of `buffer` to the file at `path`, creating it if
/// needed.
pub fn append_to_file(buffer: &mut ChunkedBuffer, path: &Path) -> io::Result<u64> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    drain(buffer, &mut file, DEFAULT_CHUNK_SIZE)
}
