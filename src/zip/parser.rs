//! Streaming reader for ZIP local entries.
//!
//! This module walks the local file headers of an archive held in a
//! [`StreamView`], front to back, without consulting the central directory.
//!
//! ## Parsing Strategy
//!
//! 1. Read a 4-byte signature; anything other than a local file header
//!    (normally the start of the central directory) ends the walk
//! 2. Read the rest of the header, the file name and the extra field
//! 3. Either extract the entry data or skip over it to reach the next header
//!
//! Entries whose sizes live in a trailing data descriptor can only be skipped
//! by inflating them, since the deflate stream is the only thing marking
//! their end.

use flate2::Crc;
use flate2::bufread::DeflateDecoder;
use std::io::{self, BufReader, Read, Seek};

use tracing::trace;

use super::structures::*;
use crate::error::ScanError;
use crate::io::StreamView;

/// Read-ahead window over the view.
const READ_AHEAD: usize = 8 * 1024;

/// Forward-only iterator over the local entries of a zip payload.
///
/// ## Example
///
/// ```ignore
/// let mut reader = EntryReader::new(&mut view)?;
/// while let Some(entry) = reader.next_entry()? {
///     if entry.has_name("classes.dex") {
///         return reader.read_data(&entry);
///     }
///     reader.skip_data(&entry)?;
/// }
/// ```
pub struct EntryReader<'v, 'a> {
    /// The view, with a read-ahead buffer so inflating does not over-read
    reader: BufReader<&'v mut StreamView<'a>>,
    /// Total size of the payload in bytes
    archive_len: u64,
    /// Set once a non-entry signature or the end of data was reached
    finished: bool,
}

impl<'v, 'a> EntryReader<'v, 'a> {
    /// Rewind `view` and start reading entries from its first byte.
    pub fn new(view: &'v mut StreamView<'a>) -> Result<Self, ScanError> {
        view.rewind()?;
        let archive_len = view.len()? as u64;

        Ok(Self {
            reader: BufReader::with_capacity(READ_AHEAD, view),
            archive_len,
            finished: false,
        })
    }

    fn offset(&mut self) -> u64 {
        self.reader.stream_position().unwrap_or(self.archive_len)
    }

    /// Read the next local file header.
    ///
    /// # Returns
    ///
    /// `None` at a clean end of data or when the next record is not a local
    /// file header.
    ///
    /// # Errors
    ///
    /// [`ScanError::Decode`] if a header is cut short.
    pub fn next_entry(&mut self) -> Result<Option<ZipFileEntry>, ScanError> {
        if self.finished {
            return Ok(None);
        }

        let lfh_offset = self.offset();
        let mut header = [0u8; LocalFileHeader::SIZE];

        let got = read_up_to(&mut self.reader, &mut header[..4])
            .map_err(|e| ScanError::from_io(lfh_offset, e))?;
        if got == 0 {
            self.finished = true;
            return Ok(None);
        }
        if got < 4 {
            return Err(ScanError::decode(lfh_offset, "truncated record signature"));
        }
        if &header[..4] != LocalFileHeader::SIGNATURE {
            trace!(offset = lfh_offset, "end of local entries");
            self.finished = true;
            return Ok(None);
        }

        let entry = self
            .read_header_rest(&mut header, lfh_offset)
            .map_err(|e| ScanError::from_io(lfh_offset, e))?;
        trace!(
            name = %entry.file_name,
            offset = lfh_offset,
            method = entry.compression_method.as_u16(),
            "local entry"
        );
        Ok(Some(entry))
    }

    fn read_header_rest(
        &mut self,
        header: &mut [u8; LocalFileHeader::SIZE],
        lfh_offset: u64,
    ) -> io::Result<ZipFileEntry> {
        self.reader.read_exact(&mut header[4..])?;
        let lfh = LocalFileHeader::from_bytes(&header[..])?;

        let mut file_name = vec![0u8; lfh.file_name_length as usize];
        self.reader.read_exact(&mut file_name)?;
        let mut extra_field = vec![0u8; lfh.extra_field_length as usize];
        self.reader.read_exact(&mut extra_field)?;

        ZipFileEntry::from_local_header(&lfh, &file_name, &extra_field, lfh_offset)
    }

    /// Extract the data of `entry`, which must be the entry most recently
    /// returned by [`next_entry`](Self::next_entry).
    ///
    /// The data is checked against the entry's CRC-32 and uncompressed size.
    pub fn read_data(&mut self, entry: &ZipFileEntry) -> Result<Vec<u8>, ScanError> {
        let data_offset = self.offset();
        if entry.is_encrypted() {
            return Err(ScanError::decode(
                data_offset,
                format!("{}: encrypted entries are not supported", entry.file_name),
            ));
        }

        let size_hint = entry.uncompressed_size.min(self.archive_len) as usize;
        let mut data = Vec::with_capacity(size_hint);

        let (crc32, uncompressed_size) = match (
            entry.compression_method,
            entry.has_data_descriptor(),
        ) {
            (CompressionMethod::Stored, false) => {
                (&mut self.reader)
                    .take(entry.compressed_size)
                    .read_to_end(&mut data)
                    .map_err(|e| ScanError::from_io(data_offset, e))?;
                (entry.crc32, entry.uncompressed_size)
            }
            (CompressionMethod::Deflate, false) => {
                let mut limited = (&mut self.reader).take(entry.compressed_size);
                DeflateDecoder::new(&mut limited)
                    .read_to_end(&mut data)
                    .map_err(|e| ScanError::from_io(data_offset, e))?;
                // Drop whatever the deflate stream did not need.
                io::copy(&mut limited, &mut io::sink())
                    .map_err(|e| ScanError::from_io(data_offset, e))?;
                (entry.crc32, entry.uncompressed_size)
            }
            (CompressionMethod::Deflate, true) => {
                DeflateDecoder::new(&mut self.reader)
                    .read_to_end(&mut data)
                    .map_err(|e| ScanError::from_io(data_offset, e))?;
                let descriptor = self.read_descriptor(entry)?;
                (descriptor.crc32, descriptor.uncompressed_size)
            }
            (CompressionMethod::Stored, true) => {
                return Err(ScanError::decode(
                    data_offset,
                    format!(
                        "{}: stored entry with a data descriptor",
                        entry.file_name
                    ),
                ));
            }
            (CompressionMethod::Unknown(method), _) => {
                return Err(ScanError::decode(
                    data_offset,
                    format!(
                        "{}: unsupported compression method {}",
                        entry.file_name, method
                    ),
                ));
            }
        };

        if data.len() as u64 != uncompressed_size {
            return Err(ScanError::decode(
                data_offset,
                format!(
                    "{}: expected {} bytes, got {}",
                    entry.file_name,
                    uncompressed_size,
                    data.len()
                ),
            ));
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != crc32 {
            return Err(ScanError::decode(
                data_offset,
                format!(
                    "{}: crc mismatch (expected {:08x}, got {:08x})",
                    entry.file_name,
                    crc32,
                    crc.sum()
                ),
            ));
        }

        Ok(data)
    }

    /// Move past the data of `entry` without keeping it.
    ///
    /// Returns the trailing data descriptor when the entry has one, since
    /// that is where its real sizes and CRC live.
    pub fn skip_data(&mut self, entry: &ZipFileEntry) -> Result<Option<DataDescriptor>, ScanError> {
        let data_offset = self.offset();

        if entry.has_data_descriptor() {
            if entry.compression_method != CompressionMethod::Deflate {
                return Err(ScanError::decode(
                    data_offset,
                    format!("{}: cannot find the end of entry data", entry.file_name),
                ));
            }
            io::copy(&mut DeflateDecoder::new(&mut self.reader), &mut io::sink())
                .map_err(|e| ScanError::from_io(data_offset, e))?;
            return self.read_descriptor(entry).map(Some);
        }

        if data_offset.saturating_add(entry.compressed_size) > self.archive_len {
            return Err(ScanError::decode(
                data_offset,
                format!("{}: entry data truncated", entry.file_name),
            ));
        }
        self.reader
            .seek_relative(entry.compressed_size as i64)
            .map_err(|e| ScanError::from_io(data_offset, e))?;
        Ok(None)
    }

    fn read_descriptor(&mut self, entry: &ZipFileEntry) -> Result<DataDescriptor, ScanError> {
        let offset = self.offset();
        DataDescriptor::read_from(&mut self.reader, entry.zip64)
            .map_err(|e| ScanError::from_io(offset, e))
    }
}

/// Fill `buf` as far as the reader allows; returns the number of bytes read.
fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
