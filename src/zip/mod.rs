//! Streaming ZIP entry lookup.
//!
//! This module finds entries in a zip payload held in a
//! [`ChunkedBuffer`] by walking the local file headers from the front.
//!
//! ## Architecture
//!
//! - [`structures`]: local file header, data descriptor and entry types
//! - [`parser`]: forward-only reader that yields entries and their data
//! - [`extractor`]: queries built on top (certificate entry, named entry, listing)
//!
//! ## Why no central directory
//!
//! The payload is already in memory and the queries stop at the first match,
//! so a linear pass over the local headers is enough. The walk ends at the
//! first record that is not a local file header, which in a well-formed
//! archive is the central directory.
//!
//! ## Supported Features
//!
//! - STORED and DEFLATE entries
//! - DEFLATE entries with trailing data descriptors
//! - ZIP64 sizes in the local extra field
//! - CRC-32 and size verification of extracted data
//!
//! ## Limitations
//!
//! - No encryption support
//! - STORED entries with data descriptors cannot be skipped or read

mod extractor;
mod parser;
mod structures;

pub use extractor::ArchiveScanner;
pub use parser::EntryReader;
pub use structures::*;

use crate::buffer::ChunkedBuffer;
use crate::error::ScanError;
use crate::io::StreamView;

/// Data of the first signing-certificate entry in `buffer`.
///
/// `Ok(None)` means the archive has no such entry; a malformed archive is
/// reported as [`ScanError::Decode`].
pub fn certificate_data(buffer: &mut ChunkedBuffer) -> Result<Option<Vec<u8>>, ScanError> {
    let mut view = StreamView::borrowing(buffer)?;
    ArchiveScanner::new(&mut view).find_certificate_entry()
}

/// Data of the entry named exactly `path` in `buffer`.
pub fn file_data(buffer: &mut ChunkedBuffer, path: &str) -> Result<Option<Vec<u8>>, ScanError> {
    let mut view = StreamView::borrowing(buffer)?;
    ArchiveScanner::new(&mut view).find_entry(path)
}

/// Local entries of the archive in `buffer`, in stream order.
pub fn list_entries(buffer: &mut ChunkedBuffer) -> Result<Vec<ZipFileEntry>, ScanError> {
    let mut view = StreamView::borrowing(buffer)?;
    ArchiveScanner::new(&mut view).list_entries()
}
