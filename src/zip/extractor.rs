use tracing::debug;

use crate::error::ScanError;
use crate::io::StreamView;

use super::parser::EntryReader;
use super::structures::ZipFileEntry;

/// Locates entries in a zip payload held in a [`StreamView`].
///
/// Every query rewinds the view and scans from the first local header, so
/// repeated queries on the same view are independent of each other.
pub struct ArchiveScanner<'v, 'a> {
    view: &'v mut StreamView<'a>,
}

impl<'v, 'a> ArchiveScanner<'v, 'a> {
    pub fn new(view: &'v mut StreamView<'a>) -> Self {
        Self { view }
    }

    /// Data of the first entry, in stream order, whose name ends in a
    /// signing-certificate suffix (`.RSA` or `.DSA`, any case).
    pub fn find_certificate_entry(&mut self) -> Result<Option<Vec<u8>>, ScanError> {
        self.find_first(ZipFileEntry::is_certificate)
    }

    /// Data of the first entry whose name is exactly `path`.
    pub fn find_entry(&mut self, path: &str) -> Result<Option<Vec<u8>>, ScanError> {
        self.find_first(|entry| entry.has_name(path))
    }

    /// All local entries in stream order.
    pub fn list_entries(&mut self) -> Result<Vec<ZipFileEntry>, ScanError> {
        let mut reader = EntryReader::new(&mut *self.view)?;
        let mut entries = Vec::new();

        while let Some(mut entry) = reader.next_entry()? {
            if let Some(descriptor) = reader.skip_data(&entry)? {
                entry.crc32 = descriptor.crc32;
                entry.compressed_size = descriptor.compressed_size;
                entry.uncompressed_size = descriptor.uncompressed_size;
            }
            entries.push(entry);
        }

        Ok(entries)
    }

    fn find_first<F>(&mut self, mut matches: F) -> Result<Option<Vec<u8>>, ScanError>
    where
        F: FnMut(&ZipFileEntry) -> bool,
    {
        let mut reader = EntryReader::new(&mut *self.view)?;

        while let Some(entry) = reader.next_entry()? {
            if matches(&entry) {
                debug!(
                    name = %entry.file_name,
                    offset = entry.lfh_offset,
                    size = entry.uncompressed_size,
                    "matched entry"
                );
                return reader.read_data(&entry).map(Some);
            }
            reader.skip_data(&entry)?;
        }

        Ok(None)
    }
}
