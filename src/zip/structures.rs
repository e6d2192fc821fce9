use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// General purpose flag: entry is encrypted.
pub const FLAG_ENCRYPTED: u16 = 0x0001;
/// General purpose flag: CRC and sizes follow the data in a data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Extra field id of the ZIP64 extended information record.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Name suffixes (upper case) of signing-certificate entries.
pub const CERTIFICATE_SUFFIXES: &[&str] = &[".RSA", ".DSA"];

/// Whether the raw entry name ends, ignoring ASCII case, in a certificate
/// suffix.
pub fn is_certificate_name(name: &[u8]) -> bool {
    CERTIFICATE_SUFFIXES.iter().any(|suffix| {
        name.len() >= suffix.len()
            && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
    })
}

/// Local File Header (LFH) - 30 bytes
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid local file header",
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>()?,
            flags: cursor.read_u16::<LittleEndian>()?,
            compression_method: cursor.read_u16::<LittleEndian>()?,
            last_mod_time: cursor.read_u16::<LittleEndian>()?,
            last_mod_date: cursor.read_u16::<LittleEndian>()?,
            crc32: cursor.read_u32::<LittleEndian>()?,
            compressed_size: cursor.read_u32::<LittleEndian>()?,
            uncompressed_size: cursor.read_u32::<LittleEndian>()?,
            file_name_length: cursor.read_u16::<LittleEndian>()?,
            extra_field_length: cursor.read_u16::<LittleEndian>()?,
        })
    }
}

/// Data descriptor trailing an entry written with [`FLAG_DATA_DESCRIPTOR`].
///
/// The leading signature is optional in the wild; sizes are 8 bytes wide
/// when the entry carries ZIP64 information.
#[derive(Debug)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl DataDescriptor {
    pub const SIGNATURE: u32 = 0x0807_4b50;

    pub fn read_from<R: Read + ?Sized>(reader: &mut R, zip64: bool) -> io::Result<Self> {
        let mut crc32 = reader.read_u32::<LittleEndian>()?;
        if crc32 == Self::SIGNATURE {
            crc32 = reader.read_u32::<LittleEndian>()?;
        }

        let (compressed_size, uncompressed_size) = if zip64 {
            (
                reader.read_u64::<LittleEndian>()?,
                reader.read_u64::<LittleEndian>()?,
            )
        } else {
            (
                reader.read_u32::<LittleEndian>()? as u64,
                reader.read_u32::<LittleEndian>()? as u64,
            )
        };

        Ok(Self {
            crc32,
            compressed_size,
            uncompressed_size,
        })
    }
}

/// Entry information taken from a local file header.
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    /// Name bytes exactly as stored in the header
    pub raw_name: Vec<u8>,
    pub compression_method: CompressionMethod,
    pub flags: u16,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
    pub zip64: bool,
}

impl ZipFileEntry {
    /// Build an entry from a parsed header and its variable-length fields.
    pub fn from_local_header(
        header: &LocalFileHeader,
        file_name: &[u8],
        extra_field: &[u8],
        lfh_offset: u64,
    ) -> io::Result<Self> {
        let is_directory = file_name.ends_with(b"/");

        let mut entry = Self {
            // Lossy for display only; lookups go through `raw_name`
            file_name: String::from_utf8_lossy(file_name).into_owned(),
            raw_name: file_name.to_vec(),
            compression_method: CompressionMethod::from_u16(header.compression_method),
            flags: header.flags,
            compressed_size: header.compressed_size as u64,
            uncompressed_size: header.uncompressed_size as u64,
            crc32: header.crc32,
            lfh_offset,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
            is_directory,
            zip64: false,
        };
        entry.apply_extra_field(extra_field)?;
        Ok(entry)
    }

    /// Pick up ZIP64 sizes from the extra field.
    ///
    /// In a local header the ZIP64 record holds the uncompressed size first,
    /// then the compressed size, each present only when the 32-bit field is
    /// saturated.
    fn apply_extra_field(&mut self, extra: &[u8]) -> io::Result<()> {
        let mut cursor = Cursor::new(extra);
        let end = extra.len() as u64;

        while cursor.position() + 4 <= end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()? as u64;
            let field_end = (cursor.position() + field_size).min(end);

            if header_id == ZIP64_EXTRA_ID {
                self.zip64 = true;
                if self.uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    self.uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if self.compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    self.compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
            }
            cursor.set_position(field_end);
        }

        Ok(())
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn is_certificate(&self) -> bool {
        !self.is_directory && is_certificate_name(&self.raw_name)
    }

    /// Whether the stored name is byte-for-byte `path`.
    pub fn has_name(&self, path: &str) -> bool {
        self.raw_name == path.as_bytes()
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
