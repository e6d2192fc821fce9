//! # memzip
//!
//! In-memory archive access built on a chunked byte buffer.
//!
//! A [`ChunkedBuffer`] holds an arbitrarily large blob as a list of
//! fixed-size blocks, so growing it never copies what was already written.
//! On top of it, the [`zip`] module scans a zip payload front to back to pull
//! out a signing-certificate entry or any entry by exact path.
//!
//! ## Features
//!
//! - Seekable, growable buffer with zero-filled growth and a 2^31 - 1 byte
//!   length ceiling
//! - Forward-reading [`StreamView`] implementing `std::io::Read` and `Seek`
//! - Bounded-chunk copy to fill a buffer from any reader and drain it back out
//! - Streaming zip entry lookup (STORED and DEFLATE, data descriptors, ZIP64
//!   sizes) with CRC verification
//! - Malformed archives reported as errors, distinct from missing entries
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use memzip::ArchiveSource;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut source = ArchiveSource::from_reader(File::open("app.apk")?)?;
//!
//!     if let Some(cert) = source.certificate_data()? {
//!         println!("certificate: {} bytes", cert.len());
//!     }
//!     match source.file_data("AndroidManifest.xml")? {
//!         Some(data) => println!("manifest: {} bytes", data.len()),
//!         None => println!("no manifest"),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod cli;
pub mod error;
pub mod io;
pub mod source;
pub mod zip;

pub use buffer::{BufferOptions, ChunkedBuffer, Retention};
pub use cli::Cli;
pub use error::{BufferError, ScanError};
pub use io::StreamView;
pub use source::ArchiveSource;
pub use crate::zip::{ArchiveScanner, ZipFileEntry, certificate_data, file_data};
