//! Stream adapters around [`ChunkedBuffer`](crate::ChunkedBuffer).
//!
//! - [`StreamView`]: forward-reading view, also usable as `std::io::Read + Seek`
//! - [`copy`]: bounded-chunk copy between any reader and writer, plus helpers
//!   to fill a buffer from a stream or file and to drain it back out

mod copy;
mod view;

pub use copy::{DEFAULT_CHUNK_SIZE, append_to_file, copy, drain, ingest, read_file};
pub use view::StreamView;
