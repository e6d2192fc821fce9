//! Error types shared by the buffer, the stream adapters and the zip scanner.

use std::io;

use thiserror::Error;

/// Contract violations reported by [`ChunkedBuffer`](crate::ChunkedBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The buffer was closed and its blocks released.
    #[error("buffer is closed")]
    Closed,

    /// A position, length, offset or capacity is negative or beyond the
    /// 31-bit length ceiling.
    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i128 },

    /// The buffer has been sealed and no longer accepts writes.
    #[error("buffer is read-only")]
    NotWritable,

    /// The slice, offset and count do not describe a valid region.
    #[error("invalid region: slice length {len}, offset {offset}, count {count}")]
    ArgumentInvalid {
        len: usize,
        offset: usize,
        count: usize,
    },
}

impl BufferError {
    pub(crate) fn out_of_range(what: &'static str, value: i128) -> Self {
        BufferError::OutOfRange { what, value }
    }
}

impl From<BufferError> for io::Error {
    fn from(err: BufferError) -> Self {
        let kind = match err {
            BufferError::Closed => io::ErrorKind::Other,
            BufferError::NotWritable => io::ErrorKind::PermissionDenied,
            BufferError::OutOfRange { .. } | BufferError::ArgumentInvalid { .. } => {
                io::ErrorKind::InvalidInput
            }
        };
        io::Error::new(kind, err)
    }
}

/// Failures while scanning a zip payload.
///
/// A missing entry is not an error: the scanner returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The underlying buffer rejected an operation (closed, out of range...).
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// The payload is not a well-formed zip stream.
    #[error("malformed archive at offset {offset}: {reason}")]
    Decode { offset: u64, reason: String },
}

impl ScanError {
    pub(crate) fn decode(offset: u64, reason: impl Into<String>) -> Self {
        ScanError::Decode {
            offset,
            reason: reason.into(),
        }
    }

    /// Classify an I/O error raised while reading through a
    /// [`StreamView`](crate::StreamView).
    ///
    /// Buffer errors travel through `std::io` wrapped in an `io::Error`; they
    /// are unwrapped here so callers can tell them apart from bad input.
    pub(crate) fn from_io(offset: u64, err: io::Error) -> Self {
        if let Some(inner) = err.get_ref().and_then(|e| e.downcast_ref::<BufferError>()) {
            return ScanError::Buffer(inner.clone());
        }
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ScanError::decode(offset, "unexpected end of data"),
            _ => ScanError::decode(offset, err.to_string()),
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, ScanError::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_error_survives_io_round_trip() {
        let io_err: io::Error = BufferError::Closed.into();
        match ScanError::from_io(12, io_err) {
            ScanError::Buffer(BufferError::Closed) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn eof_becomes_decode_failure() {
        let err = ScanError::from_io(7, io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(err.is_decode());
        assert!(err.to_string().contains("offset 7"));
    }

    #[test]
    fn out_of_range_maps_to_invalid_input() {
        let io_err: io::Error = BufferError::out_of_range("seek target", -1).into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
    }
}
