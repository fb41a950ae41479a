use std::{io, result};
use thiserror::Error as ThisError;

/// A type alias for `Result<T, revscan::Error>`.
///
/// This result type embeds the error type in this crate.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when scanning a byte stream backwards.
#[derive(Debug, ThisError)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// A crate private constructor for `Error`.
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// Returns the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwraps this error into its undelying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` if this error was raised because the internal buffer would have grown
    /// past the configured maximum.
    pub fn is_buffer_too_small(&self) -> bool {
        matches!(*self.0, ErrorKind::BufferTooSmall { .. })
    }
}

/// The specific type of an error.
///
/// This list might grow over time and it is not recommended to
/// exhaustively match against it.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Represents an I/O error.
    ///
    /// Can occur when reading the underlying byte source.
    #[error("I/O error while reading source: {0}")]
    Io(#[from] io::Error),
    /// The source returned fewer bytes than requested before reaching its end.
    #[error("short read at offset {offset}: expected {expected} bytes, got {got}")]
    ShortRead {
        /// Absolute offset the read started at.
        offset: u64,
        /// Number of bytes requested.
        expected: usize,
        /// Number of bytes actually delivered.
        got: usize,
    },
    /// Pulling the next chunk would grow the internal buffer past its maximum size.
    #[error("buffer size too small: {required} bytes required, maximum is {max}")]
    BufferTooSmall {
        /// Buffer length the pending read would have produced.
        required: usize,
        /// The configured maximum buffer size.
        max: usize,
    },
    /// A configuration value is out of range.
    #[error("invalid scanner configuration: {0}")]
    InvalidConfig(&'static str),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::new(ErrorKind::Io(err))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::new(kind)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err.into_kind() {
            ErrorKind::Io(err) => err,
            kind => io::Error::new(io::ErrorKind::Other, kind),
        }
    }
}
