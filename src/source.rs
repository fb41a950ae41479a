//! Random-access byte sources the scanner can read from.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// A finite byte sequence that supports reads at arbitrary absolute offsets.
///
/// Reads never move a shared position, so the scanner can walk the source backwards
/// without any seeking bookkeeping of its own.
///
/// # Implementors
///
/// - `[u8]` and `Vec<u8>` for in-memory data
/// - [`File`] using positional reads, on unix and windows
/// - [`SeekReader`] for anything that is [`Read`] + [`Seek`]
/// - `&T`, `Box<T>` and `Arc<T>` forwarding to `T`
pub trait ReadAt {
    /// Reads bytes starting at `offset` into `buf`, returning how many were read.
    ///
    /// A return value smaller than `buf.len()` is not an error; `0` means `offset` is at or
    /// beyond the end of the source.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the underlying storage.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Returns the total size of the source in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> io::Result<u64>;
}

impl ReadAt for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < self.len() => start,
            _ => return Ok(0),
        };
        let available = &self[start..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        (**self).size()
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Box<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        (**self).size()
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        (**self).size()
    }
}

#[cfg(any(unix, windows))]
impl ReadAt for File {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    // `seek_read` moves the file cursor as a side effect; nothing here depends on it.
    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Adapts a [`Read`] + [`Seek`] stream into a [`ReadAt`] source.
///
/// Every read seeks to the requested offset first, so the stream position is left
/// wherever the last read ended.
///
/// # Examples
///
/// ```
/// use revscan::{ReadAt, SeekReader};
/// use std::io::Cursor;
///
/// let reader = SeekReader::new(Cursor::new(b"lorem ipsum".to_vec()));
/// let mut buf = [0; 5];
///
/// assert_eq!(reader.size().unwrap(), 11);
/// assert_eq!(reader.read_at(6, &mut buf).unwrap(), 5);
/// assert_eq!(&buf, b"ipsum");
/// ```
#[derive(Debug)]
pub struct SeekReader<R> {
    inner: RefCell<R>,
}

impl<R: Read + Seek> SeekReader<R> {
    /// Wraps the given stream.
    pub fn new(inner: R) -> Self {
        SeekReader {
            inner: RefCell::new(inner),
        }
    }

    /// Unwraps this adapter, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read + Seek> ReadAt for SeekReader<R> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.inner.borrow_mut();
        inner.seek(SeekFrom::Start(offset))?;
        inner.read(buf)
    }

    fn size(&self) -> io::Result<u64> {
        let mut inner = self.inner.borrow_mut();
        let current = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(current))?;
        Ok(len)
    }
}
