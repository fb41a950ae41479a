use crate::config::ScanConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::source::ReadAt;
use std::io;
use std::iter::FusedIterator;
use std::mem;
use tracing::{debug, trace};

/// Scanner that yields the delimiter-separated records of a byte source, last record first.
///
/// # Examples
///
/// ```
/// use revscan::ReverseScanner;
///
/// let payload = b"line one\nline two\nlast line";
/// let mut scanner = ReverseScanner::new(&payload[..], payload.len() as u64);
///
/// assert_eq!(scanner.scan().unwrap().unwrap(), b"last line");
/// assert_eq!(scanner.scan().unwrap().unwrap(), b"line two");
/// assert_eq!(scanner.scan().unwrap().unwrap(), b"line one");
/// assert_eq!(scanner.scan().unwrap(), None);
/// ```
///
/// The `ReverseScanner` pulls the source in chunks of `chunk_size` bytes, walking from the
/// starting offset towards the start of the source, and keeps the bytes that do not form a
/// complete record yet in an internal buffer. The buffer never grows past `max_buffer_size`;
/// a record longer than that cannot be produced and is reported as
/// `ErrorKind::BufferTooSmall` instead. See [`ScanConfig`] for the defaults.
///
/// Empty records are significant: adjacent delimiters, or a delimiter at either end of the
/// source, produce empty records, exactly as splitting the whole source forwards would.
///
/// [`ScanConfig`]: struct.ScanConfig.html
#[derive(Debug)]
pub struct ReverseScanner<R> {
    source: R,
    config: ScanConfig,
    buf: Vec<u8>,
    start: u64,
    cursor: u64,
    exhausted: bool,
}

// Outcome of pulling one chunk from the source.
enum Pull {
    Filled,
    Exhausted,
}

impl<R: ReadAt> ReverseScanner<R> {
    /// Creates a new `ReverseScanner` with the default [`ScanConfig`], scanning backwards
    /// from `offset`.
    ///
    /// Bytes at or after `offset` are never read; pass the size of the source to scan all
    /// of it.
    ///
    /// # Examples
    ///
    /// ```
    /// use revscan::ReverseScanner;
    ///
    /// let bytes = b"a\nb\nc";
    /// // Ignore the trailing "\nc".
    /// let mut scanner = ReverseScanner::new(&bytes[..], 3);
    ///
    /// assert_eq!(scanner.scan().unwrap().unwrap(), b"b");
    /// assert_eq!(scanner.scan().unwrap().unwrap(), b"a");
    /// ```
    ///
    /// [`ScanConfig`]: struct.ScanConfig.html
    pub fn new(source: R, offset: u64) -> Self {
        ReverseScanner::from_parts(source, offset, ScanConfig::default())
    }

    /// Creates a new `ReverseScanner` scanning backwards from `offset` with the given
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidConfig` if the configuration does not validate.
    ///
    /// # Examples
    ///
    /// ```
    /// use revscan::{ReverseScanner, ScanConfig};
    ///
    /// let bytes = b"1,2,3";
    /// let config = ScanConfig::default().with_delimiter(b',').with_chunk_size(2);
    /// let mut scanner = ReverseScanner::with_config(&bytes[..], 5, config).unwrap();
    ///
    /// assert_eq!(scanner.scan().unwrap().unwrap(), b"3");
    /// ```
    pub fn with_config(source: R, offset: u64, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(ReverseScanner::from_parts(source, offset, config))
    }

    /// Creates a new `ReverseScanner` with the default configuration that starts at the end
    /// of the source.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the size of the source cannot be determined.
    pub fn from_end(source: R) -> Result<Self> {
        ReverseScanner::from_end_with_config(source, ScanConfig::default())
    }

    /// Creates a new `ReverseScanner` with the given configuration that starts at the end of
    /// the source.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidConfig` if the configuration does not validate, or an I/O
    /// error if the size of the source cannot be determined.
    pub fn from_end_with_config(source: R, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let offset = source.size()?;
        Ok(ReverseScanner::from_parts(source, offset, config))
    }

    fn from_parts(source: R, offset: u64, config: ScanConfig) -> Self {
        ReverseScanner {
            source,
            config,
            buf: Vec::new(),
            start: offset,
            cursor: offset,
            exhausted: false,
        }
    }

    /// Returns the configuration of this `ReverseScanner`.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns the offset of the first byte that has already been read from the source.
    ///
    /// Everything before this offset is still unread. The value only ever decreases.
    ///
    /// # Examples
    ///
    /// ```
    /// use revscan::{ReverseScanner, ScanConfig};
    ///
    /// let bytes = b"abc\ndef";
    /// let config = ScanConfig::default().with_chunk_size(4);
    /// let mut scanner = ReverseScanner::with_config(&bytes[..], 7, config).unwrap();
    /// assert_eq!(scanner.position(), 7);
    ///
    /// scanner.scan().unwrap();
    /// assert_eq!(scanner.position(), 3);
    /// ```
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Returns the number of bytes read from the source but not yet returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` once every record has been returned.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Gets a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Unwraps this `ReverseScanner`, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Returns the next record, walking backwards through the source.
    ///
    /// The delimiter itself is never part of a record. Once the first record of the source
    /// has been returned, `scan` returns `Ok(None)`, and keeps doing so on every further
    /// call.
    ///
    /// # Errors
    ///
    /// If the pending record does not fit within `max_buffer_size`, an error variant of
    /// `ErrorKind::BufferTooSmall` will be returned. If the source fails, an error variant
    /// of `ErrorKind::Io` will be returned, or `ErrorKind::ShortRead` if it ends before the
    /// offset the scanner was told to start at.
    ///
    /// A failed read leaves the scanner untouched, so calling `scan` again retries the
    /// same read.
    ///
    /// # Examples
    ///
    /// ```
    /// use revscan::ReverseScanner;
    ///
    /// let bytes = b"a\n\nb";
    /// let mut scanner = ReverseScanner::new(&bytes[..], 4);
    ///
    /// assert_eq!(scanner.scan().unwrap().unwrap(), b"b");
    /// assert_eq!(scanner.scan().unwrap().unwrap(), b"");
    /// assert_eq!(scanner.scan().unwrap().unwrap(), b"a");
    /// assert_eq!(scanner.scan().unwrap(), None);
    /// assert_eq!(scanner.scan().unwrap(), None);
    /// ```
    pub fn scan(&mut self) -> Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            if let Some(idx) = memchr::memrchr(self.config.delimiter, &self.buf) {
                let record = self.buf.split_off(idx + 1);
                self.buf.truncate(idx);
                return Ok(Some(record));
            }

            match self.pull()? {
                Pull::Filled => continue,
                Pull::Exhausted => {
                    self.exhausted = true;
                    debug!(start = self.start, "reverse scan reached start of source");
                    // A non-empty range always ends with one record before its first
                    // delimiter, even when that record is empty.
                    if self.start == 0 {
                        return Ok(None);
                    }
                    return Ok(Some(mem::take(&mut self.buf)));
                }
            }
        }
    }

    /// Converts this `ReverseScanner` into an iterator over its remaining records.
    ///
    /// # Examples
    ///
    /// ```
    /// use revscan::ReverseScanner;
    ///
    /// let bytes = b"x\ny\nz";
    /// let records = ReverseScanner::new(&bytes[..], 5)
    ///     .records()
    ///     .collect::<revscan::Result<Vec<_>>>()
    ///     .unwrap();
    ///
    /// assert_eq!(records, vec![b"z".to_vec(), b"y".to_vec(), b"x".to_vec()]);
    /// ```
    pub fn records(self) -> Records<R> {
        Records {
            scanner: self,
            done: false,
        }
    }
}

impl<R: ReadAt> ReverseScanner<R> {
    // Prepends the next chunk before `cursor` to the buffer.
    fn pull(&mut self) -> Result<Pull> {
        if self.cursor == 0 {
            return Ok(Pull::Exhausted);
        }

        // Never larger than `chunk_size`, so the cast is lossless.
        let size = self.cursor.min(self.config.chunk_size as u64) as usize;
        let required = self.buf.len().saturating_add(size);
        if required > self.config.max_buffer_size {
            debug!(
                required,
                max = self.config.max_buffer_size,
                "rejecting read past buffer ceiling"
            );
            return Err(Error::new(ErrorKind::BufferTooSmall {
                required,
                max: self.config.max_buffer_size,
            }));
        }

        let offset = self.cursor - size as u64;
        let mut chunk = Vec::with_capacity(required);
        chunk.resize(size, 0);
        self.read_exact_at(offset, &mut chunk)?;
        chunk.extend_from_slice(&self.buf);

        self.buf = chunk;
        self.cursor = offset;
        trace!(offset, size, buffered = self.buf.len(), "pulled chunk");
        Ok(Pull::Filled)
    }

    fn read_exact_at(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < dst.len() {
            match self.source.read_at(offset + filled as u64, &mut dst[filled..]) {
                Ok(0) => {
                    return Err(Error::new(ErrorKind::ShortRead {
                        offset,
                        expected: dst.len(),
                        got: filled,
                    }))
                }
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// An iterator over the records of a [`ReverseScanner`], last record first.
///
/// This struct is created by [`ReverseScanner::records`]. It stops after the first error.
///
/// [`ReverseScanner`]: struct.ReverseScanner.html
/// [`ReverseScanner::records`]: struct.ReverseScanner.html#method.records
#[derive(Debug)]
pub struct Records<R> {
    scanner: ReverseScanner<R>,
    done: bool,
}

impl<R> Records<R> {
    /// Unwraps this iterator, returning the scanner it was built from.
    pub fn into_scanner(self) -> ReverseScanner<R> {
        self.scanner
    }
}

impl<R: ReadAt> Iterator for Records<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.scan() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: ReadAt> FusedIterator for Records<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::iter;

    // In-memory source that counts reads and can be told to fail.
    struct CountingSource {
        bytes: Vec<u8>,
        reads: Cell<usize>,
        fail: Cell<bool>,
    }

    impl CountingSource {
        fn new(bytes: &[u8]) -> Self {
            CountingSource {
                bytes: bytes.to_vec(),
                reads: Cell::new(0),
                fail: Cell::new(false),
            }
        }
    }

    impl ReadAt for CountingSource {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
            if self.fail.get() {
                return Err(io::Error::new(io::ErrorKind::Other, "disk on fire"));
            }
            self.reads.set(self.reads.get() + 1);
            self.bytes.read_at(offset, buf)
        }

        fn size(&self) -> io::Result<u64> {
            Ok(self.bytes.len() as u64)
        }
    }

    // Source that hands out at most one byte per call and is interrupted every other call.
    struct TricklingSource {
        bytes: Vec<u8>,
        interrupt: Cell<bool>,
    }

    impl ReadAt for TricklingSource {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
            let interrupt = !self.interrupt.get();
            self.interrupt.set(interrupt);
            if interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "again"));
            }
            let len = buf.len().min(1);
            self.bytes.read_at(offset, &mut buf[..len])
        }

        fn size(&self) -> io::Result<u64> {
            Ok(self.bytes.len() as u64)
        }
    }

    const DEFAULT_TEST_CHUNK: usize = 16;

    fn over(bytes: &[u8], config: ScanConfig) -> ReverseScanner<&[u8]> {
        ReverseScanner::with_config(bytes, bytes.len() as u64, config).unwrap()
    }

    fn drain<R: ReadAt>(scanner: &mut ReverseScanner<R>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(record) = scanner.scan().unwrap() {
            out.push(record);
        }
        out
    }

    #[test]
    fn test_scan_lines() {
        let payload = b"line one\nline two\nlast line";
        let mut scanner = over(payload, ScanConfig::default().with_chunk_size(512));
        assert_eq!(scanner.scan().unwrap().unwrap(), b"last line");
        assert_eq!(scanner.scan().unwrap().unwrap(), b"line two");
        assert_eq!(scanner.scan().unwrap().unwrap(), b"line one");
        assert_eq!(scanner.scan().unwrap(), None);
        assert!(scanner.is_exhausted());
    }

    #[test]
    fn test_scan_empty_source() {
        let mut scanner = over(b"", ScanConfig::default());
        assert_eq!(scanner.scan().unwrap(), None);
        assert_eq!(scanner.scan().unwrap(), None);
        assert!(scanner.is_exhausted());
    }

    #[test]
    fn test_scan_delimiters_only() {
        let mut scanner = over(b"\n", ScanConfig::default());
        assert_eq!(drain(&mut scanner), vec![b"".to_vec(), b"".to_vec()]);

        let mut scanner = over(b"\n\n\n", ScanConfig::default().with_chunk_size(1));
        assert_eq!(drain(&mut scanner), vec![Vec::<u8>::new(); 4]);
    }

    #[test]
    fn test_scan_leading_and_trailing_delimiter() {
        let mut scanner = over(b"\na\n", ScanConfig::default().with_chunk_size(2));
        assert_eq!(
            drain(&mut scanner),
            vec![b"".to_vec(), b"a".to_vec(), b"".to_vec()]
        );
    }

    #[test]
    fn test_scan_record_across_chunks() {
        let bytes: Vec<u8> = iter::repeat(b'x')
            .take(DEFAULT_TEST_CHUNK * 3 + 1)
            .chain(iter::once(b'\n'))
            .chain(iter::repeat(b'y').take(DEFAULT_TEST_CHUNK - 1))
            .collect();
        let config = ScanConfig::default().with_chunk_size(DEFAULT_TEST_CHUNK);
        let mut scanner = over(&bytes, config);

        assert_eq!(
            scanner.scan().unwrap().unwrap(),
            vec![b'y'; DEFAULT_TEST_CHUNK - 1]
        );
        assert_eq!(
            scanner.scan().unwrap().unwrap(),
            vec![b'x'; DEFAULT_TEST_CHUNK * 3 + 1]
        );
        assert_eq!(scanner.scan().unwrap(), None);
    }

    #[test]
    fn test_scan_partial_offset() {
        let bytes = b"first\nsecond\nthird";
        let mut scanner = ReverseScanner::new(&bytes[..], 12);
        assert_eq!(
            drain(&mut scanner),
            vec![b"second".to_vec(), b"first".to_vec()]
        );
    }

    #[test]
    fn test_pull_counts() {
        let source = CountingSource::new(b"aaaa\nbbbb\ncccc");
        let config = ScanConfig::default().with_chunk_size(5);
        let mut scanner = ReverseScanner::from_end_with_config(&source, config).unwrap();

        assert_eq!(scanner.scan().unwrap().unwrap(), b"cccc");
        assert_eq!(source.reads.get(), 1);
        assert_eq!(scanner.position(), 9);
        assert_eq!(scanner.buffered(), 0);

        assert_eq!(scanner.scan().unwrap().unwrap(), b"bbbb");
        assert_eq!(source.reads.get(), 2);

        assert_eq!(scanner.scan().unwrap().unwrap(), b"aaaa");
        assert_eq!(source.reads.get(), 3);
        assert_eq!(scanner.position(), 0);

        assert_eq!(scanner.scan().unwrap(), None);
        assert_eq!(source.reads.get(), 3);
    }

    #[test]
    fn test_buffer_too_small_leaves_state_untouched() {
        let payload = b"example payload";
        let config = ScanConfig::default().with_max_buffer_size(1);
        let mut scanner = over(payload, config);

        let err = scanner.scan().unwrap_err();
        match *err.kind() {
            ErrorKind::BufferTooSmall { required, max } => {
                assert_eq!(required, 15);
                assert_eq!(max, 1);
            }
            _ => panic!("unexpected error: {}", err),
        }
        assert_eq!(scanner.position(), 15);
        assert_eq!(scanner.buffered(), 0);
        assert!(!scanner.is_exhausted());

        assert!(scanner.scan().unwrap_err().is_buffer_too_small());
    }

    #[test]
    fn test_buffer_ceiling_counts_buffered_bytes() {
        // The second chunk would take the buffer to 6 bytes.
        let config = ScanConfig::default()
            .with_chunk_size(4)
            .with_max_buffer_size(5);
        let mut scanner = over(b"aaaaaa\nb", config);
        assert_eq!(scanner.scan().unwrap().unwrap(), b"b");
        assert!(scanner.scan().unwrap_err().is_buffer_too_small());
        assert_eq!(scanner.buffered(), 2);
    }

    #[test]
    fn test_io_error_is_propagated_and_retryable() {
        let source = CountingSource::new(b"one\ntwo");
        let mut scanner = ReverseScanner::from_end(&source).unwrap();

        source.fail.set(true);
        let err = scanner.scan().unwrap_err();
        match *err.kind() {
            ErrorKind::Io(ref e) => assert_eq!(e.to_string(), "disk on fire"),
            _ => panic!("unexpected error: {}", err),
        }
        assert_eq!(scanner.position(), 7);
        assert!(!scanner.is_exhausted());

        source.fail.set(false);
        assert_eq!(drain(&mut scanner), vec![b"two".to_vec(), b"one".to_vec()]);
    }

    #[test]
    fn test_short_read() {
        let bytes = b"abc";
        // Claims more bytes than the source holds.
        let mut scanner = ReverseScanner::new(&bytes[..], 10);
        let err = scanner.scan().unwrap_err();
        match *err.kind() {
            ErrorKind::ShortRead {
                offset,
                expected,
                got,
            } => {
                assert_eq!(offset, 0);
                assert_eq!(expected, 10);
                assert_eq!(got, 3);
            }
            _ => panic!("unexpected error: {}", err),
        }
        assert_eq!(scanner.buffered(), 0);
    }

    #[test]
    fn test_trickling_source() {
        let source = TricklingSource {
            bytes: b"ab\ncd\nef".to_vec(),
            interrupt: Cell::new(false),
        };
        let config = ScanConfig::default().with_chunk_size(3);
        let mut scanner = ReverseScanner::from_end_with_config(source, config).unwrap();
        assert_eq!(
            drain(&mut scanner),
            vec![b"ef".to_vec(), b"cd".to_vec(), b"ab".to_vec()]
        );
    }

    #[test]
    fn test_records_stops_after_error() {
        let config = ScanConfig::default().with_max_buffer_size(2);
        let mut records = over(b"a\nlong", config).records();
        assert!(records.next().unwrap().unwrap_err().is_buffer_too_small());
        assert!(records.next().is_none());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_records_into_scanner() {
        let mut records = over(b"1\n2", ScanConfig::default()).records();
        assert_eq!(records.next().unwrap().unwrap(), b"2");
        let mut scanner = records.into_scanner();
        assert_eq!(scanner.scan().unwrap().unwrap(), b"1");
        assert_eq!(scanner.scan().unwrap(), None);
    }

    #[test]
    fn test_invalid_config() {
        let config = ScanConfig::default().with_chunk_size(0);
        let err = ReverseScanner::with_config(&b"abc"[..], 3, config).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfig(_)));
    }
}
