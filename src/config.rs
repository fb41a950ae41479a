use crate::error::{Error, ErrorKind, Result};

/// The default record delimiter, a newline.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// The default number of bytes pulled from the source per read.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// The default ceiling on the internal buffer, 1 MiB.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1 << 20;

/// Construction-time settings of a [`ReverseScanner`].
///
/// A scanner copies its configuration when it is created and never changes it afterwards.
///
/// # Examples
///
/// ```
/// use revscan::ScanConfig;
///
/// let config = ScanConfig::default()
///     .with_delimiter(b',')
///     .with_chunk_size(4096);
///
/// assert_eq!(config.delimiter, b',');
/// assert_eq!(config.chunk_size, 4096);
/// assert_eq!(config.max_buffer_size, 1 << 20);
/// ```
///
/// [`ReverseScanner`]: struct.ReverseScanner.html
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScanConfig {
    /// Byte separating records.
    pub delimiter: u8,
    /// Bytes pulled from the source per read. Must be positive.
    pub chunk_size: usize,
    /// Upper bound on buffered bytes. Must be positive.
    pub max_buffer_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            delimiter: DEFAULT_DELIMITER,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl ScanConfig {
    /// Sets the record delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the number of bytes pulled per read.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the maximum number of bytes the scanner may buffer.
    #[must_use]
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Checks that every size is positive.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidConfig` if `chunk_size` or `max_buffer_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "chunk_size must be positive",
            )));
        }
        if self.max_buffer_size == 0 {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "max_buffer_size must be positive",
            )));
        }
        Ok(())
    }
}
