use crate::config::ScanConfig;
use crate::error::Result;
use crate::scanner::ReverseScanner;
use crate::source::ReadAt;
use tracing::debug;

/// Returns the last `n` records of `source`, in the order they appear in the source.
///
/// Only the tail of the source needed to produce `n` records is read. A delimiter at the
/// very end of the source terminates the last record instead of starting an empty one, so
/// tailing `"a\nb\n"` by one record gives `"b"`, the way line-oriented tools behave.
///
/// # Errors
///
/// Returns any error raised while building the scanner or scanning the source.
///
/// # Examples
///
/// ```
/// use revscan::{tail, ScanConfig};
///
/// let log = b"boot\nstart\nready\n";
/// let lines = tail(&log[..], 2, ScanConfig::default()).unwrap();
///
/// assert_eq!(lines, vec![b"start".to_vec(), b"ready".to_vec()]);
/// ```
pub fn tail<R: ReadAt>(source: R, n: usize, config: ScanConfig) -> Result<Vec<Vec<u8>>> {
    let mut scanner = ReverseScanner::from_end_with_config(source, config)?;
    let mut records = Vec::new();
    if n == 0 {
        return Ok(records);
    }

    match scanner.scan()? {
        Some(record) if record.is_empty() => {}
        Some(record) => records.push(record),
        None => return Ok(records),
    }

    while records.len() < n {
        match scanner.scan()? {
            Some(record) => records.push(record),
            None => break,
        }
    }

    debug!(
        count = records.len(),
        position = scanner.position(),
        "collected tail records"
    );
    records.reverse();
    Ok(records)
}
