//! This library provides the [`ReverseScanner`] type to read the records of a stream of bytes
//! from its tail toward its head, where records are separated by a single delimiter byte.
//!
//! The [`ReverseScanner`] is helpful if you want the most recent entries of a large,
//! append-only file, such as the last lines of a log, without scanning it forwards or
//! loading it into memory. Only the bytes between the end of the stream and the oldest
//! record you ask for are ever read, in fixed-size chunks, and the internal buffer is capped
//! by a configurable ceiling.
//!
//! # Examples
//!
//! - Print the last lines of a file, newest first.
//!
//! ```no_run
//! use revscan::{ReverseScanner, Result};
//! use std::fs::File;
//!
//! fn print_newest(f: File, limit: usize) -> Result<()> {
//!     let mut scanner = ReverseScanner::from_end(f)?;
//!     for _ in 0..limit {
//!         match scanner.scan()? {
//!             Some(line) => println!("{}", String::from_utf8_lossy(&line)),
//!             None => break,
//!         }
//!     }
//!     Ok(())
//! }
//!
//! fn main() -> Result<()> {
//!    let f = File::open("./server.log")?;
//!    print_newest(f, 10)
//! }
//! ```
//!
//! - Take the last records of an in-memory buffer, in their original order.
//!
//! ```
//! use revscan::{tail, ScanConfig};
//!
//! let csv = b"id,name\n1,ada\n2,grace\n";
//! let rows = tail(&csv[..], 2, ScanConfig::default()).unwrap();
//! assert_eq!(rows, vec![b"1,ada".to_vec(), b"2,grace".to_vec()]);
//! ```
//!
//! [`ReverseScanner`]: struct.ReverseScanner.html
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod config;
pub use config::{ScanConfig, DEFAULT_CHUNK_SIZE, DEFAULT_DELIMITER, DEFAULT_MAX_BUFFER_SIZE};

mod error;
pub use error::{Error, ErrorKind, Result};

mod scanner;
pub use scanner::{Records, ReverseScanner};

mod source;
pub use source::{ReadAt, SeekReader};

mod tail;
pub use tail::tail;
