//! Shared types for the heap file layer: identifiers, error taxonomy, and
//! the handful of on-disk constants every other crate in the workspace
//! agrees on.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size in bytes. Every page on disk, including the file header page,
/// occupies exactly this many bytes.
pub const PAGE_SIZE: usize = 4096;

/// Upper bound on a stored heap file name, in bytes.
pub const MAXNAMESIZE: usize = 128;

/// Sentinel page number meaning "no page" (end of chain, absent header field).
pub const NULL_PAGE: i32 = -1;

/// Record identifier: a page number paired with a slot index within that page.
///
/// Stable for the lifetime of the record on disk; deleting the record
/// invalidates the id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    pub page_no: i32,
    pub slot_no: i32,
}

impl Rid {
    /// Sentinel meaning "no record".
    pub const NULL: Rid = Rid {
        page_no: -1,
        slot_no: -1,
    };

    pub fn new(page_no: i32, slot_no: i32) -> Self {
        Self { page_no, slot_no }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl Default for Rid {
    fn default() -> Self {
        Self::NULL
    }
}

/// Canonical error type shared across the heap file layer.
///
/// Recoverable sentinels that are handled internally by the scan and insert
/// state machines (`NoSpace`, `NoRecords`, `EndOfPage`) deliberately do not
/// appear here — they live in `page::InsertOutcome` / `page::AdvanceOutcome`
/// and never escape as a `DbError` unless the page layer returns one where
/// none was expected, which this type's `Corrupt` variant captures.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("heap file '{0}' already exists")]
    FileExists(String),

    #[error("scan exhausted: no more records")]
    FileEof,

    #[error("bad scan parameter: {0}")]
    BadScanParm(String),

    #[error("record length {len} exceeds page capacity {max}")]
    InvalidRecLen { len: usize, max: usize },

    #[error("buffer pool exhausted: all {0} frames are pinned")]
    BufferExhausted(usize),

    #[error("corrupt page state: {0}")]
    Corrupt(String),

    #[error("no record at {0:?}")]
    RecordNotFound(Rid),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for the heap file layer.
///
/// # Example
/// ```
/// use common::Config;
///
/// let config = Config::builder().buffer_pool_pages(64).build();
/// assert_eq!(config.buffer_pool_pages, 64);
/// ```
#[derive(Clone, Debug, bon::Builder)]
pub struct Config {
    /// Directory heap file paths are resolved relative to.
    #[builder(default = PathBuf::from("."))]
    pub data_dir: PathBuf,
    /// Number of frames the buffer pool keeps resident per open file.
    #[builder(default = 64)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            buffer_pool_pages: 64,
        }
    }
}

pub mod prelude {
    pub use crate::{Config, DbError, DbResult, Rid, MAXNAMESIZE, NULL_PAGE, PAGE_SIZE};
}
