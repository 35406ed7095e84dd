//! The heap file layer: an unordered collection of variable-length records
//! persisted across a linked list of fixed-size pages.
//!
//! Three handle types sit on top of a shared [`core::HeapFileCore`]:
//! [`HeapFile`] for random-access lookup by rid, [`scan::HeapFileScan`] for
//! filtered sequential scans, and [`insert::InsertFileScan`] for append.
//! Each handle pins its heap file's header page for its entire lifetime and
//! at most one data page besides, released automatically through
//! [`buffer::PagePin`]'s `Drop` — the hand-rolled unpin-on-every-error-path
//! pattern a C++ port of this layer needs is, here, enforced by the type
//! system instead of written out by hand.

mod core;
mod filter;
pub mod header;
mod insert;
mod scan;

pub use filter::{ColumnType, Op, ScanFilterSpec};
pub use header::FileHdrPage;
pub use insert::InsertFileScan;
pub use scan::HeapFileScan;

use std::io::ErrorKind;

use buffer::{BufMgr, SharedBufMgr};
use common::{Config, DbError, DbResult, Rid};
use pagedfile::PagedFile;

use crate::core::HeapFileCore;

/// Creates the on-disk file, a zero-initialized header page, and a single
/// empty data page, then flushes and closes. Fails with `FileExists` if
/// `file_name` is already in use under `config.data_dir`.
pub fn create_heap_file(config: &Config, file_name: &str) -> DbResult<()> {
    let path = config.data_dir.join(file_name);
    if let Err(e) = PagedFile::create(&path) {
        return match e {
            DbError::Io(io_err) if io_err.kind() == ErrorKind::AlreadyExists => {
                Err(DbError::FileExists(file_name.to_string()))
            }
            other => Err(other),
        };
    }

    // Every pin taken below is a local `PagePin`; on an early `?` return its
    // `Drop` unpins it, and `buf` (and the `File` it owns) close when this
    // function's scope ends. No explicit cleanup path is needed to satisfy
    // "no page left pinned, file closed, on any failure after creation".
    let file = PagedFile::open(&path)?;
    let buf = SharedBufMgr::new(BufMgr::new(file, 2));

    let header_pin = buf.alloc_page()?;
    let data_pin = buf.alloc_page()?;

    let mut hdr = FileHdrPage::new(file_name);
    hdr.rec_cnt = 0;
    hdr.page_cnt = 1;
    hdr.first_page = data_pin.page_no();
    hdr.last_page = data_pin.page_no();

    header_pin.with_mut(|p| hdr.write_to(p.raw_mut()))?;
    header_pin.mark_dirty();
    data_pin.mark_dirty();

    header_pin.unpin()?;
    data_pin.unpin()?;

    buf.flush_file()
}

/// Removes a heap file from disk. The caller is responsible for ensuring no
/// handle has it open; this layer has no cross-handle bookkeeping to check.
pub fn destroy_heap_file(config: &Config, file_name: &str) -> DbResult<()> {
    let path = config.data_dir.join(file_name);
    PagedFile::destroy(&path)
}

/// The base heap file handle: random-access record fetch by rid, and the
/// live record count.
pub struct HeapFile {
    core: HeapFileCore,
}

impl HeapFile {
    pub fn open(config: &Config, file_name: &str) -> DbResult<Self> {
        Ok(Self {
            core: HeapFileCore::open(config, file_name)?,
        })
    }

    pub fn get_rec_cnt(&self) -> DbResult<i32> {
        self.core.rec_cnt()
    }

    pub fn header(&self) -> DbResult<FileHdrPage> {
        self.core.header()
    }

    /// Fetch the record named by `rid`, re-pinning the current page first
    /// if `rid` lives elsewhere.
    pub fn get_record(&mut self, rid: Rid) -> DbResult<Vec<u8>> {
        self.core.get_record(rid)
    }
}

#[cfg(test)]
mod tests;
