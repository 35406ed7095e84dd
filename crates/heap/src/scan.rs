//! `HeapFileScan`: sequential traversal of a heap file's page chain,
//! optionally filtered by a single-attribute predicate, with mark/reset
//! snapshot support.

use common::{Config, DbError, DbResult, Rid, NULL_PAGE};
use page::{AdvanceOutcome, RecordCursor};

use crate::core::HeapFileCore;
use crate::filter::{matches, Filter, ScanFilterSpec};
use crate::header::FileHdrPage;

/// The cursor's state, made explicit rather than encoded in `curPageNo < 0`
/// / `curPage == null` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanCursor {
    /// No page pinned yet; the next `scan_next` starts at `firstPage`.
    Fresh,
    /// `core.cur` is pinned and `core.cur_rec` names the current record.
    Positioned,
    /// The chain has been walked to its end; every further call is `FileEof`.
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
struct MarkedPosition {
    page_no: i32,
    rid: Rid,
}

pub struct HeapFileScan {
    core: HeapFileCore,
    filter: Option<Filter>,
    cursor: ScanCursor,
    marked: Option<MarkedPosition>,
}

impl HeapFileScan {
    /// Opens the file like any heap file handle, then immediately releases
    /// the base constructor's eagerly-pinned first page: a scan always
    /// begins `Fresh`, so `scan_next`'s own pin-the-first-page step runs
    /// exactly once, the first time it is called.
    pub fn open(config: &Config, file_name: &str) -> DbResult<Self> {
        let mut core = HeapFileCore::open(config, file_name)?;
        if let Some(pin) = core.cur.take() {
            pin.unpin()?;
        }
        Ok(Self {
            core,
            filter: None,
            cursor: ScanCursor::Fresh,
            marked: None,
        })
    }

    pub fn get_rec_cnt(&self) -> DbResult<i32> {
        self.core.rec_cnt()
    }

    pub fn header(&self) -> DbResult<FileHdrPage> {
        self.core.header()
    }

    /// Install a new filter and rewind the cursor to `Fresh`. Passing `None`
    /// clears any existing filter; every record then matches.
    pub fn start_scan(&mut self, filter: Option<ScanFilterSpec>) -> DbResult<()> {
        let filter = filter.map(Filter::try_new).transpose()?;

        if let Some(pin) = self.core.cur.take() {
            pin.unpin()?;
        }
        self.filter = filter;
        self.cursor = ScanCursor::Fresh;
        self.core.cur_rec = Rid::NULL;
        self.marked = None;
        Ok(())
    }

    fn record_matches(&self, rid: Rid) -> DbResult<bool> {
        let pin = self
            .core
            .cur
            .as_ref()
            .expect("record_matches only called while Positioned");
        let rec = pin.with(|p| p.get_record(rid))?;
        Ok(matches(self.filter.as_ref(), &rec))
    }

    /// Advance to the next matching record, returning its rid. Returns
    /// `FileEof` once the chain is exhausted.
    pub fn scan_next(&mut self) -> DbResult<Rid> {
        loop {
            match self.cursor {
                ScanCursor::Exhausted => return Err(DbError::FileEof),
                ScanCursor::Fresh => {
                    let first_page = self.core.header()?.first_page;
                    if first_page == NULL_PAGE {
                        self.cursor = ScanCursor::Exhausted;
                        return Err(DbError::FileEof);
                    }
                    let pin = self.core.buf.pin_page(first_page)?;
                    self.core.cur = Some(pin);
                    match self.core.cur.as_ref().unwrap().with(|p| p.first_record())? {
                        RecordCursor::Found(rid) => {
                            self.core.cur_rec = rid;
                            self.cursor = ScanCursor::Positioned;
                            if self.record_matches(rid)? {
                                return Ok(rid);
                            }
                        }
                        RecordCursor::NoRecords => {
                            let pin = self.core.cur.take().unwrap();
                            pin.unpin()?;
                            self.cursor = ScanCursor::Exhausted;
                            return Err(DbError::FileEof);
                        }
                    }
                }
                ScanCursor::Positioned => {
                    let pin = self
                        .core
                        .cur
                        .as_ref()
                        .expect("Positioned always has a pinned page");
                    let advance = pin.with(|p| p.next_record(self.core.cur_rec))?;
                    match advance {
                        AdvanceOutcome::Found(rid) => {
                            self.core.cur_rec = rid;
                            if self.record_matches(rid)? {
                                return Ok(rid);
                            }
                        }
                        AdvanceOutcome::EndOfPage | AdvanceOutcome::NoRecords => {
                            let next_page = pin.with(|p| p.get_next_page())?;
                            let old = self.core.cur.take().unwrap();
                            old.unpin()?;
                            if next_page == NULL_PAGE {
                                self.cursor = ScanCursor::Exhausted;
                                return Err(DbError::FileEof);
                            }
                            let new_pin = self.core.buf.pin_page(next_page)?;
                            self.core.cur = Some(new_pin);
                            match self.core.cur.as_ref().unwrap().with(|p| p.first_record())? {
                                RecordCursor::Found(rid) => {
                                    self.core.cur_rec = rid;
                                    if self.record_matches(rid)? {
                                        return Ok(rid);
                                    }
                                }
                                RecordCursor::NoRecords => {
                                    self.core.cur_rec = Rid::NULL;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Fetch the record the cursor currently sits on without advancing.
    pub fn get_record(&self) -> DbResult<Vec<u8>> {
        match self.cursor {
            ScanCursor::Positioned => {
                let pin = self
                    .core
                    .cur
                    .as_ref()
                    .expect("Positioned always has a pinned page");
                pin.with(|p| p.get_record(self.core.cur_rec))
            }
            _ => Err(DbError::RecordNotFound(self.core.cur_rec)),
        }
    }

    /// Delete the record the cursor currently sits on. `scan_next` must be
    /// able to resume from this slot afterward — `Page::next_record`
    /// tolerates a cursor that names a just-deleted slot.
    pub fn delete_record(&mut self) -> DbResult<()> {
        match self.cursor {
            ScanCursor::Positioned => {
                let rid = self.core.cur_rec;
                let pin = self
                    .core
                    .cur
                    .as_ref()
                    .expect("Positioned always has a pinned page");
                pin.with_mut(|p| p.delete_record(rid))?;
                pin.mark_dirty();

                let mut hdr = self.core.header()?;
                hdr.rec_cnt -= 1;
                self.core.write_header(&hdr)
            }
            _ => Err(DbError::Corrupt(
                "deleteRecord called without a positioned scan cursor".into(),
            )),
        }
    }

    /// Mark the current page dirty, for callers that mutate a record
    /// in-place via the buffer returned by `get_record`.
    pub fn mark_dirty(&self) -> DbResult<()> {
        match self.cursor {
            ScanCursor::Positioned => {
                self.core
                    .cur
                    .as_ref()
                    .expect("Positioned always has a pinned page")
                    .mark_dirty();
                Ok(())
            }
            _ => Err(DbError::Corrupt(
                "markDirty called without a positioned scan cursor".into(),
            )),
        }
    }

    /// Snapshot the current position so a later `reset_scan` can return to it.
    pub fn mark_scan(&mut self) -> DbResult<()> {
        match self.cursor {
            ScanCursor::Positioned => {
                let page_no = self
                    .core
                    .cur
                    .as_ref()
                    .expect("Positioned always has a pinned page")
                    .page_no();
                self.marked = Some(MarkedPosition {
                    page_no,
                    rid: self.core.cur_rec,
                });
                Ok(())
            }
            _ => Err(DbError::Corrupt(
                "markScan called without a positioned scan cursor".into(),
            )),
        }
    }

    /// Restore the position captured by the last `mark_scan`. Repins only
    /// if the marked record lives on a different page than the one
    /// currently pinned.
    pub fn reset_scan(&mut self) -> DbResult<()> {
        let marked = self.marked.ok_or_else(|| {
            DbError::Corrupt("resetScan called before markScan".into())
        })?;

        self.core.switch_current(marked.page_no)?;
        self.core.cur_rec = marked.rid;
        self.cursor = ScanCursor::Positioned;
        Ok(())
    }

    /// Release the current page, if any. Idempotent: calling this again
    /// after the page is already released is a no-op.
    pub fn end_scan(&mut self) -> DbResult<()> {
        if let Some(pin) = self.core.cur.take() {
            pin.unpin()?;
        }
        self.cursor = ScanCursor::Exhausted;
        Ok(())
    }
}

/// Adapts `scan_next`'s `FileEof` sentinel into `None`, so a scan can be
/// driven with a plain `for rid in &mut scan { ... }`.
impl Iterator for HeapFileScan {
    type Item = DbResult<Rid>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan_next() {
            Ok(rid) => Some(Ok(rid)),
            Err(DbError::FileEof) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
