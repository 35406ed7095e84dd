//! Shared state and pin-management logic behind `HeapFile`, `HeapFileScan`,
//! and `InsertFileScan`. Not part of the public API: each of the three
//! handle types wraps one of these and layers its own cursor semantics on
//! top, in place of a base class the three would otherwise extend.

use buffer::{BufMgr, PagePin, SharedBufMgr};
use common::{Config, DbResult, Rid};
use pagedfile::PagedFile;

use crate::header::FileHdrPage;

/// Field order matters: `cur` drops (unpinning the data page) before
/// `header_pin` (unpinning the header page), before `buf` (closing the
/// file) — the data page must never outlive the header page it was found
/// through.
pub(crate) struct HeapFileCore {
    pub(crate) cur: Option<PagePin>,
    pub(crate) header_pin: PagePin,
    pub(crate) buf: SharedBufMgr,
    pub(crate) cur_rec: Rid,
}

impl HeapFileCore {
    /// Open an existing heap file: pin the header, read `firstPage` out of
    /// it, and pin that page as the initial current page. If the second pin
    /// fails, `header_pin` is still released — it goes out of scope via the
    /// `?` early return and its `Drop` unpins it.
    pub(crate) fn open(config: &Config, file_name: &str) -> DbResult<Self> {
        let path = config.data_dir.join(file_name);
        let file = PagedFile::open(&path)?;
        let buf = SharedBufMgr::new(BufMgr::new(file, config.buffer_pool_pages));

        let header_pin = buf.pin_page(0)?;
        let first_page = header_pin
            .with(|p| FileHdrPage::read_from(p.raw()))?
            .first_page;
        let cur = buf.pin_page(first_page)?;

        Ok(Self {
            cur: Some(cur),
            header_pin,
            buf,
            cur_rec: Rid::NULL,
        })
    }

    pub(crate) fn header(&self) -> DbResult<FileHdrPage> {
        self.header_pin.with(|p| FileHdrPage::read_from(p.raw()))
    }

    pub(crate) fn write_header(&self, hdr: &FileHdrPage) -> DbResult<()> {
        self.header_pin.with_mut(|p| hdr.write_to(p.raw_mut()))?;
        self.header_pin.mark_dirty();
        Ok(())
    }

    pub(crate) fn rec_cnt(&self) -> DbResult<i32> {
        Ok(self.header()?.rec_cnt)
    }

    /// Make `page_no` the current page, unpinning whatever was current
    /// before (dirty flag honored) if it differs. A no-op if `page_no` is
    /// already current, so callers never double-pin the same frame.
    pub(crate) fn switch_current(&mut self, page_no: i32) -> DbResult<()> {
        if let Some(pin) = &self.cur {
            if pin.page_no() == page_no {
                return Ok(());
            }
        }
        if let Some(pin) = self.cur.take() {
            pin.unpin()?;
        }
        let pin = self.buf.pin_page(page_no)?;
        self.cur = Some(pin);
        Ok(())
    }

    /// Random-access fetch by rid, switching the current page if needed.
    /// Shared by `HeapFile::get_record` and `HeapFileScan::get_record`'s
    /// non-scan-path sibling behavior.
    pub(crate) fn get_record(&mut self, rid: Rid) -> DbResult<Vec<u8>> {
        self.switch_current(rid.page_no)?;
        let pin = self
            .cur
            .as_ref()
            .expect("switch_current always leaves cur populated on success");
        let rec = pin.with(|p| p.get_record(rid))?;
        self.cur_rec = rid;
        Ok(rec)
    }
}
