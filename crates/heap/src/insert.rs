//! `InsertFileScan`: append-only insertion into a heap file, allocating and
//! linking a fresh page whenever the tail page runs out of room.

use buffer::PagePin;
use common::{Config, DbError, DbResult, Rid};
use page::{InsertOutcome, Page};

use crate::core::HeapFileCore;
use crate::header::FileHdrPage;

pub struct InsertFileScan {
    core: HeapFileCore,
}

impl InsertFileScan {
    pub fn open(config: &Config, file_name: &str) -> DbResult<Self> {
        let mut core = HeapFileCore::open(config, file_name)?;
        let last_page = core.header()?.last_page;
        core.switch_current(last_page)?;
        Ok(Self { core })
    }

    pub fn get_rec_cnt(&self) -> DbResult<i32> {
        self.core.rec_cnt()
    }

    pub fn header(&self) -> DbResult<FileHdrPage> {
        self.core.header()
    }

    pub fn get_record(&mut self, rid: Rid) -> DbResult<Vec<u8>> {
        self.core.get_record(rid)
    }

    /// Append `rec`. Allocates and links a new tail page when the current
    /// one reports `NoSpace`; a record respecting `max_record_len` is
    /// guaranteed to fit on a freshly initialized page.
    pub fn insert_record(&mut self, rec: &[u8]) -> DbResult<Rid> {
        let max_len = Page::max_record_len();
        if rec.len() > max_len {
            return Err(DbError::InvalidRecLen {
                len: rec.len(),
                max: max_len,
            });
        }

        if self.core.cur.is_none() {
            let last_page = self.core.header()?.last_page;
            self.core.switch_current(last_page)?;
        }

        let outcome = {
            let pin = self
                .core
                .cur
                .as_ref()
                .expect("just ensured cur is populated");
            pin.with_mut(|p| p.insert_record(rec))?
        };

        match outcome {
            InsertOutcome::Inserted(rid) => {
                self.core
                    .cur
                    .as_ref()
                    .expect("just ensured cur is populated")
                    .mark_dirty();
                self.bump_rec_cnt()?;
                self.core.cur_rec = rid;
                Ok(rid)
            }
            InsertOutcome::NoSpace => {
                self.grow_and_retry(rec)
            }
        }
    }

    fn bump_rec_cnt(&self) -> DbResult<()> {
        let mut hdr = self.core.header()?;
        hdr.rec_cnt += 1;
        self.core.write_header(&hdr)
    }

    /// Allocate a new tail page, link it onto the chain, update the header,
    /// and retry the insert that didn't fit on the old tail.
    fn grow_and_retry(&mut self, rec: &[u8]) -> DbResult<Rid> {
        let new_pin: PagePin = self.core.buf.alloc_page()?;
        let new_page_no = new_pin.page_no();

        let old_pin = self
            .core
            .cur
            .take()
            .expect("grow_and_retry only called after a failed insert on the current page");
        old_pin.with_mut(|p| p.set_next_page(new_page_no))?;
        old_pin.mark_dirty();
        old_pin.unpin()?;

        new_pin.mark_dirty();
        self.core.cur = Some(new_pin);

        let mut hdr = self.core.header()?;
        hdr.last_page = new_page_no;
        hdr.page_cnt += 1;
        self.core.write_header(&hdr)?;

        let outcome = {
            let pin = self.core.cur.as_ref().expect("just adopted new_pin");
            pin.with_mut(|p| p.insert_record(rec))?
        };
        match outcome {
            InsertOutcome::Inserted(rid) => {
                self.bump_rec_cnt()?;
                self.core.cur_rec = rid;
                Ok(rid)
            }
            InsertOutcome::NoSpace => Err(DbError::Corrupt(
                "record within max_record_len did not fit on a freshly initialized page".into(),
            )),
        }
    }
}

/// The current data page is always treated as dirty on teardown — insertion
/// may have mutated it on any control path, and there is no cheaper way to
/// tell from here than "assume yes". Header release is handled by `core`'s
/// own field drop order.
impl Drop for InsertFileScan {
    fn drop(&mut self) {
        if let Some(pin) = &self.core.cur {
            pin.mark_dirty();
        }
    }
}
