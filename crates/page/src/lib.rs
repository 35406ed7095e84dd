//! The page abstraction: a fixed-size block with a slot directory, an
//! intra-page record iterator, and a forward link to the next page in a
//! heap file's chain.
//!
//! A page knows nothing about the file or chain it belongs to beyond its
//! own `next_page` link; walking the chain, pinning, and counting records
//! is the heap file's job.

#[cfg(test)]
mod tests;

use std::mem::size_of;

use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_into_slice};
use common::{DbError, DbResult, Rid, PAGE_SIZE};
use serde::{Deserialize, Serialize};

fn bincode_config() -> impl Config {
    config::legacy()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PageHeader {
    next_page: i32,
    num_slots: u16,
    free_offset: u16,
}

impl Default for PageHeader {
    fn default() -> Self {
        Self {
            next_page: -1,
            num_slots: 0,
            free_offset: PAGE_SIZE as u16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot {
    offset: u16,
    len: u16,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

const HEADER_BYTES: usize = size_of::<PageHeader>();
const SLOT_BYTES: usize = size_of::<Slot>();

/// Fixed per-page overhead: the page header plus the slot-directory entry a
/// single record needs. A record larger than `PAGE_SIZE - DPFIXED` can never
/// fit on any page, freshly initialized or not.
pub const DPFIXED: usize = HEADER_BYTES + SLOT_BYTES;

/// Outcome of looking for the first record on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCursor {
    Found(Rid),
    NoRecords,
}

/// Outcome of advancing past a known-valid cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Found(Rid),
    EndOfPage,
    NoRecords,
}

/// Outcome of attempting to insert a record on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(Rid),
    NoSpace,
}

/// A fixed-size page: a slot directory growing down from the header, and
/// record payloads growing up from the end of the buffer.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_no: i32,
    data: Vec<u8>,
}

impl Page {
    /// Maximum payload a record may have on any page.
    pub fn max_record_len() -> usize {
        PAGE_SIZE - DPFIXED
    }

    /// Initialize a fresh, empty page with the given page number and no
    /// next-page link.
    pub fn init(page_no: i32) -> Self {
        let mut page = Self {
            page_no,
            data: vec![0u8; PAGE_SIZE],
        };
        page.write_header(&PageHeader::default())
            .expect("fresh page header always fits");
        page
    }

    /// Wrap bytes already on disk as a page, without reinitializing them.
    pub fn from_raw(page_no: i32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), PAGE_SIZE);
        Self { page_no, data }
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn header(&self) -> DbResult<PageHeader> {
        let (header, read) = decode_from_slice(&self.data[..HEADER_BYTES], bincode_config())
            .map_err(|e| DbError::Corrupt(format!("page header decode failed: {e}")))?;
        debug_assert_eq!(read, HEADER_BYTES);
        Ok(header)
    }

    fn write_header(&mut self, header: &PageHeader) -> DbResult<()> {
        let written = encode_into_slice(header, &mut self.data[..HEADER_BYTES], bincode_config())
            .map_err(|e| DbError::Corrupt(format!("page header encode failed: {e}")))?;
        debug_assert_eq!(written, HEADER_BYTES);
        Ok(())
    }

    fn slot_offset(slot_no: u16) -> usize {
        HEADER_BYTES + slot_no as usize * SLOT_BYTES
    }

    fn read_slot(&self, slot_no: u16) -> DbResult<Slot> {
        let start = Self::slot_offset(slot_no);
        let end = start + SLOT_BYTES;
        if end > PAGE_SIZE {
            return Err(DbError::Corrupt(format!("slot {slot_no} out of bounds")));
        }
        let (slot, read) = decode_from_slice(&self.data[start..end], bincode_config())
            .map_err(|e| DbError::Corrupt(format!("slot decode failed: {e}")))?;
        debug_assert_eq!(read, SLOT_BYTES);
        Ok(slot)
    }

    fn write_slot(&mut self, slot_no: u16, slot: &Slot) -> DbResult<()> {
        let start = Self::slot_offset(slot_no);
        let end = start + SLOT_BYTES;
        if end > PAGE_SIZE {
            return Err(DbError::Corrupt(format!("slot {slot_no} out of bounds")));
        }
        let written = encode_into_slice(slot, &mut self.data[start..end], bincode_config())
            .map_err(|e| DbError::Corrupt(format!("slot encode failed: {e}")))?;
        debug_assert_eq!(written, SLOT_BYTES);
        Ok(())
    }

    fn free_space(&self, header: &PageHeader) -> usize {
        let slots_end = HEADER_BYTES + header.num_slots as usize * SLOT_BYTES;
        (header.free_offset as usize).saturating_sub(slots_end)
    }

    fn rid(&self, slot_no: u16) -> Rid {
        Rid::new(self.page_no, slot_no as i32)
    }

    pub fn get_next_page(&self) -> DbResult<i32> {
        Ok(self.header()?.next_page)
    }

    pub fn set_next_page(&mut self, next_page: i32) -> DbResult<()> {
        let mut header = self.header()?;
        header.next_page = next_page;
        self.write_header(&header)
    }

    pub fn first_record(&self) -> DbResult<RecordCursor> {
        let header = self.header()?;
        for slot_no in 0..header.num_slots {
            if !self.read_slot(slot_no)?.is_empty() {
                return Ok(RecordCursor::Found(self.rid(slot_no)));
            }
        }
        Ok(RecordCursor::NoRecords)
    }

    /// Advance past `cur`. Tolerates `cur` referring to a slot that has
    /// since been deleted — only the slot index is used to resume the scan.
    pub fn next_record(&self, cur: Rid) -> DbResult<AdvanceOutcome> {
        let header = self.header()?;
        if header.num_slots == 0 {
            return Ok(AdvanceOutcome::NoRecords);
        }
        let mut slot_no = cur.slot_no as i64 + 1;
        while slot_no < header.num_slots as i64 {
            let idx = slot_no as u16;
            if !self.read_slot(idx)?.is_empty() {
                return Ok(AdvanceOutcome::Found(self.rid(idx)));
            }
            slot_no += 1;
        }
        Ok(AdvanceOutcome::EndOfPage)
    }

    pub fn get_record(&self, rid: Rid) -> DbResult<Vec<u8>> {
        let header = self.header()?;
        if rid.slot_no < 0 || rid.slot_no as u16 >= header.num_slots {
            return Err(DbError::RecordNotFound(rid));
        }
        let slot = self.read_slot(rid.slot_no as u16)?;
        if slot.is_empty() {
            return Err(DbError::RecordNotFound(rid));
        }
        let start = slot.offset as usize;
        let end = start + slot.len as usize;
        Ok(self.data[start..end].to_vec())
    }

    pub fn insert_record(&mut self, bytes: &[u8]) -> DbResult<InsertOutcome> {
        let mut header = self.header()?;
        if header.num_slots == u16::MAX || bytes.len() > u16::MAX as usize {
            return Ok(InsertOutcome::NoSpace);
        }
        let needed = bytes.len() + SLOT_BYTES;
        if self.free_space(&header) < needed {
            return Ok(InsertOutcome::NoSpace);
        }

        let slot_no = header.num_slots;
        let len = bytes.len() as u16;
        let new_free_offset = header.free_offset - len;
        self.data[new_free_offset as usize..header.free_offset as usize].copy_from_slice(bytes);
        self.write_slot(slot_no, &Slot {
            offset: new_free_offset,
            len,
        })?;

        header.num_slots += 1;
        header.free_offset = new_free_offset;
        self.write_header(&header)?;

        Ok(InsertOutcome::Inserted(self.rid(slot_no)))
    }

    pub fn delete_record(&mut self, rid: Rid) -> DbResult<()> {
        let header = self.header()?;
        if rid.slot_no < 0 || rid.slot_no as u16 >= header.num_slots {
            return Err(DbError::RecordNotFound(rid));
        }
        let mut slot = self.read_slot(rid.slot_no as u16)?;
        if slot.is_empty() {
            return Err(DbError::RecordNotFound(rid));
        }
        slot.len = 0;
        self.write_slot(rid.slot_no as u16, &slot)
    }
}
