//! The file header page: page 0 of every heap file. Unlike a data page it
//! carries no slot directory — it is a single fixed-layout struct occupying
//! the whole page, bincode-encoded directly into the buffer.

use bincode::config::{self, Config};
use bincode::serde::{decode_from_slice, encode_into_slice};
use common::{DbError, DbResult, MAXNAMESIZE, PAGE_SIZE};
use serde::{Deserialize, Serialize};

fn bincode_config() -> impl Config {
    config::legacy()
}

/// File-level metadata: the page-chain endpoints and live counters.
///
/// `page_cnt` counts data pages only, not the header page itself — the
/// convention the original left implicit (it starts at 1 right after the
/// first data page is allocated, and the header page is never part of the
/// data-page chain).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHdrPage {
    pub file_name: String,
    pub rec_cnt: i32,
    pub page_cnt: i32,
    pub first_page: i32,
    pub last_page: i32,
}

impl FileHdrPage {
    pub fn new(file_name: &str) -> Self {
        let cut = (0..=MAXNAMESIZE.min(file_name.len()))
            .rev()
            .find(|&i| file_name.is_char_boundary(i))
            .unwrap_or(0);
        let mut name = file_name.to_string();
        name.truncate(cut);
        Self {
            file_name: name,
            rec_cnt: 0,
            page_cnt: 0,
            first_page: -1,
            last_page: -1,
        }
    }

    pub fn read_from(raw: &[u8]) -> DbResult<Self> {
        debug_assert_eq!(raw.len(), PAGE_SIZE);
        let (hdr, _) = decode_from_slice(raw, bincode_config())
            .map_err(|e| DbError::Corrupt(format!("file header decode failed: {e}")))?;
        Ok(hdr)
    }

    pub fn write_to(&self, raw: &mut [u8]) -> DbResult<()> {
        debug_assert_eq!(raw.len(), PAGE_SIZE);
        for b in raw.iter_mut() {
            *b = 0;
        }
        encode_into_slice(self, raw, bincode_config())
            .map_err(|e| DbError::Corrupt(format!("file header encode failed: {e}")))?;
        Ok(())
    }
}
