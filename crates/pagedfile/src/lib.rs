//! The paged file abstraction: a flat OS file addressed as a sequence of
//! fixed-size, zero-indexed pages. This is the lowest layer of the storage
//! stack — it knows nothing about slot directories or record chains, only
//! byte offsets.


use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use common::{DbError, DbResult, PAGE_SIZE};

/// A single OS file accessed page-by-page.
#[derive(Debug)]
pub struct PagedFile {
    path: PathBuf,
    file: File,
}

impl PagedFile {
    /// Create a new, empty paged file. Fails if a file already exists at `path`.
    pub fn create(path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(())
    }

    /// Remove the file entirely. The caller is responsible for verifying the
    /// file is not currently open elsewhere.
    pub fn destroy(path: impl AsRef<Path>) -> DbResult<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    /// Open an existing paged file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of whole pages currently allocated in the file.
    pub fn num_pages(&self) -> DbResult<i32> {
        let len = self.file.metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as i32)
    }

    /// The page number of the first page in the file (always 0; every heap
    /// file's header page occupies it).
    pub fn first_page_no(&self) -> i32 {
        0
    }

    /// Reserve the next sequential page number without writing anything.
    /// The caller must write a full page at this offset before it is
    /// considered allocated by `num_pages`.
    pub fn allocate_page_no(&self) -> DbResult<i32> {
        self.num_pages()
    }

    pub fn read_page(&mut self, page_no: i32, buf: &mut [u8]) -> DbResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let offset = page_no as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file
            .read_exact(buf)
            .map_err(|e| DbError::Corrupt(format!("short read of page {page_no}: {e}")))?;
        Ok(())
    }

    pub fn write_page(&mut self, page_no: i32, buf: &[u8]) -> DbResult<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let offset = page_no as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    pub fn sync(&mut self) -> DbResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Close the file. Trivial beyond the `Drop` of the underlying handle,
    /// kept as an explicit method to mirror the external file contract.
    pub fn close(self) -> DbResult<()> {
        Ok(())
    }
}
