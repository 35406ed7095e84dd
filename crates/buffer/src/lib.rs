//! The buffer manager: a process-wide pool of page frames sitting between
//! the heap file layer and the paged file on disk.
//!
//! `BufMgr` owns the frame table and enforces the pinning contract (every
//! pin is matched by exactly one unpin, carrying a dirty flag) internally by
//! counting. Callers are not expected to drive `BufMgr` directly; `SharedBufMgr`
//! hands out [`PagePin`] guards whose `Drop` performs the unpin, so a page
//! brought into memory cannot be leaked on an early return — the compiler
//! enforces it the same way it enforces dropping a `MutexGuard`.


use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;
use std::rc::Rc;

use common::{DbError, DbResult, PAGE_SIZE};
use hashbrown::HashMap;
use lru::LruCache;
use page::Page;
use pagedfile::PagedFile;

struct Frame {
    page: Page,
    pin_count: u32,
    dirty: bool,
}

/// Low-level frame table. Not meant to be driven directly by the heap file
/// layer — see [`SharedBufMgr`] for the pin-as-RAII-guard API built on top.
pub struct BufMgr {
    file: PagedFile,
    pool_size: usize,
    frames: HashMap<i32, Frame>,
    /// Page numbers with `pin_count == 0`, in least-recently-unpinned order.
    /// Invariant: a page number is in here if and only if its frame exists
    /// and is currently unpinned.
    evictable: LruCache<i32, ()>,
}

impl BufMgr {
    pub fn new(file: PagedFile, pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        Self {
            file,
            pool_size,
            frames: HashMap::new(),
            evictable: LruCache::new(NonZeroUsize::new(pool_size).unwrap()),
        }
    }

    fn ensure_capacity(&mut self) -> DbResult<()> {
        if self.frames.len() < self.pool_size {
            return Ok(());
        }
        let (evict_no, _) = self
            .evictable
            .pop_lru()
            .ok_or(DbError::BufferExhausted(self.pool_size))?;
        let frame = self
            .frames
            .remove(&evict_no)
            .expect("evictable entry always names a resident, unpinned frame");
        if frame.dirty {
            self.file.write_page(evict_no, frame.page.raw())?;
        }
        Ok(())
    }

    pub fn alloc_page(&mut self) -> DbResult<i32> {
        let page_no = self.file.allocate_page_no()?;
        self.ensure_capacity()?;
        let page = Page::init(page_no);
        self.file.write_page(page_no, page.raw())?;
        self.frames.insert(
            page_no,
            Frame {
                page,
                pin_count: 1,
                dirty: false,
            },
        );
        Ok(page_no)
    }

    pub fn pin_page(&mut self, page_no: i32) -> DbResult<()> {
        if let Some(frame) = self.frames.get_mut(&page_no) {
            frame.pin_count += 1;
            self.evictable.pop(&page_no);
            return Ok(());
        }

        self.ensure_capacity()?;
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file.read_page(page_no, &mut buf)?;
        self.frames.insert(
            page_no,
            Frame {
                page: Page::from_raw(page_no, buf),
                pin_count: 1,
                dirty: false,
            },
        );
        Ok(())
    }

    pub fn unpin_page(&mut self, page_no: i32, dirty: bool) -> DbResult<()> {
        let frame = self
            .frames
            .get_mut(&page_no)
            .ok_or_else(|| DbError::Corrupt(format!("unpin of non-resident page {page_no}")))?;
        if frame.pin_count == 0 {
            return Err(DbError::Corrupt(format!(
                "page {page_no} unpinned while its pin count was already zero"
            )));
        }
        frame.pin_count -= 1;
        frame.dirty |= dirty;
        if frame.pin_count == 0 {
            self.evictable.put(page_no, ());
        }
        Ok(())
    }

    pub fn frame_page(&self, page_no: i32) -> Option<&Page> {
        self.frames.get(&page_no).map(|f| &f.page)
    }

    pub fn frame_page_mut(&mut self, page_no: i32) -> Option<&mut Page> {
        self.frames.get_mut(&page_no).map(|f| &mut f.page)
    }

    /// Write every dirty frame back to disk and force the OS to persist it.
    pub fn flush_file(&mut self) -> DbResult<()> {
        let dirty_ids: Vec<i32> = self
            .frames
            .iter()
            .filter(|(_, f)| f.dirty)
            .map(|(id, _)| *id)
            .collect();
        for id in dirty_ids {
            let raw = self.frames[&id].page.raw().to_vec();
            self.file.write_page(id, &raw)?;
            self.frames.get_mut(&id).unwrap().dirty = false;
        }
        self.file.sync()
    }

    /// Number of frames currently pinned, for tests asserting pin discipline.
    pub fn pinned_count(&self) -> usize {
        self.frames.values().filter(|f| f.pin_count > 0).count()
    }
}

/// Shared handle to a [`BufMgr`], cheaply cloneable within a single thread.
///
/// The heap file layer is single-threaded cooperative (see the concurrency
/// model) so `Rc<RefCell<_>>` is the right tool here: no handle crosses a
/// thread boundary, and every access is a short, non-reentrant borrow.
#[derive(Clone)]
pub struct SharedBufMgr(Rc<RefCell<BufMgr>>);

impl SharedBufMgr {
    pub fn new(mgr: BufMgr) -> Self {
        Self(Rc::new(RefCell::new(mgr)))
    }

    /// Allocate a fresh page and pin it.
    pub fn alloc_page(&self) -> DbResult<PagePin> {
        let page_no = self.0.borrow_mut().alloc_page()?;
        Ok(PagePin::new(self.0.clone(), page_no))
    }

    /// Pin an existing page, faulting it in from disk if necessary.
    pub fn pin_page(&self, page_no: i32) -> DbResult<PagePin> {
        self.0.borrow_mut().pin_page(page_no)?;
        Ok(PagePin::new(self.0.clone(), page_no))
    }

    pub fn flush_file(&self) -> DbResult<()> {
        self.0.borrow_mut().flush_file()
    }

    pub fn pinned_count(&self) -> usize {
        self.0.borrow().pinned_count()
    }
}

/// A pinned page. Dropping this guard unpins the page, carrying whatever
/// dirty flag was set via [`PagePin::mark_dirty`] — the same discipline a
/// hand-rolled "unpin on every return path" implementation would have to
/// enforce by hand, except here it is impossible to forget.
pub struct PagePin {
    mgr: Rc<RefCell<BufMgr>>,
    page_no: i32,
    dirty: Cell<bool>,
    released: Cell<bool>,
}

impl PagePin {
    fn new(mgr: Rc<RefCell<BufMgr>>, page_no: i32) -> Self {
        Self {
            mgr,
            page_no,
            dirty: Cell::new(false),
            released: Cell::new(false),
        }
    }

    pub fn page_no(&self) -> i32 {
        self.page_no
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&Page) -> R) -> R {
        let mgr = self.mgr.borrow();
        let page = mgr
            .frame_page(self.page_no)
            .expect("a live PagePin's frame is always resident");
        f(page)
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        let mut mgr = self.mgr.borrow_mut();
        let page = mgr
            .frame_page_mut(self.page_no)
            .expect("a live PagePin's frame is always resident");
        f(page)
    }

    /// Release the pin now, propagating any unpin error instead of logging
    /// and swallowing it the way `Drop` does.
    pub fn unpin(self) -> DbResult<()> {
        self.released.set(true);
        self.mgr.borrow_mut().unpin_page(self.page_no, self.dirty.get())
    }
}

impl Drop for PagePin {
    fn drop(&mut self) {
        if self.released.get() {
            return;
        }
        self.released.set(true);
        if let Err(e) = self.mgr.borrow_mut().unpin_page(self.page_no, self.dirty.get()) {
            log::error!("failed to unpin page {}: {e}", self.page_no);
        }
    }
}
