use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use crate::common::types::{Frame, FrameId, Page, PageId, PagePtr, INVALID_PAGE_ID};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::page_guard::{PageGuard, ReadPageGuard, WritePageGuard};
use crate::storage::buffer::replacer::LruKReplacer;
use crate::storage::disk::DiskManager;
use crate::wal::LogManager;

/// Mutable pool state, serialized under the manager's latch
struct PoolState {
    frames: Vec<Frame>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
}

impl PoolState {
    /// Hand out the next page ID; IDs grow monotonically and are never reused
    fn allocate_page(&mut self) -> PageId {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    /// Allocator notification; this core does not reclaim page IDs
    fn deallocate_page(&mut self, _page_id: PageId) {}
}

/// Fixed-capacity page cache mediating all access to on-disk pages.
///
/// Every public operation runs under one latch; per-page data access is
/// protected separately by the page latches, which the read/write guards
/// take only after the manager latch has been released. That ordering
/// (manager first, page latch second) is what keeps the two levels
/// deadlock free.
pub struct BufferPoolManager {
    pool_size: usize,
    state: Mutex<PoolState>,
    replacer: LruKReplacer,
    disk_manager: Arc<DiskManager>,
    log_manager: Option<Arc<LogManager>>,
}

impl BufferPoolManager {
    pub fn new(
        pool_size: usize,
        replacer_k: usize,
        db_path: impl AsRef<Path>,
    ) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::with_disk_manager(
            pool_size,
            replacer_k,
            disk_manager,
            None,
        ))
    }

    /// Create a buffer pool manager with WAL support
    pub fn new_with_wal(
        pool_size: usize,
        replacer_k: usize,
        db_path: impl AsRef<Path>,
        log_manager: Arc<LogManager>,
    ) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        Ok(Self::with_disk_manager(
            pool_size,
            replacer_k,
            disk_manager,
            Some(log_manager),
        ))
    }

    /// Build a pool over an existing disk manager
    pub fn with_disk_manager(
        pool_size: usize,
        replacer_k: usize,
        disk_manager: Arc<DiskManager>,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            frames.push(Frame::new(Arc::new(RwLock::new(Page::new(
                INVALID_PAGE_ID,
            )))));
            free_list.push_back(i as FrameId);
        }

        Self {
            pool_size,
            state: Mutex::new(PoolState {
                frames,
                page_table: HashMap::new(),
                free_list,
                next_page_id: 0,
            }),
            replacer: LruKReplacer::new(pool_size, replacer_k),
            disk_manager,
            log_manager,
        }
    }

    /// Create a new zero-filled page, pinned in a frame
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = self.obtain_frame(state)?;
        let page_id = state.allocate_page();

        let frame = &mut state.frames[frame_id as usize];
        frame.pin_count = 1;
        frame.is_dirty = false;
        {
            let mut page = frame.page.write();
            page.reset();
            page.page_id = page_id;
        }
        let page_ptr = Arc::clone(&frame.page);
        state.page_table.insert(page_id, frame_id);

        self.replacer.set_evictable(frame_id, false)?;
        self.replacer.record_access(frame_id)?;

        debug!("allocated page {} in frame {}", page_id, frame_id);
        Ok((page_ptr, page_id))
    }

    /// Fetch a page, reading it from disk if it is not resident
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Check if page is already in the buffer pool
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &mut state.frames[frame_id as usize];
            frame.pin_count += 1;
            let page_ptr = Arc::clone(&frame.page);

            self.replacer.set_evictable(frame_id, false)?;
            self.replacer.record_access(frame_id)?;
            return Ok(page_ptr);
        }

        // Page not in buffer pool, allocate a frame and read from disk
        let frame_id = self.obtain_frame(state)?;
        {
            let frame = &mut state.frames[frame_id as usize];
            let mut page = frame.page.write();
            if let Err(e) = self.disk_manager.read_page(page_id, &mut page.data) {
                // the frame is still clean and empty, hand it back
                drop(page);
                state.free_list.push_front(frame_id);
                return Err(e.into());
            }
            page.page_id = page_id;
            page.lsn = 0;
            frame.pin_count = 1;
            frame.is_dirty = false;
        }
        state.page_table.insert(page_id, frame_id);

        self.replacer.set_evictable(frame_id, false)?;
        self.replacer.record_access(frame_id)?;

        Ok(Arc::clone(&state.frames[frame_id as usize].page))
    }

    /// Drop one pin on a resident page, OR-ing in the caller's dirty flag
    ///
    /// Returns false if the page is not resident or has no outstanding
    /// pins. The data is not written back here; once the pin count reaches
    /// zero the frame merely becomes a replacement candidate.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return false,
        };

        let frame = &mut state.frames[frame_id as usize];
        if frame.pin_count == 0 {
            return false;
        }
        frame.is_dirty |= is_dirty;
        frame.pin_count -= 1;

        if frame.pin_count == 0 {
            // frame ids coming out of the page table are always in range
            self.replacer
                .set_evictable(frame_id, true)
                .expect("page table produced an out-of-range frame id");
        }
        true
    }

    /// Write a resident page to disk and clear its dirty flag
    ///
    /// Ignores the pin count; callers are responsible for flushing at a
    /// consistent point. Returns Ok(false) if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(false),
        };

        let frame = &mut state.frames[frame_id as usize];
        {
            let page = frame.page.read();
            if let Some(ref log_manager) = self.log_manager {
                log_manager.flush_till_lsn(page.lsn);
            }
            self.disk_manager.write_page(page_id, &page.data)?;
        }
        frame.is_dirty = false;
        Ok(true)
    }

    /// Write every resident page to disk, clearing all dirty flags
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        if let Some(ref log_manager) = self.log_manager {
            log_manager.flush();
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let entries: Vec<(PageId, FrameId)> =
            state.page_table.iter().map(|(&p, &f)| (p, f)).collect();
        for (page_id, frame_id) in entries {
            let frame = &mut state.frames[frame_id as usize];
            {
                let page = frame.page.read();
                self.disk_manager.write_page(page_id, &page.data)?;
            }
            frame.is_dirty = false;
        }
        Ok(())
    }

    /// Drop a page from the pool, returning its frame to the free list
    ///
    /// Succeeds vacuously when the page is not resident. Refuses with
    /// Ok(false) while any pin is outstanding.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(true),
        };

        let frame = &mut state.frames[frame_id as usize];
        if frame.pin_count >= 1 {
            warn!("refusing to delete pinned page {}", page_id);
            return Ok(false);
        }

        if frame.is_dirty {
            let page = frame.page.read();
            if let Some(ref log_manager) = self.log_manager {
                log_manager.flush_till_lsn(page.lsn);
            }
            self.disk_manager.write_page(page_id, &page.data)?;
            drop(page);
            frame.is_dirty = false;
        }
        frame.page.write().reset();

        state.page_table.remove(&page_id);
        // the frame is unpinned, so the replacer still tracks it as evictable
        self.replacer.remove(frame_id)?;
        state.free_list.push_back(frame_id);
        state.deallocate_page(page_id);

        debug!("deleted page {}, frame {} returned to free list", page_id, frame_id);
        Ok(true)
    }

    /// Fetch a page wrapped in a basic guard that unpins on drop
    pub fn fetch_page_basic(
        self: &Arc<Self>,
        page_id: PageId,
    ) -> Result<PageGuard, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageGuard::new(Arc::clone(self), page, page_id))
    }

    /// Fetch a page and take its shared latch
    pub fn fetch_page_read(
        self: &Arc<Self>,
        page_id: PageId,
    ) -> Result<ReadPageGuard, BufferPoolError> {
        Ok(self.fetch_page_basic(page_id)?.into_read())
    }

    /// Fetch a page and take its exclusive latch
    pub fn fetch_page_write(
        self: &Arc<Self>,
        page_id: PageId,
    ) -> Result<WritePageGuard, BufferPoolError> {
        Ok(self.fetch_page_basic(page_id)?.into_write())
    }

    /// Create a new page wrapped in a basic guard
    pub fn new_page_guarded(self: &Arc<Self>) -> Result<PageGuard, BufferPoolError> {
        let (page, page_id) = self.new_page()?;
        Ok(PageGuard::new(Arc::clone(self), page, page_id))
    }

    /// Pin count of a resident page
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        let &frame_id = state.page_table.get(&page_id)?;
        Some(state.frames[frame_id as usize].pin_count)
    }

    /// Number of frames in the pool
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Get a reference to the disk manager
    pub fn disk_manager(&self) -> Arc<DiskManager> {
        Arc::clone(&self.disk_manager)
    }

    /// Get a reference to the log manager, if available
    pub fn log_manager(&self) -> Option<Arc<LogManager>> {
        self.log_manager.clone()
    }

    /// Victim selection: free list first, then the replacer
    ///
    /// On the eviction path the victim's page-table entry is removed and
    /// dirty contents are written back, so the returned frame is always
    /// clean and empty.
    fn obtain_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = match self.replacer.evict() {
            Some(id) => id,
            None => return Err(BufferPoolError::PoolExhausted),
        };

        let frame = &mut state.frames[frame_id as usize];
        let old_page_id = frame.page.read().page_id;

        if frame.is_dirty {
            let page = frame.page.read();
            if let Some(ref log_manager) = self.log_manager {
                log_manager.flush_till_lsn(page.lsn);
            }
            if let Err(e) = self.disk_manager.write_page(old_page_id, &page.data) {
                // leave the victim resident; it only lost its access history
                drop(page);
                self.replacer
                    .set_evictable(frame_id, true)
                    .expect("evicted frame id out of range");
                return Err(e.into());
            }
            drop(page);
            frame.is_dirty = false;
            debug!(
                "wrote back dirty page {} evicted from frame {}",
                old_page_id, frame_id
            );
        }

        if old_page_id != INVALID_PAGE_ID {
            state.page_table.remove(&old_page_id);
        }
        frame.page.write().reset();
        Ok(frame_id)
    }
}
