use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock};

use crate::common::types::{Lsn, Page, PageId, PagePtr};
use crate::storage::buffer::manager::BufferPoolManager;

struct GuardInner {
    bpm: Arc<BufferPoolManager>,
    page: PagePtr,
    page_id: PageId,
    is_dirty: bool,
}

/// Scoped handle over a pinned page.
///
/// Owns one pin on the page and releases it on drop, carrying the dirty
/// flag accumulated through `mark_dirty`. Upgrading into a read or write
/// guard takes the page latch while the pin is already held, which is the
/// required ordering: manager latch, then page latch.
///
/// A guard whose pin has been handed off (by `into_read`/`into_write`) is
/// an inert shell; dropping it does nothing.
pub struct PageGuard {
    inner: Option<GuardInner>,
}

impl PageGuard {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page: PagePtr, page_id: PageId) -> Self {
        Self {
            inner: Some(GuardInner {
                bpm,
                page,
                page_id,
                is_dirty: false,
            }),
        }
    }

    fn inner(&self) -> &GuardInner {
        self.inner.as_ref().expect("page guard already released")
    }

    /// ID of the guarded page
    pub fn page_id(&self) -> PageId {
        self.inner().page_id
    }

    /// The guarded page; callers take the page latch to touch its data
    pub fn page(&self) -> &PagePtr {
        &self.inner().page
    }

    /// Mark the page dirty when the pin is released
    pub fn mark_dirty(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            inner.is_dirty = true;
        }
    }

    /// Take the shared latch, turning this into a read guard
    pub fn into_read(mut self) -> ReadPageGuard {
        let inner = self.inner.take().expect("page guard already released");
        let latch = inner.page.read_arc();
        ReadPageGuard {
            latch,
            base: PageGuard { inner: Some(inner) },
        }
    }

    /// Take the exclusive latch, turning this into a write guard
    pub fn into_write(mut self) -> WritePageGuard {
        let inner = self.inner.take().expect("page guard already released");
        let latch = inner.page.write_arc();
        WritePageGuard {
            latch,
            base: PageGuard { inner: Some(inner) },
        }
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.bpm.unpin_page(inner.page_id, inner.is_dirty);
        }
    }
}

/// Shared-latch guard over a pinned page.
///
/// Field order matters: the latch is declared first so it is released
/// before the pin on drop.
pub struct ReadPageGuard {
    latch: ArcRwLockReadGuard<RawRwLock, Page>,
    base: PageGuard,
}

impl ReadPageGuard {
    /// ID of the guarded page
    pub fn page_id(&self) -> PageId {
        self.base.page_id()
    }

    /// Page bytes under the shared latch
    pub fn data(&self) -> &[u8] {
        &self.latch.data
    }

    /// LSN of the last logged update to this page
    pub fn lsn(&self) -> Lsn {
        self.latch.lsn
    }
}

/// Exclusive-latch guard over a pinned page.
///
/// Mutable access through `data_mut` marks the page dirty, so the pin
/// release carries the flag without the caller having to remember it.
pub struct WritePageGuard {
    latch: ArcRwLockWriteGuard<RawRwLock, Page>,
    base: PageGuard,
}

impl WritePageGuard {
    /// ID of the guarded page
    pub fn page_id(&self) -> PageId {
        self.base.page_id()
    }

    /// Page bytes under the exclusive latch
    pub fn data(&self) -> &[u8] {
        &self.latch.data
    }

    /// Mutable page bytes; marks the page dirty
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.base.mark_dirty();
        &mut self.latch.data
    }

    /// LSN of the last logged update to this page
    pub fn lsn(&self) -> Lsn {
        self.latch.lsn
    }

    /// Record the LSN of the caller's latest log record for this page
    pub fn set_lsn(&mut self, lsn: Lsn) {
        self.base.mark_dirty();
        self.latch.lsn = lsn;
    }
}
