use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page ID type
pub type PageId = u32;

/// Sentinel page ID denoting "no page"
pub const INVALID_PAGE_ID: PageId = PageId::MAX;

/// Buffer pool frame ID type
pub type FrameId = u32;

/// LSN (Log Sequence Number) type
pub type Lsn = u64;

/// Page structure
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub page_id: PageId,
    pub lsn: Lsn,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: [0; PAGE_SIZE],
            page_id,
            lsn: 0,
        }
    }

    /// Clear the page back to its empty state
    pub fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.lsn = 0;
        self.data.fill(0);
    }
}

/// Smart pointer to a page; the lock doubles as the per-page latch
pub type PagePtr = Arc<RwLock<Page>>;

/// Buffer pool frame structure
///
/// `pin_count` and `is_dirty` are mutated only under the buffer pool
/// manager's latch.
#[derive(Debug)]
pub struct Frame {
    pub page: PagePtr,
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl Frame {
    pub fn new(page: PagePtr) -> Self {
        Self {
            page,
            pin_count: 0,
            is_dirty: false,
        }
    }
}
