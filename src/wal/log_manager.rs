use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::types::Lsn;

/// Log manager handle consumed by the buffer pool.
///
/// Tracks the LSN sequence and the durable high-water mark that the
/// write-ahead rule observes: no page may reach disk before the log
/// records it depends on. Record encoding, buffering and recovery belong
/// to the recovery subsystem and live outside this crate.
pub struct LogManager {
    next_lsn: AtomicU64,
    flushed_lsn: AtomicU64,
}

impl LogManager {
    pub fn new() -> Self {
        Self {
            next_lsn: AtomicU64::new(1),
            flushed_lsn: AtomicU64::new(0),
        }
    }

    /// Reserve the next LSN for a log record
    pub fn append(&self) -> Lsn {
        self.next_lsn.fetch_add(1, Ordering::SeqCst)
    }

    /// LSN of the most recently appended record
    pub fn current_lsn(&self) -> Lsn {
        self.next_lsn.load(Ordering::SeqCst) - 1
    }

    /// LSN up to which the log is known durable
    pub fn flushed_lsn(&self) -> Lsn {
        self.flushed_lsn.load(Ordering::SeqCst)
    }

    /// Force the whole log out; returns the new durable LSN
    pub fn flush(&self) -> Lsn {
        let durable = self.current_lsn();
        self.flushed_lsn.fetch_max(durable, Ordering::SeqCst);
        durable
    }

    /// Make every record up to `target_lsn` durable
    ///
    /// Called by the buffer pool before a page carrying `target_lsn` is
    /// written back.
    pub fn flush_till_lsn(&self, target_lsn: Lsn) {
        self.flushed_lsn.fetch_max(target_lsn, Ordering::SeqCst);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
