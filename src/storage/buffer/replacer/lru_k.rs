use std::collections::{BTreeSet, VecDeque};

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::FrameId;

/// Backward K-distance of a frame with fewer than `k` recorded accesses
const INF: u64 = u64::MAX;

#[derive(Error, Debug)]
pub enum ReplacerError {
    #[error("Invalid frame ID: {0}")]
    InvalidFrame(FrameId),
}

/// Access history of a single frame: at most `k` timestamps, oldest first
#[derive(Debug, Default)]
struct LruKNode {
    history: VecDeque<u64>,
}

impl LruKNode {
    /// Oldest retained access timestamp
    ///
    /// A frame that was never accessed sorts before every accessed one.
    fn oldest(&self) -> u64 {
        self.history.front().copied().unwrap_or(0)
    }

    /// Backward K-distance: infinite until `k` accesses are retained
    fn k_distance(&self, k: usize) -> u64 {
        match (self.history.front(), self.history.back()) {
            (Some(&oldest), Some(&newest)) if self.history.len() >= k => newest - oldest,
            _ => INF,
        }
    }
}

struct ReplacerState {
    node_store: Vec<LruKNode>,
    evictable: BTreeSet<FrameId>,
    current_timestamp: u64,
}

/// LRU-K replacement policy over a fixed set of frames.
///
/// Evicts the evictable frame with the greatest backward K-distance,
/// breaking ties towards the earliest retained access. Frames with fewer
/// than `k` recorded accesses have infinite distance and are preferred
/// victims, ordered among themselves by earliest access (classical LRU).
///
/// The replacer carries its own latch so it stays usable, and testable,
/// outside the buffer pool manager's critical section.
pub struct LruKReplacer {
    state: Mutex<ReplacerState>,
    num_frames: usize,
    k: usize,
}

impl LruKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        let mut node_store = Vec::with_capacity(num_frames);
        node_store.resize_with(num_frames, LruKNode::default);

        Self {
            state: Mutex::new(ReplacerState {
                node_store,
                evictable: BTreeSet::new(),
                current_timestamp: 0,
            }),
            num_frames,
            k: k.max(1),
        }
    }

    /// Record an access to `frame_id` at the current logical timestamp
    pub fn record_access(&self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.check_frame(frame_id)?;
        let mut state = self.state.lock();

        let timestamp = state.current_timestamp;
        state.current_timestamp += 1;

        let node = &mut state.node_store[frame_id as usize];
        node.history.push_back(timestamp);
        if node.history.len() > self.k {
            node.history.pop_front();
        }
        Ok(())
    }

    /// Mark `frame_id` as evictable or pinned; idempotent
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) -> Result<(), ReplacerError> {
        self.check_frame(frame_id)?;
        let mut state = self.state.lock();

        if evictable {
            state.evictable.insert(frame_id);
        } else {
            state.evictable.remove(&frame_id);
        }
        Ok(())
    }

    /// Select and claim a victim among the evictable frames
    ///
    /// The victim's history is cleared and it leaves the evictable set.
    /// Returns `None` when no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();

        let mut victim: Option<(FrameId, u64, u64)> = None;
        for &frame_id in &state.evictable {
            let node = &state.node_store[frame_id as usize];
            let distance = node.k_distance(self.k);
            let oldest = node.oldest();
            let better = match victim {
                None => true,
                Some((_, best_distance, best_oldest)) => {
                    distance > best_distance
                        || (distance == best_distance && oldest < best_oldest)
                }
            };
            if better {
                victim = Some((frame_id, distance, oldest));
            }
        }

        let (frame_id, _, _) = victim?;
        state.node_store[frame_id as usize].history.clear();
        state.evictable.remove(&frame_id);
        Some(frame_id)
    }

    /// Forget `frame_id` entirely; used when its frame is torn down
    ///
    /// A frame that is not evictable is left untouched: the manager only
    /// tears frames down at pin count zero, so a non-evictable argument
    /// means the frame never left the free list.
    pub fn remove(&self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.check_frame(frame_id)?;
        let mut state = self.state.lock();

        if state.evictable.remove(&frame_id) {
            state.node_store[frame_id as usize].history.clear();
        } else {
            debug_assert!(
                state.node_store[frame_id as usize].history.is_empty(),
                "remove() called on a pinned frame"
            );
        }
        Ok(())
    }

    /// Number of evictable frames
    pub fn size(&self) -> usize {
        self.state.lock().evictable.len()
    }

    fn check_frame(&self, frame_id: FrameId) -> Result<(), ReplacerError> {
        if (frame_id as usize) < self.num_frames {
            Ok(())
        } else {
            Err(ReplacerError::InvalidFrame(frame_id))
        }
    }
}
