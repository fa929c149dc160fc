use std::io;
use std::sync::{Arc, RwLock};

use lru::LruCache;

use crate::basalt_debug_log;
use crate::error::{DbError, DbResult};
use crate::page::Page;
use crate::PageId;

/// A resident page, shared with callers that hold a lock on it.
pub type Frame = Arc<RwLock<Page>>;

/// Capacity-bounded residency for pages, ordered by recency. The
/// `LruCache` runs unbounded and the capacity is enforced here, because
/// eviction is not free to pick the strict LRU entry: dirty pages must
/// stay resident until their transaction completes (NO-STEAL), so the
/// scan takes the least recently used *clean* page instead.
pub struct PageCache {
    capacity: usize,
    frames: LruCache<PageId, Frame>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "page cache needs at least one frame");
        PageCache {
            capacity,
            frames: LruCache::unbounded(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.len() == 0
    }

    pub fn contains(&self, pid: PageId) -> bool {
        self.frames.contains(&pid)
    }

    /// Returns the resident frame and touches it to most recently used.
    pub fn get(&mut self, pid: PageId) -> Option<Frame> {
        self.frames.get(&pid).cloned()
    }

    /// Returns the resident frame without touching recency. Used by
    /// commit/abort bookkeeping so completing a transaction does not
    /// reorder the recency list.
    pub fn peek(&self, pid: PageId) -> Option<Frame> {
        self.frames.peek(&pid).cloned()
    }

    /// Inserts as most recently used, evicting first if the cache is at
    /// capacity.
    pub fn insert(&mut self, pid: PageId, frame: Frame) -> DbResult<()> {
        if self.frames.len() >= self.capacity && !self.frames.contains(&pid) {
            self.evict_clean()?;
        }
        self.frames.put(pid, frame);
        Ok(())
    }

    pub fn remove(&mut self, pid: PageId) -> Option<Frame> {
        self.frames.pop(&pid)
    }

    /// Scans from least toward most recently used and drops the first
    /// clean page. Clean frames match their on-disk image, so no
    /// write-back happens here; dirty frames are never eligible. When
    /// everything resident is dirty the cache is wedged and the caller
    /// gets a storage error.
    pub fn evict_clean(&mut self) -> DbResult<PageId> {
        let victim = self
            .frames
            .iter()
            .rev()
            .find(|(_, frame)| frame.read().unwrap().is_clean())
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                basalt_debug_log!("[PageCache::evict_clean] Evicting page {pid:?}");
                self.frames.pop(&pid);
                Ok(pid)
            }
            None => Err(DbError::Storage(io::Error::other(
                "cannot evict: every cached page is dirty",
            ))),
        }
    }
}
