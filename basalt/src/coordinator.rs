use std::sync::{Arc, Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::basalt_debug_log;
use crate::cache::{Frame, PageCache};
use crate::catalog::Catalog;
use crate::error::{DbError, DbResult};
use crate::page::Page;
use crate::store::PageStore;
use crate::transaction::{Permission, TransactionId};
use crate::tuple::Tuple;
use crate::waits_for::WaitsForGraph;
use crate::{lock::LockTable, PageId};

/// Mediates every page access: lock acquisition with deadlock
/// detection, cache residency with eviction, and NO-STEAL/FORCE
/// transaction completion.
///
/// One mutex guards all of the mutable state below and one condition
/// variable attached to it broadcasts lock-state changes. The wait
/// inside `get_page` is the only suspension point; it releases the
/// mutex and re-acquires it on wakeup. Operations linearize with
/// respect to that mutex.
pub struct TransactionCoordinator {
    catalog: Arc<Catalog>,
    store: PageStore,
    state: Mutex<CoreState>,
    lock_changed: Condvar,
}

struct CoreState {
    locks: LockTable,
    cache: PageCache,
}

/// A resident page returned to the caller. The handle stays valid for
/// the duration of the transaction's lock on the page; `write` records
/// the writing transaction as the page's dirtier.
#[derive(Debug)]
pub struct PageHandle {
    frame: Frame,
}

impl PageHandle {
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.frame.read().unwrap()
    }

    pub fn write(&self, tid: TransactionId) -> RwLockWriteGuard<'_, Page> {
        let mut page = self.frame.write().unwrap();
        page.mark_dirty(tid);
        page
    }
}

impl TransactionCoordinator {
    pub fn new(catalog: Arc<Catalog>, cache_capacity: usize) -> Self {
        TransactionCoordinator {
            store: PageStore::new(Arc::clone(&catalog)),
            catalog,
            state: Mutex::new(CoreState {
                locks: LockTable::new(),
                cache: PageCache::new(cache_capacity),
            }),
            lock_changed: Condvar::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Fetches a page for `tid` with the requested permission.
    ///
    /// Records the want, runs one cycle check over the waits-for graph
    /// (aborting the requester on a cycle), then blocks until the lock
    /// table grants the request. Once locked, the page comes from the
    /// cache or from the store, evicting a clean page first when the
    /// cache is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> DbResult<PageHandle> {
        let mut state = self.state.lock().unwrap();

        state.locks.record_want(tid, pid, perm);
        if WaitsForGraph::build(&state.locks).has_cycle() {
            state.locks.clear_want(tid);
            basalt_debug_log!(
                "[Coordinator::get_page] Deadlock: aborting requester {} on {:?}",
                tid,
                pid
            );
            return Err(DbError::Aborted);
        }
        while !state.locks.try_acquire(tid, pid, perm) {
            state = self.lock_changed.wait(state).unwrap();
        }
        state.locks.clear_want(tid);

        if let Some(frame) = state.cache.get(pid) {
            return Ok(PageHandle { frame });
        }

        let page = self.store.read_page(pid)?;
        let frame: Frame = Arc::new(RwLock::new(page));
        state.cache.insert(pid, Arc::clone(&frame))?;
        basalt_debug_log!("[Coordinator::get_page] Cached page {:?} for {}", pid, tid);
        Ok(PageHandle { frame })
    }

    /// Adds a tuple to the named table on behalf of `tid`, write-locking
    /// the page it lands on. Returns the dirtied pages.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table: u64,
        tuple: &mut Tuple,
    ) -> DbResult<Vec<PageId>> {
        let file = self.catalog.heap_file(table)?;
        file.add_tuple(self, tid, tuple)
    }

    /// Removes the tuple named by its record id, write-locking its page.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> DbResult<PageId> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| DbError::invalid("tuple has no record id"))?;
        let file = self.catalog.heap_file(rid.page.table)?;
        file.delete_tuple(self, tid, tuple)
    }

    /// Commits or aborts `tid` and releases all of its locks.
    ///
    /// Commit forces every page the transaction dirtied to the store
    /// before any lock is dropped (FORCE); abort replaces each dirtied
    /// frame with a fresh read of the on-disk image, which is the
    /// pre-transaction state because dirty pages are never written
    /// early (NO-STEAL). Completing a transaction that holds nothing is
    /// a no-op.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        basalt_debug_log!(
            "[Coordinator::transaction_complete] {} {}",
            tid,
            if commit { "commit" } else { "abort" }
        );

        for pid in state.locks.held_pages(tid) {
            let Some(frame) = state.cache.peek(pid) else {
                continue;
            };
            let mut page = frame.write().unwrap();
            if page.dirtier() != Some(tid) {
                continue;
            }
            if commit {
                self.store.write_page(&page)?;
                page.set_clean();
            } else {
                *page = self.store.read_page(pid)?;
            }
        }

        state.locks.release_all(tid);
        state.locks.clear_want(tid);
        self.lock_changed.notify_all();
        Ok(())
    }

    /// True when `tid` holds a lock of either strength on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.state.lock().unwrap().locks.holds(tid, pid)
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.state.lock().unwrap().cache.contains(pid)
    }

    pub fn cached_page_count(&self) -> usize {
        self.state.lock().unwrap().cache.len()
    }
}
