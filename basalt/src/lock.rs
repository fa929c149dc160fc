use std::collections::{HashMap, HashSet};

use crate::transaction::{Permission, TransactionId};
use crate::PageId;

/// The lock state of one page: a single exclusive holder or a set of
/// shared holders. Absence from the lock table means unlocked; empty
/// shared sets are removed on release so the two states stay one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEntry {
    Exclusive(TransactionId),
    Shared(HashSet<TransactionId>),
}

/// Page-granularity lock state: per-page entries, a per-transaction
/// holds map and a per-transaction outstanding want. All transitions
/// here are non-blocking; the coordinator owns the condition variable
/// and loops on `try_acquire` while waiters sleep.
#[derive(Debug, Default)]
pub struct LockTable {
    pub(crate) entries: HashMap<PageId, LockEntry>,
    pub(crate) holds: HashMap<TransactionId, HashSet<(PageId, Permission)>>,
    pub(crate) wants: HashMap<TransactionId, (PageId, Permission)>,
}

impl LockTable {
    pub fn new() -> Self {
        LockTable::default()
    }

    /// Records the single outstanding request of `tid`. A transaction
    /// blocks on one request at a time, so a new want replaces any
    /// stale one.
    pub fn record_want(&mut self, tid: TransactionId, pid: PageId, perm: Permission) {
        self.wants.insert(tid, (pid, perm));
    }

    pub fn clear_want(&mut self, tid: TransactionId) {
        self.wants.remove(&tid);
    }

    /// Attempts to grant `tid` the requested mode on `pid` without
    /// blocking. Grants are reentrant: holding at least the requested
    /// strength already succeeds immediately. A sole shared holder
    /// requesting `ReadWrite` upgrades in place.
    pub fn try_acquire(&mut self, tid: TransactionId, pid: PageId, perm: Permission) -> bool {
        match perm {
            Permission::ReadOnly => match self.entries.get_mut(&pid) {
                None => {
                    self.entries
                        .insert(pid, LockEntry::Shared(HashSet::from([tid])));
                    self.record_hold(tid, pid, Permission::ReadOnly);
                    true
                }
                Some(LockEntry::Exclusive(holder)) => *holder == tid,
                Some(LockEntry::Shared(holders)) => {
                    holders.insert(tid);
                    self.record_hold(tid, pid, Permission::ReadOnly);
                    true
                }
            },
            Permission::ReadWrite => match self.entries.get(&pid) {
                None => {
                    self.entries.insert(pid, LockEntry::Exclusive(tid));
                    self.record_hold(tid, pid, Permission::ReadWrite);
                    true
                }
                Some(LockEntry::Exclusive(holder)) => *holder == tid,
                Some(LockEntry::Shared(holders)) => {
                    if holders.len() == 1 && holders.contains(&tid) {
                        self.entries.insert(pid, LockEntry::Exclusive(tid));
                        self.drop_hold(tid, pid, Permission::ReadOnly);
                        self.record_hold(tid, pid, Permission::ReadWrite);
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }

    /// Removes `tid` from the entry for `pid`, in whichever role it
    /// holds. A no-op when `tid` holds nothing there.
    pub fn release(&mut self, tid: TransactionId, pid: PageId) {
        match self.entries.get_mut(&pid) {
            Some(LockEntry::Exclusive(holder)) if *holder == tid => {
                self.entries.remove(&pid);
                self.drop_hold(tid, pid, Permission::ReadWrite);
            }
            Some(LockEntry::Shared(holders)) => {
                if holders.remove(&tid) {
                    if holders.is_empty() {
                        self.entries.remove(&pid);
                    }
                    self.drop_hold(tid, pid, Permission::ReadOnly);
                }
            }
            _ => {}
        }
    }

    /// Releases every lock held by `tid`.
    pub fn release_all(&mut self, tid: TransactionId) {
        let Some(held) = self.holds.remove(&tid) else {
            return;
        };
        for (pid, perm) in held {
            match perm {
                Permission::ReadWrite => {
                    if matches!(self.entries.get(&pid), Some(LockEntry::Exclusive(h)) if *h == tid)
                    {
                        self.entries.remove(&pid);
                    }
                }
                Permission::ReadOnly => {
                    if let Some(LockEntry::Shared(holders)) = self.entries.get_mut(&pid) {
                        holders.remove(&tid);
                        if holders.is_empty() {
                            self.entries.remove(&pid);
                        }
                    }
                }
            }
        }
    }

    /// True when `tid` holds a lock of either strength on `pid`.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        match self.entries.get(&pid) {
            Some(LockEntry::Exclusive(holder)) => *holder == tid,
            Some(LockEntry::Shared(holders)) => holders.contains(&tid),
            None => false,
        }
    }

    /// The pages `tid` currently holds locks on.
    pub fn held_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.holds
            .get(&tid)
            .map(|set| set.iter().map(|(pid, _)| *pid).collect())
            .unwrap_or_default()
    }

    pub fn entry(&self, pid: PageId) -> Option<&LockEntry> {
        self.entries.get(&pid)
    }

    fn record_hold(&mut self, tid: TransactionId, pid: PageId, perm: Permission) {
        self.holds.entry(tid).or_default().insert((pid, perm));
    }

    fn drop_hold(&mut self, tid: TransactionId, pid: PageId, perm: Permission) {
        if let Some(set) = self.holds.get_mut(&tid) {
            set.remove(&(pid, perm));
            if set.is_empty() {
                self.holds.remove(&tid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(page_no: u32) -> PageId {
        PageId { table: 1, page_no }
    }

    fn tid(raw: u64) -> TransactionId {
        TransactionId::new(raw)
    }

    #[test]
    fn shared_locks_coexist() {
        let mut table = LockTable::new();
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadOnly));
        assert!(table.try_acquire(tid(2), pid(0), Permission::ReadOnly));
        assert!(table.holds(tid(1), pid(0)));
        assert!(table.holds(tid(2), pid(0)));
        match table.entry(pid(0)).unwrap() {
            LockEntry::Shared(holders) => assert_eq!(holders.len(), 2),
            other => panic!("expected shared entry, got {other:?}"),
        }
    }

    #[test]
    fn exclusive_excludes_everything() {
        let mut table = LockTable::new();
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadWrite));
        assert!(!table.try_acquire(tid(2), pid(0), Permission::ReadOnly));
        assert!(!table.try_acquire(tid(2), pid(0), Permission::ReadWrite));
        // Reentrant in both strengths for the holder itself.
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadOnly));
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadWrite));
    }

    #[test]
    fn shared_blocks_writers_from_others() {
        let mut table = LockTable::new();
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadOnly));
        assert!(!table.try_acquire(tid(2), pid(0), Permission::ReadWrite));
    }

    #[test]
    fn sole_shared_holder_upgrades_in_place() {
        let mut table = LockTable::new();
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadOnly));
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadWrite));
        assert_eq!(table.entry(pid(0)), Some(&LockEntry::Exclusive(tid(1))));
        // The holds map reflects the upgraded strength only.
        assert_eq!(
            table.holds.get(&tid(1)).unwrap().iter().collect::<Vec<_>>(),
            vec![&(pid(0), Permission::ReadWrite)]
        );
    }

    #[test]
    fn upgrade_waits_behind_other_readers() {
        let mut table = LockTable::new();
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadOnly));
        assert!(table.try_acquire(tid(2), pid(0), Permission::ReadOnly));
        assert!(!table.try_acquire(tid(1), pid(0), Permission::ReadWrite));
        // Once the other reader leaves, the upgrade goes through.
        table.release(tid(2), pid(0));
        assert!(table.try_acquire(tid(1), pid(0), Permission::ReadWrite));
    }

    #[test]
    fn release_of_unheld_page_is_a_noop() {
        let mut table = LockTable::new();
        table.release(tid(1), pid(0));
        assert!(table.try_acquire(tid(2), pid(0), Permission::ReadWrite));
        table.release(tid(1), pid(0));
        assert!(table.holds(tid(2), pid(0)));
    }

    #[test]
    fn release_all_clears_every_hold() {
        let mut table = LockTable::new();
        table.try_acquire(tid(1), pid(0), Permission::ReadWrite);
        table.try_acquire(tid(1), pid(1), Permission::ReadOnly);
        table.try_acquire(tid(2), pid(1), Permission::ReadOnly);

        table.release_all(tid(1));
        assert!(!table.holds(tid(1), pid(0)));
        assert!(!table.holds(tid(1), pid(1)));
        assert!(table.holds(tid(2), pid(1)));
        assert!(table.held_pages(tid(1)).is_empty());
        // pid(0) is unlocked again.
        assert!(table.entry(pid(0)).is_none());
    }

    #[test]
    fn last_shared_release_canonicalises_to_unlocked() {
        let mut table = LockTable::new();
        table.try_acquire(tid(1), pid(0), Permission::ReadOnly);
        table.release(tid(1), pid(0));
        assert!(table.entry(pid(0)).is_none());
    }
}
