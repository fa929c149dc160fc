use std::collections::HashMap;

use crate::lock::{LockEntry, LockTable};
use crate::transaction::{Permission, TransactionId};

/// A directed graph over transactions where an edge `t -> u` means `t`
/// is waiting for a lock `u` holds. Built on demand from the lock
/// table's holds and wants, checked once per page request, and thrown
/// away; nothing here persists across calls.
#[derive(Debug)]
pub struct WaitsForGraph {
    adj: Vec<Vec<usize>>,
}

impl WaitsForGraph {
    /// Builds the graph from current lock state. Vertices are every
    /// transaction holding or wanting a lock. For a pending want:
    /// a writer waits on every holder of the page, a reader only on an
    /// exclusive holder. Self-edges are never added.
    pub fn build(locks: &LockTable) -> WaitsForGraph {
        let mut index: HashMap<TransactionId, usize> = HashMap::new();
        for tid in locks.holds.keys().chain(locks.wants.keys()) {
            let next = index.len();
            index.entry(*tid).or_insert(next);
        }

        let mut adj = vec![Vec::new(); index.len()];
        for (tid, (pid, perm)) in &locks.wants {
            let from = index[tid];
            let Some(entry) = locks.entries.get(pid) else {
                continue;
            };
            match (perm, entry) {
                (_, LockEntry::Exclusive(holder)) => {
                    if holder != tid {
                        adj[from].push(index[holder]);
                    }
                }
                (Permission::ReadWrite, LockEntry::Shared(holders)) => {
                    for holder in holders {
                        if holder != tid {
                            adj[from].push(index[holder]);
                        }
                    }
                }
                (Permission::ReadOnly, LockEntry::Shared(_)) => {}
            }
        }
        WaitsForGraph { adj }
    }

    /// Depth-first search over every component with `marked` and
    /// `on_stack` bit-vectors; a back-edge to an on-stack vertex is a
    /// cycle. Iterative with an explicit stack so the graph size is not
    /// bounded by the call stack.
    pub fn has_cycle(&self) -> bool {
        let n = self.adj.len();
        let mut marked = vec![false; n];
        let mut on_stack = vec![false; n];

        for start in 0..n {
            if marked[start] {
                continue;
            }
            marked[start] = true;
            on_stack[start] = true;
            // Each frame is a vertex plus the next outgoing edge to try.
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(frame) = stack.last_mut() {
                let v = frame.0;
                if frame.1 < self.adj[v].len() {
                    let w = self.adj[v][frame.1];
                    frame.1 += 1;
                    if on_stack[w] {
                        return true;
                    }
                    if !marked[w] {
                        marked[w] = true;
                        on_stack[w] = true;
                        stack.push((w, 0));
                    }
                } else {
                    on_stack[v] = false;
                    stack.pop();
                }
            }
        }
        false
    }
}
