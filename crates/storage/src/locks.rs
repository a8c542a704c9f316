//! Per-fingerprint namespace locks.
//!
//! Chunk writes and resume queries take a shared lock on their fingerprint;
//! a merge takes it exclusively for list, concatenate and delete. A chunk
//! that arrives during a merge therefore waits and lands in a fresh
//! namespace afterwards instead of being deleted with the old one. Two merges
//! of the same fingerprint run one after the other: the second observes the
//! first one's cleanup.

use dashmap::DashMap;
use splice_core::Fingerprint;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type LockTable = DashMap<Fingerprint, Arc<RwLock<()>>>;

/// Table of namespace locks. Cheap to clone; clones share the table.
#[derive(Clone, Default)]
pub struct NamespaceLocks {
    table: Arc<LockTable>,
}

impl NamespaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, fingerprint: &Fingerprint) -> Arc<RwLock<()>> {
        self.table
            .entry(fingerprint.clone())
            .or_default()
            .value()
            .clone()
    }

    /// Acquire a shared lock (chunk writes, resume queries).
    pub async fn shared(&self, fingerprint: &Fingerprint) -> NamespaceGuard {
        let guard = self.lock_for(fingerprint).read_owned().await;
        NamespaceGuard {
            inner: Some(Held::Shared(guard)),
            fingerprint: fingerprint.clone(),
            table: self.table.clone(),
        }
    }

    /// Acquire an exclusive lock (merge).
    pub async fn exclusive(&self, fingerprint: &Fingerprint) -> NamespaceGuard {
        let guard = self.lock_for(fingerprint).write_owned().await;
        NamespaceGuard {
            inner: Some(Held::Exclusive(guard)),
            fingerprint: fingerprint.clone(),
            table: self.table.clone(),
        }
    }

    /// Number of fingerprints with a live lock entry.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

enum Held {
    Shared(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Exclusive(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

/// A held namespace lock. Releasing the last holder prunes the table entry.
pub struct NamespaceGuard {
    inner: Option<Held>,
    fingerprint: Fingerprint,
    table: Arc<LockTable>,
}

impl NamespaceGuard {
    pub fn is_exclusive(&self) -> bool {
        matches!(self.inner, Some(Held::Exclusive(_)))
    }
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        drop(self.inner.take());
        // Only the table still references the lock: nobody holds or waits on it.
        self.table
            .remove_if(&self.fingerprint, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fp(c: char) -> Fingerprint {
        Fingerprint::parse(&c.to_string().repeat(32)).unwrap()
    }

    #[tokio::test]
    async fn test_shared_locks_coexist() {
        let locks = NamespaceLocks::new();
        let a = locks.shared(&fp('a')).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.shared(&fp('a')))
            .await
            .expect("second shared lock should not block");
        assert!(!a.is_exclusive());
        drop((a, b));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_exclusive_blocks_shared_on_same_fingerprint_only() {
        let locks = NamespaceLocks::new();
        let merge = locks.exclusive(&fp('a')).await;
        assert!(merge.is_exclusive());

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.shared(&fp('a'))).await;
        assert!(blocked.is_err(), "shared lock must wait for the merge");

        let other = tokio::time::timeout(Duration::from_millis(100), locks.shared(&fp('b')))
            .await
            .expect("other fingerprints are independent");
        drop(other);

        drop(merge);
        let after = tokio::time::timeout(Duration::from_millis(100), locks.shared(&fp('a')))
            .await
            .expect("lock available after merge");
        drop(after);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_keeps_entry_alive() {
        let locks = NamespaceLocks::new();
        let merge = locks.exclusive(&fp('c')).await;

        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.exclusive(&fp('c')).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(merge);
        // The waiter still holds a clone of the lock, so the entry survives
        // until it finishes.
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
