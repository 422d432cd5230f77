// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Per-project mirror locking.
//!
//! At most one filesystem-mutating operation may touch a given mirror at a
//! time. Exclusivity is scoped to the project name rather than the whole
//! repository root, so unrelated projects never wait on each other.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Registry of mutual exclusion guards keyed by project name.
///
/// Guards are created lazily, and dropped from the registry once nothing
/// holds or waits on them anymore.
#[derive(Debug, Default)]
pub struct MirrorLocks {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MirrorLocks {
    /// Construct new empty lock registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to mirror of target project name.
    pub async fn acquire(&self, name: &str) -> MirrorGuard {
        let lock = self.entry(name).await;
        trace!("waiting on mirror lock {name:?}");
        MirrorGuard {
            _held: vec![lock.lock_owned().await],
        }
    }

    /// Wait for exclusive access to two mirrors at once.
    ///
    /// Locks are always taken in name order, such that two callers asking
    /// for the same pair in opposite order cannot deadlock. Asking for the
    /// same name twice takes one lock.
    pub async fn acquire_pair(&self, first: &str, second: &str) -> MirrorGuard {
        if first == second {
            return self.acquire(first).await;
        }

        let (low, high) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        let low = self.entry(low).await;
        let high = self.entry(high).await;
        trace!("waiting on mirror locks {first:?} and {second:?}");

        let low = low.lock_owned().await;
        let high = high.lock_owned().await;
        MirrorGuard {
            _held: vec![low, high],
        }
    }

    /// Number of names currently tracked by the registry.
    pub async fn tracked(&self) -> usize {
        self.inflight.lock().await.len()
    }

    async fn entry(&self, name: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;

        // INVARIANT: Only prune guards nobody else holds a handle to.
        inflight.retain(|_, lock| Arc::strong_count(lock) > 1);

        Arc::clone(
            inflight
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Exclusive access to one or more mirrors, released on drop.
#[derive(Debug)]
pub struct MirrorGuard {
    _held: Vec<OwnedMutexGuard<()>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_name_is_exclusive() {
        let locks = Arc::new(MirrorLocks::new());
        let guard = locks.acquire("api").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("api").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        let result = timeout(Duration::from_secs(5), waiter).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn different_names_do_not_wait() {
        let locks = MirrorLocks::new();
        let _api = locks.acquire("api").await;

        let result = timeout(Duration::from_secs(5), locks.acquire("web")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn pair_blocks_both_names() {
        let locks = Arc::new(MirrorLocks::new());
        let pair = locks.acquire_pair("api2", "api").await;

        for name in ["api", "api2"] {
            let result = timeout(Duration::from_millis(50), locks.acquire(name)).await;
            assert!(result.is_err(), "{name} should be held by the pair");
        }

        drop(pair);
        let result = timeout(Duration::from_secs(5), locks.acquire_pair("api", "api2")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn idle_guards_are_pruned() {
        let locks = MirrorLocks::new();
        drop(locks.acquire("api").await);
        drop(locks.acquire("web").await);

        let _cli = locks.acquire("cli").await;
        assert_eq!(locks.tracked().await, 1);
    }
}
