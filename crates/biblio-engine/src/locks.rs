//! # Per-Student Locks
//!
//! Mutual exclusion for the limit-check-then-insert critical section.
//!
//! ## Why This Exists
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              The Check-Then-Act Race (without locking)                  │
//! │                                                                         │
//! │  Task A: count active → 2   ✓ under limit                              │
//! │  Task B: count active → 2   ✓ under limit      ← same snapshot!        │
//! │  Task A: insert loan        (3 active)                                 │
//! │  Task B: insert loan        (4 active)         ← limit violated        │
//! │                                                                         │
//! │  With a per-student lock, B's count runs after A's insert commits      │
//! │  and B is rejected. Locks are keyed by index_number, so borrows for    │
//! │  different students never contend.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of per-student async mutexes.
///
/// Cloning shares the underlying map; every engine clone serializes
/// against the same locks.
#[derive(Debug, Clone, Default)]
pub struct StudentLocks {
    // The std mutex only guards map access; it is never held across await.
    inner: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl StudentLocks {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        StudentLocks::default()
    }

    /// Acquires the lock for a student key, waiting if another operation
    /// for the same student is in flight.
    ///
    /// The returned guard owns the lock; drop it to release. The map entry
    /// is kept after release - the kiosk's student population is small and
    /// entries are one Arc each.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    /// Number of keys currently tracked (for diagnostics).
    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = StudentLocks::new();
        let counter = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("UE2020001").await;
                let inside = counter.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(inside, Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Never more than one task inside the critical section
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = StudentLocks::new();

        let guard_a = locks.acquire("UE2020001").await;
        // A second key locks immediately even while the first is held
        let guard_b = locks.acquire("UE2020002").await;

        drop(guard_a);
        drop(guard_b);
        assert_eq!(locks.tracked_keys(), 2);
    }
}
