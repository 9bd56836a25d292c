//! Single-flight schema caches.
//!
//! The declared model and the observed snapshot are each built once and
//! then shared. Concurrent callers that arrive while a build is in flight
//! wait for it and receive the same value; a failed build leaves the cell
//! empty so the next caller retries.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use strata_core::schema::Table;
use tokio::sync::OnceCell;

/// A compute-once cell that can be reset.
///
/// Resetting swaps in a fresh cell; callers already waiting on the old one
/// still receive its value.
#[derive(Debug)]
pub struct SingleFlight<T> {
    cell: Mutex<Arc<OnceCell<Arc<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            cell: Mutex::new(Arc::new(OnceCell::new())),
        }
    }
}

impl<T> SingleFlight<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value, running `build` if no value is cached and
    /// no build is in flight.
    pub async fn get_or_try_init<E, F, Fut>(&self, build: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync,
        E: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let cell = Arc::clone(&self.cell.lock());
        cell.get_or_try_init(|| async { build().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Returns the cached value without building it.
    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.lock().get().cloned()
    }

    /// Drops the cached value.
    pub fn reset(&self) {
        *self.cell.lock() = Arc::new(OnceCell::new());
    }
}

/// The observed snapshot of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedSchema {
    pub tables: Vec<Table>,
    /// Tables whose probe failed. They are left unresolved this pass.
    pub unresolved: Vec<String>,
}

impl ObservedSchema {
    /// Finds a table by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.is_named(name))
    }

    /// Returns `true` if the probe of `name` failed.
    #[must_use]
    pub fn is_unresolved(&self, name: &str) -> bool {
        self.unresolved.iter().any(|u| u.eq_ignore_ascii_case(name))
    }
}

/// Caches owned by one reconciler.
#[derive(Debug, Default)]
pub struct SchemaCache {
    declared: SingleFlight<Vec<Table>>,
    observed: SingleFlight<ObservedSchema>,
    reconciled: Mutex<HashSet<String>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn declared(&self) -> &SingleFlight<Vec<Table>> {
        &self.declared
    }

    pub const fn observed(&self) -> &SingleFlight<ObservedSchema> {
        &self.observed
    }

    /// Forgets the observed snapshot; the next read probes again.
    pub fn invalidate_observed(&self) {
        self.observed.reset();
    }

    /// Claims `table` for reconciliation.
    ///
    /// Returns `true` for exactly one caller per table name, however many
    /// race for it.
    pub fn begin(&self, table: &str) -> bool {
        self.reconciled.lock().insert(table.to_ascii_lowercase())
    }

    /// Returns `true` if `table` has been claimed.
    #[must_use]
    pub fn is_reconciled(&self, table: &str) -> bool {
        self.reconciled.lock().contains(&table.to_ascii_lowercase())
    }

    /// Releases a claim so the table is reconciled again.
    pub fn forget(&self, table: &str) {
        self.reconciled.lock().remove(&table.to_ascii_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn builds_once_for_concurrent_callers() {
        let cache = Arc::new(SingleFlight::<usize>::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                tokio::spawn(async move {
                    cache
                        .get_or_try_init(|| async {
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, ()>(builds.fetch_add(1, Ordering::SeqCst) + 41)
                        })
                        .await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap(), 41);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_builds_are_retried() {
        let cache = SingleFlight::<u8>::new();
        assert_eq!(cache.get_or_try_init(|| async { Err("down") }).await, Err("down"));
        assert!(cache.get().is_none());
        assert_eq!(*cache.get_or_try_init(|| async { Ok::<_, &str>(7) }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn reset_forces_a_rebuild() {
        let cache = SingleFlight::<u8>::new();
        cache.get_or_try_init(|| async { Ok::<_, ()>(1) }).await.unwrap();
        cache.reset();
        assert!(cache.get().is_none());
        assert_eq!(*cache.get_or_try_init(|| async { Ok::<_, ()>(2) }).await.unwrap(), 2);
    }

    #[test]
    fn begin_claims_each_table_once() {
        let cache = SchemaCache::new();
        assert!(cache.begin("Users"));
        assert!(!cache.begin("USERS"));
        assert!(cache.is_reconciled("users"));
        cache.forget("Users");
        assert!(cache.begin("Users"));
    }
}
