//! Per-key write serialization

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A registry of named async locks
///
/// One lock per key (e.g. `tenant/subject-name` or `tenant/axis-key`), so
/// that all mutations of a given subject or axis serialize while unrelated
/// keys proceed in parallel. Lock objects are created on first use and kept
/// for the registry's lifetime; the registry is expected to stay small (one
/// entry per hot key).
#[derive(Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for a key
    ///
    /// The returned handle must be `.lock().await`-ed by the caller; holding
    /// the registry's own mutex never spans an await point.
    pub fn handle(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|m| m.len())
            .unwrap_or_else(|e| e.into_inner().len())
    }

    /// Whether any key has been locked yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_same_lock() {
        let locks = KeyLocks::new();
        let a = locks.handle("t1/acme");
        let b = locks.handle("t1/acme");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locks = KeyLocks::new();
        let a = locks.handle("t1/acme");
        let b = locks.handle("t1/globex");

        let _guard_a = a.lock().await;
        // A held lock on one key must not block another key
        let guard_b = b.try_lock();
        assert!(guard_b.is_ok());
    }

    #[tokio::test]
    async fn test_serialization_on_one_key() {
        let locks = KeyLocks::new();
        let handle = locks.handle("t1/acme");

        let _guard = handle.lock().await;
        assert!(handle.try_lock().is_err(), "second writer must wait");
    }
}
