//! Document-context resolution cache
//!
//! Repeated mentions of the same subject inside one document are common;
//! this cache remembers, per (tenant, document), how a normalized mention
//! resolved, so the ingestion loop does not hit the store for every
//! repetition. It is an explicit object passed by reference - never a global
//! - with insertion-order eviction at a fixed capacity and tenant-scoped
//! invalidation.

use concord_domain::SubjectId;
use std::collections::{HashMap, VecDeque};

fn cache_key(tenant: &str, document_id: &str, normalized: &str) -> String {
    format!("{}\u{1f}{}\u{1f}{}", tenant, document_id, normalized)
}

/// Bounded per-document resolution cache
pub struct ContextCache {
    capacity: usize,
    entries: HashMap<String, SubjectId>,
    order: VecDeque<String>,
}

impl ContextCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Look up a cached resolution
    pub fn get(&self, tenant: &str, document_id: &str, normalized: &str) -> Option<SubjectId> {
        self.entries
            .get(&cache_key(tenant, document_id, normalized))
            .copied()
    }

    /// Record a resolution, evicting the oldest entry at capacity
    pub fn insert(
        &mut self,
        tenant: &str,
        document_id: &str,
        normalized: &str,
        subject_id: SubjectId,
    ) {
        let key = cache_key(tenant, document_id, normalized);
        if self.entries.insert(key.clone(), subject_id).is_none() {
            self.order.push_back(key);
            while self.entries.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                } else {
                    break;
                }
            }
        }
    }

    /// Drop every entry belonging to one tenant
    pub fn invalidate_tenant(&mut self, tenant: &str) {
        let prefix = format!("{}\u{1f}", tenant);
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        self.order.retain(|k| !k.starts_with(&prefix));
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
