//! Ordered name registry.
//!
//! Maps symbolic names to opaque handles with deterministic ordering. The
//! registry keeps entries sorted by name, so prefix queries return the full
//! ordered list of matches instead of callers probing formatted names one by
//! one until a lookup misses.

use smallvec::SmallVec;

/// Sorted name → handle table with binary-search lookup.
///
/// Names are unique within one registry; inserting an existing name replaces
/// its handle. Handles are plain `u32` indices into whatever arena the owner
/// of the registry maintains.
#[derive(Debug, Default, Clone)]
pub struct NameRegistry {
    // Invariant: sorted by name, no duplicate names.
    entries: Vec<(String, u32)>,
}

impl NameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `name` → `handle`, replacing any previous binding.
    pub fn insert(&mut self, name: &str, handle: u32) {
        match self.entries.binary_search_by(|(n, _)| n.as_str().cmp(name)) {
            Ok(pos) => self.entries[pos].1 = handle,
            Err(pos) => self.entries.insert(pos, (name.to_string(), handle)),
        }
    }

    /// Look up a handle by exact name.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    /// Remove a binding by name. Returns the handle if it existed.
    pub fn remove(&mut self, name: &str) -> Option<u32> {
        self.entries
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|pos| self.entries.remove(pos).1)
    }

    /// All handles whose names start with `prefix`, in name order.
    pub fn with_prefix(&self, prefix: &str) -> SmallVec<[u32; 8]> {
        let start = self
            .entries
            .partition_point(|(n, _)| n.as_str() < prefix);
        self.entries[start..]
            .iter()
            .take_while(|(n, _)| n.starts_with(prefix))
            .map(|&(_, h)| h)
            .collect()
    }

    /// Iterate `(name, handle)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(n, h)| (n.as_str(), *h))
    }
}
