//! Wrapper liveness registry
//!
//! Maps a session's persistent id to a non-owning handle of the wrapper that
//! currently exposes it. Queued tasks consult the registry before touching a
//! wrapper, since the wrapper may be finalized while the task waits.

use std::sync::{Arc, PoisonError, RwLock, Weak};

use rustc_hash::FxHashMap;

/// Persistent session identifier assigned by the session manager
pub type PersistentId = i32;

/// Process-wide map from persistent id to a weak wrapper handle
pub struct LivenessRegistry<T> {
    entries: RwLock<FxHashMap<PersistentId, Weak<T>>>,
}

impl<T> LivenessRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Record `wrapper` as the live wrapper for `id`
    ///
    /// Returns the previous live wrapper for the id, if any.
    pub fn insert(&self, id: PersistentId, wrapper: &Arc<T>) -> Option<Arc<T>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .insert(id, Arc::downgrade(wrapper))
            .and_then(|old| old.upgrade())
    }

    /// Forget the wrapper for `id`; returns whether an entry existed
    pub fn remove(&self, id: PersistentId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&id).is_some()
    }

    /// Forget `id` only if it still points at the wrapper behind `ptr`
    ///
    /// Usable from a wrapper's own teardown, when no strong handle to it can
    /// be made any more.
    pub fn remove_instance(&self, id: PersistentId, ptr: *const T) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&id) {
            Some(weak) if std::ptr::eq(weak.as_ptr(), ptr) => {
                entries.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Whether an entry exists for `id`
    pub fn contains(&self, id: PersistentId) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&id)
    }

    /// Whether `id` is registered to exactly this wrapper instance
    pub fn is_registered(&self, id: PersistentId, wrapper: &Arc<T>) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&id)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(wrapper)))
    }

    /// Strong handle to the live wrapper for `id`
    pub fn get(&self, id: PersistentId) -> Option<Arc<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&id).and_then(Weak::upgrade)
    }

    /// Drop entries whose wrapper has already been freed
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, weak| weak.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every registered wrapper, sorted
    pub fn ids(&self) -> Vec<PersistentId> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl<T> Default for LivenessRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let registry = LivenessRegistry::new();
        let wrapper = Arc::new("session-7");

        assert!(registry.insert(7, &wrapper).is_none());
        assert!(registry.contains(7));
        assert_eq!(registry.get(7).as_deref(), Some(&"session-7"));

        assert!(registry.remove(7));
        assert!(!registry.contains(7));
        assert!(!registry.remove(7));
    }

    #[test]
    fn test_entry_outlives_wrapper_but_cannot_upgrade() {
        let registry = LivenessRegistry::new();
        let wrapper = Arc::new(1u8);
        registry.insert(3, &wrapper);
        drop(wrapper);

        assert!(registry.contains(3));
        assert!(registry.get(3).is_none());
        assert_eq!(registry.prune(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_is_registered_checks_identity() {
        let registry = LivenessRegistry::new();
        let first = Arc::new(10u32);
        let second = Arc::new(10u32);

        registry.insert(1, &first);
        assert!(registry.is_registered(1, &first));
        assert!(!registry.is_registered(1, &second));

        let replaced = registry.insert(1, &second);
        assert!(replaced.is_some_and(|old| Arc::ptr_eq(&old, &first)));
        assert!(registry.is_registered(1, &second));
        assert!(!registry.is_registered(1, &first));
    }

    #[test]
    fn test_remove_instance_spares_newer_wrapper() {
        let registry = LivenessRegistry::new();
        let old = Arc::new(1u32);
        let new = Arc::new(2u32);
        registry.insert(4, &old);
        registry.insert(4, &new);

        assert!(!registry.remove_instance(4, Arc::as_ptr(&old)));
        assert!(registry.is_registered(4, &new));
        assert!(registry.remove_instance(4, Arc::as_ptr(&new)));
        assert!(!registry.contains(4));
    }

    #[test]
    fn test_ids_sorted() {
        let registry = LivenessRegistry::new();
        let a = Arc::new(());
        registry.insert(9, &a);
        registry.insert(2, &a);
        registry.insert(5, &a);
        assert_eq!(registry.ids(), vec![2, 5, 9]);
    }
}
