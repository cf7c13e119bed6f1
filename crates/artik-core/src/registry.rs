//! Handle registry for live module resources.
//!
//! Each module keeps one [`HandleRegistry`] of the resources it has handed
//! out. A resource is identified by a key (pin number, GPIO line, PWM
//! channel) and addressed by an opaque [`Handle`]. At most one live entry
//! exists per key.
//!
//! Handles are drawn from a process-wide counter, so a handle issued by the
//! ADC module is never mistaken for one issued by the GPIO module.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to a requested resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    fn next() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value, for logging.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot<K, T> {
    key: K,
    value: T,
}

/// Keyed container of live resources with unique-key enforcement.
pub struct HandleRegistry<K, T> {
    slots: HashMap<Handle, Slot<K, T>>,
    index: HashMap<K, Handle>,
}

impl<K, T> Default for HandleRegistry<K, T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

impl<K, T> HandleRegistry<K, T>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry has no live entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether `key` currently has a live entry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Handle of the live entry for `key`.
    pub fn handle_of(&self, key: &K) -> Option<Handle> {
        self.index.get(key).copied()
    }

    /// Track `value` under `key`.
    ///
    /// Returns the value back if `key` is already live.
    pub fn insert(&mut self, key: K, value: T) -> std::result::Result<Handle, T> {
        if self.index.contains_key(&key) {
            return Err(value);
        }
        let handle = Handle::next();
        self.index.insert(key.clone(), handle);
        self.slots.insert(handle, Slot { key, value });
        Ok(handle)
    }

    /// Value tracked under `handle`.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots.get(&handle).map(|slot| &slot.value)
    }

    /// Mutable value tracked under `handle`.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots.get_mut(&handle).map(|slot| &mut slot.value)
    }

    /// Key of the entry tracked under `handle`.
    pub fn key_of(&self, handle: Handle) -> Option<&K> {
        self.slots.get(&handle).map(|slot| &slot.key)
    }

    /// First entry accepted by `predicate`.
    ///
    /// Linear scan; iteration order is unspecified.
    pub fn find<F>(&self, mut predicate: F) -> Option<Handle>
    where
        F: FnMut(&K, &T) -> bool,
    {
        self.slots
            .iter()
            .find(|(_, slot)| predicate(&slot.key, &slot.value))
            .map(|(handle, _)| *handle)
    }

    /// Stop tracking `handle`, returning its key and value.
    pub fn remove(&mut self, handle: Handle) -> Option<(K, T)> {
        let slot = self.slots.remove(&handle)?;
        self.index.remove(&slot.key);
        Some((slot.key, slot.value))
    }

    /// All live handles.
    pub fn handles(&self) -> Vec<Handle> {
        self.slots.keys().copied().collect()
    }

    /// Remove every entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (Handle, K, T)> + '_ {
        self.index.clear();
        self.slots
            .drain()
            .map(|(handle, slot)| (handle, slot.key, slot.value))
    }
}

impl<K: fmt::Debug, T> fmt::Debug for HandleRegistry<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("keys", &self.index.keys().collect::<Vec<_>>())
            .finish()
    }
}
