#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
type OrdinalMap<K> = HashMap<K, u64>;
#[cfg(not(feature = "std"))]
type OrdinalMap<K> = BTreeMap<K, u64>;

/// Bound on tile keys: hashable under `std`, ordered under `no_std`.
#[cfg(feature = "std")]
pub trait GalleryKey: core::hash::Hash + Eq + Clone {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone> GalleryKey for K {}

/// Bound on tile keys: hashable under `std`, ordered under `no_std`.
#[cfg(not(feature = "std"))]
pub trait GalleryKey: Ord + Clone {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone> GalleryKey for K {}

/// Key → insertion ordinal.
///
/// Ordinals are assigned exactly once, in arrival order, and never change
/// across resizes or re-tiles; the map only shrinks on a hard reset. Hosts
/// use it for "nth item" navigation and selection bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct ItemIndexMap<K> {
    map: OrdinalMap<K>,
    next: u64,
}

impl<K: GalleryKey> ItemIndexMap<K> {
    pub(crate) fn new() -> Self {
        Self {
            map: OrdinalMap::default(),
            next: 0,
        }
    }

    /// Assigns the next ordinal to `key`, or returns the existing one.
    pub(crate) fn record(&mut self, key: &K) -> u64 {
        if let Some(&ordinal) = self.map.get(key) {
            return ordinal;
        }
        let ordinal = self.next;
        self.next += 1;
        self.map.insert(key.clone(), ordinal);
        ordinal
    }

    pub fn ordinal(&self, key: &K) -> Option<u64> {
        self.map.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn for_each(&self, mut f: impl FnMut(&K, u64)) {
        for (k, &ordinal) in self.map.iter() {
            f(k, ordinal);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.map.clear();
        self.next = 0;
    }
}
