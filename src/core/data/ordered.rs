use {
    indexmap::{map, set, IndexMap, IndexSet},
    std::hash::Hash,
};

/// A set which iterates in insertion order.
pub struct OrderedSet<T: Eq + Hash> {
    items: IndexSet<T>,
}

impl<T: Eq + Hash> OrderedSet<T> {
    pub fn new() -> OrderedSet<T> {
        OrderedSet {
            items: IndexSet::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> set::Iter<T> {
        self.items.iter()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A multi-map whose keys and per-key value sets both iterate in insertion
/// order.
pub struct OrderedMultiMap<K: Eq + Hash, V: Eq + Hash> {
    map: IndexMap<K, OrderedSet<V>>,
}

impl<K: Eq + Hash, V: Eq + Hash> OrderedMultiMap<K, V> {
    pub fn new() -> OrderedMultiMap<K, V> {
        OrderedMultiMap {
            map: IndexMap::new(),
        }
    }

    /// Adds `value` to the set stored under `key`, registering the key on
    /// first use. Returns true if the value was not already present.
    pub fn put(&mut self, key: K, value: V) -> bool {
        self.map
            .entry(key)
            .or_insert_with(OrderedSet::new)
            .insert(value)
    }

    pub fn get(&self, key: &K) -> Option<&OrderedSet<V>> {
        self.map.get(key)
    }

    pub fn keys(&self) -> map::Keys<K, OrderedSet<V>> {
        self.map.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
