#![allow(clippy::mutable_key_type)]

//! Map stack item implementation.
//!
//! Entries keep insertion order; removing an entry preserves the order of
//! the rest. Keys must be primitive items (Boolean, Integer, ByteArray) and
//! are compared by their byte representation.

use crate::error::{VmError, VmResult};
use crate::stack_item::{next_stack_item_id, StackItem};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Represents a map of stack items in the VM.
#[derive(Clone)]
pub struct Map {
    inner: Arc<Mutex<IndexMap<StackItem, StackItem>>>,
    /// Unique identifier mirroring reference equality semantics.
    id: usize,
}

impl Map {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(IndexMap::new())),
            id: next_stack_item_id(),
        }
    }

    /// Returns the unique identifier for this map.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Gets the value for the specified key.
    pub fn get(&self, key: &StackItem) -> Option<StackItem> {
        self.inner.lock().get(key).cloned()
    }

    /// Sets the value for the specified key. Existing keys keep their
    /// position.
    pub fn insert(&self, key: StackItem, value: StackItem) -> VmResult<()> {
        Self::validate_key(&key)?;
        self.inner.lock().insert(key, value);
        Ok(())
    }

    /// Removes the entry for `key`, returning its value if it was present.
    pub fn remove(&self, key: &StackItem) -> Option<StackItem> {
        self.inner.lock().shift_remove(key)
    }

    pub fn contains_key(&self, key: &StackItem) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<StackItem> {
        self.inner.lock().keys().cloned().collect()
    }

    /// Values in insertion order.
    pub fn values(&self) -> Vec<StackItem> {
        self.inner.lock().values().cloned().collect()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<(StackItem, StackItem)> {
        self.inner
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// The entry at insertion position `index`.
    pub fn get_index(&self, index: usize) -> Option<(StackItem, StackItem)> {
        self.inner
            .lock()
            .get_index(index)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Rejects keys that are not primitive values.
    pub fn validate_key(key: &StackItem) -> VmResult<()> {
        let item_type = key.item_type();
        if !item_type.is_primitive() {
            return Err(VmError::type_mismatch("primitive map key", item_type));
        }
        Ok(())
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map#{}(len={})", self.id, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack_item::{Array, StackItemType};

    #[test]
    fn test_insertion_order_survives_removal() {
        let map = Map::new();
        for key in [3, 1, 2] {
            map.insert(StackItem::from_int(key), StackItem::from_int(key * 10))
                .unwrap();
        }
        map.remove(&StackItem::from_int(1));

        assert_eq!(map.keys(), vec![StackItem::from_int(3), StackItem::from_int(2)]);
        assert_eq!(map.values(), vec![StackItem::from_int(30), StackItem::from_int(20)]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let map = Map::new();
        map.insert(StackItem::from_int(1), StackItem::from_int(1)).unwrap();
        map.insert(StackItem::from_int(2), StackItem::from_int(2)).unwrap();
        map.insert(StackItem::from_int(1), StackItem::from_int(5)).unwrap();

        assert_eq!(
            map.get_index(0),
            Some((StackItem::from_int(1), StackItem::from_int(5)))
        );
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_keys_compare_by_bytes() {
        let map = Map::new();
        map.insert(StackItem::from_int(1), StackItem::from_bool(true))
            .unwrap();
        let key = StackItem::from_byte_array(vec![1]).unwrap();
        assert!(map.contains_key(&key));
        assert_eq!(map.get(&key), Some(StackItem::from_bool(true)));
    }

    #[test]
    fn test_compound_keys_rejected() {
        let map = Map::new();
        let key = StackItem::Array(Array::new(Vec::new()));
        assert_eq!(
            map.insert(key, StackItem::from_int(1)),
            Err(VmError::type_mismatch("primitive map key", StackItemType::Array))
        );
    }

    #[test]
    fn test_clone_aliases() {
        let map = Map::new();
        let alias = map.clone();
        alias
            .insert(StackItem::from_int(7), StackItem::from_int(8))
            .unwrap();
        assert_eq!(map.get(&StackItem::from_int(7)), Some(StackItem::from_int(8)));
    }
}
