//! Array stack item implementation.
//!
//! An [`Array`] is a shared handle: cloning it (and therefore duplicating it
//! on a stack) aliases the same backing list, so a mutation through one
//! handle is visible through every other.

use crate::error::{VmError, VmResult};
use crate::stack_item::{next_stack_item_id, StackItem};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Represents an array of stack items in the VM.
#[derive(Clone)]
pub struct Array {
    inner: Arc<Mutex<Vec<StackItem>>>,
    /// Unique identifier giving reference equality semantics.
    id: usize,
}

impl Array {
    /// Creates a new array with the specified items.
    pub fn new(items: Vec<StackItem>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(items)),
            id: next_stack_item_id(),
        }
    }

    /// Returns the unique identifier for this array.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns true when both handles refer to the same backing list.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Snapshot of the items.
    pub fn items(&self) -> Vec<StackItem> {
        self.inner.lock().clone()
    }

    /// Gets the item at the specified index.
    pub fn get(&self, index: usize) -> Option<StackItem> {
        self.inner.lock().get(index).cloned()
    }

    /// Sets the item at the specified index.
    pub fn set(&self, index: usize, item: StackItem) -> VmResult<()> {
        let mut items = self.inner.lock();
        let len = items.len();
        let slot = items.get_mut(index).ok_or_else(|| {
            VmError::invalid_operation(format!("index {index} out of range for length {len}"))
        })?;
        *slot = item;
        Ok(())
    }

    /// Adds an item to the end of the array.
    pub fn push(&self, item: StackItem) {
        self.inner.lock().push(item);
    }

    /// Removes the item at the specified index.
    pub fn remove_at(&self, index: usize) -> VmResult<StackItem> {
        let mut items = self.inner.lock();
        if index >= items.len() {
            return Err(VmError::invalid_operation(format!(
                "index {index} out of range for length {}",
                items.len()
            )));
        }
        Ok(items.remove(index))
    }

    /// Reverses the items in place.
    pub fn reverse(&self) {
        self.inner.lock().reverse();
    }

    /// Removes all items from the array.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Gets the number of items in the array.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the array is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl fmt::Debug for Array {
    // Items are not printed: an array may contain itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array#{}(len={})", self.id, self.len())
    }
}

impl From<Vec<StackItem>> for Array {
    fn from(items: Vec<StackItem>) -> Self {
        Self::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_aliases_backing_list() {
        let array = Array::new(vec![StackItem::from_int(1)]);
        let alias = array.clone();
        alias.push(StackItem::from_int(2));
        alias.set(0, StackItem::from_int(10)).unwrap();

        assert_eq!(array.len(), 2);
        assert_eq!(array.get(0), Some(StackItem::from_int(10)));
        assert!(array.ptr_eq(&alias));
        assert_eq!(array.id(), alias.id());
    }

    #[test]
    fn test_distinct_arrays_have_distinct_ids() {
        let a = Array::new(Vec::new());
        let b = Array::new(Vec::new());
        assert_ne!(a.id(), b.id());
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_out_of_range() {
        let array = Array::new(vec![StackItem::from_int(1)]);
        assert!(array.set(1, StackItem::from_int(2)).is_err());
        assert!(array.remove_at(3).is_err());
        assert_eq!(array.remove_at(0).unwrap(), StackItem::from_int(1));
        assert!(array.is_empty());
    }

    #[test]
    fn test_self_containing_array_debug() {
        let array = Array::new(Vec::new());
        array.push(StackItem::Array(array.clone()));
        assert!(format!("{array:?}").starts_with("Array#"));
    }
}
