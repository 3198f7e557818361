//! Struct stack item implementation.
//!
//! A struct is stored exactly like an [`Array`] but behaves as a value:
//! stack duplication and storage into collections go through
//! [`Struct::deep_clone`], and EQUAL compares structs field by field.

use crate::stack_item::{Array, StackItem};
use std::fmt;
use std::ops::Deref;

/// Represents a struct of stack items in the VM.
#[derive(Clone)]
pub struct Struct {
    items: Array,
}

impl Struct {
    /// Creates a new struct with the specified items.
    pub fn new(items: Vec<StackItem>) -> Self {
        Self {
            items: Array::new(items),
        }
    }

    /// Copies the struct. Nested structs are copied recursively; any other
    /// element, arrays and maps included, is shared with the original.
    pub fn deep_clone(&self) -> Self {
        let items = self
            .items
            .items()
            .into_iter()
            .map(|item| match item {
                StackItem::Struct(inner) => StackItem::Struct(inner.deep_clone()),
                other => other,
            })
            .collect();
        Self::new(items)
    }

    /// Field-by-field comparison. Nested structs compare structurally, other
    /// fields with [`StackItem`]'s own equality.
    pub fn structural_eq(&self, other: &Struct) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let left = self.items.items();
        let right = other.items.items();
        left.len() == right.len() && left.iter().zip(right.iter()).all(|(a, b)| a.equals(b))
    }

    /// The backing list, shared with this handle.
    pub fn as_array(&self) -> &Array {
        &self.items
    }
}

impl Deref for Struct {
    type Target = Array;

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl fmt::Debug for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Struct#{}(len={})", self.id(), self.len())
    }
}
