//! Stack item module for the virtual machine.
//!
//! This module provides the stack item types used by the VM.

pub mod array;
pub mod interop_interface;
pub mod map;
mod serialization;
pub mod stack_item; // allow module inception for clarity of type name
pub mod stack_item_type;
pub mod struct_item;

pub use array::Array;
pub use interop_interface::{InteropConstructor, InteropInterface, InteropTypeRegistry};
pub use map::Map;
pub use stack_item::{
    bytes_to_integer, integer_size, integer_to_bytes, StackItem, MAX_INTEGER_SIZE, MAX_ITEM_SIZE,
};
pub use stack_item_type::StackItemType;
pub use struct_item::Struct;

use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_STACK_ITEM_ID: AtomicUsize = AtomicUsize::new(1);

/// Allocates a process-unique identity for a collection.
pub(crate) fn next_stack_item_id() -> usize {
    NEXT_STACK_ITEM_ID.fetch_add(1, Ordering::Relaxed)
}
