//! Stack item implementation for the virtual machine.
//!
//! This module provides the closed set of values the VM operates on.

use crate::error::{VmError, VmResult};
use crate::stack_item::{Array, InteropInterface, Map, StackItemType, Struct};
use num_bigint::BigInt;
use num_traits::Zero;
use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Default maximum encoded size of an Integer, in bytes. Engines may be
/// configured with a different ceiling through `ExecutionEngineLimits`.
pub const MAX_INTEGER_SIZE: usize = 32;

/// Default maximum size of a ByteArray, in bytes.
pub const MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Represents a value in the VM.
///
/// `Clone` is shallow: cloning an `Array`, `Struct` or `Map` shares the
/// backing collection. Use [`StackItem::duplicate`] for the copy semantics
/// stack duplication requires.
#[derive(Debug, Clone)]
pub enum StackItem {
    /// Represents a boolean value.
    Boolean(bool),

    /// Represents an integer value.
    Integer(BigInt),

    /// Represents an immutable byte array.
    ByteArray(Vec<u8>),

    /// Represents an array of stack items.
    Array(Array),

    /// Represents a struct of stack items.
    Struct(Struct),

    /// Represents a map of stack items.
    Map(Map),

    /// Represents an interop interface.
    InteropInterface(Arc<dyn InteropInterface>),
}

impl StackItem {
    /// Creates a boolean stack item.
    pub fn from_bool(value: bool) -> Self {
        StackItem::Boolean(value)
    }

    /// Creates an integer stack item from a machine integer.
    pub fn from_int(value: i64) -> Self {
        StackItem::Integer(BigInt::from(value))
    }

    /// Creates an integer stack item, failing above [`MAX_INTEGER_SIZE`].
    pub fn from_big_int(value: BigInt) -> VmResult<Self> {
        let size = integer_size(&value);
        if size > MAX_INTEGER_SIZE {
            return Err(VmError::OversizedValue {
                size,
                max: MAX_INTEGER_SIZE,
            });
        }
        Ok(StackItem::Integer(value))
    }

    /// Creates a byte array stack item, failing above [`MAX_ITEM_SIZE`].
    pub fn from_byte_array(value: impl Into<Vec<u8>>) -> VmResult<Self> {
        let value = value.into();
        if value.len() > MAX_ITEM_SIZE {
            return Err(VmError::OversizedValue {
                size: value.len(),
                max: MAX_ITEM_SIZE,
            });
        }
        Ok(StackItem::ByteArray(value))
    }

    /// Creates an array stack item.
    pub fn new_array(items: Vec<StackItem>) -> Self {
        StackItem::Array(Array::new(items))
    }

    /// Creates a struct stack item.
    pub fn new_struct(items: Vec<StackItem>) -> Self {
        StackItem::Struct(Struct::new(items))
    }

    /// Creates an empty map stack item.
    pub fn new_map() -> Self {
        StackItem::Map(Map::new())
    }

    /// Creates an interop interface stack item.
    pub fn from_interface<T: InteropInterface + 'static>(value: T) -> Self {
        StackItem::InteropInterface(Arc::new(value))
    }

    /// Returns the type of the stack item.
    pub fn item_type(&self) -> StackItemType {
        match self {
            StackItem::Boolean(_) => StackItemType::Boolean,
            StackItem::Integer(_) => StackItemType::Integer,
            StackItem::ByteArray(_) => StackItemType::ByteArray,
            StackItem::Array(_) => StackItemType::Array,
            StackItem::Struct(_) => StackItemType::Struct,
            StackItem::Map(_) => StackItemType::Map,
            StackItem::InteropInterface(_) => StackItemType::InteropInterface,
        }
    }

    /// Converts the stack item to a boolean.
    ///
    /// Byte arrays are true when any byte is non-zero; collections and
    /// interop objects are always true.
    pub fn as_bool(&self) -> bool {
        match self {
            StackItem::Boolean(b) => *b,
            StackItem::Integer(i) => !i.is_zero(),
            StackItem::ByteArray(b) => b.iter().any(|&byte| byte != 0),
            StackItem::Array(_)
            | StackItem::Struct(_)
            | StackItem::Map(_)
            | StackItem::InteropInterface(_) => true,
        }
    }

    /// Converts the stack item to an integer, reading byte arrays of at most
    /// [`MAX_INTEGER_SIZE`] bytes.
    pub fn as_int(&self) -> VmResult<BigInt> {
        self.as_int_within(MAX_INTEGER_SIZE)
    }

    /// Converts the stack item to an integer, reading byte arrays of at most
    /// `max_size` bytes.
    pub fn as_int_within(&self, max_size: usize) -> VmResult<BigInt> {
        match self {
            StackItem::Boolean(b) => Ok(BigInt::from(*b as u8)),
            StackItem::Integer(i) => Ok(i.clone()),
            StackItem::ByteArray(b) => {
                if b.len() > max_size {
                    return Err(VmError::OversizedValue {
                        size: b.len(),
                        max: max_size,
                    });
                }
                Ok(bytes_to_integer(b))
            }
            other => Err(VmError::type_mismatch("Integer", other.item_type())),
        }
    }

    /// Converts the stack item to a byte array.
    pub fn as_bytes(&self) -> VmResult<Vec<u8>> {
        self.primitive_bytes()
            .map(Cow::into_owned)
            .ok_or_else(|| VmError::type_mismatch("ByteArray", self.item_type()))
    }

    /// The backing list of an Array or Struct.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            StackItem::Array(array) => Some(array),
            StackItem::Struct(structure) => Some(structure.as_array()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            StackItem::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Gets the interop interface from the stack item, downcast to `T`.
    pub fn as_interface<T: InteropInterface + 'static>(&self) -> VmResult<&T> {
        match self {
            StackItem::InteropInterface(i) => i.as_any().downcast_ref::<T>().ok_or_else(|| {
                VmError::invalid_operation(format!(
                    "interop object {} has an unexpected type",
                    i.interface_type()
                ))
            }),
            other => Err(VmError::type_mismatch("InteropInterface", other.item_type())),
        }
    }

    /// Copies the item the way a stack duplication does: structs are deep
    /// copied, arrays and maps are shared, value types are copied.
    pub fn duplicate(&self) -> Self {
        match self {
            StackItem::Struct(s) => StackItem::Struct(s.deep_clone()),
            other => other.clone(),
        }
    }

    /// Equality as observed by the EQUAL opcode: like `==`, except that two
    /// structs compare field by field.
    pub fn equals(&self, other: &StackItem) -> bool {
        match (self, other) {
            (StackItem::Struct(a), StackItem::Struct(b)) => a.structural_eq(b),
            _ => self == other,
        }
    }

    /// Byte form of a primitive item; `None` for collections and interop
    /// objects.
    fn primitive_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            StackItem::Boolean(true) => Some(Cow::Borrowed(&[1])),
            StackItem::Boolean(false) => Some(Cow::Borrowed(&[])),
            StackItem::Integer(i) => Some(Cow::Owned(integer_to_bytes(i))),
            StackItem::ByteArray(b) => Some(Cow::Borrowed(b)),
            _ => None,
        }
    }
}

/// Minimal two's-complement little-endian encoding; zero is empty.
pub fn integer_to_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    }
}

/// Inverse of [`integer_to_bytes`]; the empty array is zero.
pub fn bytes_to_integer(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        BigInt::zero()
    } else {
        BigInt::from_signed_bytes_le(bytes)
    }
}

/// Encoded size of `value` in bytes.
pub fn integer_size(value: &BigInt) -> usize {
    if value.is_zero() {
        0
    } else {
        value.to_signed_bytes_le().len()
    }
}

fn interop_address(i: &Arc<dyn InteropInterface>) -> *const () {
    Arc::as_ptr(i) as *const ()
}

// Primitives compare by byte form across types, so Boolean(true),
// Integer(1) and ByteArray([1]) are equal keys. Collections and interop
// objects compare by identity.
impl PartialEq for StackItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StackItem::Array(a), StackItem::Array(b)) => a.ptr_eq(b),
            (StackItem::Struct(a), StackItem::Struct(b)) => a.ptr_eq(b),
            (StackItem::Map(a), StackItem::Map(b)) => a.ptr_eq(b),
            (StackItem::InteropInterface(a), StackItem::InteropInterface(b)) => {
                interop_address(a) == interop_address(b)
            }
            (StackItem::Boolean(a), StackItem::Boolean(b)) => a == b,
            (StackItem::Integer(a), StackItem::Integer(b)) => a == b,
            (StackItem::ByteArray(a), StackItem::ByteArray(b)) => a == b,
            _ => match (self.primitive_bytes(), other.primitive_bytes()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for StackItem {}

impl Hash for StackItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            StackItem::Array(a) => a.id().hash(state),
            StackItem::Struct(s) => s.id().hash(state),
            StackItem::Map(m) => m.id().hash(state),
            StackItem::InteropInterface(i) => interop_address(i).hash(state),
            primitive => {
                if let Some(bytes) = primitive.primitive_bytes() {
                    bytes.hash(state);
                }
            }
        }
    }
}

impl From<bool> for StackItem {
    fn from(value: bool) -> Self {
        StackItem::Boolean(value)
    }
}

impl From<Array> for StackItem {
    fn from(value: Array) -> Self {
        StackItem::Array(value)
    }
}

impl From<Struct> for StackItem {
    fn from(value: Struct) -> Self {
        StackItem::Struct(value)
    }
}

impl From<Map> for StackItem {
    fn from(value: Map) -> Self {
        StackItem::Map(value)
    }
}
