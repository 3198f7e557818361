//! Stack item type tags.

use std::fmt;

/// The type tag of a stack item; the discriminants double as the tag byte
/// of the canonical wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StackItemType {
    ByteArray = 0x00,
    Boolean = 0x01,
    Integer = 0x02,
    InteropInterface = 0x40,
    Array = 0x80,
    Struct = 0x81,
    Map = 0x82,
}

impl StackItemType {
    /// Converts a tag byte to a type.
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::ByteArray),
            0x01 => Some(Self::Boolean),
            0x02 => Some(Self::Integer),
            0x40 => Some(Self::InteropInterface),
            0x80 => Some(Self::Array),
            0x81 => Some(Self::Struct),
            0x82 => Some(Self::Map),
            _ => None,
        }
    }

    /// Converts a type name as written in test fixtures.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ByteArray" => Some(Self::ByteArray),
            "Boolean" => Some(Self::Boolean),
            "Integer" => Some(Self::Integer),
            "InteropInterface" | "Interop" => Some(Self::InteropInterface),
            "Array" => Some(Self::Array),
            "Struct" => Some(Self::Struct),
            "Map" => Some(Self::Map),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Array, Struct and Map.
    pub fn is_compound(self) -> bool {
        matches!(self, Self::Array | Self::Struct | Self::Map)
    }

    /// Boolean, Integer and ByteArray.
    pub fn is_primitive(self) -> bool {
        matches!(self, Self::Boolean | Self::Integer | Self::ByteArray)
    }
}

impl fmt::Display for StackItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
