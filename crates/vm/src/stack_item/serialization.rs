//! Canonical wire form of stack items.
//!
//! `[type tag][payload]`: Boolean, Integer and ByteArray write their byte
//! form as var-bytes; an InteropInterface writes its type name as a
//! var-string followed by its u64 handle. Collections have no wire form.
//!
//! Writing and reading enforce the same size ceilings, taken from
//! [`ExecutionEngineLimits`], so anything written under a set of limits reads
//! back under the same limits.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngineLimits;
use crate::stack_item::{integer_size, InteropTypeRegistry, StackItem, StackItemType};
use neo2_io::{BinaryWriter, IoError, MemoryReader};

/// Interop type names longer than this are rejected when reading.
const MAX_INTEROP_TYPE_NAME: usize = 252;

impl StackItem {
    /// Writes the canonical form of the item, rejecting values above the
    /// ceilings in `limits`.
    pub fn serialize(
        &self,
        writer: &mut BinaryWriter,
        limits: &ExecutionEngineLimits,
    ) -> VmResult<()> {
        let item_type = self.item_type();
        match self {
            StackItem::Integer(value) => {
                check_size(integer_size(value), limits.max_integer_size)?;
                writer.write_u8(item_type.to_byte());
                writer.write_var_bytes(&self.as_bytes()?);
            }
            StackItem::ByteArray(bytes) => {
                check_size(bytes.len(), limits.max_item_size)?;
                writer.write_u8(item_type.to_byte());
                writer.write_var_bytes(bytes);
            }
            StackItem::Boolean(_) => {
                writer.write_u8(item_type.to_byte());
                writer.write_var_bytes(&self.as_bytes()?);
            }
            StackItem::InteropInterface(object) => {
                writer.write_u8(item_type.to_byte());
                writer.write_var_string(object.interface_type());
                writer.write_u64(object.handle());
            }
            StackItem::Array(_) | StackItem::Struct(_) | StackItem::Map(_) => {
                return Err(VmError::NotSerializable(item_type));
            }
        }
        Ok(())
    }

    /// Returns the canonical form of the item under the default limits.
    pub fn to_canonical_bytes(&self) -> VmResult<Vec<u8>> {
        self.to_canonical_bytes_with(&ExecutionEngineLimits::DEFAULT)
    }

    /// Returns the canonical form of the item under `limits`.
    pub fn to_canonical_bytes_with(&self, limits: &ExecutionEngineLimits) -> VmResult<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.serialize(&mut writer, limits)?;
        Ok(writer.into_bytes())
    }

    /// Reads one item in canonical form.
    pub fn deserialize(
        reader: &mut MemoryReader,
        registry: &InteropTypeRegistry,
        limits: &ExecutionEngineLimits,
    ) -> VmResult<Self> {
        let tag = reader.read_u8()?;
        let item_type = StackItemType::from_byte(tag)
            .ok_or_else(|| IoError::invalid_data(format!("unknown stack item tag {tag:#04x}")))?;

        match item_type {
            StackItemType::Boolean => {
                let payload = read_payload(reader, limits.max_integer_size)?;
                Ok(StackItem::Boolean(payload.iter().any(|&b| b != 0)))
            }
            StackItemType::Integer => {
                let payload = read_payload(reader, limits.max_integer_size)?;
                Ok(StackItem::Integer(super::stack_item::bytes_to_integer(
                    payload,
                )))
            }
            StackItemType::ByteArray => {
                let payload = read_payload(reader, limits.max_item_size)?;
                Ok(StackItem::ByteArray(payload.to_vec()))
            }
            StackItemType::InteropInterface => {
                let type_name = reader.read_var_string(MAX_INTEROP_TYPE_NAME)?;
                let handle = reader.read_u64()?;
                let object = registry.construct(&type_name, handle).ok_or_else(|| {
                    IoError::invalid_data(format!("unregistered interop type {type_name}"))
                })?;
                Ok(StackItem::InteropInterface(object))
            }
            StackItemType::Array | StackItemType::Struct | StackItemType::Map => {
                Err(VmError::NotSerializable(item_type))
            }
        }
    }

    /// Reads an item from `bytes`, which must contain exactly one item, under
    /// the default limits.
    pub fn from_canonical_bytes(bytes: &[u8], registry: &InteropTypeRegistry) -> VmResult<Self> {
        Self::from_canonical_bytes_with(bytes, registry, &ExecutionEngineLimits::DEFAULT)
    }

    /// Reads an item from `bytes`, which must contain exactly one item, under
    /// `limits`.
    pub fn from_canonical_bytes_with(
        bytes: &[u8],
        registry: &InteropTypeRegistry,
        limits: &ExecutionEngineLimits,
    ) -> VmResult<Self> {
        let mut reader = MemoryReader::new(bytes);
        let item = Self::deserialize(&mut reader, registry, limits)?;
        if !reader.is_empty() {
            return Err(IoError::invalid_data(format!(
                "{} trailing bytes after stack item",
                reader.remaining()
            ))
            .into());
        }
        Ok(item)
    }
}

fn check_size(size: usize, max: usize) -> VmResult<()> {
    if size > max {
        return Err(VmError::OversizedValue { size, max });
    }
    Ok(())
}

/// Reads a var-length payload, rejecting lengths above `max` before reading
/// the payload itself.
fn read_payload<'a>(reader: &mut MemoryReader<'a>, max: usize) -> VmResult<&'a [u8]> {
    let length = reader.read_var_int(u64::MAX)?;
    if length > max as u64 {
        return Err(VmError::OversizedValue {
            size: usize::try_from(length).unwrap_or(usize::MAX),
            max,
        });
    }
    Ok(reader.read_memory(length as usize)?)
}
