//! Compound-type operations for the virtual machine.
//!
//! Arrays and maps are shared by reference: a change made through one copy
//! on the stack is visible through every other. Structs are copied whenever
//! they are stored into a collection.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{pop_index, to_int, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::{Array, StackItem, StackItemType};
use num_traits::ToPrimitive;

/// Registers the compound-type operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::ARRAYSIZE, array_size);
    jump_table.register(OpCode::PACK, pack);
    jump_table.register(OpCode::UNPACK, unpack);
    jump_table.register(OpCode::PICKITEM, pick_item);
    jump_table.register(OpCode::SETITEM, set_item);
    jump_table.register(OpCode::NEWARRAY, new_array);
    jump_table.register(OpCode::NEWSTRUCT, new_struct);
    jump_table.register(OpCode::NEWMAP, new_map);
    jump_table.register(OpCode::APPEND, append);
    jump_table.register(OpCode::REVERSE, reverse);
    jump_table.register(OpCode::REMOVE, remove);
    jump_table.register(OpCode::HASKEY, has_key);
    jump_table.register(OpCode::KEYS, keys);
    jump_table.register(OpCode::VALUES, values);
}

/// Pops a key for PICKITEM, SETITEM, REMOVE or HASKEY.
fn pop_key(engine: &mut ExecutionEngine) -> VmResult<StackItem> {
    let key = engine.pop()?;
    if key.item_type().is_compound() {
        return Err(VmError::type_mismatch("primitive key", key.item_type()));
    }
    Ok(key)
}

/// Converts `key` into an index into a collection of `len` items.
fn index_into(engine: &ExecutionEngine, key: &StackItem, len: usize) -> VmResult<usize> {
    let index = to_int(engine, key)?;
    match index.to_usize() {
        Some(i) if i < len => Ok(i),
        _ => Err(VmError::invalid_operation(format!(
            "index {index} out of range for {len} items"
        ))),
    }
}

fn check_array_size(engine: &ExecutionEngine, size: usize) -> VmResult<()> {
    let max = engine.limits().max_array_size;
    if size > max {
        return Err(VmError::OversizedValue { size, max });
    }
    Ok(())
}

fn array_size(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.pop()?;
    let size = match (&item, item.as_array()) {
        (_, Some(array)) => array.len(),
        (StackItem::Map(map), None) => map.len(),
        _ => item.as_bytes()?.len(),
    };
    engine.push(StackItem::from_int(size as i64))
}

/// Implements the PACK operation. The item on top of the stack becomes the
/// first element.
fn pack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let size = pop_index(engine)?;
    check_array_size(engine, size)?;
    let available = engine
        .current_context()
        .map(|context| context.evaluation_stack().len())
        .unwrap_or(0);
    if size > available {
        return Err(VmError::stack_underflow(size, available));
    }
    let mut items = Vec::with_capacity(size);
    for _ in 0..size {
        items.push(engine.pop()?);
    }
    engine.push(StackItem::new_array(items))
}

/// Implements the UNPACK operation, the inverse of PACK: elements are pushed
/// last first, followed by the count.
fn unpack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.pop()?;
    let array = item
        .as_array()
        .ok_or_else(|| VmError::type_mismatch("Array", item.item_type()))?;
    let items = array.items();
    let count = items.len();
    for element in items.into_iter().rev() {
        engine.push(element)?;
    }
    engine.push(StackItem::from_int(count as i64))
}

/// Implements the PICKITEM operation. Byte strings yield the byte at the
/// index as an integer.
fn pick_item(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let key = pop_key(engine)?;
    let collection = engine.pop()?;
    let item = match (&collection, collection.as_array()) {
        (_, Some(array)) => {
            let index = index_into(engine, &key, array.len())?;
            array
                .get(index)
                .ok_or_else(|| VmError::invalid_operation("index out of range"))?
        }
        (StackItem::Map(map), None) => map
            .get(&key)
            .ok_or_else(|| VmError::invalid_operation("key not found in map"))?,
        _ => {
            let bytes = collection.as_bytes()?;
            let index = index_into(engine, &key, bytes.len())?;
            StackItem::from_int(bytes[index] as i64)
        }
    };
    engine.push(item)
}

/// Implements the SETITEM operation.
fn set_item(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let value = engine.pop()?.duplicate();
    let key = pop_key(engine)?;
    let collection = engine.pop()?;
    match (&collection, collection.as_array()) {
        (_, Some(array)) => {
            let index = index_into(engine, &key, array.len())?;
            array.set(index, value)
        }
        (StackItem::Map(map), None) => {
            if !map.contains_key(&key) {
                check_array_size(engine, map.len() + 1)?;
            }
            map.insert(key, value)
        }
        _ => Err(VmError::type_mismatch("Array or Map", collection.item_type())),
    }
}

/// Implements the NEWARRAY operation. An array operand is reused; a struct
/// operand is converted; an integer gives that many `false` elements.
fn new_array(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.pop()?;
    let array = match item.item_type() {
        StackItemType::Array => item,
        StackItemType::Struct => {
            StackItem::new_array(item.as_array().map(Array::items).unwrap_or_default())
        }
        _ => StackItem::new_array(filled(engine, &item)?),
    };
    engine.push(array)
}

/// Implements the NEWSTRUCT operation, the mirror of NEWARRAY.
fn new_struct(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.pop()?;
    let structure = match item.item_type() {
        StackItemType::Struct => item,
        StackItemType::Array => {
            StackItem::new_struct(item.as_array().map(Array::items).unwrap_or_default())
        }
        _ => StackItem::new_struct(filled(engine, &item)?),
    };
    engine.push(structure)
}

fn filled(engine: &ExecutionEngine, count: &StackItem) -> VmResult<Vec<StackItem>> {
    let count = to_int(engine, count)?;
    let size = count
        .to_usize()
        .ok_or_else(|| VmError::invalid_operation(format!("invalid element count {count}")))?;
    check_array_size(engine, size)?;
    Ok(vec![StackItem::from_bool(false); size])
}

fn new_map(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    engine.push(StackItem::new_map())
}

/// Implements the APPEND operation.
fn append(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let value = engine.pop()?.duplicate();
    let target = engine.pop()?;
    let array = target
        .as_array()
        .ok_or_else(|| VmError::type_mismatch("Array", target.item_type()))?;
    check_array_size(engine, array.len() + 1)?;
    array.push(value);
    Ok(())
}

fn reverse(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let target = engine.pop()?;
    let array = target
        .as_array()
        .ok_or_else(|| VmError::type_mismatch("Array", target.item_type()))?;
    array.reverse();
    Ok(())
}

/// Implements the REMOVE operation. Removing an absent map key is a no-op.
fn remove(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let key = pop_key(engine)?;
    let collection = engine.pop()?;
    match (&collection, collection.as_array()) {
        (_, Some(array)) => {
            let index = index_into(engine, &key, array.len())?;
            array.remove_at(index)?;
            Ok(())
        }
        (StackItem::Map(map), None) => {
            map.remove(&key);
            Ok(())
        }
        _ => Err(VmError::type_mismatch("Array or Map", collection.item_type())),
    }
}

/// Implements the HASKEY operation.
fn has_key(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let key = pop_key(engine)?;
    let collection = engine.pop()?;
    let found = match (&collection, collection.as_array()) {
        (_, Some(array)) => {
            let index = to_int(engine, &key)?;
            if index.sign() == num_bigint::Sign::Minus {
                return Err(VmError::invalid_operation(format!("negative index {index}")));
            }
            index.to_usize().map_or(false, |i| i < array.len())
        }
        (StackItem::Map(map), None) => map.contains_key(&key),
        _ => return Err(VmError::type_mismatch("Array or Map", collection.item_type())),
    };
    engine.push(StackItem::from_bool(found))
}

fn keys(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.pop()?;
    let map = item
        .as_map()
        .ok_or_else(|| VmError::type_mismatch("Map", item.item_type()))?;
    engine.push(StackItem::new_array(map.keys()))
}

/// Implements the VALUES operation. Struct values are copied into the new
/// array.
fn values(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.pop()?;
    let values = match (&item, item.as_array()) {
        (_, Some(array)) => array.items(),
        (StackItem::Map(map), None) => map.values(),
        _ => return Err(VmError::type_mismatch("Array or Map", item.item_type())),
    };
    let values: Vec<StackItem> = values.iter().map(StackItem::duplicate).collect();
    engine.push(StackItem::Array(Array::new(values)))
}
