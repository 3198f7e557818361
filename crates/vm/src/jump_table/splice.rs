//! Byte string operations for the virtual machine.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{pop_index, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the splice operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::CAT, cat);
    jump_table.register(OpCode::SUBSTR, substr);
    jump_table.register(OpCode::LEFT, left);
    jump_table.register(OpCode::RIGHT, right);
    jump_table.register(OpCode::SIZE, size);
}

fn pop_bytes(engine: &mut ExecutionEngine) -> VmResult<Vec<u8>> {
    engine.pop()?.as_bytes()
}

/// Implements the CAT operation.
fn cat(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = pop_bytes(engine)?;
    let mut x1 = pop_bytes(engine)?;
    let size = x1.len() + x2.len();
    let max = engine.limits().max_item_size;
    if size > max {
        return Err(VmError::OversizedValue { size, max });
    }
    x1.extend_from_slice(&x2);
    engine.push(StackItem::ByteArray(x1))
}

/// Implements the SUBSTR operation. A start past the end yields an empty
/// array; a count past the end is clamped.
fn substr(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let count = pop_index(engine)?;
    let index = pop_index(engine)?;
    let x = pop_bytes(engine)?;
    if index > x.len() {
        return engine.push(StackItem::ByteArray(Vec::new()));
    }
    let end = index + count.min(x.len() - index);
    engine.push(StackItem::ByteArray(x[index..end].to_vec()))
}

/// Implements the LEFT operation.
fn left(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let count = pop_index(engine)?;
    let mut x = pop_bytes(engine)?;
    x.truncate(count);
    engine.push(StackItem::ByteArray(x))
}

/// Implements the RIGHT operation. Asking for more bytes than the array
/// holds faults.
fn right(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let count = pop_index(engine)?;
    let x = pop_bytes(engine)?;
    if count > x.len() {
        return Err(VmError::invalid_operation(format!(
            "RIGHT count {count} exceeds length {}",
            x.len()
        )));
    }
    engine.push(StackItem::ByteArray(x[x.len() - count..].to_vec()))
}

fn size(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_bytes(engine)?;
    engine.push(StackItem::from_int(x.len() as i64))
}
