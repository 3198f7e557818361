//! Bitwise operations for the virtual machine.
//!
//! Operands are interpreted as two's-complement integers of unbounded width.

use crate::error::VmResult;
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{pop_int, push_int, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the bitwise operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::INVERT, invert);
    jump_table.register(OpCode::AND, and);
    jump_table.register(OpCode::OR, or);
    jump_table.register(OpCode::XOR, xor);
    jump_table.register(OpCode::EQUAL, equal);
}

/// Implements the INVERT operation.
fn invert(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    push_int(engine, !x)
}

/// Implements the AND operation.
fn and(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = pop_int(engine)?;
    let x1 = pop_int(engine)?;
    push_int(engine, x1 & x2)
}

/// Implements the OR operation.
fn or(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = pop_int(engine)?;
    let x1 = pop_int(engine)?;
    push_int(engine, x1 | x2)
}

/// Implements the XOR operation.
fn xor(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = pop_int(engine)?;
    let x1 = pop_int(engine)?;
    push_int(engine, x1 ^ x2)
}

/// Implements the EQUAL operation.
///
/// Primitives compare by byte form, so `Integer(1)` equals `ByteArray([1])`.
/// Collections compare by identity, except structs, which compare field by
/// field.
fn equal(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = engine.pop()?;
    let x1 = engine.pop()?;
    engine.push(StackItem::from_bool(x1.equals(&x2)))
}
