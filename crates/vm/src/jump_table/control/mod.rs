//! Control flow operations for the virtual machine.
//!
//! Jump and call offsets are relative to the first byte of the jumping
//! instruction. A target may be any position from the start of the script
//! up to and including its end, where execution returns implicitly.

pub mod calls;

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::JumpTable;
use crate::op_code::OpCode;

/// Registers the control operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::NOP, nop);
    jump_table.register(OpCode::JMP, jmp);
    jump_table.register(OpCode::JMPIF, jmp);
    jump_table.register(OpCode::JMPIFNOT, jmp);
    jump_table.register(OpCode::CALL, call);
    jump_table.register(OpCode::RET, ret);
    jump_table.register(OpCode::THROW, throw);
    jump_table.register(OpCode::THROWIFNOT, throw_if_not);
    calls::register_handlers(jump_table);
}

/// Resolves the signed 16-bit offset at `offset_at` in the operand into an
/// absolute position within the current script.
pub(crate) fn jump_target(
    engine: &ExecutionEngine,
    instruction: &Instruction,
    offset_at: usize,
) -> VmResult<usize> {
    let script_len = engine
        .current_context()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?
        .script()
        .len();
    let target = instruction.pointer() as i64 + instruction.token_i16(offset_at) as i64;
    if target < 0 || target > script_len as i64 {
        return Err(VmError::invalid_operation(format!(
            "jump target {target} outside script of {script_len} bytes"
        )));
    }
    Ok(target as usize)
}

fn nop(_engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    Ok(())
}

/// Implements JMP, JMPIF and JMPIFNOT.
///
/// The target is validated before the condition is popped, so an invalid
/// target faults whether or not the jump would be taken.
fn jmp(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let target = jump_target(engine, instruction, 0)?;
    let taken = match instruction.opcode() {
        OpCode::JMPIF => engine.pop()?.as_bool(),
        OpCode::JMPIFNOT => !engine.pop()?.as_bool(),
        _ => true,
    };
    if taken {
        if let Some(context) = engine.current_context_mut() {
            context.set_instruction_pointer(target);
        }
    }
    Ok(())
}

/// Implements the CALL operation.
///
/// The callee runs the same script from the target with the caller's whole
/// evaluation stack, which the caller gives up.
fn call(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let target = jump_target(engine, instruction, 0)?;
    let callee = engine
        .current_context()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?
        .clone_for_call(target, -1);
    engine.load_context(callee)?;
    if let Some(caller) = engine.calling_context_mut() {
        caller.evaluation_stack_mut().clear();
    }
    Ok(())
}

fn ret(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    engine.unload_context()
}

fn throw(_engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    Err(VmError::Throw {
        position: instruction.pointer(),
    })
}

fn throw_if_not(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    if !engine.pop()?.as_bool() {
        return Err(VmError::Throw {
            position: instruction.pointer(),
        });
    }
    Ok(())
}
