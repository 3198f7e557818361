//! Calls into other scripts and into the host.
//!
//! `APPCALL` and `TAILCALL` hand the callee the caller's whole evaluation
//! stack. `CALL_I` and the `CALL_E*` family carry explicit return and
//! parameter counts and move only `pcount` items. The `*T` variants and
//! `TAILCALL` replace the caller instead of returning to it.

use crate::error::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::interop_service::InteropResult;
use crate::jump_table::control::jump_target;
use crate::jump_table::JumpTable;
use crate::op_code::OpCode;
use crate::script::{Script, ScriptHash};
use crate::script_table::ContractProperties;

/// Registers the call operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::APPCALL, app_call);
    jump_table.register(OpCode::TAILCALL, app_call);
    jump_table.register(OpCode::SYSCALL, syscall);
    jump_table.register(OpCode::CALL_I, call_i);
    jump_table.register(OpCode::CALL_E, call_e);
    jump_table.register(OpCode::CALL_ED, call_e);
    jump_table.register(OpCode::CALL_ET, call_e);
    jump_table.register(OpCode::CALL_EDT, call_e);
}

/// Implements APPCALL and TAILCALL. An all-zero operand asks for a dynamic
/// call to a hash popped from the stack.
fn app_call(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let mut hash = instruction.token_hash(0)?;
    if hash.is_zero() {
        check_dynamic_invoke(engine)?;
        hash = pop_script_hash(engine)?;
    }
    let script = resolve(engine, &hash)?;
    let tail = instruction.opcode() == OpCode::TAILCALL;
    enter(engine, ExecutionContext::new(script, -1), None, tail)
}

/// Implements CALL_I: a call into the current script with explicit counts.
fn call_i(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let rvcount = instruction.token_u8(0) as i32;
    let pcount = instruction.token_u8(1) as usize;
    let target = jump_target(engine, instruction, 2)?;
    let script = current_script(engine)?;
    let mut callee = ExecutionContext::new(script, rvcount);
    callee.set_instruction_pointer(target);
    enter(engine, callee, Some(pcount), false)
}

/// Implements CALL_E, CALL_ED, CALL_ET and CALL_EDT.
fn call_e(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let rvcount = instruction.token_u8(0) as i32;
    let pcount = instruction.token_u8(1) as usize;
    let opcode = instruction.opcode();
    let tail = matches!(opcode, OpCode::CALL_ET | OpCode::CALL_EDT);
    let dynamic = matches!(opcode, OpCode::CALL_ED | OpCode::CALL_EDT);

    let caller = engine
        .current_context()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?;
    let available = caller.evaluation_stack().len();
    if available < pcount {
        return Err(VmError::stack_underflow(pcount, available));
    }
    if tail && caller.rvcount() != rvcount {
        return Err(VmError::invalid_operation(format!(
            "tail call returns {rvcount} values, caller expects {}",
            caller.rvcount()
        )));
    }

    let hash = if dynamic {
        check_dynamic_invoke(engine)?;
        pop_script_hash(engine)?
    } else {
        instruction.token_hash(2)?
    };
    let script = resolve(engine, &hash)?;
    enter(engine, ExecutionContext::new(script, rvcount), Some(pcount), tail)
}

/// Implements SYSCALL.
fn syscall(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let name = instruction.token_string();
    let service = engine.interop_service().clone();
    match service.invoke(engine, &name)? {
        InteropResult::True => Ok(()),
        InteropResult::False => Err(VmError::SyscallFailed(name)),
        InteropResult::NotFound => Err(VmError::UnknownSyscall(name)),
        InteropResult::OutOfGas => Err(VmError::OutOfGas {
            required: service.price(&name).unwrap_or_default(),
            available: engine.gas_left(),
        }),
    }
}

/// Loads `callee` and moves `pcount` items (the whole stack when `None`)
/// from the caller's evaluation stack onto it. A tail call then drops the
/// caller.
fn enter(
    engine: &mut ExecutionEngine,
    mut callee: ExecutionContext,
    pcount: Option<usize>,
    tail: bool,
) -> VmResult<()> {
    // Nothing leaves the caller unless the callee can be loaded.
    engine.check_invocation_depth()?;
    let caller = engine
        .current_context_mut()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?;
    let count = pcount.unwrap_or_else(|| caller.evaluation_stack().len());
    caller
        .evaluation_stack_mut()
        .move_to(callee.evaluation_stack_mut(), count)?;

    engine.load_context(callee)?;
    if tail {
        let caller_index = engine.invocation_stack().len() - 2;
        engine.remove_context(caller_index)?;
    }
    Ok(())
}

/// Dynamic calls are allowed from the entry script and from scripts
/// registered with [`ContractProperties::HAS_DYNAMIC_INVOKE`].
fn check_dynamic_invoke(engine: &ExecutionEngine) -> VmResult<()> {
    let current = engine.current_script_hash()?;
    let is_entry = engine
        .entry_context()
        .is_some_and(|entry| entry.script_hash() == current);
    let has_permission = engine.script_table().is_some_and(|table| {
        table
            .properties(&current)
            .contains(ContractProperties::HAS_DYNAMIC_INVOKE)
    });
    if is_entry || has_permission {
        Ok(())
    } else {
        Err(VmError::DynamicInvokeNotAllowed(current))
    }
}

fn pop_script_hash(engine: &mut ExecutionEngine) -> VmResult<ScriptHash> {
    let bytes = engine.pop()?.as_bytes()?;
    ScriptHash::from_slice(&bytes).map_err(|_| {
        VmError::invalid_operation(format!(
            "dynamic call target must be {} bytes, got {}",
            ScriptHash::LENGTH,
            bytes.len()
        ))
    })
}

fn resolve(engine: &ExecutionEngine, hash: &ScriptHash) -> VmResult<Script> {
    engine
        .script_table()
        .and_then(|table| table.resolve(hash))
        .ok_or(VmError::ScriptNotFound(*hash))
}

fn current_script(engine: &ExecutionEngine) -> VmResult<Script> {
    engine
        .current_context()
        .map(|context| context.script().clone())
        .ok_or_else(|| VmError::invalid_operation("no current context"))
}
