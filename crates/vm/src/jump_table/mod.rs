//! Jump table module for the virtual machine.
//!
//! Each opcode category registers its handlers into a [`JumpTable`]; the
//! engine looks up the handler for every decoded instruction. Hosts may
//! replace individual handlers before handing the table to an engine.

pub mod bitwise;
pub mod compound;
pub mod control;
pub mod crypto;
pub mod numeric;
pub mod push;
pub mod splice;
pub mod stack;

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::stack_item::{integer_size, StackItem};
use num_bigint::BigInt;
use once_cell::sync::Lazy;
use std::fmt;

/// A handler for a VM instruction.
///
/// The engine has already charged gas and advanced the instruction pointer
/// past `instruction` when the handler runs.
pub type InstructionHandler = fn(&mut ExecutionEngine, &Instruction) -> VmResult<()>;

static DEFAULT: Lazy<JumpTable> = Lazy::new(|| {
    let mut jump_table = JumpTable::empty();
    jump_table.register_default_handlers();
    jump_table
});

/// Represents a jump table for the VM.
#[derive(Clone, Copy)]
pub struct JumpTable {
    /// One entry per byte value.
    handlers: [Option<InstructionHandler>; 256],
}

impl Default for JumpTable {
    fn default() -> Self {
        *DEFAULT
    }
}

impl JumpTable {
    /// Creates a jump table with every opcode handler registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jump table with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: [None; 256],
        }
    }

    /// Registers a handler for an opcode.
    pub fn register(&mut self, opcode: OpCode, handler: InstructionHandler) {
        self.handlers[opcode as usize] = Some(handler);
    }

    /// Removes the handler for an opcode; executing it then faults.
    pub fn unregister(&mut self, opcode: OpCode) {
        self.handlers[opcode as usize] = None;
    }

    /// Gets the handler for an opcode.
    pub fn get_handler(&self, opcode: OpCode) -> Option<InstructionHandler> {
        self.handlers[opcode as usize]
    }

    /// Resolves the handler the engine runs for an opcode.
    pub(crate) fn handler_for(&self, opcode: OpCode) -> VmResult<InstructionHandler> {
        self.get_handler(opcode)
            .ok_or_else(|| VmError::invalid_operation(format!("no handler for {opcode}")))
    }

    fn register_default_handlers(&mut self) {
        push::register_handlers(self);
        control::register_handlers(self);
        stack::register_handlers(self);
        splice::register_handlers(self);
        bitwise::register_handlers(self);
        numeric::register_handlers(self);
        crypto::register_handlers(self);
        compound::register_handlers(self);
    }
}

impl fmt::Debug for JumpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = self.handlers.iter().filter(|h| h.is_some()).count();
        f.debug_struct("JumpTable")
            .field("registered", &registered)
            .finish()
    }
}

/// Pops an integer operand that must fit an `i64`.
pub(crate) fn pop_i64(engine: &mut ExecutionEngine) -> VmResult<i64> {
    use num_traits::ToPrimitive;
    let item = engine.pop()?;
    let value = to_int(engine, &item)?;
    value
        .to_i64()
        .ok_or_else(|| VmError::invalid_operation(format!("integer {value} out of range")))
}

/// Pops a non-negative integer operand, used for counts and indices.
pub(crate) fn pop_index(engine: &mut ExecutionEngine) -> VmResult<usize> {
    let value = pop_i64(engine)?;
    usize::try_from(value)
        .map_err(|_| VmError::invalid_operation(format!("negative index {value}")))
}

/// Pops an operand as an integer, rejecting ones wider than the engine allows.
pub(crate) fn pop_int(engine: &mut ExecutionEngine) -> VmResult<BigInt> {
    let item = engine.pop()?;
    let value = to_int(engine, &item)?;
    check_integer(engine, &value)?;
    Ok(value)
}

/// Reads `item` as an integer under the engine's integer size ceiling.
pub(crate) fn to_int(engine: &ExecutionEngine, item: &StackItem) -> VmResult<BigInt> {
    item.as_int_within(engine.limits().max_integer_size)
}

/// Pushes an arithmetic result, faulting when it is wider than the engine
/// allows.
pub(crate) fn push_int(engine: &mut ExecutionEngine, value: BigInt) -> VmResult<()> {
    check_integer(engine, &value)?;
    engine.push(StackItem::Integer(value))
}

fn check_integer(engine: &ExecutionEngine, value: &BigInt) -> VmResult<()> {
    let max = engine.limits().max_integer_size;
    let size = integer_size(value);
    if size > max {
        return Err(VmError::OversizedValue { size, max });
    }
    Ok(())
}

/// Runs `script` to completion on a default engine with unlimited gas.
#[cfg(test)]
pub(crate) fn run_script(script: &[u8]) -> ExecutionEngine {
    let mut engine = ExecutionEngine::new(
        crate::trigger_type::TriggerType::Application,
        ExecutionEngine::UNLIMITED_GAS,
    );
    engine
        .load_script(script.to_vec(), -1)
        .expect("fresh engine accepts a script");
    engine.execute();
    engine
}

/// The result stack, bottom first.
#[cfg(test)]
pub(crate) fn results(engine: &ExecutionEngine) -> Vec<crate::stack_item::StackItem> {
    engine.result_stack().iter().cloned().collect()
}
