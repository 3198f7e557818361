//! Execution context module for the virtual machine.
//!
//! A context is one frame of the invocation stack: a script, the position
//! of the next instruction, and the frame's evaluation and alt stacks.

use crate::error::VmResult;
use crate::evaluation_stack::EvaluationStack;
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::script::{Script, ScriptHash};
use crate::stack_item::StackItem;

/// Represents an execution context in the virtual machine.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The script, shared with the engine and any script table
    script: Script,

    /// The current instruction pointer
    instruction_pointer: usize,

    /// The number of values to return when the context is unloaded (-1 for all)
    rvcount: i32,

    evaluation_stack: EvaluationStack,

    alt_stack: EvaluationStack,
}

impl ExecutionContext {
    /// Creates a new execution context positioned at the start of `script`.
    pub fn new(script: Script, rvcount: i32) -> Self {
        Self {
            script,
            instruction_pointer: 0,
            rvcount,
            evaluation_stack: EvaluationStack::new(),
            alt_stack: EvaluationStack::new(),
        }
    }

    /// Creates the context for a call into this context's own script.
    ///
    /// The new context starts at `instruction_pointer` with a copy of this
    /// context's evaluation stack. Items are shared, not deep copied, so
    /// arrays and maps stay aliased across the two frames.
    pub fn clone_for_call(&self, instruction_pointer: usize, rvcount: i32) -> Self {
        let mut context = Self::new(self.script.clone(), rvcount);
        context.instruction_pointer = instruction_pointer;
        self.evaluation_stack.copy_to(&mut context.evaluation_stack);
        context
    }

    /// Returns the script for this context.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Returns the script hash for this context.
    pub fn script_hash(&self) -> ScriptHash {
        self.script.hash()
    }

    /// Returns the current instruction pointer.
    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    /// Sets the instruction pointer.
    pub fn set_instruction_pointer(&mut self, position: usize) {
        self.instruction_pointer = position;
    }

    /// Advances the instruction pointer past `instruction`.
    pub fn move_next(&mut self, instruction: &Instruction) {
        self.instruction_pointer += instruction.size();
    }

    /// Decodes the instruction at the instruction pointer; past the end of
    /// the script this is an implicit RET.
    pub fn current_instruction(&self) -> VmResult<Instruction> {
        self.script.get_instruction(self.instruction_pointer)
    }

    /// Opcode at the instruction pointer, RET past the end of the script.
    /// Undecodable bytes report `None`.
    pub fn next_opcode(&self) -> Option<OpCode> {
        match self.script.as_bytes().get(self.instruction_pointer) {
            Some(byte) => OpCode::from_byte(*byte),
            None => Some(OpCode::RET),
        }
    }

    /// Returns the number of values to return when the context is unloaded (-1 for all).
    pub fn rvcount(&self) -> i32 {
        self.rvcount
    }

    /// Returns the evaluation stack for this context.
    pub fn evaluation_stack(&self) -> &EvaluationStack {
        &self.evaluation_stack
    }

    pub fn evaluation_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.evaluation_stack
    }

    /// Returns the alt stack for this context.
    pub fn alt_stack(&self) -> &EvaluationStack {
        &self.alt_stack
    }

    pub fn alt_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.alt_stack
    }

    /// Items held by this frame's two stacks.
    pub fn stack_item_count(&self) -> usize {
        self.evaluation_stack.len() + self.alt_stack.len()
    }

    /// Push an item onto the evaluation stack
    pub fn push(&mut self, item: StackItem) {
        self.evaluation_stack.push(item);
    }

    /// Pop an item from the evaluation stack
    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.evaluation_stack.pop()
    }

    /// Peek at an item on the evaluation stack without removing it
    pub fn peek(&self, index: usize) -> VmResult<&StackItem> {
        self.evaluation_stack.peek(index)
    }
}
