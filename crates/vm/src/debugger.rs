//! Debugger for the virtual machine.
//!
//! A [`Debugger`] owns an engine and pauses it at breakpoints. Breakpoints
//! are checked after each executed instruction, so resuming from a
//! breakpoint always makes progress.

use crate::execution_engine::ExecutionEngine;
use crate::script::ScriptHash;
use crate::vm_state::VMState;
use std::collections::{BTreeSet, HashMap};

/// Represents a breakpoint in the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Breakpoint {
    /// The script hash.
    script_hash: ScriptHash,

    /// The instruction pointer.
    instruction_pointer: usize,
}

impl Breakpoint {
    /// Creates a new breakpoint.
    pub fn new(script_hash: ScriptHash, instruction_pointer: usize) -> Self {
        Self {
            script_hash,
            instruction_pointer,
        }
    }

    /// Gets the script hash.
    pub fn script_hash(&self) -> &ScriptHash {
        &self.script_hash
    }

    /// Gets the instruction pointer.
    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }
}

/// Why a debugger run returned control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStop {
    /// The next instruction to run sits on a breakpoint.
    Breakpoint(Breakpoint),
    /// A step finished with the engine still running.
    Paused,
    /// The engine halted.
    Halt,
    /// The engine faulted.
    Fault,
}

/// Represents a debugger for the VM.
#[derive(Debug)]
pub struct Debugger {
    /// The execution engine.
    engine: ExecutionEngine,

    /// The breakpoints.
    breakpoints: HashMap<ScriptHash, BTreeSet<usize>>,
}

impl Debugger {
    /// Creates a new debugger with the specified execution engine.
    pub fn new(engine: ExecutionEngine) -> Self {
        Self {
            engine,
            breakpoints: HashMap::new(),
        }
    }

    /// Gets the execution engine.
    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Gets a mutable reference to the execution engine.
    pub fn engine_mut(&mut self) -> &mut ExecutionEngine {
        &mut self.engine
    }

    /// Gives the engine back.
    pub fn into_engine(self) -> ExecutionEngine {
        self.engine
    }

    /// Adds a breakpoint. Returns false if it was already set.
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) -> bool {
        self.breakpoints
            .entry(breakpoint.script_hash)
            .or_default()
            .insert(breakpoint.instruction_pointer)
    }

    /// Removes a breakpoint. Returns false if it was not set.
    pub fn remove_breakpoint(&mut self, breakpoint: &Breakpoint) -> bool {
        let Some(positions) = self.breakpoints.get_mut(&breakpoint.script_hash) else {
            return false;
        };
        let removed = positions.remove(&breakpoint.instruction_pointer);
        if positions.is_empty() {
            self.breakpoints.remove(&breakpoint.script_hash);
        }
        removed
    }

    /// Clears all breakpoints.
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Gets all breakpoints.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints
            .iter()
            .flat_map(|(hash, positions)| {
                positions.iter().map(|&ip| Breakpoint::new(*hash, ip))
            })
            .collect()
    }

    /// Checks if a breakpoint exists at the specified location.
    pub fn has_breakpoint(&self, script_hash: &ScriptHash, instruction_pointer: usize) -> bool {
        self.breakpoints
            .get(script_hash)
            .map_or(false, |positions| positions.contains(&instruction_pointer))
    }

    /// Runs until a breakpoint, HALT or FAULT.
    pub fn execute(&mut self) -> DebugStop {
        loop {
            if let Some(stop) = self.step_and_check() {
                return stop;
            }
        }
    }

    /// Executes a single instruction.
    pub fn step_into(&mut self) -> DebugStop {
        self.step_and_check().unwrap_or(DebugStop::Paused)
    }

    /// Executes one instruction, running any call it makes to completion.
    /// Breakpoints inside the call still stop it.
    pub fn step_over(&mut self) -> DebugStop {
        let depth = self.engine.invocation_stack().len();
        self.run_while(|engine| engine.invocation_stack().len() > depth)
    }

    /// Runs until the current context returns.
    pub fn step_out(&mut self) -> DebugStop {
        let depth = self.engine.invocation_stack().len();
        self.run_while(|engine| engine.invocation_stack().len() >= depth)
    }

    fn run_while(&mut self, keep_going: impl Fn(&ExecutionEngine) -> bool) -> DebugStop {
        loop {
            if let Some(stop) = self.step_and_check() {
                return stop;
            }
            if !keep_going(&self.engine) {
                return DebugStop::Paused;
            }
        }
    }

    /// Steps once; `None` means the engine is still running and no
    /// breakpoint was reached.
    fn step_and_check(&mut self) -> Option<DebugStop> {
        match self.engine.step_into() {
            VMState::HALT => return Some(DebugStop::Halt),
            VMState::FAULT => return Some(DebugStop::Fault),
            VMState::NONE => {}
        }
        let context = self.engine.current_context()?;
        let breakpoint = Breakpoint::new(context.script_hash(), context.instruction_pointer());
        if self.has_breakpoint(breakpoint.script_hash(), breakpoint.instruction_pointer()) {
            log::debug!(
                "breakpoint hit in {} at {}",
                breakpoint.script_hash(),
                breakpoint.instruction_pointer()
            );
            return Some(DebugStop::Breakpoint(breakpoint));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op_code::OpCode;
    use crate::script::Script;
    use crate::script_builder::ScriptBuilder;
    use crate::stack_item::StackItem;
    use crate::trigger_type::TriggerType;

    fn debugger_for(script: &Script) -> Debugger {
        let mut engine = ExecutionEngine::new(TriggerType::Application, ExecutionEngine::UNLIMITED_GAS);
        engine.load_script(script.clone(), -1).unwrap();
        Debugger::new(engine)
    }

    #[test]
    fn test_debugger_breakpoints() {
        let hash = ScriptHash::new([1; 20]);
        let mut debugger = debugger_for(&Script::from(vec![0x61]));
        let breakpoint = Breakpoint::new(hash, 10);

        assert!(debugger.add_breakpoint(breakpoint));
        assert!(!debugger.add_breakpoint(breakpoint));
        assert_eq!(debugger.breakpoints(), vec![breakpoint]);
        assert!(debugger.has_breakpoint(&hash, 10));
        assert!(!debugger.has_breakpoint(&hash, 20));

        assert!(debugger.remove_breakpoint(&breakpoint));
        assert!(!debugger.remove_breakpoint(&breakpoint));
        assert!(debugger.breakpoints().is_empty());
    }

    #[test]
    fn test_execute_stops_at_breakpoint_and_resumes() {
        // 0: PUSH1  1: PUSH2  2: ADD  3: PUSH3
        let script = Script::from(vec![0x51, 0x52, 0x93, 0x53]);
        let mut debugger = debugger_for(&script);
        let breakpoint = Breakpoint::new(script.hash(), 2);
        debugger.add_breakpoint(breakpoint);

        assert_eq!(debugger.execute(), DebugStop::Breakpoint(breakpoint));
        assert_eq!(debugger.engine().state(), VMState::NONE);
        assert_eq!(
            debugger.engine().current_context().unwrap().evaluation_stack().len(),
            2
        );

        assert_eq!(debugger.execute(), DebugStop::Halt);
        let results: Vec<StackItem> = debugger.engine().result_stack().iter().cloned().collect();
        assert_eq!(results, vec![StackItem::from_int(3), StackItem::from_int(3)]);
    }

    #[test]
    fn test_step_over_runs_calls_to_completion() {
        // 0: CALL +4 -> 4  3: RET  4: PUSH1  5: RET
        let mut builder = ScriptBuilder::new();
        builder.emit_call(4).emit(OpCode::RET).emit(OpCode::PUSH1).emit(OpCode::RET);
        let script = builder.to_script();
        let mut debugger = debugger_for(&script);

        assert_eq!(debugger.step_over(), DebugStop::Paused);
        let engine = debugger.engine();
        assert_eq!(engine.invocation_stack().len(), 1);
        assert_eq!(engine.current_context().unwrap().instruction_pointer(), 3);
        assert_eq!(engine.current_context().unwrap().evaluation_stack().len(), 1);
    }

    #[test]
    fn test_step_into_and_out() {
        let mut builder = ScriptBuilder::new();
        builder.emit_call(4).emit(OpCode::RET).emit(OpCode::PUSH1).emit(OpCode::RET);
        let script = builder.to_script();
        let mut debugger = debugger_for(&script);

        assert_eq!(debugger.step_into(), DebugStop::Paused);
        assert_eq!(debugger.engine().invocation_stack().len(), 2);

        assert_eq!(debugger.step_out(), DebugStop::Paused);
        assert_eq!(debugger.engine().invocation_stack().len(), 1);

        assert_eq!(debugger.step_out(), DebugStop::Halt);
    }

    #[test]
    fn test_fault_is_reported() {
        let mut debugger = debugger_for(&Script::from(vec![0x75]));
        assert_eq!(debugger.execute(), DebugStop::Fault);
        assert_eq!(debugger.step_into(), DebugStop::Fault);
    }
}
