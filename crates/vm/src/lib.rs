//! # Legacy Neo Virtual Machine
//!
//! A deterministic execution engine for legacy Neo smart-contract bytecode.
//!
//! The engine interprets a flat byte script one instruction at a time,
//! charging gas before each instruction takes effect. Every run ends in one
//! of two terminal states: `HALT` with the results on the result stack, or
//! `FAULT` with the reason available from
//! [`ExecutionEngine::fault_reason`]. Malformed or hostile scripts never
//! panic the host.
//!
//! ## Features
//!
//! - **Stack items**: Boolean, Integer, ByteArray, Array, Struct, Map and
//!   InteropInterface, with reference semantics for arrays and maps and
//!   value semantics for structs
//! - **Complete opcode set**: the legacy instruction table, including the
//!   `CALL_I`/`CALL_E*` call forms with explicit return counts
//! - **Gas**: a versioned, configurable price table
//! - **Interop services**: a named syscall registry with the runtime,
//!   engine and enumerator services built in
//! - **Debugging**: breakpoints and step execution
//! - **Conformance vectors**: a JSON test-vector runner
//!
//! ## Architecture
//!
//! - **ExecutionEngine**: invocation stack, result stack, gas and state
//! - **ExecutionContext**: one frame with its evaluation and alt stacks
//! - **JumpTable**: opcode handlers, looked up per instruction
//! - **InteropService**: syscall dispatch
//! - **ScriptTable**: script lookup for cross-contract calls
//!
//! ## Example
//!
//! ```rust
//! use neo2_vm::{ExecutionEngine, ScriptBuilder, OpCode, StackItem, TriggerType, VMState};
//!
//! let mut builder = ScriptBuilder::new();
//! builder.emit_push_int(1).emit_push_int(2).emit(OpCode::ADD);
//!
//! let mut engine = ExecutionEngine::new(TriggerType::Application, 10);
//! engine.load_script(builder.to_script(), -1).unwrap();
//!
//! assert_eq!(engine.execute(), VMState::HALT);
//! assert_eq!(engine.result_stack().peek(0).unwrap(), &StackItem::from_int(3));
//! assert_eq!(engine.gas_consumed(), 1);
//! ```
//!
//! ## Interop Services
//!
//! ```rust
//! use neo2_vm::{ExecutionEngine, InteropService, StackItem, TriggerType, VMState};
//! use std::sync::Arc;
//!
//! let mut service = InteropService::with_standard_services();
//! service.register_fn("Test.Answer", 1, |engine| {
//!     engine.push(StackItem::from_int(42))?;
//!     Ok(true)
//! });
//!
//! let mut engine = ExecutionEngine::new(TriggerType::Application, 100)
//!     .with_interop_service(Arc::new(service));
//! let mut script = vec![0x68, 11];
//! script.extend_from_slice(b"Test.Answer");
//! engine.load_script(script, -1).unwrap();
//!
//! assert_eq!(engine.execute(), VMState::HALT);
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

/// Engine configuration loading
pub mod config;
/// Hash functions and the signature verification hook
pub mod crypto;
/// Debugging support with breakpoints and step execution
pub mod debugger;
/// Lazy sequences over composite stack items
pub mod enumerator;
/// VM error types and result handling
pub mod error;
/// Type-safe evaluation stack implementation
pub mod evaluation_stack;
/// Script execution context
pub mod execution_context;
/// Low-level VM execution engine
pub mod execution_engine;
/// C ABI over the execution engine
pub mod ffi;
/// VM instruction representation
pub mod instruction;
/// Interop service registry and standard syscalls
pub mod interop_service;
/// OpCode implementation and instruction dispatch
pub mod jump_table;
/// VM opcode definitions and utilities
pub mod op_code;
/// Per-opcode gas prices
pub mod price_table;
/// VM script representation and script hashes
pub mod script;
/// Utility for constructing VM bytecode
pub mod script_builder;
/// Script lookup for cross-contract calls
pub mod script_table;
/// Polymorphic data types for VM values
pub mod stack_item;
/// JSON conformance test vectors
#[cfg(feature = "serde-types")]
pub mod test_vectors;
/// Trigger types a script can run under
pub mod trigger_type;
/// Engine states
pub mod vm_state;

pub use config::{ConfigError, EngineConfig};
pub use crypto::Crypto;
pub use debugger::{Breakpoint, DebugStop, Debugger};
pub use enumerator::{SharedEnumerator, StackItemEnumerator};
pub use error::{VmError, VmResult};
pub use evaluation_stack::EvaluationStack;
pub use execution_context::ExecutionContext;
pub use execution_engine::{ExecutionEngine, ExecutionEngineLimits, LogEntry, NotifyEvent};
pub use instruction::Instruction;
pub use interop_service::{InteropDescriptor, InteropHandler, InteropResult, InteropService};
pub use jump_table::{InstructionHandler, JumpTable};
pub use op_code::OpCode;
pub use price_table::PriceTable;
pub use script::{Script, ScriptHash};
pub use script_builder::ScriptBuilder;
pub use script_table::{ContractProperties, InMemoryScriptTable, ScriptTable};
pub use stack_item::{
    Array, InteropInterface, InteropTypeRegistry, Map, StackItem, StackItemType, Struct,
};
pub use trigger_type::TriggerType;
pub use vm_state::VMState;

/// Re-export of the binary codec crate.
pub use neo2_io as io;
