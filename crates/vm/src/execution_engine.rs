//! Execution engine for the virtual machine.
//!
//! The engine owns the invocation stack and drives the fetch, charge,
//! execute loop one instruction at a time. Errors raised by an instruction
//! never escape [`ExecutionEngine::step_into`] and friends: they move the
//! engine to [`VMState::FAULT`] and are kept as [`ExecutionEngine::fault_reason`].

use crate::config::EngineConfig;
use crate::crypto::Crypto;
use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::execution_context::ExecutionContext;
use crate::instruction::Instruction;
use crate::interop_service::InteropService;
use crate::jump_table::JumpTable;
use crate::op_code::OpCode;
use crate::price_table::PriceTable;
use crate::script::{Script, ScriptHash};
use crate::script_table::ScriptTable;
use crate::stack_item::{StackItem, MAX_INTEGER_SIZE, MAX_ITEM_SIZE};
use crate::trigger_type::TriggerType;
use crate::vm_state::VMState;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

static STANDARD_SERVICES: Lazy<Arc<InteropService>> =
    Lazy::new(|| Arc::new(InteropService::with_standard_services()));

/// Restrictions on the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ExecutionEngineLimits {
    /// The maximum number of items on all stacks together.
    pub max_stack_size: usize,

    /// The maximum size of a byte array, in bytes.
    pub max_item_size: usize,

    /// The maximum number of frames allowed on the invocation stack.
    pub max_invocation_stack_size: usize,

    /// The maximum number of elements in an array, struct or map.
    pub max_array_size: usize,

    /// The maximum size of an integer result, in bytes.
    pub max_integer_size: usize,

    /// The maximum shift distance of `SHL` and `SHR`.
    pub max_shift: i64,
}

impl ExecutionEngineLimits {
    /// The default execution engine limits.
    pub const DEFAULT: Self = Self {
        max_stack_size: 2 * 1024,
        max_item_size: MAX_ITEM_SIZE,
        max_invocation_stack_size: 1024,
        max_array_size: 1024,
        max_integer_size: MAX_INTEGER_SIZE,
        max_shift: 256,
    };
}

impl Default for ExecutionEngineLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A message emitted by `Runtime.Log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub script_hash: ScriptHash,
    pub message: String,
}

/// A state emitted by `Runtime.Notify`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyEvent {
    pub script_hash: ScriptHash,
    pub state: StackItem,
}

/// The execution engine for the virtual machine.
pub struct ExecutionEngine {
    /// The current state of the VM
    state: VMState,

    /// Why the engine faulted, once it has
    fault_reason: Option<VmError>,

    /// The jump table used to execute instructions
    jump_table: JumpTable,

    /// Restrictions on the VM
    limits: ExecutionEngineLimits,

    prices: PriceTable,

    trigger: TriggerType,

    gas_limit: u64,

    gas_consumed: u64,

    /// The invocation stack of the VM, entry context first
    invocation_stack: Vec<ExecutionContext>,

    /// The stack to store the return values
    result_stack: EvaluationStack,

    script_table: Option<Arc<dyn ScriptTable>>,

    interop_service: Arc<InteropService>,

    crypto: Option<Arc<dyn Crypto>>,

    /// The message signature checks verify against
    script_container: Vec<u8>,

    logs: Vec<LogEntry>,

    notifications: Vec<NotifyEvent>,
}

impl ExecutionEngine {
    /// Gas limit for hosts that do not meter execution.
    pub const UNLIMITED_GAS: u64 = u64::MAX;

    /// Creates an engine with default limits and prices, the standard
    /// interop services and no script table.
    pub fn new(trigger: TriggerType, gas_limit: u64) -> Self {
        Self {
            state: VMState::NONE,
            fault_reason: None,
            jump_table: JumpTable::default(),
            limits: ExecutionEngineLimits::default(),
            prices: PriceTable::default(),
            trigger,
            gas_limit,
            gas_consumed: 0,
            invocation_stack: Vec::new(),
            result_stack: EvaluationStack::new(),
            script_table: None,
            interop_service: STANDARD_SERVICES.clone(),
            crypto: None,
            script_container: Vec::new(),
            logs: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.limits = config.limits;
        self.prices = config.prices;
        self
    }

    pub fn with_limits(mut self, limits: ExecutionEngineLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_script_table(mut self, script_table: Arc<dyn ScriptTable>) -> Self {
        self.script_table = Some(script_table);
        self
    }

    pub fn with_interop_service(mut self, interop_service: Arc<InteropService>) -> Self {
        self.interop_service = interop_service;
        self
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn Crypto>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    /// Sets the message `CHECKSIG` and `CHECKMULTISIG` verify signatures over.
    pub fn with_script_container(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.script_container = message.into();
        self
    }

    pub fn with_jump_table(mut self, jump_table: JumpTable) -> Self {
        self.jump_table = jump_table;
        self
    }

    /// Returns the current state of the VM.
    pub fn state(&self) -> VMState {
        self.state
    }

    /// The error that moved the engine to `FAULT`.
    pub fn fault_reason(&self) -> Option<&VmError> {
        self.fault_reason.as_ref()
    }

    pub fn trigger(&self) -> TriggerType {
        self.trigger
    }

    pub fn limits(&self) -> &ExecutionEngineLimits {
        &self.limits
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    pub fn gas_consumed(&self) -> u64 {
        self.gas_consumed
    }

    /// Gas still available to the script.
    pub fn gas_left(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_consumed)
    }

    /// Charges `amount` gas, failing without charging anything when the
    /// remaining budget cannot pay for it.
    pub fn consume_gas(&mut self, amount: u64) -> VmResult<()> {
        let available = self.gas_left();
        if amount > available {
            return Err(VmError::OutOfGas {
                required: amount,
                available,
            });
        }
        self.gas_consumed += amount;
        Ok(())
    }

    /// The invocation stack, entry context first.
    pub fn invocation_stack(&self) -> &[ExecutionContext] {
        &self.invocation_stack
    }

    /// Returns the current context, if any.
    pub fn current_context(&self) -> Option<&ExecutionContext> {
        self.invocation_stack.last()
    }

    pub fn current_context_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.invocation_stack.last_mut()
    }

    /// The context that called the current one.
    pub fn calling_context(&self) -> Option<&ExecutionContext> {
        let depth = self.invocation_stack.len();
        if depth < 2 {
            return None;
        }
        self.invocation_stack.get(depth - 2)
    }

    pub fn calling_context_mut(&mut self) -> Option<&mut ExecutionContext> {
        let depth = self.invocation_stack.len();
        if depth < 2 {
            return None;
        }
        self.invocation_stack.get_mut(depth - 2)
    }

    /// Returns the entry context, if any.
    pub fn entry_context(&self) -> Option<&ExecutionContext> {
        self.invocation_stack.first()
    }

    /// Returns the result stack.
    pub fn result_stack(&self) -> &EvaluationStack {
        &self.result_stack
    }

    pub fn script_table(&self) -> Option<&Arc<dyn ScriptTable>> {
        self.script_table.as_ref()
    }

    pub fn interop_service(&self) -> &Arc<InteropService> {
        &self.interop_service
    }

    pub fn crypto(&self) -> Option<&Arc<dyn Crypto>> {
        self.crypto.as_ref()
    }

    pub fn script_container(&self) -> &[u8] {
        &self.script_container
    }

    pub fn jump_table(&self) -> &JumpTable {
        &self.jump_table
    }

    pub fn jump_table_mut(&mut self) -> &mut JumpTable {
        &mut self.jump_table
    }

    /// Messages emitted by `Runtime.Log`, in order.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// States emitted by `Runtime.Notify`, in order.
    pub fn notifications(&self) -> &[NotifyEvent] {
        &self.notifications
    }

    /// Hash of the script being executed.
    pub fn current_script_hash(&self) -> VmResult<ScriptHash> {
        self.current_context()
            .map(|context| context.script_hash())
            .ok_or_else(no_context)
    }

    pub fn add_log(&mut self, message: String) -> VmResult<()> {
        let script_hash = self.current_script_hash()?;
        log::info!("[{script_hash}] {message}");
        self.logs.push(LogEntry {
            script_hash,
            message,
        });
        Ok(())
    }

    pub fn add_notification(&mut self, state: StackItem) -> VmResult<()> {
        let script_hash = self.current_script_hash()?;
        log::debug!("[{script_hash}] notify {:?}", state.item_type());
        self.notifications.push(NotifyEvent { script_hash, state });
        Ok(())
    }

    /// Loads a context into the invocation stack.
    pub fn load_context(&mut self, context: ExecutionContext) -> VmResult<()> {
        self.check_invocation_depth()?;
        log::debug!(
            "load context {} at depth {}",
            context.script_hash(),
            self.invocation_stack.len() + 1
        );
        self.invocation_stack.push(context);
        Ok(())
    }

    /// Fails when one more context would exceed the invocation stack limit.
    pub fn check_invocation_depth(&self) -> VmResult<()> {
        if self.invocation_stack.len() >= self.limits.max_invocation_stack_size {
            return Err(VmError::InvocationStackOverflow {
                limit: self.limits.max_invocation_stack_size,
            });
        }
        Ok(())
    }

    /// Loads a script into a new context returning `rvcount` values
    /// (-1 for all).
    pub fn load_script(&mut self, script: impl Into<Script>, rvcount: i32) -> VmResult<()> {
        self.load_context(ExecutionContext::new(script.into(), rvcount))
    }

    /// Resolves `hash` through the script table and loads the script.
    pub fn load_script_by_hash(&mut self, hash: &ScriptHash, rvcount: i32) -> VmResult<()> {
        let script = self
            .script_table
            .as_ref()
            .and_then(|table| table.resolve(hash))
            .ok_or(VmError::ScriptNotFound(*hash))?;
        self.load_script(script, rvcount)
    }

    /// Removes the context at `index` (0 is the entry context).
    pub fn remove_context(&mut self, index: usize) -> VmResult<ExecutionContext> {
        if index >= self.invocation_stack.len() {
            return Err(VmError::invalid_operation(format!(
                "context index {index} out of range"
            )));
        }
        let context = self.invocation_stack.remove(index);
        log::debug!("remove context {}", context.script_hash());
        Ok(context)
    }

    /// Pops the current context and hands its return values to the caller,
    /// or to the result stack when it was the last context.
    pub fn unload_context(&mut self) -> VmResult<()> {
        let context = self.current_context().ok_or_else(no_context)?;
        let rvcount = context.rvcount();
        let available = context.evaluation_stack().len();
        let count = match rvcount {
            -1 => available,
            n if n < -1 => {
                return Err(VmError::invalid_operation(format!("invalid rvcount {n}")));
            }
            n => n as usize,
        };
        if available < count {
            return Err(VmError::stack_underflow(count, available));
        }

        let mut context = self.invocation_stack.pop().ok_or_else(no_context)?;
        let target = match self.invocation_stack.last_mut() {
            Some(caller) => caller.evaluation_stack_mut(),
            None => &mut self.result_stack,
        };
        context.evaluation_stack_mut().move_to(target, count)?;

        if rvcount == -1 {
            if let Some(caller) = self.invocation_stack.last_mut() {
                let alt_count = context.alt_stack().len();
                context
                    .alt_stack_mut()
                    .move_to(caller.alt_stack_mut(), alt_count)?;
            }
        }

        log::debug!(
            "unload context {} returning {count} items",
            context.script_hash()
        );
        if self.invocation_stack.is_empty() {
            self.state = VMState::HALT;
        }
        Ok(())
    }

    /// Returns the item `index` positions below the top of the current
    /// evaluation stack.
    pub fn peek(&self, index: usize) -> VmResult<&StackItem> {
        self.current_context()
            .ok_or_else(no_context)?
            .evaluation_stack()
            .peek(index)
    }

    /// Pops the top item of the current evaluation stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.current_context_mut().ok_or_else(no_context)?.pop()
    }

    /// Pushes onto the current evaluation stack.
    pub fn push(&mut self, item: StackItem) -> VmResult<()> {
        self.current_context_mut().ok_or_else(no_context)?.push(item);
        Ok(())
    }

    /// Executes until the engine halts or faults.
    pub fn execute(&mut self) -> VMState {
        while !self.state.is_terminal() {
            self.step_into();
        }
        self.state
    }

    /// Executes one instruction.
    pub fn step_into(&mut self) -> VMState {
        if self.state.is_terminal() {
            return self.state;
        }
        if let Err(error) = self.execute_next() {
            self.on_fault(error);
        }
        self.state
    }

    /// Executes one instruction, running any context it loads to completion.
    pub fn step_over(&mut self) -> VMState {
        if self.state.is_terminal() {
            return self.state;
        }
        let depth = self.invocation_stack.len();
        loop {
            self.step_into();
            if self.state.is_terminal() || self.invocation_stack.len() <= depth {
                break;
            }
        }
        self.state
    }

    /// Executes until the current context returns.
    pub fn step_out(&mut self) -> VMState {
        if self.state.is_terminal() {
            return self.state;
        }
        let depth = self.invocation_stack.len();
        loop {
            self.step_into();
            if self.state.is_terminal() || self.invocation_stack.len() < depth {
                break;
            }
        }
        self.state
    }

    /// Drops every context, the result stack and the emitted logs and
    /// notifications, and returns the engine to `NONE`. Consumed gas is kept.
    pub fn clean(&mut self) {
        self.invocation_stack.clear();
        self.result_stack.clear();
        self.logs.clear();
        self.notifications.clear();
        self.fault_reason = None;
        self.state = VMState::NONE;
    }

    fn execute_next(&mut self) -> VmResult<()> {
        let Some(context) = self.invocation_stack.last() else {
            self.state = VMState::HALT;
            return Ok(());
        };
        let instruction = context.current_instruction()?;

        // Running off the end of a script returns for free.
        if instruction.pointer() < context.script().len() {
            let price = self.price_of(&instruction);
            self.consume_gas(price)?;
        }

        log::trace!(
            "{:>4} {:<14} depth={} gas={}",
            instruction.pointer(),
            instruction.opcode(),
            self.invocation_stack.len(),
            self.gas_consumed
        );

        if let Some(context) = self.invocation_stack.last_mut() {
            context.move_next(&instruction);
        }

        let handler = self.jump_table.handler_for(instruction.opcode())?;
        handler(self, &instruction)?;

        self.check_stack_size()
    }

    fn price_of(&self, instruction: &Instruction) -> u64 {
        let opcode = instruction.opcode();
        let base = self.prices.price_of(opcode);
        if opcode != OpCode::CHECKMULTISIG {
            return base;
        }

        let keys = self.peek(0).ok().and_then(|item| match item.as_array() {
            Some(array) => Some(array.len() as u64),
            None => item.as_int_within(self.limits.max_integer_size).ok().and_then(|n| n.to_u64()),
        });
        match keys {
            Some(n) if n >= 1 => base.saturating_add(
                self.prices.multisig_price_per_key.saturating_mul(n),
            ),
            _ => base.max(self.prices.default_price),
        }
    }

    fn check_stack_size(&self) -> VmResult<()> {
        let size = self.result_stack.len()
            + self
                .invocation_stack
                .iter()
                .map(ExecutionContext::stack_item_count)
                .sum::<usize>();
        if size > self.limits.max_stack_size {
            return Err(VmError::StackOverflow {
                size,
                limit: self.limits.max_stack_size,
            });
        }
        Ok(())
    }

    fn on_fault(&mut self, error: VmError) {
        match self.current_context() {
            Some(context) => log::warn!(
                "engine faulted in {} at {}: {error}",
                context.script_hash(),
                context.instruction_pointer()
            ),
            None => log::warn!("engine faulted: {error}"),
        }
        self.state = VMState::FAULT;
        self.fault_reason = Some(error);
    }
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("state", &self.state)
            .field("fault_reason", &self.fault_reason)
            .field("trigger", &self.trigger)
            .field("gas_consumed", &self.gas_consumed)
            .field("gas_limit", &self.gas_limit)
            .field("invocation_depth", &self.invocation_stack.len())
            .field("result_stack", &self.result_stack.len())
            .finish_non_exhaustive()
    }
}

fn no_context() -> VmError {
    VmError::invalid_operation("no current context")
}
