//! Error types for the virtual machine.
//!
//! Every error raised while an engine is stepping is caught by the engine and
//! turned into [`VMState::FAULT`](crate::VMState::FAULT); the error itself is
//! kept as the fault reason. Only setup problems (bad fixtures, bad
//! configuration) reach the host as `Err`.

use crate::script::ScriptHash;
use crate::stack_item::StackItemType;
use neo2_io::IoError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type VmResult<T> = Result<T, VmError>;

/// Errors raised by the virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// The script ended before the instruction's payload did.
    #[error("script truncated at offset {position}: needed {needed} more bytes")]
    TruncatedScript { position: usize, needed: usize },

    /// A length prefix read from the script is not allowed for this opcode.
    #[error("invalid payload length {length} at offset {position}")]
    InvalidPayloadLength { position: usize, length: i64 },

    /// The byte at the instruction pointer is not an opcode.
    #[error("invalid opcode {opcode:#04x} at offset {position}")]
    InvalidOpcode { opcode: u8, position: usize },

    /// Pop or peek on an empty (or too shallow) stack.
    #[error("stack underflow: needed {needed} items, {available} available")]
    StackUnderflow { needed: usize, available: usize },

    /// Total stack items across all contexts exceeded the limit.
    #[error("stack overflow: {size} items exceeds limit {limit}")]
    StackOverflow { size: usize, limit: usize },

    /// An operand had the wrong type for the operation.
    #[error("type mismatch: expected {expected}, found {actual:?}")]
    TypeMismatch {
        expected: &'static str,
        actual: StackItemType,
    },

    /// An integer or byte array exceeded its size ceiling.
    #[error("value of {size} bytes exceeds the {max} byte ceiling")]
    OversizedValue { size: usize, max: usize },

    /// Composite items have no canonical byte form.
    #[error("{0:?} items are not serializable")]
    NotSerializable(StackItemType),

    /// Loading another context would exceed the call depth limit.
    #[error("invocation stack overflow: limit {limit}")]
    InvocationStackOverflow { limit: usize },

    /// A call referenced a script hash the script table does not know.
    #[error("script not found: {0}")]
    ScriptNotFound(ScriptHash),

    /// The remaining gas cannot pay for the next charge.
    #[error("out of gas: required {required}, available {available}")]
    OutOfGas { required: u64, available: u64 },

    /// No interop handler is registered under this name.
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),

    /// An interop handler reported a logical failure.
    #[error("syscall {0} failed")]
    SyscallFailed(String),

    /// The calling script may not perform dynamic invocation.
    #[error("dynamic invoke not allowed from {0}")]
    DynamicInvokeNotAllowed(ScriptHash),

    /// The script raised THROW or a failed THROWIFNOT.
    #[error("script threw at offset {position}")]
    Throw { position: usize },

    /// Any other violated instruction precondition.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Malformed serialized input.
    #[error("decode error: {0}")]
    Io(#[from] IoError),
}

impl VmError {
    /// Creates an [`VmError::InvalidOperation`] with the given message.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Creates a [`VmError::StackUnderflow`].
    pub fn stack_underflow(needed: usize, available: usize) -> Self {
        Self::StackUnderflow { needed, available }
    }

    /// Creates a [`VmError::TypeMismatch`].
    pub fn type_mismatch(expected: &'static str, actual: StackItemType) -> Self {
        Self::TypeMismatch { expected, actual }
    }

    /// Returns true when the error is a gas exhaustion.
    pub fn is_out_of_gas(&self) -> bool {
        matches!(self, Self::OutOfGas { .. })
    }
}
