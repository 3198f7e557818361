//! Script builder module for the virtual machine.
//!
//! This module provides a way to programmatically construct scripts, using
//! the shortest encoding for every push.

use crate::error::{VmError, VmResult};
use crate::op_code::OpCode;
use crate::script::{Script, ScriptHash};
use crate::stack_item::integer_to_bytes;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Longest name a SYSCALL operand can carry.
const MAX_SYSCALL_NAME: usize = 251;

/// Helps construct VM scripts programmatically.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    /// The script being built
    script: Vec<u8>,
}

impl ScriptBuilder {
    /// Creates a new script builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of the script, which is also the offset of the next
    /// emitted instruction.
    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    /// Emits an opcode to the script.
    pub fn emit(&mut self, op: OpCode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Emits an opcode followed by its operand bytes.
    pub fn emit_with(&mut self, op: OpCode, operand: &[u8]) -> &mut Self {
        self.script.push(op as u8);
        self.script.extend_from_slice(operand);
        self
    }

    /// Emits raw bytes to the script.
    pub fn emit_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.script.extend_from_slice(bytes);
        self
    }

    /// Emits a push of a byte array.
    pub fn emit_push_bytes(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len <= OpCode::PUSHBYTES75 as usize {
            self.script.push(len as u8);
        } else if len <= u8::MAX as usize {
            self.emit_with(OpCode::PUSHDATA1, &[len as u8]);
        } else if len <= u16::MAX as usize {
            self.emit_with(OpCode::PUSHDATA2, &(len as u16).to_le_bytes());
        } else {
            self.emit_with(OpCode::PUSHDATA4, &(len as u32).to_le_bytes());
        }
        self.emit_raw(data)
    }

    /// Emits a push of an integer.
    pub fn emit_push_int(&mut self, value: i64) -> &mut Self {
        self.emit_push_integer(&BigInt::from(value))
    }

    /// Emits a push of an integer of any width.
    pub fn emit_push_integer(&mut self, value: &BigInt) -> &mut Self {
        match value.to_i8() {
            Some(-1) => self.emit(OpCode::PUSHM1),
            Some(0) => self.emit(OpCode::PUSH0),
            Some(n @ 1..=16) => {
                self.script.push(OpCode::PUSH1 as u8 + n as u8 - 1);
                self
            }
            _ => self.emit_push_bytes(&integer_to_bytes(value)),
        }
    }

    /// Emits a push operation for a boolean.
    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        if value {
            self.emit(OpCode::PUSH1)
        } else {
            self.emit(OpCode::PUSH0)
        }
    }

    /// Emits a push of a UTF-8 string.
    pub fn emit_push_string(&mut self, value: &str) -> &mut Self {
        self.emit_push_bytes(value.as_bytes())
    }

    /// Emits a jump or CALL with an offset relative to the jump itself.
    pub fn emit_jump(&mut self, op: OpCode, offset: i16) -> VmResult<&mut Self> {
        if !matches!(
            op,
            OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT | OpCode::CALL
        ) {
            return Err(VmError::invalid_operation(format!("{op} is not a jump")));
        }
        Ok(self.emit_with(op, &offset.to_le_bytes()))
    }

    /// Emits a CALL.
    pub fn emit_call(&mut self, offset: i16) -> &mut Self {
        self.emit_with(OpCode::CALL, &offset.to_le_bytes())
    }

    /// Emits an APPCALL, or a TAILCALL when `tail` is set. Passing
    /// [`ScriptHash::zero`] produces a dynamic call.
    pub fn emit_app_call(&mut self, hash: &ScriptHash, tail: bool) -> &mut Self {
        let op = if tail { OpCode::TAILCALL } else { OpCode::APPCALL };
        self.emit_with(op, hash.as_bytes())
    }

    /// Emits a SYSCALL to the named interop service.
    pub fn emit_syscall(&mut self, api: &str) -> VmResult<&mut Self> {
        let name = api.as_bytes();
        if name.is_empty() || name.len() > MAX_SYSCALL_NAME {
            return Err(VmError::invalid_operation(format!(
                "syscall name of {} bytes",
                name.len()
            )));
        }
        self.emit_with(OpCode::SYSCALL, &[name.len() as u8]);
        Ok(self.emit_raw(name))
    }

    /// Emits a CALL_I into the current script.
    pub fn emit_call_i(&mut self, rvcount: u8, pcount: u8, offset: i16) -> &mut Self {
        let [lo, hi] = offset.to_le_bytes();
        self.emit_with(OpCode::CALL_I, &[rvcount, pcount, lo, hi])
    }

    /// Emits a CALL_E, or CALL_ET when `tail` is set.
    pub fn emit_call_e(
        &mut self,
        rvcount: u8,
        pcount: u8,
        hash: &ScriptHash,
        tail: bool,
    ) -> &mut Self {
        let op = if tail { OpCode::CALL_ET } else { OpCode::CALL_E };
        self.emit_with(op, &[rvcount, pcount]);
        self.emit_raw(hash.as_bytes())
    }

    /// Emits a CALL_ED, or CALL_EDT when `tail` is set. The callee hash is
    /// popped at run time.
    pub fn emit_call_ed(&mut self, rvcount: u8, pcount: u8, tail: bool) -> &mut Self {
        let op = if tail { OpCode::CALL_EDT } else { OpCode::CALL_ED };
        self.emit_with(op, &[rvcount, pcount])
    }

    /// Converts the builder to a script.
    pub fn to_script(&self) -> Script {
        Script::new(self.script.clone())
    }

    /// Converts the builder to a byte array.
    pub fn to_array(&self) -> Vec<u8> {
        self.script.clone()
    }
}
