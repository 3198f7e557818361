//! Push operations for the virtual machine.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::JumpTable;
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the push operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::PUSH0, push_0);
    for opcode in OpCode::iter() {
        if (OpCode::PUSHBYTES1..=OpCode::PUSHBYTES75).contains(&opcode) {
            jump_table.register(opcode, push_bytes);
        }
        if (OpCode::PUSH1..=OpCode::PUSH16).contains(&opcode) {
            jump_table.register(opcode, push_n);
        }
    }
    jump_table.register(OpCode::PUSHDATA1, push_data);
    jump_table.register(OpCode::PUSHDATA2, push_data);
    jump_table.register(OpCode::PUSHDATA4, push_data);
    jump_table.register(OpCode::PUSHM1, push_m1);
}

/// Implements the PUSH0 operation: an empty byte array.
fn push_0(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    engine.push(StackItem::ByteArray(Vec::new()))
}

/// Implements PUSHBYTES1 through PUSHBYTES75.
fn push_bytes(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    engine.push(StackItem::ByteArray(instruction.operand().to_vec()))
}

/// Implements PUSHDATA1, PUSHDATA2 and PUSHDATA4.
fn push_data(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let data = instruction.operand();
    let max = engine.limits().max_item_size;
    if data.len() > max {
        return Err(VmError::OversizedValue {
            size: data.len(),
            max,
        });
    }
    engine.push(StackItem::ByteArray(data.to_vec()))
}

/// Implements the PUSHM1 operation.
fn push_m1(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    engine.push(StackItem::from_int(-1))
}

/// Implements PUSH1 through PUSH16.
fn push_n(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let value = instruction.opcode() as i64 - OpCode::PUSH1 as i64 + 1;
    engine.push(StackItem::from_int(value))
}

#[cfg(test)]
mod tests {
    use crate::jump_table::{results, run_script};
    use crate::stack_item::StackItem;
    use crate::vm_state::VMState;

    #[test]
    fn test_constant_pushes() {
        let engine = run_script(&[0x00, 0x4F, 0x51, 0x60]);
        assert_eq!(engine.state(), VMState::HALT);
        assert_eq!(
            results(&engine),
            vec![
                StackItem::ByteArray(vec![]),
                StackItem::from_int(-1),
                StackItem::from_int(1),
                StackItem::from_int(16),
            ]
        );
    }

    #[test]
    fn test_push_bytes_and_data() {
        let engine = run_script(&[0x02, 0xAA, 0xBB, 0x4C, 0x01, 0xCC, 0x4D, 0x01, 0x00, 0xDD]);
        assert_eq!(engine.state(), VMState::HALT);
        assert_eq!(
            results(&engine),
            vec![
                StackItem::ByteArray(vec![0xAA, 0xBB]),
                StackItem::ByteArray(vec![0xCC]),
                StackItem::ByteArray(vec![0xDD]),
            ]
        );
    }

    #[test]
    fn test_truncated_push_faults() {
        let engine = run_script(&[0x4C, 0x05, 0x01]);
        assert_eq!(engine.state(), VMState::FAULT);
        assert!(matches!(
            engine.fault_reason(),
            Some(crate::error::VmError::TruncatedScript { position: 0, .. })
        ));
    }
}
