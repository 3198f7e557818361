//! Stack operations for the virtual machine.
//!
//! Opcodes that copy an item push its [`StackItem::duplicate`], so a copied
//! Struct never shares fields with the original.

use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{pop_index, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the stack operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::DUPFROMALTSTACK, dup_from_alt_stack);
    jump_table.register(OpCode::TOALTSTACK, to_alt_stack);
    jump_table.register(OpCode::FROMALTSTACK, from_alt_stack);
    jump_table.register(OpCode::XDROP, xdrop);
    jump_table.register(OpCode::XSWAP, xswap);
    jump_table.register(OpCode::XTUCK, xtuck);
    jump_table.register(OpCode::DEPTH, depth);
    jump_table.register(OpCode::DROP, drop);
    jump_table.register(OpCode::DUP, dup);
    jump_table.register(OpCode::NIP, nip);
    jump_table.register(OpCode::OVER, over);
    jump_table.register(OpCode::PICK, pick);
    jump_table.register(OpCode::ROLL, roll);
    jump_table.register(OpCode::ROT, rot);
    jump_table.register(OpCode::SWAP, swap);
    jump_table.register(OpCode::TUCK, tuck);
}

fn stack(engine: &mut ExecutionEngine) -> VmResult<&mut EvaluationStack> {
    engine
        .current_context_mut()
        .map(|context| context.evaluation_stack_mut())
        .ok_or_else(|| VmError::invalid_operation("no current context"))
}

fn dup_from_alt_stack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = engine
        .current_context_mut()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?;
    let item = context.alt_stack().peek(0)?.duplicate();
    context.push(item);
    Ok(())
}

fn to_alt_stack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = engine
        .current_context_mut()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?;
    let item = context.pop()?;
    context.alt_stack_mut().push(item);
    Ok(())
}

fn from_alt_stack(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let context = engine
        .current_context_mut()
        .ok_or_else(|| VmError::invalid_operation("no current context"))?;
    let item = context.alt_stack_mut().pop()?;
    context.push(item);
    Ok(())
}

/// Removes the item `n` positions below the top, `n` popped first.
fn xdrop(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let n = pop_index(engine)?;
    stack(engine)?.remove(n)?;
    Ok(())
}

/// Swaps the top item with the item `n` positions below it.
fn xswap(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let n = pop_index(engine)?;
    if n == 0 {
        return Ok(());
    }
    stack(engine)?.swap(0, n)
}

/// Copies the top item to `n` positions below the top.
fn xtuck(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let n = pop_index(engine)?;
    if n == 0 {
        return Err(VmError::invalid_operation("XTUCK position must be positive"));
    }
    let stack = stack(engine)?;
    let item = stack.peek(0)?.duplicate();
    stack.insert(n, item)
}

fn depth(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let depth = stack(engine)?.len();
    engine.push(StackItem::from_int(depth as i64))
}

fn drop(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    engine.pop()?;
    Ok(())
}

fn dup(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.peek(0)?.duplicate();
    engine.push(item)
}

fn nip(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    stack(engine)?.remove(1)?;
    Ok(())
}

fn over(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let item = engine.peek(1)?.duplicate();
    engine.push(item)
}

fn pick(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let n = pop_index(engine)?;
    let item = engine.peek(n)?.duplicate();
    engine.push(item)
}

fn roll(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let n = pop_index(engine)?;
    if n == 0 {
        return Ok(());
    }
    let stack = stack(engine)?;
    let item = stack.remove(n)?;
    stack.push(item);
    Ok(())
}

fn rot(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let stack = stack(engine)?;
    let item = stack.remove(2)?;
    stack.push(item);
    Ok(())
}

fn swap(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    stack(engine)?.swap(0, 1)
}

fn tuck(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let stack = stack(engine)?;
    if stack.len() < 2 {
        return Err(VmError::stack_underflow(2, stack.len()));
    }
    let item = stack.peek(0)?.duplicate();
    stack.insert(2, item)
}

#[cfg(test)]
mod tests {
    use crate::error::VmError;
    use crate::jump_table::{results, run_script};
    use crate::stack_item::StackItem;
    use crate::vm_state::VMState;

    fn ints(values: &[i64]) -> Vec<StackItem> {
        values.iter().map(|v| StackItem::from_int(*v)).collect()
    }

    #[test]
    fn test_drop_on_empty_stack_faults() {
        let engine = run_script(&[0x75]);
        assert_eq!(engine.state(), VMState::FAULT);
        assert_eq!(engine.fault_reason(), Some(&VmError::stack_underflow(1, 0)));
    }

    #[test]
    fn test_basic_shuffles() {
        // PUSH1 PUSH2 PUSH3 ROT -> 2 3 1
        assert_eq!(results(&run_script(&[0x51, 0x52, 0x53, 0x7B])), ints(&[2, 3, 1]));
        // PUSH1 PUSH2 SWAP -> 2 1
        assert_eq!(results(&run_script(&[0x51, 0x52, 0x7C])), ints(&[2, 1]));
        // PUSH1 PUSH2 TUCK -> 2 1 2
        assert_eq!(results(&run_script(&[0x51, 0x52, 0x7D])), ints(&[2, 1, 2]));
        // PUSH1 PUSH2 OVER -> 1 2 1
        assert_eq!(results(&run_script(&[0x51, 0x52, 0x78])), ints(&[1, 2, 1]));
        // PUSH1 PUSH2 NIP -> 2
        assert_eq!(results(&run_script(&[0x51, 0x52, 0x77])), ints(&[2]));
        // PUSH1 DUP DEPTH -> 1 1 2
        assert_eq!(results(&run_script(&[0x51, 0x76, 0x74])), ints(&[1, 1, 2]));
    }

    #[test]
    fn test_indexed_shuffles() {
        // PUSH1 PUSH2 PUSH3 PUSH2 PICK -> 1 2 3 1
        assert_eq!(
            results(&run_script(&[0x51, 0x52, 0x53, 0x52, 0x79])),
            ints(&[1, 2, 3, 1])
        );
        // PUSH1 PUSH2 PUSH3 PUSH2 ROLL -> 2 3 1
        assert_eq!(
            results(&run_script(&[0x51, 0x52, 0x53, 0x52, 0x7A])),
            ints(&[2, 3, 1])
        );
        // PUSH1 PUSH2 PUSH3 PUSH2 XSWAP -> 3 2 1
        assert_eq!(
            results(&run_script(&[0x51, 0x52, 0x53, 0x52, 0x72])),
            ints(&[3, 2, 1])
        );
        // PUSH1 PUSH2 PUSH3 PUSH2 XTUCK -> 1 3 2 3
        assert_eq!(
            results(&run_script(&[0x51, 0x52, 0x53, 0x52, 0x73])),
            ints(&[1, 3, 2, 3])
        );
        // PUSH1 PUSH2 PUSH3 PUSH1 XDROP -> 1 3
        assert_eq!(
            results(&run_script(&[0x51, 0x52, 0x53, 0x51, 0x6D])),
            ints(&[1, 3])
        );
    }

    #[test]
    fn test_dup_copies_structs() {
        // PUSH1 NEWSTRUCT DUP PUSH0 PUSH5 SETITEM
        let engine = run_script(&[0x51, 0xC6, 0x76, 0x00, 0x55, 0xC4]);
        assert_eq!(engine.state(), VMState::HALT);
        let original = engine.result_stack().peek(0).unwrap().as_array().unwrap().clone();
        assert_eq!(original.get(0), Some(StackItem::from_bool(false)));
    }

    #[test]
    fn test_negative_index_faults() {
        let engine = run_script(&[0x51, 0x4F, 0x79]);
        assert_eq!(engine.state(), VMState::FAULT);
    }

    #[test]
    fn test_alt_stack_round_trip() {
        // PUSH1 TOALTSTACK DUPFROMALTSTACK FROMALTSTACK -> 1 1
        let engine = run_script(&[0x51, 0x6B, 0x6A, 0x6C]);
        assert_eq!(engine.state(), VMState::HALT);
        assert_eq!(results(&engine), ints(&[1, 1]));

        let engine = run_script(&[0x6C]);
        assert_eq!(engine.fault_reason(), Some(&VmError::stack_underflow(1, 0)));
    }
}
