//! Numeric operations for the virtual machine.
//!
//! Every result is checked against the engine's integer width limit before
//! it is pushed.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{pop_i64, pop_int, push_int, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};

/// Registers the numeric operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::INC, inc);
    jump_table.register(OpCode::DEC, dec);
    jump_table.register(OpCode::SIGN, sign);
    jump_table.register(OpCode::NEGATE, negate);
    jump_table.register(OpCode::ABS, abs);
    jump_table.register(OpCode::NOT, not);
    jump_table.register(OpCode::NZ, nz);
    jump_table.register(OpCode::ADD, add);
    jump_table.register(OpCode::SUB, sub);
    jump_table.register(OpCode::MUL, mul);
    jump_table.register(OpCode::DIV, div);
    jump_table.register(OpCode::MOD, modulo);
    jump_table.register(OpCode::SHL, shl);
    jump_table.register(OpCode::SHR, shr);
    jump_table.register(OpCode::BOOLAND, bool_and);
    jump_table.register(OpCode::BOOLOR, bool_or);
    jump_table.register(OpCode::NUMEQUAL, num_equal);
    jump_table.register(OpCode::NUMNOTEQUAL, num_not_equal);
    jump_table.register(OpCode::LT, lt);
    jump_table.register(OpCode::GT, gt);
    jump_table.register(OpCode::LTE, lte);
    jump_table.register(OpCode::GTE, gte);
    jump_table.register(OpCode::MIN, min);
    jump_table.register(OpCode::MAX, max);
    jump_table.register(OpCode::WITHIN, within);
}

fn pop_pair(engine: &mut ExecutionEngine) -> VmResult<(BigInt, BigInt)> {
    let x2 = pop_int(engine)?;
    let x1 = pop_int(engine)?;
    Ok((x1, x2))
}

fn push_bool(engine: &mut ExecutionEngine, value: bool) -> VmResult<()> {
    engine.push(StackItem::from_bool(value))
}

fn inc(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    push_int(engine, x + 1)
}

fn dec(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    push_int(engine, x - 1)
}

fn sign(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    let sign = match x.sign() {
        Sign::Minus => -1,
        Sign::NoSign => 0,
        Sign::Plus => 1,
    };
    engine.push(StackItem::from_int(sign))
}

fn negate(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    push_int(engine, -x)
}

fn abs(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    push_int(engine, x.abs())
}

/// Implements the NOT operation: boolean negation of any item.
fn not(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = engine.pop()?.as_bool();
    push_bool(engine, !x)
}

fn nz(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x = pop_int(engine)?;
    push_bool(engine, !x.is_zero())
}

fn add(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_int(engine, x1 + x2)
}

fn sub(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_int(engine, x1 - x2)
}

fn mul(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_int(engine, x1 * x2)
}

/// Implements the DIV operation, rounding toward zero.
fn div(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    if x2.is_zero() {
        return Err(VmError::invalid_operation("division by zero"));
    }
    push_int(engine, x1 / x2)
}

/// Implements the MOD operation. The remainder takes the sign of the
/// dividend.
fn modulo(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    if x2.is_zero() {
        return Err(VmError::invalid_operation("division by zero"));
    }
    push_int(engine, x1 % x2)
}

fn shl(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    shift(engine, false)
}

fn shr(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    shift(engine, true)
}

/// Shared body of SHL and SHR. A negative amount shifts the other way.
fn shift(engine: &mut ExecutionEngine, right: bool) -> VmResult<()> {
    let amount = pop_i64(engine)?;
    let max_shift = engine.limits().max_shift;
    if amount.unsigned_abs() > max_shift.unsigned_abs() {
        return Err(VmError::invalid_operation(format!(
            "shift {amount} exceeds {max_shift}"
        )));
    }
    let x = pop_int(engine)?;
    if amount == 0 {
        return push_int(engine, x);
    }
    let right = right != (amount < 0);
    let bits = amount.unsigned_abs() as usize;
    let result = if right { x >> bits } else { x << bits };
    push_int(engine, result)
}

fn bool_and(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = engine.pop()?.as_bool();
    let x1 = engine.pop()?.as_bool();
    push_bool(engine, x1 && x2)
}

fn bool_or(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let x2 = engine.pop()?.as_bool();
    let x1 = engine.pop()?.as_bool();
    push_bool(engine, x1 || x2)
}

fn num_equal(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_bool(engine, x1 == x2)
}

fn num_not_equal(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_bool(engine, x1 != x2)
}

fn lt(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_bool(engine, x1 < x2)
}

fn gt(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_bool(engine, x1 > x2)
}

fn lte(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_bool(engine, x1 <= x2)
}

fn gte(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_bool(engine, x1 >= x2)
}

fn min(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_int(engine, x1.min(x2))
}

fn max(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let (x1, x2) = pop_pair(engine)?;
    push_int(engine, x1.max(x2))
}

/// Implements the WITHIN operation: `a <= x < b`, with `b` on top.
fn within(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let b = pop_int(engine)?;
    let a = pop_int(engine)?;
    let x = pop_int(engine)?;
    push_bool(engine, a <= x && x < b)
}

#[cfg(test)]
mod tests {
    use crate::error::VmError;
    use crate::jump_table::{results, run_script};
    use crate::stack_item::StackItem;
    use crate::vm_state::VMState;

    fn single(script: &[u8]) -> StackItem {
        let engine = run_script(script);
        assert_eq!(engine.state(), VMState::HALT, "{:?}", engine.fault_reason());
        let mut items = results(&engine);
        assert_eq!(items.len(), 1);
        items.remove(0)
    }

    #[test]
    fn test_unary() {
        assert_eq!(single(&[0x55, 0x8B]), StackItem::from_int(6));
        assert_eq!(single(&[0x55, 0x8C]), StackItem::from_int(4));
        assert_eq!(single(&[0x4F, 0x8D]), StackItem::from_int(-1));
        assert_eq!(single(&[0x00, 0x8D]), StackItem::from_int(0));
        assert_eq!(single(&[0x55, 0x8F]), StackItem::from_int(-5));
        assert_eq!(single(&[0x4F, 0x90]), StackItem::from_int(1));
        assert_eq!(single(&[0x00, 0x91]), StackItem::from_bool(true));
        assert_eq!(single(&[0x55, 0x92]), StackItem::from_bool(true));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(single(&[0x57, 0x53, 0x94]), StackItem::from_int(4));
        assert_eq!(single(&[0x57, 0x53, 0x95]), StackItem::from_int(21));
        assert_eq!(single(&[0x57, 0x53, 0x96]), StackItem::from_int(2));
        assert_eq!(single(&[0x57, 0x53, 0x97]), StackItem::from_int(1));
        // -7 / 2 truncates toward zero, -7 % 2 keeps the dividend's sign
        assert_eq!(single(&[0x57, 0x8F, 0x52, 0x96]), StackItem::from_int(-3));
        assert_eq!(single(&[0x57, 0x8F, 0x52, 0x97]), StackItem::from_int(-1));
    }

    #[test]
    fn test_division_by_zero_faults() {
        let engine = run_script(&[0x51, 0x00, 0x96]);
        assert_eq!(engine.state(), VMState::FAULT);
        assert!(matches!(
            engine.fault_reason(),
            Some(VmError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_shifts() {
        assert_eq!(single(&[0x51, 0x54, 0x98]), StackItem::from_int(16));
        assert_eq!(single(&[0x60, 0x52, 0x99]), StackItem::from_int(4));
        // a negative amount reverses the direction
        assert_eq!(single(&[0x60, 0x4F, 0x98]), StackItem::from_int(8));
        assert_eq!(single(&[0x55, 0x00, 0x98]), StackItem::from_int(5));
    }

    #[test]
    fn test_shift_limits() {
        // PUSH1 PUSHDATA2 0x0101 (257) SHL
        let engine = run_script(&[0x51, 0x02, 0x01, 0x01, 0x98]);
        assert!(matches!(
            engine.fault_reason(),
            Some(VmError::InvalidOperation(_))
        ));

        // PUSH1 PUSHBYTES2 0x0001 (256) SHL overflows the integer width
        let engine = run_script(&[0x51, 0x02, 0x00, 0x01, 0x98]);
        assert!(matches!(
            engine.fault_reason(),
            Some(VmError::OversizedValue { size: 33, max: 32 })
        ));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(single(&[0x52, 0x53, 0x9F]), StackItem::from_bool(true));
        assert_eq!(single(&[0x52, 0x53, 0xA0]), StackItem::from_bool(false));
        assert_eq!(single(&[0x53, 0x53, 0xA1]), StackItem::from_bool(true));
        assert_eq!(single(&[0x52, 0x53, 0xA2]), StackItem::from_bool(false));
        assert_eq!(single(&[0x52, 0x53, 0x9C]), StackItem::from_bool(false));
        assert_eq!(single(&[0x52, 0x53, 0x9E]), StackItem::from_bool(true));
        assert_eq!(single(&[0x52, 0x53, 0xA3]), StackItem::from_int(2));
        assert_eq!(single(&[0x52, 0x53, 0xA4]), StackItem::from_int(3));
        assert_eq!(single(&[0x51, 0x00, 0x9A]), StackItem::from_bool(false));
        assert_eq!(single(&[0x51, 0x00, 0x9B]), StackItem::from_bool(true));
    }

    #[test]
    fn test_within() {
        assert_eq!(single(&[0x52, 0x51, 0x53, 0xA5]), StackItem::from_bool(true));
        assert_eq!(single(&[0x53, 0x51, 0x53, 0xA5]), StackItem::from_bool(false));
    }

    #[test]
    fn test_byte_arrays_are_numbers() {
        // PUSHBYTES1 0xFF is -1
        assert_eq!(single(&[0x01, 0xFF, 0x8B]), StackItem::from_int(0));
    }

    #[test]
    fn test_collections_are_not_numbers() {
        let engine = run_script(&[0xC7, 0x8B]);
        assert!(matches!(
            engine.fault_reason(),
            Some(VmError::TypeMismatch { .. })
        ));
    }
}
