//! Property tests over the stack item wire form and the engine's fault
//! behavior.

use neo2_vm::stack_item::{MAX_INTEGER_SIZE, MAX_ITEM_SIZE};
use neo2_vm::{
    ExecutionEngine, ExecutionEngineLimits, InteropTypeRegistry, OpCode, StackItem, StackItemType, TriggerType, VMState,
    VmError,
};
use num_bigint::BigInt;
use proptest::prelude::*;

fn primitive_item() -> impl Strategy<Value = StackItem> {
    prop_oneof![
        any::<bool>().prop_map(StackItem::from_bool),
        proptest::collection::vec(any::<u8>(), 0..=MAX_INTEGER_SIZE)
            .prop_map(|bytes| StackItem::from_big_int(BigInt::from_signed_bytes_le(&bytes)).unwrap()),
        proptest::collection::vec(any::<u8>(), 0..2048)
            .prop_map(|bytes| StackItem::from_byte_array(bytes).unwrap()),
    ]
}

/// Operations that pop or inspect two items.
const BINARY_OPCODES: &[OpCode] = &[
    OpCode::ADD,
    OpCode::SUB,
    OpCode::MUL,
    OpCode::DIV,
    OpCode::MOD,
    OpCode::AND,
    OpCode::OR,
    OpCode::XOR,
    OpCode::EQUAL,
    OpCode::CAT,
    OpCode::SWAP,
    OpCode::NIP,
    OpCode::OVER,
    OpCode::TUCK,
    OpCode::NUMEQUAL,
    OpCode::LT,
    OpCode::MIN,
    OpCode::BOOLAND,
];

proptest! {
    #[test]
    fn canonical_form_round_trips(item in primitive_item()) {
        let bytes = item.to_canonical_bytes().unwrap();
        let back = StackItem::from_canonical_bytes(&bytes, &InteropTypeRegistry::new()).unwrap();
        prop_assert_eq!(back.item_type(), item.item_type());
        prop_assert_eq!(back, item);
    }

    #[test]
    fn canonical_decoding_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = StackItem::from_canonical_bytes(&bytes, &InteropTypeRegistry::new());
    }

    #[test]
    fn unaffordable_opcode_is_never_applied(drops in 1usize..40, gas in 0u64..40) {
        // Each PUSH1 is free and each DROP costs one.
        let script: Vec<u8> = std::iter::repeat([OpCode::PUSH1 as u8, OpCode::DROP as u8])
            .take(drops)
            .flatten()
            .collect();
        let mut engine = ExecutionEngine::new(TriggerType::Application, gas);
        engine.load_script(script, -1).unwrap();
        let state = engine.execute();

        prop_assert!(engine.gas_consumed() <= gas);
        if (drops as u64) <= gas {
            prop_assert_eq!(state, VMState::HALT);
            prop_assert_eq!(engine.gas_consumed(), drops as u64);
        } else {
            prop_assert_eq!(state, VMState::FAULT);
            prop_assert!(engine.fault_reason().unwrap().is_out_of_gas());
            prop_assert_eq!(engine.gas_consumed(), gas);
            // The pushed item the failed DROP would have removed is still there.
            let context = engine.current_context().unwrap();
            prop_assert_eq!(context.evaluation_stack().len(), 1);
        }
    }

    #[test]
    fn missing_operands_fault_with_underflow(
        opcode in proptest::sample::select(BINARY_OPCODES),
        present in 0usize..2,
    ) {
        let mut script = vec![OpCode::PUSH1 as u8; present];
        script.push(opcode as u8);
        let mut engine = ExecutionEngine::new(TriggerType::Application, 100);
        engine.load_script(script, -1).unwrap();

        prop_assert_eq!(engine.execute(), VMState::FAULT);
        prop_assert!(
            matches!(engine.fault_reason(), Some(VmError::StackUnderflow { .. })),
            "{} faulted with {:?}",
            opcode,
            engine.fault_reason()
        );
    }

    #[test]
    fn arbitrary_scripts_end_in_a_terminal_state(script in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut engine = ExecutionEngine::new(TriggerType::Application, 1_000);
        engine.load_script(script, -1).unwrap();
        prop_assert!(engine.execute().is_terminal());
        prop_assert!(engine.gas_consumed() <= 1_000);
    }
}

#[test]
fn oversized_payloads_are_rejected() {
    let item = StackItem::ByteArray(vec![0; MAX_ITEM_SIZE + 1]);
    assert!(matches!(
        item.to_canonical_bytes(),
        Err(VmError::OversizedValue { .. })
    ));

    // A length prefix above the ceiling is refused before the payload is read.
    let mut bytes = vec![0x00, 0xFE];
    bytes.extend_from_slice(&((MAX_ITEM_SIZE + 1) as u32).to_le_bytes());
    assert!(matches!(
        StackItem::from_canonical_bytes(&bytes, &InteropTypeRegistry::new()),
        Err(VmError::OversizedValue { .. })
    ));

    assert!(StackItem::from_byte_array(vec![0; MAX_ITEM_SIZE + 1]).is_err());
    assert!(StackItem::from_big_int(BigInt::from(1) << (MAX_INTEGER_SIZE * 8)).is_err());
}

#[test]
fn collections_have_no_canonical_form() {
    for (item, item_type) in [
        (StackItem::new_array(Vec::new()), StackItemType::Array),
        (StackItem::new_struct(Vec::new()), StackItemType::Struct),
        (StackItem::new_map(), StackItemType::Map),
    ] {
        assert_eq!(item.to_canonical_bytes(), Err(VmError::NotSerializable(item_type)));
    }
}

#[test]
fn configured_integer_ceiling_governs_operands_and_wire_form() {
    let limits = ExecutionEngineLimits {
        max_integer_size: 64,
        ..ExecutionEngineLimits::DEFAULT
    };

    // PUSHBYTES32 0x7f.. DUP MUL
    let mut script = vec![0x20];
    script.extend_from_slice(&[0x7F; 32]);
    script.extend_from_slice(&[OpCode::DUP as u8, OpCode::MUL as u8]);
    let mut engine = ExecutionEngine::new(TriggerType::Application, ExecutionEngine::UNLIMITED_GAS)
        .with_limits(limits.clone());
    engine.load_script(script, -1).unwrap();
    assert_eq!(engine.execute(), VMState::HALT, "{:?}", engine.fault_reason());

    let product = engine.result_stack().peek(0).unwrap().clone();
    let bytes = product.to_canonical_bytes_with(engine.limits()).unwrap();
    let back =
        StackItem::from_canonical_bytes_with(&bytes, &InteropTypeRegistry::new(), &limits).unwrap();
    assert_eq!(back, product);
    assert!(product.to_canonical_bytes().is_err());

    // A 40-byte operand is an integer under the wider ceiling.
    let mut script = vec![0x28];
    script.extend_from_slice(&[0x01; 40]);
    script.extend_from_slice(&[OpCode::PUSH1 as u8, OpCode::ADD as u8]);
    let mut engine = ExecutionEngine::new(TriggerType::Application, ExecutionEngine::UNLIMITED_GAS)
        .with_limits(limits);
    engine.load_script(script.clone(), -1).unwrap();
    assert_eq!(engine.execute(), VMState::HALT, "{:?}", engine.fault_reason());

    let mut engine = ExecutionEngine::new(TriggerType::Application, ExecutionEngine::UNLIMITED_GAS);
    engine.load_script(script, -1).unwrap();
    assert_eq!(engine.execute(), VMState::FAULT);
    assert!(matches!(
        engine.fault_reason(),
        Some(VmError::OversizedValue { size: 40, max: 32 })
    ));
}
