//! Independent engines running on separate threads.

use neo2_vm::{
    ContractProperties, ExecutionEngine, InMemoryScriptTable, InteropService, OpCode,
    ScriptBuilder, StackItem, TriggerType, VMState,
};
use std::sync::Arc;
use std::thread;

fn assert_send<T: Send>() {}

#[test]
fn engines_are_send() {
    assert_send::<ExecutionEngine>();
    assert_send::<StackItem>();
}

#[test]
fn engines_share_read_only_registries() {
    let mut table = InMemoryScriptTable::new();
    // callee: MUL
    let callee = table.add(vec![OpCode::MUL as u8], ContractProperties::NO_PROPERTY);
    let table = Arc::new(table);
    let service = Arc::new(InteropService::with_standard_services());

    let handles: Vec<_> = (0..8i64)
        .map(|n| {
            let table = table.clone();
            let service = service.clone();
            thread::spawn(move || {
                let mut builder = ScriptBuilder::new();
                builder
                    .emit_push_int(n)
                    .emit_push_int(n)
                    .emit_app_call(&callee, false)
                    .emit(OpCode::DUP);
                builder.emit_syscall("System.Runtime.Notify").unwrap();

                let mut engine =
                    ExecutionEngine::new(TriggerType::Application, ExecutionEngine::UNLIMITED_GAS)
                        .with_script_table(table)
                        .with_interop_service(service);
                engine.load_script(builder.to_script(), -1).unwrap();
                let state = engine.execute();
                let result = engine.result_stack().peek(0).unwrap().clone();
                let notified = engine.notifications()[0].state.clone();
                (n, state, result, notified)
            })
        })
        .collect();

    for handle in handles {
        let (n, state, result, notified) = handle.join().unwrap();
        assert_eq!(state, VMState::HALT);
        assert_eq!(result, StackItem::from_int(n * n));
        assert_eq!(notified, StackItem::from_int(n * n));
    }
}

#[test]
fn collections_moved_across_threads_keep_identity() {
    let array = StackItem::new_array(vec![StackItem::from_int(1)]);
    let alias = array.clone();
    let handle = thread::spawn(move || {
        alias.as_array().unwrap().push(StackItem::from_int(2));
        alias
    });
    let alias = handle.join().unwrap();
    assert_eq!(array.as_array().unwrap().len(), 2);
    assert_eq!(array, alias);
}
