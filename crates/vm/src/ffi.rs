//! C ABI over the execution engine.
//!
//! Ownership rules:
//!
//! - An engine handle is allocated by [`neo2vm_engine_new`] and released only
//!   by [`neo2vm_engine_free`]. Using a handle after freeing it is undefined
//!   behavior.
//! - Input buffers are borrowed for the duration of one call; the engine
//!   copies what it keeps.
//! - Output buffers are allocated and owned by the caller.
//!
//! Every function tolerates a null engine pointer and reports it through its
//! return value instead of dereferencing it.

use crate::error::VmError;
use crate::execution_engine::ExecutionEngine;
use crate::trigger_type::TriggerType;
use std::slice;

/// Success.
pub const NEO2VM_OK: i32 = 0;
/// A required pointer was null.
pub const NEO2VM_ERR_NULL: i32 = -1;
/// The engine rejected the request.
pub const NEO2VM_ERR_REJECTED: i32 = -2;
/// The result-stack index is out of range.
pub const NEO2VM_ERR_INDEX: i32 = -3;
/// The item has no canonical byte form.
pub const NEO2VM_ERR_NOT_SERIALIZABLE: i32 = -4;
/// The item exceeds the engine's size limits.
pub const NEO2VM_ERR_OVERSIZED: i32 = -5;

/// State value reported for a null handle.
const STATE_INVALID: u8 = 0xFF;

/// Creates an engine with the standard interop services. Returns null for an
/// unknown trigger byte. Release the handle with [`neo2vm_engine_free`].
#[no_mangle]
pub extern "C" fn neo2vm_engine_new(trigger: u8, gas_limit: u64) -> *mut ExecutionEngine {
    match TriggerType::from_byte(trigger) {
        Some(trigger) => Box::into_raw(Box::new(ExecutionEngine::new(trigger, gas_limit))),
        None => std::ptr::null_mut(),
    }
}

/// Frees an engine handle. Null is ignored.
///
/// # Safety
///
/// `engine` must be null or a pointer returned by [`neo2vm_engine_new`] that
/// has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_free(engine: *mut ExecutionEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Copies `len` bytes from `script` and loads them as a new context that
/// returns every item.
///
/// # Safety
///
/// `engine` must be a live handle. `script` must point to `len` readable
/// bytes, or be null when `len` is zero.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_load_script(
    engine: *mut ExecutionEngine,
    script: *const u8,
    len: usize,
) -> i32 {
    let Some(engine) = engine.as_mut() else {
        return NEO2VM_ERR_NULL;
    };
    let bytes = if len == 0 {
        Vec::new()
    } else if script.is_null() {
        return NEO2VM_ERR_NULL;
    } else {
        slice::from_raw_parts(script, len).to_vec()
    };
    match engine.load_script(bytes, -1) {
        Ok(()) => NEO2VM_OK,
        Err(error) => {
            log::debug!("ffi load_script rejected: {error}");
            NEO2VM_ERR_REJECTED
        }
    }
}

/// Runs to HALT or FAULT and returns the state byte.
///
/// # Safety
///
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_execute(engine: *mut ExecutionEngine) -> u8 {
    match engine.as_mut() {
        Some(engine) => engine.execute() as u8,
        None => STATE_INVALID,
    }
}

/// Executes one instruction and returns the state byte.
///
/// # Safety
///
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_step_into(engine: *mut ExecutionEngine) -> u8 {
    match engine.as_mut() {
        Some(engine) => engine.step_into() as u8,
        None => STATE_INVALID,
    }
}

/// Returns the state byte: 0 NONE, 1 HALT, 2 FAULT, 0xFF for null.
///
/// # Safety
///
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_state(engine: *const ExecutionEngine) -> u8 {
    match engine.as_ref() {
        Some(engine) => engine.state() as u8,
        None => STATE_INVALID,
    }
}

/// Returns the gas consumed so far, 0 for null.
///
/// # Safety
///
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_gas_consumed(engine: *const ExecutionEngine) -> u64 {
    engine.as_ref().map_or(0, ExecutionEngine::gas_consumed)
}

/// Returns the number of items on the result stack, 0 for null.
///
/// # Safety
///
/// `engine` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_result_count(engine: *const ExecutionEngine) -> usize {
    engine.as_ref().map_or(0, |engine| engine.result_stack().len())
}

/// Writes the canonical bytes of the result-stack item `index` (0 = top)
/// into `out` and returns their length. The engine's own size limits apply.
///
/// When `out` is null or `out_len` is too small nothing is written and the
/// required length is returned, so callers can size the buffer first. A
/// negative return is one of the `NEO2VM_ERR_*` codes.
///
/// # Safety
///
/// `engine` must be null or a live handle. `out` must be null or point to
/// `out_len` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn neo2vm_engine_result_item(
    engine: *const ExecutionEngine,
    index: usize,
    out: *mut u8,
    out_len: usize,
) -> i64 {
    let Some(engine) = engine.as_ref() else {
        return NEO2VM_ERR_NULL as i64;
    };
    let Ok(item) = engine.result_stack().peek(index) else {
        return NEO2VM_ERR_INDEX as i64;
    };
    let bytes = match item.to_canonical_bytes_with(engine.limits()) {
        Ok(bytes) => bytes,
        Err(VmError::OversizedValue { .. }) => return NEO2VM_ERR_OVERSIZED as i64,
        Err(_) => return NEO2VM_ERR_NOT_SERIALIZABLE as i64,
    };
    if !out.is_null() && out_len >= bytes.len() {
        slice::from_raw_parts_mut(out, bytes.len()).copy_from_slice(&bytes);
    }
    bytes.len() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack_item::{InteropTypeRegistry, StackItem};
    use crate::vm_state::VMState;

    #[test]
    fn test_engine_lifecycle() {
        // PUSH1 PUSH2 ADD
        let script = [0x51u8, 0x52, 0x93];
        unsafe {
            let engine = neo2vm_engine_new(TriggerType::Application.to_byte(), 100);
            assert!(!engine.is_null());
            assert_eq!(
                neo2vm_engine_load_script(engine, script.as_ptr(), script.len()),
                NEO2VM_OK
            );
            assert_eq!(neo2vm_engine_state(engine), 0);
            assert_eq!(neo2vm_engine_step_into(engine), 0);
            assert_eq!(neo2vm_engine_execute(engine), VMState::HALT as u8);
            assert_eq!(neo2vm_engine_gas_consumed(engine), 1);
            assert_eq!(neo2vm_engine_result_count(engine), 1);

            let needed = neo2vm_engine_result_item(engine, 0, std::ptr::null_mut(), 0);
            assert!(needed > 0);
            let mut buffer = vec![0u8; needed as usize];
            let written =
                neo2vm_engine_result_item(engine, 0, buffer.as_mut_ptr(), buffer.len());
            assert_eq!(written, needed);
            let item =
                StackItem::from_canonical_bytes(&buffer, &InteropTypeRegistry::new()).unwrap();
            assert_eq!(item, StackItem::from_int(3));

            assert_eq!(
                neo2vm_engine_result_item(engine, 1, buffer.as_mut_ptr(), buffer.len()),
                NEO2VM_ERR_INDEX as i64
            );
            neo2vm_engine_free(engine);
        }
    }

    #[test]
    fn test_null_handles_are_reported() {
        unsafe {
            assert_eq!(neo2vm_engine_state(std::ptr::null()), STATE_INVALID);
            assert_eq!(neo2vm_engine_execute(std::ptr::null_mut()), STATE_INVALID);
            assert_eq!(neo2vm_engine_gas_consumed(std::ptr::null()), 0);
            assert_eq!(
                neo2vm_engine_load_script(std::ptr::null_mut(), std::ptr::null(), 0),
                NEO2VM_ERR_NULL
            );
            neo2vm_engine_free(std::ptr::null_mut());
        }
        assert!(neo2vm_engine_new(0x42, 1).is_null());
    }

    #[test]
    fn test_composite_result_is_not_serializable() {
        // NEWMAP
        let script = [0xC7u8];
        unsafe {
            let engine = neo2vm_engine_new(TriggerType::Application.to_byte(), 100);
            neo2vm_engine_load_script(engine, script.as_ptr(), script.len());
            assert_eq!(neo2vm_engine_execute(engine), VMState::HALT as u8);
            assert_eq!(
                neo2vm_engine_result_item(engine, 0, std::ptr::null_mut(), 0),
                NEO2VM_ERR_NOT_SERIALIZABLE as i64
            );
            neo2vm_engine_free(engine);
        }
    }

    #[test]
    fn test_fault_state_byte() {
        // DROP on an empty stack
        let script = [0x75u8];
        unsafe {
            let engine = neo2vm_engine_new(TriggerType::Verification.to_byte(), 100);
            neo2vm_engine_load_script(engine, script.as_ptr(), script.len());
            assert_eq!(neo2vm_engine_execute(engine), VMState::FAULT as u8);
            neo2vm_engine_free(engine);
        }
    }
}
