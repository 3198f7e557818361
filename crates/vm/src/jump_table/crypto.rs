//! Cryptographic operations for the virtual machine.
//!
//! Hashing is built in. Signature checks go through the host's
//! [`Crypto`](crate::crypto::Crypto) hook and verify as false when no hook
//! is installed.

use crate::crypto::{hash160, hash256, sha1, sha256};
use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::jump_table::{to_int, JumpTable};
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Registers the cryptographic operation handlers.
pub fn register_handlers(jump_table: &mut JumpTable) {
    jump_table.register(OpCode::SHA1, hash);
    jump_table.register(OpCode::SHA256, hash);
    jump_table.register(OpCode::HASH160, hash);
    jump_table.register(OpCode::HASH256, hash);
    jump_table.register(OpCode::CHECKSIG, check_sig);
    jump_table.register(OpCode::VERIFY, verify);
    jump_table.register(OpCode::CHECKMULTISIG, check_multisig);
}

/// Implements SHA1, SHA256, HASH160 and HASH256.
fn hash(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let x = engine.pop()?.as_bytes()?;
    let digest = match instruction.opcode() {
        OpCode::SHA1 => sha1(&x).to_vec(),
        OpCode::SHA256 => sha256(&x).to_vec(),
        OpCode::HASH160 => hash160(&x).to_vec(),
        _ => hash256(&x).to_vec(),
    };
    engine.push(StackItem::ByteArray(digest))
}

fn verify_signature(
    engine: &ExecutionEngine,
    message: &[u8],
    signature: &[u8],
    pubkey: &[u8],
) -> bool {
    engine
        .crypto()
        .map(|crypto| crypto.verify_signature(message, signature, pubkey))
        .unwrap_or(false)
}

/// Implements the CHECKSIG operation against the script container.
fn check_sig(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let pubkey = engine.pop()?.as_bytes()?;
    let signature = engine.pop()?.as_bytes()?;
    let ok = verify_signature(engine, engine.script_container(), &signature, &pubkey);
    engine.push(StackItem::from_bool(ok))
}

/// Implements the VERIFY operation against an explicit message.
fn verify(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let pubkey = engine.pop()?.as_bytes()?;
    let signature = engine.pop()?.as_bytes()?;
    let message = engine.pop()?.as_bytes()?;
    let ok = verify_signature(engine, &message, &signature, &pubkey);
    engine.push(StackItem::from_bool(ok))
}

/// Pops a list of byte strings given either as an array or as a count
/// followed by that many items. Returns the list in pop order.
fn pop_byte_list(engine: &mut ExecutionEngine, what: &str, max: usize) -> VmResult<Vec<Vec<u8>>> {
    let item = engine.pop()?;
    let list = match item.as_array() {
        Some(array) => array
            .items()
            .iter()
            .map(StackItem::as_bytes)
            .collect::<VmResult<Vec<_>>>()?,
        None => {
            let count = to_int(engine, &item)?;
            let available = engine
                .current_context()
                .map(|context| context.evaluation_stack().len())
                .unwrap_or(0);
            let count = i64::try_from(&count).unwrap_or(-1);
            if count < 1 || count as usize > available {
                return Err(VmError::invalid_operation(format!(
                    "{what} count {count} with {available} items on the stack"
                )));
            }
            let mut list = Vec::with_capacity(count as usize);
            for _ in 0..count {
                list.push(engine.pop()?.as_bytes()?);
            }
            list
        }
    };
    if list.is_empty() || list.len() > max {
        return Err(VmError::invalid_operation(format!(
            "{what} count {} outside 1..={max}",
            list.len()
        )));
    }
    Ok(list)
}

/// Implements the CHECKMULTISIG operation.
///
/// Keys are popped first, then signatures. Signatures must match keys in
/// order; the check stops as soon as too few keys remain for the unmatched
/// signatures.
fn check_multisig(engine: &mut ExecutionEngine, _instruction: &Instruction) -> VmResult<()> {
    let pubkeys = pop_byte_list(engine, "public key", usize::MAX)?;
    let signatures = pop_byte_list(engine, "signature", pubkeys.len())?;
    let (n, m) = (pubkeys.len(), signatures.len());
    let message = engine.script_container();
    let mut ok = true;
    let (mut i, mut j) = (0, 0);
    while ok && i < m && j < n {
        if verify_signature(engine, message, &signatures[i], &pubkeys[j]) {
            i += 1;
        }
        j += 1;
        if m - i > n - j {
            ok = false;
        }
    }
    engine.push(StackItem::from_bool(ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Crypto;
    use crate::jump_table::results;
    use crate::trigger_type::TriggerType;
    use crate::vm_state::VMState;
    use std::sync::Arc;

    /// Accepts a signature equal to the key followed by the message.
    struct EchoCrypto;

    impl Crypto for EchoCrypto {
        fn verify_signature(&self, message: &[u8], signature: &[u8], pubkey: &[u8]) -> bool {
            signature == [pubkey, message].concat()
        }
    }

    fn run_with_crypto(script: &[u8], container: &[u8]) -> ExecutionEngine {
        let mut engine = ExecutionEngine::new(TriggerType::Verification, ExecutionEngine::UNLIMITED_GAS)
            .with_crypto(Arc::new(EchoCrypto))
            .with_script_container(container.to_vec());
        engine.load_script(script.to_vec(), -1).unwrap();
        engine.execute();
        engine
    }

    #[test]
    fn test_hashes() {
        let engine = crate::jump_table::run_script(&[0x00, 0xA8]);
        assert_eq!(
            results(&engine),
            vec![StackItem::ByteArray(sha256(b"").to_vec())]
        );

        let engine = crate::jump_table::run_script(&[0x01, 0x61, 0xA9]);
        assert_eq!(
            results(&engine),
            vec![StackItem::ByteArray(hash160(b"a").to_vec())]
        );
    }

    #[test]
    fn test_checksig_uses_container() {
        // sig = "kx" (key "k" + container "x"), key = "k"
        let script = [0x02, b'k', b'x', 0x01, b'k', 0xAC];
        let engine = run_with_crypto(&script, b"x");
        assert_eq!(results(&engine), vec![StackItem::from_bool(true)]);

        let engine = run_with_crypto(&script, b"y");
        assert_eq!(results(&engine), vec![StackItem::from_bool(false)]);
    }

    #[test]
    fn test_checksig_without_crypto_is_false() {
        let engine = crate::jump_table::run_script(&[0x01, 0x01, 0x01, 0x02, 0xAC]);
        assert_eq!(engine.state(), VMState::HALT);
        assert_eq!(results(&engine), vec![StackItem::from_bool(false)]);
    }

    #[test]
    fn test_verify_uses_explicit_message() {
        // message "m", sig "km", key "k"
        let script = [0x01, b'm', 0x02, b'k', b'm', 0x01, b'k', 0xAD];
        let engine = run_with_crypto(&script, b"");
        assert_eq!(results(&engine), vec![StackItem::from_bool(true)]);
    }

    #[test]
    fn test_checkmultisig_counts() {
        // sigs "ax" "cx", count 2; keys "a" "b" "c", count 3
        // signatures pop as ["cx", "ax"] and keys as ["c", "b", "a"]
        let script = [
            0x02, b'a', b'x', 0x02, b'c', b'x', 0x52, //
            0x01, b'a', 0x01, b'b', 0x01, b'c', 0x53, //
            0xAE,
        ];
        let engine = run_with_crypto(&script, b"x");
        assert_eq!(engine.state(), VMState::HALT);
        assert_eq!(results(&engine), vec![StackItem::from_bool(true)]);

        // out of order signatures fail
        let script = [
            0x02, b'c', b'x', 0x02, b'a', b'x', 0x52, //
            0x01, b'a', 0x01, b'b', 0x01, b'c', 0x53, //
            0xAE,
        ];
        let engine = run_with_crypto(&script, b"x");
        assert_eq!(results(&engine), vec![StackItem::from_bool(false)]);
    }

    #[test]
    fn test_checkmultisig_arrays() {
        // [ "ax" ] and [ "a", "b" ] packed as arrays
        let script = [
            0x02, b'a', b'x', 0x51, 0xC1, //
            0x01, b'b', 0x01, b'a', 0x52, 0xC1, //
            0xAE,
        ];
        let engine = run_with_crypto(&script, b"x");
        assert_eq!(results(&engine), vec![StackItem::from_bool(true)]);
    }

    #[test]
    fn test_checkmultisig_rejects_bad_counts() {
        // more signatures than keys
        let script = [0x51, 0x51, 0x52, 0x01, b'a', 0x51, 0xAE];
        let engine = run_with_crypto(&script, b"");
        assert_eq!(engine.state(), VMState::FAULT);

        // zero keys
        let engine = run_with_crypto(&[0x00, 0xAE], b"");
        assert_eq!(engine.state(), VMState::FAULT);
    }
}
