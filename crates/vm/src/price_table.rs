//! Gas price table.
//!
//! The per-opcode schedule is protocol configuration, versioned alongside
//! the node. [`PriceTable::default`] is the legacy schedule; hosts replace it
//! through [`EngineConfig`](crate::EngineConfig).

use crate::error::{VmError, VmResult};
use crate::op_code::OpCode;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;

/// Gas charged per opcode.
///
/// `SYSCALL` is not priced here: the interop dispatcher charges the price of
/// the descriptor it resolves. `CHECKMULTISIG` costs
/// `multisig_price_per_key` for every public key it checks.
///
/// Fields are read once, on the first price lookup.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PriceTable {
    /// Schedule version, reported in logs.
    pub version: u32,

    /// Price of any opcode without an override.
    pub default_price: u64,

    /// Price of constant pushes (`PUSH0` through `PUSH16`) and `NOP`.
    pub push_price: u64,

    /// Price per public key of `CHECKMULTISIG`.
    pub multisig_price_per_key: u64,

    /// Opcode mnemonic to price.
    pub overrides: BTreeMap<String, u64>,

    #[cfg_attr(feature = "serde-types", serde(skip))]
    resolved: OnceCell<Box<[u64; 256]>>,
}

impl PriceTable {
    /// Builds a table with the given overrides on top of the legacy defaults.
    pub fn new(version: u32, default_price: u64, overrides: BTreeMap<String, u64>) -> Self {
        Self {
            version,
            default_price,
            push_price: 0,
            multisig_price_per_key: 100,
            overrides,
            resolved: OnceCell::new(),
        }
    }

    /// A table that charges nothing, for hosts that meter elsewhere.
    pub fn free() -> Self {
        let mut table = Self::new(0, 0, BTreeMap::new());
        table.multisig_price_per_key = 0;
        table
    }

    /// Checks that every override names a known opcode.
    pub fn validate(&self) -> VmResult<()> {
        for name in self.overrides.keys() {
            if OpCode::from_name(name).is_none() {
                return Err(VmError::invalid_operation(format!(
                    "price override for unknown opcode {name}"
                )));
            }
        }
        Ok(())
    }

    /// Fixed price of `opcode`.
    pub fn price_of(&self, opcode: OpCode) -> u64 {
        self.resolved.get_or_init(|| self.resolve())[opcode as usize]
    }

    fn resolve(&self) -> Box<[u64; 256]> {
        let mut prices = Box::new([self.default_price; 256]);
        for opcode in OpCode::iter() {
            if opcode.is_push() || opcode == OpCode::NOP {
                prices[opcode as usize] = self.push_price;
            }
            if matches!(opcode, OpCode::SYSCALL | OpCode::CHECKMULTISIG) {
                prices[opcode as usize] = 0;
            }
        }
        for (name, price) in &self.overrides {
            if let Some(opcode) = OpCode::from_name(name) {
                prices[opcode as usize] = *price;
            }
        }
        prices
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        let overrides = [
            (OpCode::APPCALL, 10),
            (OpCode::TAILCALL, 10),
            (OpCode::CALL_E, 10),
            (OpCode::CALL_ED, 10),
            (OpCode::CALL_ET, 10),
            (OpCode::CALL_EDT, 10),
            (OpCode::SHA1, 10),
            (OpCode::SHA256, 10),
            (OpCode::HASH160, 20),
            (OpCode::HASH256, 20),
            (OpCode::CHECKSIG, 100),
            (OpCode::VERIFY, 100),
        ]
        .into_iter()
        .map(|(opcode, price)| (opcode.name(), price))
        .collect();
        Self::new(1, 1, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_schedule() {
        let prices = PriceTable::default();
        assert_eq!(prices.price_of(OpCode::PUSH0), 0);
        assert_eq!(prices.price_of(OpCode::PUSHDATA4), 0);
        assert_eq!(prices.price_of(OpCode::PUSH16), 0);
        assert_eq!(prices.price_of(OpCode::NOP), 0);
        assert_eq!(prices.price_of(OpCode::ADD), 1);
        assert_eq!(prices.price_of(OpCode::RET), 1);
        assert_eq!(prices.price_of(OpCode::APPCALL), 10);
        assert_eq!(prices.price_of(OpCode::HASH256), 20);
        assert_eq!(prices.price_of(OpCode::CHECKSIG), 100);
        assert_eq!(prices.price_of(OpCode::SYSCALL), 0);
        assert_eq!(prices.price_of(OpCode::CHECKMULTISIG), 0);
        assert_eq!(prices.multisig_price_per_key, 100);
    }

    #[test]
    fn test_overrides() {
        let overrides = BTreeMap::from([("ADD".to_string(), 7), ("PUSH1".to_string(), 2)]);
        let prices = PriceTable::new(2, 3, overrides);
        assert_eq!(prices.price_of(OpCode::ADD), 7);
        assert_eq!(prices.price_of(OpCode::PUSH1), 2);
        assert_eq!(prices.price_of(OpCode::SUB), 3);
        assert!(prices.validate().is_ok());
    }

    #[test]
    fn test_unknown_override_rejected() {
        let overrides = BTreeMap::from([("PUSHINT8".to_string(), 1)]);
        assert!(PriceTable::new(1, 1, overrides).validate().is_err());
    }

    #[test]
    fn test_free_table() {
        let prices = PriceTable::free();
        assert!(OpCode::iter().all(|opcode| prices.price_of(opcode) == 0));
    }
}
