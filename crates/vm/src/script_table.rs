//! Script table module for the virtual machine.
//!
//! The engine resolves call targets through a [`ScriptTable`]. The node
//! backs it with its contract store; [`InMemoryScriptTable`] serves hosts
//! and tests that register scripts up front.

use crate::script::{Script, ScriptHash};
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Capability bits a contract is deployed with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContractProperties: u8 {
        const NO_PROPERTY = 0;
        const HAS_STORAGE = 1 << 0;
        const HAS_DYNAMIC_INVOKE = 1 << 1;
        const PAYABLE = 1 << 2;
    }
}

impl ContractProperties {
    /// Parses a capability name as written in test fixtures, such as
    /// `HasDynamicInvoke`. The upper-case flag names are parsed by the
    /// generated `from_name`.
    pub fn from_capability_name(name: &str) -> Option<Self> {
        match name {
            "HasStorage" => Some(Self::HAS_STORAGE),
            "HasDynamicInvoke" => Some(Self::HAS_DYNAMIC_INVOKE),
            "Payable" => Some(Self::PAYABLE),
            "NoProperty" => Some(Self::NO_PROPERTY),
            _ => None,
        }
    }
}

/// Lookup from script hash to script bytes.
///
/// Implementations are shared between engines running on different threads
/// and are only read while executing.
pub trait ScriptTable: Send + Sync {
    /// Returns the script registered under `hash`.
    fn resolve(&self, hash: &ScriptHash) -> Option<Script>;

    /// Returns the capability bits of the script registered under `hash`.
    fn properties(&self, _hash: &ScriptHash) -> ContractProperties {
        ContractProperties::NO_PROPERTY
    }
}

/// A script table held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScriptTable {
    entries: HashMap<ScriptHash, (Script, ContractProperties)>,
}

impl InMemoryScriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `script` under its own hash and returns that hash.
    pub fn add(&mut self, script: impl Into<Script>, properties: ContractProperties) -> ScriptHash {
        let script = script.into();
        let hash = script.hash();
        self.entries.insert(hash, (script, properties));
        hash
    }

    pub fn remove(&mut self, hash: &ScriptHash) -> Option<Script> {
        self.entries.remove(hash).map(|(script, _)| script)
    }

    pub fn contains(&self, hash: &ScriptHash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScriptTable for InMemoryScriptTable {
    fn resolve(&self, hash: &ScriptHash) -> Option<Script> {
        self.entries.get(hash).map(|(script, _)| script.clone())
    }

    fn properties(&self, hash: &ScriptHash) -> ContractProperties {
        self.entries
            .get(hash)
            .map(|(_, properties)| *properties)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_resolve() {
        let mut table = InMemoryScriptTable::new();
        let hash = table.add(vec![0x51, 0x66], ContractProperties::HAS_DYNAMIC_INVOKE);

        assert_eq!(hash, ScriptHash::of(&[0x51, 0x66]));
        assert_eq!(table.resolve(&hash).unwrap().as_bytes(), &[0x51, 0x66]);
        assert!(table
            .properties(&hash)
            .contains(ContractProperties::HAS_DYNAMIC_INVOKE));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unknown_hash() {
        let table = InMemoryScriptTable::new();
        let hash = ScriptHash::of(&[0x66]);
        assert!(table.resolve(&hash).is_none());
        assert_eq!(table.properties(&hash), ContractProperties::NO_PROPERTY);
    }

    #[test]
    fn test_property_names() {
        assert_eq!(
            ContractProperties::from_capability_name("Payable"),
            Some(ContractProperties::PAYABLE)
        );
        assert_eq!(ContractProperties::from_capability_name("HasNothing"), None);
        assert_eq!(
            ContractProperties::from_name("HAS_DYNAMIC_INVOKE"),
            ContractProperties::from_capability_name("HasDynamicInvoke")
        );
        assert_eq!(ContractProperties::HAS_STORAGE.bits(), 1);
        assert_eq!(ContractProperties::HAS_DYNAMIC_INVOKE.bits(), 2);
    }
}
