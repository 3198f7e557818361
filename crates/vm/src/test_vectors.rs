//! JSON conformance test vectors.
//!
//! A suite file holds test cases; each case loads a hex script (plus any
//! auxiliary scripts into a script table), then applies steps. A step runs
//! its actions and compares the engine against the declared expected state.
//!
//! ```json
//! {
//!   "category": "Arithmetic",
//!   "name": "ADD",
//!   "tests": [{
//!     "name": "1 + 2",
//!     "script": "515293",
//!     "steps": [{
//!       "actions": ["Execute"],
//!       "result": {
//!         "state": "HALT",
//!         "gasConsumed": 1,
//!         "resultStack": [{ "type": "Integer", "value": "3" }]
//!       }
//!     }]
//!   }]
//! }
//! ```
//!
//! Stacks are listed top first, the invocation stack included. Fields left
//! out of `result` are not compared.

use crate::config::EngineConfig;
use crate::error::VmError;
use crate::execution_context::ExecutionContext;
use crate::execution_engine::ExecutionEngine;
use crate::interop_service::InteropService;
use crate::script_table::{ContractProperties, InMemoryScriptTable};
use crate::stack_item::StackItem;
use crate::trigger_type::TriggerType;
use crate::vm_state::VMState;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Nesting depth beyond which a collection is treated as cyclic.
const MAX_SNAPSHOT_DEPTH: usize = 32;

/// Problems with a fixture itself, as opposed to engine mismatches.
#[derive(Debug, Error)]
pub enum TestVectorError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse fixture: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hex in {field}: {message}")]
    Hex { field: String, message: String },

    #[error("unknown contract property {0}")]
    UnknownProperty(String),

    #[error("failed to load script: {0}")]
    Load(#[from] VmError),

    #[error("stack item nested too deeply to snapshot")]
    TooDeep,
}

/// A named collection of test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmTestSuite {
    pub category: String,
    pub name: String,
    pub tests: Vec<VmTestCase>,
}

impl VmTestSuite {
    pub fn from_json(source: &str) -> Result<Self, TestVectorError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TestVectorError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&source)
    }
}

/// One script run through a sequence of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmTestCase {
    pub name: String,

    /// Entry script as hex.
    pub script: String,

    /// Scripts callable from the entry script.
    #[serde(default)]
    pub script_table: Vec<VmTestScript>,

    #[serde(default)]
    pub trigger: TriggerType,

    #[serde(default = "unlimited_gas")]
    pub gas: u64,

    pub steps: Vec<VmTestStep>,
}

fn unlimited_gas() -> u64 {
    ExecutionEngine::UNLIMITED_GAS
}

/// An auxiliary script and the capabilities it is registered with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmTestScript {
    pub script: String,

    /// Names such as `HasDynamicInvoke`, `HasStorage` or `Payable`.
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Control action applied to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmTestAction {
    #[serde(alias = "execute")]
    Execute,
    #[serde(alias = "clean")]
    Clean,
    #[serde(alias = "stepInto")]
    StepInto,
    #[serde(alias = "stepOut")]
    StepOut,
    #[serde(alias = "stepOver")]
    StepOver,
}

/// Actions followed by the state they must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmTestStep {
    #[serde(default)]
    pub name: String,
    pub actions: Vec<VmTestAction>,
    pub result: ExpectedState,
}

/// Engine state after a step. `None` fields are not checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedState {
    pub state: VMState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_consumed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<VmTestItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_stack: Option<Vec<VmTestItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_stack: Option<Vec<ExpectedContext>>,
}

/// Snapshot of one invocation frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedContext {
    /// Hex script hash in byte order.
    pub script_hash: String,

    /// Mnemonic of the opcode at the instruction pointer.
    #[serde(default)]
    pub next_instruction: Option<String>,

    pub instruction_pointer: usize,

    #[serde(default)]
    pub alt_stack: Vec<VmTestItem>,

    #[serde(default)]
    pub evaluation_stack: Vec<VmTestItem>,
}

/// A stack item as written in fixtures: `{"type": ..., "value": ...}`.
///
/// Integers are decimal strings (JSON numbers are accepted), byte arrays are
/// hex and maps are lists of `{key, value}` entries. An interop item's value
/// is its type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum VmTestItem {
    Boolean(bool),
    Integer(#[serde(with = "decimal")] BigInt),
    ByteArray(#[serde(with = "hex_text")] Vec<u8>),
    Array(Vec<VmTestItem>),
    Struct(Vec<VmTestItem>),
    Map(Vec<VmTestMapEntry>),
    InteropInterface(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmTestMapEntry {
    pub key: VmTestItem,
    pub value: VmTestItem,
}

impl VmTestItem {
    /// Captures a live stack item.
    pub fn snapshot(item: &StackItem) -> Result<Self, TestVectorError> {
        Self::snapshot_at(item, 0)
    }

    fn snapshot_at(item: &StackItem, depth: usize) -> Result<Self, TestVectorError> {
        if depth > MAX_SNAPSHOT_DEPTH {
            return Err(TestVectorError::TooDeep);
        }
        let items = |items: Vec<StackItem>| {
            items
                .iter()
                .map(|item| Self::snapshot_at(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(match item {
            StackItem::Boolean(value) => Self::Boolean(*value),
            StackItem::Integer(value) => Self::Integer(value.clone()),
            StackItem::ByteArray(value) => Self::ByteArray(value.clone()),
            StackItem::Array(array) => Self::Array(items(array.items())?),
            StackItem::Struct(fields) => Self::Struct(items(fields.items())?),
            StackItem::Map(map) => Self::Map(
                map.entries()
                    .iter()
                    .map(|(key, value)| {
                        Ok(VmTestMapEntry {
                            key: Self::snapshot_at(key, depth + 1)?,
                            value: Self::snapshot_at(value, depth + 1)?,
                        })
                    })
                    .collect::<Result<Vec<_>, TestVectorError>>()?,
            ),
            StackItem::InteropInterface(object) => {
                Self::InteropInterface(object.interface_type().to_string())
            }
        })
    }
}

/// A field whose actual value differs from the fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub test: String,
    pub step: String,
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {}: {} expected {} but was {}",
            self.test, self.step, self.field, self.expected, self.actual
        )
    }
}

/// Replays suites against fresh engines.
#[derive(Debug, Clone)]
pub struct TestVectorRunner {
    interop_service: Arc<InteropService>,
    config: EngineConfig,
}

impl Default for TestVectorRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestVectorRunner {
    /// A runner using the standard interop services and default limits.
    pub fn new() -> Self {
        Self {
            interop_service: Arc::new(InteropService::with_standard_services()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_interop_service(mut self, interop_service: Arc<InteropService>) -> Self {
        self.interop_service = interop_service;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads and runs one suite file.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<Vec<Mismatch>, TestVectorError> {
        let suite = VmTestSuite::load(path)?;
        self.run_suite(&suite)
    }

    /// Runs every case of the suite and returns all mismatches found. An
    /// `Err` means the fixture itself is unusable.
    pub fn run_suite(&self, suite: &VmTestSuite) -> Result<Vec<Mismatch>, TestVectorError> {
        log::debug!("running suite {} / {}", suite.category, suite.name);
        let mut mismatches = Vec::new();
        for case in &suite.tests {
            mismatches.extend(self.run_case(case)?);
        }
        Ok(mismatches)
    }

    /// Runs one case on a fresh engine.
    pub fn run_case(&self, case: &VmTestCase) -> Result<Vec<Mismatch>, TestVectorError> {
        let mut engine = self.build_engine(case)?;
        engine.load_script(decode_hex("script", &case.script)?, -1)?;

        let mut mismatches = Vec::new();
        for (index, step) in case.steps.iter().enumerate() {
            let step_name = if step.name.is_empty() {
                format!("step {}", index + 1)
            } else {
                step.name.clone()
            };
            log::debug!("{} / {step_name}: {:?}", case.name, step.actions);

            for action in &step.actions {
                apply(&mut engine, *action);
            }

            let mut check = Check {
                test: &case.name,
                step: &step_name,
                mismatches: &mut mismatches,
            };
            check.state(&engine, &step.result)?;
        }
        Ok(mismatches)
    }

    fn build_engine(&self, case: &VmTestCase) -> Result<ExecutionEngine, TestVectorError> {
        let mut engine = ExecutionEngine::new(case.trigger, case.gas)
            .with_config(self.config.clone())
            .with_interop_service(self.interop_service.clone());

        if !case.script_table.is_empty() {
            let mut table = InMemoryScriptTable::new();
            for entry in &case.script_table {
                let mut properties = ContractProperties::NO_PROPERTY;
                for name in &entry.properties {
                    properties |= ContractProperties::from_capability_name(name)
                        .ok_or_else(|| TestVectorError::UnknownProperty(name.clone()))?;
                }
                table.add(decode_hex("scriptTable", &entry.script)?, properties);
            }
            engine = engine.with_script_table(Arc::new(table));
        }
        Ok(engine)
    }
}

fn apply(engine: &mut ExecutionEngine, action: VmTestAction) {
    match action {
        VmTestAction::Execute => {
            engine.execute();
        }
        VmTestAction::Clean => engine.clean(),
        VmTestAction::StepInto => {
            engine.step_into();
        }
        VmTestAction::StepOut => {
            engine.step_out();
        }
        VmTestAction::StepOver => {
            engine.step_over();
        }
    }
}

struct Check<'a> {
    test: &'a str,
    step: &'a str,
    mismatches: &'a mut Vec<Mismatch>,
}

impl Check<'_> {
    fn state(&mut self, engine: &ExecutionEngine, expected: &ExpectedState) -> Result<(), TestVectorError> {
        self.field("state", &expected.state, &engine.state());

        if let Some(gas) = &expected.gas_consumed {
            self.field("gasConsumed", gas, &engine.gas_consumed());
        }
        if let Some(logs) = &expected.logs {
            let actual: Vec<String> = engine.logs().iter().map(|log| log.message.clone()).collect();
            self.field("logs", logs, &actual);
        }
        if let Some(notifications) = &expected.notifications {
            let actual = engine
                .notifications()
                .iter()
                .map(|event| VmTestItem::snapshot(&event.state))
                .collect::<Result<Vec<_>, _>>()?;
            self.field("notifications", notifications, &actual);
        }
        if let Some(result_stack) = &expected.result_stack {
            let actual = snapshot_stack(engine.result_stack().iter())?;
            self.field("resultStack", result_stack, &actual);
        }
        if let Some(invocation_stack) = &expected.invocation_stack {
            let actual = engine
                .invocation_stack()
                .iter()
                .rev()
                .map(snapshot_context)
                .collect::<Result<Vec<_>, _>>()?;
            self.field("invocationStack", invocation_stack, &actual);
        }
        Ok(())
    }

    fn field<T: PartialEq + fmt::Debug>(&mut self, field: &'static str, expected: &T, actual: &T) {
        if expected != actual {
            self.mismatches.push(Mismatch {
                test: self.test.to_string(),
                step: self.step.to_string(),
                field,
                expected: format!("{expected:?}"),
                actual: format!("{actual:?}"),
            });
        }
    }
}

/// Snapshots a bottom-first iterator as a top-first list.
fn snapshot_stack<'a>(
    items: impl DoubleEndedIterator<Item = &'a StackItem>,
) -> Result<Vec<VmTestItem>, TestVectorError> {
    items.rev().map(VmTestItem::snapshot).collect()
}

fn snapshot_context(context: &ExecutionContext) -> Result<ExpectedContext, TestVectorError> {
    Ok(ExpectedContext {
        script_hash: context.script_hash().to_string(),
        next_instruction: context.next_opcode().map(|opcode| opcode.to_string()),
        instruction_pointer: context.instruction_pointer(),
        alt_stack: snapshot_stack(context.alt_stack().iter())?,
        evaluation_stack: snapshot_stack(context.evaluation_stack().iter())?,
    })
}

fn decode_hex(field: &str, text: &str) -> Result<Vec<u8>, TestVectorError> {
    let text = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(text).map_err(|e| TestVectorError::Hex {
        field: field.to_string(),
        message: e.to_string(),
    })
}

mod decimal {
    use num_bigint::BigInt;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let text = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::String(text) => text,
            other => return Err(D::Error::custom(format!("expected an integer, got {other}"))),
        };
        text.parse()
            .map_err(|_| D::Error::custom(format!("invalid integer {text}")))
    }
}

mod hex_text {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let digits = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(digits).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptHash;

    const ADD_SUITE: &str = r#"{
        "category": "Arithmetic",
        "name": "ADD",
        "tests": [{
            "name": "1 + 2",
            "script": "515293",
            "steps": [
                {
                    "actions": ["StepInto", "StepInto"],
                    "result": {
                        "state": "NONE",
                        "gasConsumed": 0,
                        "invocationStack": [{
                            "scriptHash": "HASH",
                            "nextInstruction": "ADD",
                            "instructionPointer": 2,
                            "evaluationStack": [
                                { "type": "Integer", "value": 2 },
                                { "type": "Integer", "value": "1" }
                            ]
                        }]
                    }
                },
                {
                    "name": "finish",
                    "actions": ["Execute"],
                    "result": {
                        "state": "HALT",
                        "gasConsumed": 1,
                        "resultStack": [{ "type": "Integer", "value": "3" }],
                        "invocationStack": []
                    }
                }
            ]
        }]
    }"#;

    fn add_suite() -> VmTestSuite {
        let hash = ScriptHash::of(&[0x51, 0x52, 0x93]).to_string();
        VmTestSuite::from_json(&ADD_SUITE.replace("HASH", &hash)).unwrap()
    }

    #[test]
    fn test_passing_suite_has_no_mismatches() {
        let mismatches = TestVectorRunner::new().run_suite(&add_suite()).unwrap();
        assert!(mismatches.is_empty(), "{mismatches:?}");
    }

    #[test]
    fn test_mismatch_is_reported() {
        let mut suite = add_suite();
        suite.tests[0].steps[1].result.result_stack = Some(vec![VmTestItem::Integer(4.into())]);

        let mismatches = TestVectorRunner::new().run_suite(&suite).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, "resultStack");
        assert_eq!(mismatches[0].step, "finish");
    }

    #[test]
    fn test_clean_resets_state_and_keeps_gas() {
        let json = r#"{
            "category": "Control",
            "name": "Clean",
            "tests": [{
                "name": "clean after halt",
                "script": "515293",
                "steps": [{
                    "actions": ["Execute", "Clean"],
                    "result": { "state": "NONE", "gasConsumed": 1, "resultStack": [], "invocationStack": [] }
                }]
            }]
        }"#;
        let suite = VmTestSuite::from_json(json).unwrap();
        assert!(TestVectorRunner::new().run_suite(&suite).unwrap().is_empty());
    }

    #[test]
    fn test_item_json_form() {
        let item = VmTestItem::Map(vec![VmTestMapEntry {
            key: VmTestItem::ByteArray(vec![0xAB]),
            value: VmTestItem::Array(vec![VmTestItem::Boolean(true)]),
        }]);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "Map",
                "value": [{
                    "key": { "type": "ByteArray", "value": "0xab" },
                    "value": { "type": "Array", "value": [{ "type": "Boolean", "value": true }] }
                }]
            })
        );
        let back: VmTestItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_snapshot_rejects_cycles() {
        let array = StackItem::new_array(Vec::new());
        if let StackItem::Array(inner) = &array {
            inner.push(array.clone());
        }
        assert!(matches!(
            VmTestItem::snapshot(&array),
            Err(TestVectorError::TooDeep)
        ));
    }

    #[test]
    fn test_bad_fixtures_are_errors() {
        let mut suite = add_suite();
        suite.tests[0].script = "zz".to_string();
        assert!(matches!(
            TestVectorRunner::new().run_suite(&suite),
            Err(TestVectorError::Hex { .. })
        ));

        let mut suite = add_suite();
        suite.tests[0].script_table = vec![VmTestScript {
            script: "66".to_string(),
            properties: vec!["Mintable".to_string()],
        }];
        assert!(matches!(
            TestVectorRunner::new().run_suite(&suite),
            Err(TestVectorError::UnknownProperty(_))
        ));
    }
}
