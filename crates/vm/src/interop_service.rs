//! Interop service module for the virtual machine.
//!
//! This module resolves the names scripts pass to `SYSCALL` into host
//! handlers. A service is populated once by the host and then shared,
//! read-only, by every engine it is handed to.

use crate::enumerator::{
    enumerate, ArrayEnumerator, ConcatEnumerator, EnumeratorKind, EnumeratorObject,
    ProjectionEnumerator, SharedEnumerator,
};
use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::StackItem;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A host function invocable from scripts.
///
/// Returns `Ok(false)` for a logical failure the script may not continue
/// past; returning `Err` faults the engine with that error.
pub type InteropHandler = Arc<dyn Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync>;

/// Result code of a dispatched syscall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteropResult {
    /// The handler ran and succeeded.
    True,

    /// The handler ran and reported a failure.
    False,

    /// No handler is registered under the name.
    NotFound,

    /// The handler's price could not be paid; it did not run.
    OutOfGas,
}

/// Represents an interop descriptor.
#[derive(Clone)]
pub struct InteropDescriptor {
    /// The name scripts call the method by
    pub name: String,

    /// The fee charged before the handler runs
    pub price: u64,

    /// The handler function
    pub handler: InteropHandler,
}

impl InteropDescriptor {
    pub fn new<F>(name: impl Into<String>, price: u64, handler: F) -> Self
    where
        F: Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            price,
            handler: Arc::new(handler),
        }
    }
}

impl fmt::Debug for InteropDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteropDescriptor")
            .field("name", &self.name)
            .field("price", &self.price)
            .finish_non_exhaustive()
    }
}

/// Provides interoperability between the VM and the host.
#[derive(Debug, Clone, Default)]
pub struct InteropService {
    methods: HashMap<String, InteropDescriptor>,
}

impl InteropService {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with the runtime, execution engine, enumerator and
    /// iterator methods registered.
    pub fn with_standard_services() -> Self {
        let mut service = Self::new();
        service.register_runtime_methods();
        service.register_engine_methods();
        service.register_enumerator_methods();
        service
    }

    /// Registers an interop method, replacing any method of the same name.
    pub fn register(&mut self, descriptor: InteropDescriptor) {
        self.methods.insert(descriptor.name.clone(), descriptor);
    }

    /// Registers `handler` under `name`.
    pub fn register_fn<F>(&mut self, name: &str, price: u64, handler: F)
    where
        F: Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync + 'static,
    {
        self.register(InteropDescriptor::new(name, price, handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Gets the price of an interop method.
    pub fn price(&self, name: &str) -> Option<u64> {
        self.methods.get(name).map(|d| d.price)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Charges the method's price to `engine` and runs it.
    ///
    /// Errors raised by the handler itself are returned as `Err`.
    pub fn invoke(&self, engine: &mut ExecutionEngine, name: &str) -> VmResult<InteropResult> {
        let Some(descriptor) = self.methods.get(name) else {
            log::debug!("syscall {name} is not registered");
            return Ok(InteropResult::NotFound);
        };

        if let Err(error) = engine.consume_gas(descriptor.price) {
            if error.is_out_of_gas() {
                return Ok(InteropResult::OutOfGas);
            }
            return Err(error);
        }

        log::debug!("syscall {name}");
        if (descriptor.handler)(engine)? {
            Ok(InteropResult::True)
        } else {
            Ok(InteropResult::False)
        }
    }

    fn register_runtime_methods(&mut self) {
        for prefix in ["System", "Neo"] {
            self.register_fn(&format!("{prefix}.Runtime.GetTrigger"), 1, |engine| {
                let trigger = engine.trigger().to_byte();
                engine.push(StackItem::from_int(trigger as i64))?;
                Ok(true)
            });

            self.register_fn(&format!("{prefix}.Runtime.Log"), 1, |engine| {
                let message = engine.pop()?.as_bytes()?;
                engine.add_log(String::from_utf8_lossy(&message).into_owned())?;
                Ok(true)
            });

            self.register_fn(&format!("{prefix}.Runtime.Notify"), 1, |engine| {
                let state = engine.pop()?;
                engine.add_notification(state)?;
                Ok(true)
            });
        }
    }

    fn register_engine_methods(&mut self) {
        self.register_fn(
            "System.ExecutionEngine.GetScriptContainer",
            1,
            |engine| {
                let container = StackItem::from_byte_array(engine.script_container().to_vec())?;
                engine.push(container)?;
                Ok(true)
            },
        );

        self.register_fn(
            "System.ExecutionEngine.GetExecutingScriptHash",
            1,
            |engine| {
                let hash = engine.current_script_hash()?;
                engine.push(StackItem::ByteArray(hash.to_vec()))?;
                Ok(true)
            },
        );

        self.register_fn("System.ExecutionEngine.GetCallingScriptHash", 1, |engine| {
            let hash = engine
                .calling_context()
                .map(|context| context.script_hash().to_vec())
                .unwrap_or_default();
            engine.push(StackItem::ByteArray(hash))?;
            Ok(true)
        });

        self.register_fn("System.ExecutionEngine.GetEntryScriptHash", 1, |engine| {
            let hash = engine
                .entry_context()
                .map(|context| context.script_hash().to_vec())
                .unwrap_or_default();
            engine.push(StackItem::ByteArray(hash))?;
            Ok(true)
        });
    }

    fn register_enumerator_methods(&mut self) {
        self.register_fn("Neo.Enumerator.Create", 1, |engine| {
            let item = engine.pop()?;
            let Some(array) = item.as_array() else {
                return Ok(false);
            };
            let enumerator = ArrayEnumerator::new(array.clone());
            engine.push(StackItem::from_interface(EnumeratorObject::new(
                EnumeratorKind::Enumerator,
                Box::new(enumerator),
            )))?;
            Ok(true)
        });

        for name in ["Neo.Enumerator.Next", "Neo.Iterator.Next"] {
            self.register_fn(name, 1, |engine| {
                let item = engine.pop()?;
                let moved = item.as_interface::<EnumeratorObject>()?.move_next();
                engine.push(StackItem::from_bool(moved))?;
                Ok(true)
            });
        }

        for name in ["Neo.Enumerator.Value", "Neo.Iterator.Value"] {
            self.register_fn(name, 1, |engine| {
                let item = engine.pop()?;
                let value = item
                    .as_interface::<EnumeratorObject>()?
                    .current()
                    .ok_or_else(|| VmError::invalid_operation("enumerator has no current value"))?;
                engine.push(value)?;
                Ok(true)
            });
        }

        for (name, kind) in [
            ("Neo.Enumerator.Concat", EnumeratorKind::Enumerator),
            ("Neo.Iterator.Concat", EnumeratorKind::Iterator),
        ] {
            self.register_fn(name, 1, move |engine| {
                let first = SharedEnumerator::from_item(&engine.pop()?)?;
                let second = SharedEnumerator::from_item(&engine.pop()?)?;
                let concat = ConcatEnumerator::new(vec![Box::new(first), Box::new(second)]);
                engine.push(StackItem::from_interface(EnumeratorObject::new(
                    kind,
                    Box::new(concat),
                )))?;
                Ok(true)
            });
        }

        self.register_fn("Neo.Iterator.Create", 1, |engine| {
            let item = engine.pop()?;
            let Ok(entries) = enumerate(&item) else {
                return Ok(false);
            };
            let iterator = EnumeratorObject::new(EnumeratorKind::Iterator, entries);
            engine.push(StackItem::from_interface(iterator))?;
            Ok(true)
        });

        self.register_fn("Neo.Iterator.Key", 1, |engine| {
            let item = engine.pop()?;
            let iterator = item.as_interface::<EnumeratorObject>()?;
            if iterator.kind() != EnumeratorKind::Iterator {
                return Err(VmError::invalid_operation("enumerator has no keys"));
            }
            let key = iterator
                .key()
                .ok_or_else(|| VmError::invalid_operation("iterator has no current key"))?;
            engine.push(key)?;
            Ok(true)
        });

        self.register_fn("Neo.Iterator.Keys", 1, |engine| {
            let source = SharedEnumerator::from_item(&engine.pop()?)?;
            engine.push(StackItem::from_interface(EnumeratorObject::new(
                EnumeratorKind::Enumerator,
                Box::new(ProjectionEnumerator::keys(Box::new(source))),
            )))?;
            Ok(true)
        });

        self.register_fn("Neo.Iterator.Values", 1, |engine| {
            let source = SharedEnumerator::from_item(&engine.pop()?)?;
            engine.push(StackItem::from_interface(EnumeratorObject::new(
                EnumeratorKind::Enumerator,
                Box::new(ProjectionEnumerator::values(Box::new(source))),
            )))?;
            Ok(true)
        });
    }
}
