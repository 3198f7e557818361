//! Host objects carried on the stack.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A trait for interop interfaces that can be wrapped by a stack item.
///
/// The engine treats the object as opaque: it compares by identity and, in
/// the canonical wire form, writes only the type name and [`handle`].
///
/// [`handle`]: InteropInterface::handle
pub trait InteropInterface: fmt::Debug + Send + Sync {
    /// Gets the type of the interop interface.
    fn interface_type(&self) -> &str;

    /// Allows downcasting to concrete types
    fn as_any(&self) -> &dyn Any;

    /// Host-defined handle identifying the object outside the engine.
    fn handle(&self) -> u64 {
        0
    }
}

/// Builds an interop object back from its serialized handle.
pub type InteropConstructor = fn(u64) -> Arc<dyn InteropInterface>;

/// Maps interop type names to constructors, used when reading the canonical
/// form of an InteropInterface item.
///
/// The registry is populated by the host before any engine runs and is read
/// only afterwards.
#[derive(Default, Clone)]
pub struct InteropTypeRegistry {
    constructors: HashMap<String, InteropConstructor>,
}

impl InteropTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `type_name`, replacing any previous entry.
    pub fn register(&mut self, type_name: impl Into<String>, constructor: InteropConstructor) {
        self.constructors.insert(type_name.into(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Constructs an object of `type_name`, or `None` if the name is unknown.
    pub fn construct(&self, type_name: &str, handle: u64) -> Option<Arc<dyn InteropInterface>> {
        self.constructors.get(type_name).map(|ctor| ctor(handle))
    }
}

impl fmt::Debug for InteropTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Account(u64);

    impl InteropInterface for Account {
        fn interface_type(&self) -> &str {
            "Account"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn handle(&self) -> u64 {
            self.0
        }
    }

    fn account(handle: u64) -> Arc<dyn InteropInterface> {
        Arc::new(Account(handle))
    }

    #[test]
    fn test_registry_constructs_registered_types() {
        let mut registry = InteropTypeRegistry::new();
        registry.register("Account", account);

        let object = registry.construct("Account", 9).unwrap();
        assert_eq!(object.interface_type(), "Account");
        assert_eq!(object.handle(), 9);
        assert!(object.as_any().downcast_ref::<Account>().is_some());
        assert!(registry.construct("Block", 1).is_none());
    }
}
