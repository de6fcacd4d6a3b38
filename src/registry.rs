//! Operation registry.
//!
//! An explicit value built once at start-up and handed to the
//! orchestrator. Ids map to shared operation instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::detect::{
    DependencyCycles, DuplicateTypes, ImportConflicts, NamingConventions, UndefinedReferences,
};
use crate::error::RegistryError;
use crate::operation::{AnalyzerOperation, Operation};

/// Ids of the operations shipped with declcheck, in registration order.
pub const BUILTIN_OPERATIONS: &[&str] = &[
    "duplicate-types",
    "import-conflicts",
    "naming",
    "undefined-refs",
    "dependency-graph",
];

/// Built-in dispatch table for well-known ids.
pub fn builtin_operation(id: &str) -> Option<Arc<dyn Operation>> {
    let op: Arc<dyn Operation> = match id {
        "duplicate-types" => Arc::new(AnalyzerOperation::new(DuplicateTypes)),
        "import-conflicts" => Arc::new(AnalyzerOperation::new(ImportConflicts)),
        "naming" => Arc::new(AnalyzerOperation::new(NamingConventions)),
        "undefined-refs" => Arc::new(AnalyzerOperation::new(UndefinedReferences)),
        "dependency-graph" => Arc::new(AnalyzerOperation::new(DependencyCycles)),
        _ => return None,
    };
    Some(op)
}

#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
    order: Vec<String>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding one instance of every built-in operation.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for id in BUILTIN_OPERATIONS {
            if let Some(op) = builtin_operation(id) {
                registry.order.push(id.to_string());
                registry.operations.insert(id.to_string(), op);
            }
        }
        registry
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        operation: Arc<dyn Operation>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if self.operations.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        self.order.push(id.clone());
        self.operations.insert(id, operation);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Operation>, RegistryError> {
        self.operations
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Registered ids in registration order.
    pub fn list(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_in_order() {
        let registry = OperationRegistry::with_builtins();
        assert_eq!(registry.list(), BUILTIN_OPERATIONS);
        assert_eq!(registry.list(), registry.list());
        assert_eq!(registry.get("naming").unwrap().id(), "naming");
    }

    #[test]
    fn test_builtins_registered_under_their_own_ids() {
        let registry = OperationRegistry::with_builtins();
        assert_eq!(registry.len(), BUILTIN_OPERATIONS.len());
        for id in BUILTIN_OPERATIONS {
            assert_eq!(registry.get(id).unwrap().id(), *id);
        }
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = OperationRegistry::new();
        let op = builtin_operation("duplicate-types").unwrap();
        registry.register("duplicate-types", op.clone()).unwrap();
        assert_eq!(
            registry.register("duplicate-types", op).unwrap_err(),
            RegistryError::AlreadyRegistered("duplicate-types".to_string())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let registry = OperationRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(registry.get("nope"), Err(RegistryError::NotFound(id)) if id == "nope"));
        assert!(builtin_operation("nope").is_none());
    }
}
