// File: src/interpreter/environment.rs
//
// Lexical scoping environment for the keai interpreter.
//
// Environments form a chain of frames: each function call and each
// foreach loop pushes a child frame whose parent link is shared (`Rc`),
// so closures keep their defining scope alive. Bindings are immutable
// (`let`) or mutable (`mutable`); temporary frames carry a permit set
// that redirects writes to all other names outward.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::{HashKey, HashPair, HashStore, Value};

/// Shared handle to a scope frame.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Debug)]
pub struct Environment {
    store: HashMap<String, Binding>,
    parent: Option<Env>,
    /// When present, writes to names outside this set delegate to the
    /// parent frame. Used by foreach for its loop variables.
    permit: Option<Vec<String>>,
    /// The enclosing call's positional arguments; the target of `...`.
    pub current_args: Vec<Value>,
}

impl Environment {
    /// A fresh top-level environment.
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            parent: None,
            permit: None,
            current_args: Vec::new(),
        }))
    }

    /// A child frame for a function call, carrying the call's arguments.
    pub fn new_enclosed(parent: &Env, args: Vec<Value>) -> Env {
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            parent: Some(Rc::clone(parent)),
            permit: None,
            current_args: args,
        }))
    }

    /// A temporary frame whose permit set names the only bindings that
    /// live here; everything else writes through to the parent.
    pub fn new_temporary(parent: &Env, permit: Vec<String>) -> Env {
        let args = parent.borrow().current_args.clone();
        Rc::new(RefCell::new(Environment {
            store: HashMap::new(),
            parent: Some(Rc::clone(parent)),
            permit: Some(permit),
            current_args: args,
        }))
    }

    /// Walks self and then the parent chain, returning the first match.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.store.get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    fn delegates(&self, name: &str) -> bool {
        match &self.permit {
            Some(permit) => !permit.iter().any(|p| p == name),
            None => false,
        }
    }

    /// Re-assigns an existing binding. Fails on immutable bindings and
    /// on names that exist nowhere in the chain.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), String> {
        if self.delegates(name) {
            if let Some(parent) = &self.parent {
                return parent.borrow_mut().set(name, value);
            }
        }
        if let Some(binding) = self.store.get_mut(name) {
            if !binding.mutable {
                return Err(format!("`{}` is immutable", name));
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().set(name, value),
            None => Err(format!("`{}` has not been declared", name)),
        }
    }

    /// Introduces an immutable binding in the nearest frame that permits
    /// it (temporary frames delegate like `set`).
    pub fn set_let(&mut self, name: &str, value: Value) {
        if self.delegates(name) {
            if let Some(parent) = &self.parent {
                parent.borrow_mut().set_let(name, value);
                return;
            }
        }
        self.store.insert(name.to_string(), Binding { value, mutable: false });
    }

    /// Introduces a mutable binding in this frame.
    pub fn set_mutable(&mut self, name: &str, value: Value) {
        self.store.insert(name.to_string(), Binding { value, mutable: true });
    }

    /// Snapshots this frame's public bindings (names not starting with
    /// an underscore) into a Hash. Parent frames are not consulted;
    /// modules are evaluated with this frame on top.
    pub fn exported_hash(&self) -> Value {
        let mut store = HashStore::new();
        for (name, binding) in &self.store {
            if name.starts_with('_') {
                continue;
            }
            store.insert(
                HashKey::Str(name.clone()),
                HashPair { key: Value::str(name.clone()), value: binding.value.clone() },
            );
        }
        Value::hash(store)
    }
}

#[cfg(test)]
mod tests {
    use super::Environment;
    use crate::interpreter::Value;

    #[test]
    fn test_get_walks_parent_chain() {
        let outer = Environment::new();
        outer.borrow_mut().set_let("x", Value::Int(1));
        let inner = Environment::new_enclosed(&outer, vec![]);
        assert!(matches!(inner.borrow().get("x"), Some(Value::Int(1))));
        assert!(inner.borrow().get("y").is_none());
    }

    #[test]
    fn test_set_rejects_immutable_and_unknown() {
        let env = Environment::new();
        env.borrow_mut().set_let("a", Value::Int(1));
        assert!(env.borrow_mut().set("a", Value::Int(2)).is_err());
        assert!(env.borrow_mut().set("missing", Value::Int(2)).is_err());

        env.borrow_mut().set_mutable("b", Value::Int(1));
        assert!(env.borrow_mut().set("b", Value::Int(2)).is_ok());
        assert!(matches!(env.borrow().get("b"), Some(Value::Int(2))));
    }

    #[test]
    fn test_set_updates_outer_binding() {
        let outer = Environment::new();
        outer.borrow_mut().set_mutable("count", Value::Int(0));
        let inner = Environment::new_enclosed(&outer, vec![]);
        assert!(inner.borrow_mut().set("count", Value::Int(5)).is_ok());
        assert!(matches!(outer.borrow().get("count"), Some(Value::Int(5))));
    }

    #[test]
    fn test_permit_set_redirects_writes() {
        let outer = Environment::new();
        outer.borrow_mut().set_mutable("sum", Value::Int(0));
        let temp = Environment::new_temporary(&outer, vec!["x".to_string()]);

        // the loop variable stays local
        temp.borrow_mut().set_mutable("x", Value::Int(1));
        assert!(outer.borrow().get("x").is_none());

        // writes to other names land outside
        assert!(temp.borrow_mut().set("sum", Value::Int(9)).is_ok());
        assert!(matches!(outer.borrow().get("sum"), Some(Value::Int(9))));

        // and so do let-introductions
        temp.borrow_mut().set_let("fresh", Value::Int(7));
        assert!(matches!(outer.borrow().get("fresh"), Some(Value::Int(7))));
    }

    #[test]
    fn test_exported_hash_skips_private_names() {
        let env = Environment::new();
        env.borrow_mut().set_let("public", Value::Int(1));
        env.borrow_mut().set_let("_private", Value::Int(2));
        let exported = env.borrow().exported_hash();
        match exported {
            Value::Hash(store) => {
                let store = store.borrow();
                assert_eq!(store.len(), 1);
            }
            other => panic!("expected hash, got {:?}", other),
        }
    }
}
