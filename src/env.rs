// ABOUTME: Environment module for managing the global and per-call variable bindings

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A flat binding table. TL has no lexical nesting beyond the single
/// local/global split described in spec.md section 3 — a function call's
/// local environment is a snapshot copy of the global environment at call
/// time (see DESIGN.md "Environment seeding"), not a parent-linked scope.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
}

impl Environment {
    /// Creates a fresh, empty environment (used both for the global scope
    /// and, with `snapshot_of`, as the starting point for a call frame).
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Creates a new environment whose bindings are a clone of `global`'s
    /// bindings at this instant — the "snapshot" a function call's local
    /// scope is seeded from.
    pub fn snapshot_of(global: &Environment) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(global.bindings.borrow().clone()),
        })
    }

    /// Defines (or overwrites) a binding in this scope.
    pub fn define(&self, name: String, value: Value) {
        self.bindings.borrow_mut().insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Updates an existing binding in place. Panics if `name` isn't already
    /// bound here — callers must check `contains` first, matching the
    /// evaluator's explicit local/global/new three-way assignment rule.
    pub fn update(&self, name: &str, value: Value) {
        debug_assert!(self.contains(name));
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get() {
        let env = Environment::new();
        env.define("x".to_string(), Value::Integer(42));
        match env.get("x") {
            Some(Value::Integer(n)) => assert_eq!(n, 42),
            _ => panic!("expected Integer(42)"),
        }
    }

    #[test]
    fn undefined_symbol_is_none() {
        let env = Environment::new();
        assert!(env.get("undefined").is_none());
    }

    #[test]
    fn snapshot_copies_bindings_but_not_future_writes() {
        let global = Environment::new();
        global.define("x".to_string(), Value::Integer(1));

        let local = Environment::snapshot_of(&global);
        assert!(local.contains("x"));

        // Writing to the snapshot does not affect the source environment.
        local.update("x", Value::Integer(2));
        assert_eq!(global.get("x"), Some(Value::Integer(1)));
        assert_eq!(local.get("x"), Some(Value::Integer(2)));

        // Writing to the source after the snapshot was taken does not
        // retroactively appear in the snapshot either.
        global.define("y".to_string(), Value::Integer(3));
        assert!(!local.contains("y"));
    }

    #[test]
    fn redeclaration_in_same_scope_overwrites() {
        let env = Environment::new();
        env.define("x".to_string(), Value::Integer(1));
        env.define("x".to_string(), Value::Integer(2));
        assert_eq!(env.get("x"), Some(Value::Integer(2)));
    }
}
