use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

pub type ScopeRef = Rc<RefCell<Scope>>;

/// A runtime scope: a name-to-value map with an optional parent. Closures
/// hold an owning reference to their defining scope, so scopes stay alive as
/// long as any lambda captured them.
#[derive(Debug, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
    pub parent: Option<ScopeRef>,
}

impl Scope {
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Introduce or overwrite a name in this scope.
    pub fn define(scope: &ScopeRef, name: &str, value: Value) {
        scope.borrow_mut().vars.insert(name.to_string(), value);
    }

    /// Look a name up, walking parents on a miss.
    pub fn get(scope: &ScopeRef, name: &str) -> Option<Value> {
        let scope = scope.borrow();
        if let Some(value) = scope.vars.get(name) {
            return Some(value.clone());
        }
        scope.parent.as_ref().and_then(|parent| Scope::get(parent, name))
    }

    /// Update an existing name wherever it lives in the chain. Returns false
    /// if the name is not bound anywhere.
    pub fn assign(scope: &ScopeRef, name: &str, value: Value) -> bool {
        let mut scope = scope.borrow_mut();
        if let Some(slot) = scope.vars.get_mut(name) {
            *slot = value;
            return true;
        }
        match &scope.parent {
            Some(parent) => Scope::assign(parent, name, value),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let root = Scope::root();
        Scope::define(&root, "x", Value::Int(1));
        let child = Scope::child(&root);
        assert!(Scope::get(&child, "x").unwrap().equals(&Value::Int(1)));
    }

    #[test]
    fn test_assign_updates_outer_binding() {
        let root = Scope::root();
        Scope::define(&root, "x", Value::Int(1));
        let child = Scope::child(&root);
        assert!(Scope::assign(&child, "x", Value::Int(2)));
        assert!(Scope::get(&root, "x").unwrap().equals(&Value::Int(2)));
    }

    #[test]
    fn test_shadowing_does_not_touch_outer() {
        let root = Scope::root();
        Scope::define(&root, "x", Value::Int(1));
        let child = Scope::child(&root);
        Scope::define(&child, "x", Value::Int(5));
        assert!(Scope::assign(&child, "x", Value::Int(7)));
        assert!(Scope::get(&root, "x").unwrap().equals(&Value::Int(1)));
    }

    #[test]
    fn test_assign_missing_name_fails() {
        let root = Scope::root();
        assert!(!Scope::assign(&root, "missing", Value::Int(1)));
    }
}
