use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Object;

/// A lexical scope shared by reference. Cloning an `Environment` yields a
/// handle to the same scope, which is how closures capture their definition
/// site.
///
/// A closure stored in the scope it captured forms an `Rc` cycle and is not
/// reclaimed until the process exits.
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

#[derive(Default)]
struct Scope {
    store: FxHashMap<String, Object>,
    outer: Option<Environment>,
}

impl Environment {
    pub fn new_root() -> Self {
        Self::default()
    }

    pub fn new_child(parent: &Environment) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            store: FxHashMap::default(),
            outer: Some(parent.clone()),
        })))
    }

    /// Looks `name` up in this scope and then each enclosing one.
    pub fn get(&self, name: &str) -> Option<Object> {
        let mut scope = self.clone();
        loop {
            let outer = {
                let inner = scope.0.borrow();
                if let Some(value) = inner.store.get(name) {
                    return Some(value.clone());
                }
                inner.outer.clone()
            };
            scope = outer?;
        }
    }

    /// Binds `name` in this scope, shadowing any outer binding.
    pub fn set(&self, name: impl Into<String>, value: Object) {
        self.0.borrow_mut().store.insert(name.into(), value);
    }

    /// Rebinds `name` in the nearest scope that already holds it. Returns
    /// `false` when no scope does.
    pub fn update(&self, name: &str, value: Object) -> bool {
        let mut scope = self.clone();
        loop {
            let outer = {
                let mut inner = scope.0.borrow_mut();
                if let Some(slot) = inner.store.get_mut(name) {
                    *slot = value;
                    return true;
                }
                inner.outer.clone()
            };
            match outer {
                Some(next) => scope = next,
                None => return false,
            }
        }
    }

    /// Names bound directly in this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.0.borrow().store.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

impl fmt::Debug for Environment {
    // Bound values may be closures holding this very scope, so only names
    // are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names())
            .field("has_outer", &self.0.borrow().outer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer(env: &Environment, name: &str) -> Option<i64> {
        match env.get(name) {
            Some(Object::Integer(value)) => Some(value),
            Some(other) => panic!("expected integer for {name}, got {other}"),
            None => None,
        }
    }

    #[test]
    fn child_reads_through_to_parent() {
        let root = Environment::new_root();
        root.set("x", Object::Integer(1));
        let child = Environment::new_child(&root);
        assert_eq!(integer(&child, "x"), Some(1));
        assert_eq!(integer(&child, "missing"), None);
    }

    #[test]
    fn set_shadows_without_touching_parent() {
        let root = Environment::new_root();
        root.set("x", Object::Integer(1));
        let child = Environment::new_child(&root);
        child.set("x", Object::Integer(2));
        assert_eq!(integer(&child, "x"), Some(2));
        assert_eq!(integer(&root, "x"), Some(1));
    }

    #[test]
    fn update_rebinds_nearest_holder() {
        let root = Environment::new_root();
        root.set("x", Object::Integer(1));
        let middle = Environment::new_child(&root);
        let leaf = Environment::new_child(&middle);

        assert!(leaf.update("x", Object::Integer(5)));
        assert_eq!(integer(&root, "x"), Some(5));
        assert!(middle.names().is_empty());

        assert!(!leaf.update("y", Object::Integer(1)));
        assert_eq!(integer(&leaf, "y"), None);
    }

    #[test]
    fn clones_share_one_scope() {
        let env = Environment::new_root();
        let alias = env.clone();
        alias.set("z", Object::Integer(3));
        assert_eq!(integer(&env, "z"), Some(3));
        assert_eq!(format!("{env:?}"), r#"Environment { names: ["z"], has_outer: false }"#);
    }
}
