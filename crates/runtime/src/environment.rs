use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

use crate::symbols::SymbolId;
use crate::values::{RuntimeVal, ValueKind};

pub type EnvRef = Rc<RefCell<Env>>;

#[derive(Error, Debug, PartialEq)]
pub enum EnvError {
    #[error("undeclared variable: '{0}'")]
    UndeclaredVar(String),

    #[error("assignment to undeclared variable: '{0}'")]
    AssignToUndeclared(String),

    #[error("cannot assign to constant '{0}'")]
    AssignToConst(String),
}

/// One lexical scope. A child owns its bindings and keeps its parent alive
/// for as long as it runs, the parent never knows its children.
#[derive(Debug, Default)]
pub struct Env {
    parent: Option<EnvRef>,
    vars: HashMap<String, RuntimeVal>,
    constants: HashSet<String>,
    // Kind each local accepts on assignment, kept when it holds nil
    kinds: HashMap<String, ValueKind>,
    // Symbol table entry of the declaration behind each local name
    symbols: HashMap<String, SymbolId>,
}

impl Env {
    // Option allow to not have a parent (the global env)
    pub fn new(parent: Option<EnvRef>) -> Self {
        Self {
            parent,
            ..Default::default()
        }
    }

    pub fn global() -> EnvRef {
        Rc::new(RefCell::new(Env::new(None)))
    }

    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Env::new(Some(parent.clone()))))
    }

    /// Creates or overwrites the binding in this frame only.
    pub fn define(&mut self, name: &str, value: RuntimeVal) {
        self.constants.remove(name);
        self.kinds.insert(name.to_string(), value.kind());
        self.vars.insert(name.to_string(), value);
    }

    pub fn define_const(&mut self, name: &str, value: RuntimeVal) {
        self.kinds.insert(name.to_string(), value.kind());
        self.vars.insert(name.to_string(), value);
        self.constants.insert(name.to_string());
    }

    /// Declared kind of a local, for a value that does not tell it (nil).
    pub fn set_kind(&mut self, name: &str, kind: ValueKind) {
        if self.vars.contains_key(name) {
            self.kinds.insert(name.to_string(), kind);
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        if self.vars.contains_key(name) {
            return self.kinds.get(name).copied();
        }

        self.parent.as_ref()?.borrow().kind_of(name)
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<RuntimeVal> {
        match self.vars.get(name) {
            Some(val) => Some(val.clone()),
            None => self.parent.as_ref()?.borrow().get(name),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.vars.contains_key(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.borrow().exists(name))
    }

    /// Writes to the closest frame defining the name.
    pub fn set(&mut self, name: &str, value: RuntimeVal) -> Result<(), EnvError> {
        if let Some(slot) = self.vars.get_mut(name) {
            *slot = value;
            return Ok(());
        }

        match &self.parent {
            Some(parent) => parent.borrow_mut().set(name, value),
            None => Err(EnvError::AssignToUndeclared(name.to_string())),
        }
    }

    pub fn is_const(&self, name: &str) -> bool {
        if self.vars.contains_key(name) {
            return self.constants.contains(name);
        }

        self.parent
            .as_ref()
            .is_some_and(|parent| parent.borrow().is_const(name))
    }

    /// The frame where the name is defined, used to build pointers.
    pub fn resolve(env: &EnvRef, name: &str) -> Option<EnvRef> {
        if env.borrow().vars.contains_key(name) {
            return Some(env.clone());
        }

        let parent = env.borrow().parent.clone()?;
        Env::resolve(&parent, name)
    }

    pub fn bind_symbol(&mut self, name: &str, id: SymbolId) {
        self.symbols.insert(name.to_string(), id);
    }

    // Entry of the declaration the name currently resolves to
    pub fn symbol_of(&self, name: &str) -> Option<SymbolId> {
        if self.vars.contains_key(name) {
            return self.symbols.get(name).copied();
        }

        self.parent.as_ref()?.borrow().symbol_of(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_walks_the_parent_chain() {
        let global = Env::global();
        global.borrow_mut().define("x", RuntimeVal::Int32(1));

        let child = Env::child(&global);
        let grand_child = Env::child(&child);

        assert_eq!(grand_child.borrow().get("x"), Some(RuntimeVal::Int32(1)));
        assert!(grand_child.borrow().exists("x"));
        assert!(!grand_child.borrow().has_local("x"));
        assert_eq!(grand_child.borrow().get("y"), None);
    }

    #[test]
    fn define_shadows_locally() {
        let global = Env::global();
        global.borrow_mut().define("x", RuntimeVal::Int32(1));

        let child = Env::child(&global);
        child.borrow_mut().define("x", RuntimeVal::Str("inner".into()));

        assert_eq!(child.borrow().get("x"), Some(RuntimeVal::Str("inner".into())));
        assert_eq!(global.borrow().get("x"), Some(RuntimeVal::Int32(1)));
    }

    #[test]
    fn set_writes_to_defining_frame() {
        let global = Env::global();
        global.borrow_mut().define("count", RuntimeVal::Int32(0));

        let child = Env::child(&global);
        child
            .borrow_mut()
            .set("count", RuntimeVal::Int32(3))
            .unwrap();

        assert_eq!(global.borrow().get("count"), Some(RuntimeVal::Int32(3)));
        assert!(!child.borrow().has_local("count"));
    }

    #[test]
    fn set_undeclared_fails() {
        let global = Env::global();
        let child = Env::child(&global);

        assert_eq!(
            child.borrow_mut().set("ghost", RuntimeVal::Nil),
            Err(EnvError::AssignToUndeclared("ghost".into()))
        );
    }

    #[test]
    fn constants_are_tracked_per_frame() {
        let global = Env::global();
        global.borrow_mut().define_const("pi", RuntimeVal::Float32(3.14));

        let child = Env::child(&global);
        assert!(child.borrow().is_const("pi"));

        // A local variable shadowing the constant is not constant
        child.borrow_mut().define("pi", RuntimeVal::Int32(3));
        assert!(!child.borrow().is_const("pi"));
    }

    #[test]
    fn resolve_finds_the_owner() {
        let global = Env::global();
        global.borrow_mut().define("x", RuntimeVal::Int32(1));
        let child = Env::child(&global);

        let owner = Env::resolve(&child, "x").unwrap();
        assert!(Rc::ptr_eq(&owner, &global));
        assert!(Env::resolve(&child, "nope").is_none());
    }

    #[test]
    fn symbols_follow_the_declaration() {
        let global = Env::global();
        global.borrow_mut().define("x", RuntimeVal::Int32(1));
        global.borrow_mut().bind_symbol("x", 0);

        let child = Env::child(&global);
        child.borrow_mut().define("x", RuntimeVal::Int32(2));
        child.borrow_mut().bind_symbol("x", 4);

        assert_eq!(child.borrow().symbol_of("x"), Some(4));
        assert_eq!(Env::child(&global).borrow().symbol_of("x"), Some(0));
    }

    #[test]
    fn declared_kind_outlives_a_nil_value() {
        let global = Env::global();
        global.borrow_mut().define("q", RuntimeVal::Nil);
        global.borrow_mut().set_kind("q", ValueKind::Int32);
        global.borrow_mut().set_kind("ghost", ValueKind::Int32);

        let child = Env::child(&global);
        child.borrow_mut().set("q", RuntimeVal::Int32(4)).unwrap();

        assert_eq!(child.borrow().kind_of("q"), Some(ValueKind::Int32));
        assert_eq!(child.borrow().kind_of("ghost"), None);
    }
}
