#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Lexical environments.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use super::value::{Function, Value};

/// Shared handle to a scope.
pub type ScopeRef = Rc<RefCell<Scope>>;

/// A variable slot.
#[derive(Clone)]
struct Binding {
    /// Current value.
    value:   Value,
    /// False for `const` bindings.
    mutable: bool,
}

/// Why an assignment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    /// No scope declares the name.
    Undeclared,
    /// The binding is `const`.
    Constant,
}

/// One environment record in the scope chain.
#[derive(Default)]
pub struct Scope {
    /// Bindings declared here.
    vars:     HashMap<Rc<str>, Binding>,
    /// Enclosing scope.
    parent:   Option<ScopeRef>,
    /// Function and global scopes receive `var` declarations.
    function: bool,
    /// `this` for non-arrow function scopes.
    this:     Option<Value>,
    /// Class that owns the running method, for `super`.
    home:     Option<Weak<Function>>,
}

impl Scope {
    /// The outermost scope of a realm.
    pub fn global() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            function: true,
            this: Some(Value::Undefined),
            ..Scope::default()
        }))
    }

    /// A block scope nested in `parent`.
    pub fn block(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            parent: Some(Rc::clone(parent)),
            ..Scope::default()
        }))
    }

    /// A function scope nested in `parent`. Arrow functions pass `None` for
    /// `this` so lookups continue outwards.
    pub fn function(
        parent: &ScopeRef,
        this: Option<Value>,
        home: Option<Weak<Function>>,
    ) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            parent: Some(Rc::clone(parent)),
            function: true,
            this,
            home,
            ..Scope::default()
        }))
    }

    /// Declares (or redeclares) `name` in this scope.
    pub fn declare(scope: &ScopeRef, name: Rc<str>, value: Value, mutable: bool) {
        scope.borrow_mut().vars.insert(name, Binding { value, mutable });
    }

    /// Declares `name` as `undefined` unless this scope already has it.
    pub fn hoist(scope: &ScopeRef, name: &Rc<str>) {
        scope
            .borrow_mut()
            .vars
            .entry(Rc::clone(name))
            .or_insert(Binding {
                value:   Value::Undefined,
                mutable: true,
            });
    }

    /// Whether this very scope declares `name`.
    pub fn has_own(scope: &ScopeRef, name: &str) -> bool {
        scope.borrow().vars.contains_key(name)
    }

    /// Resolves `name` through the scope chain.
    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        let mut current = Rc::clone(scope);
        loop {
            let parent = {
                let record = current.borrow();
                if let Some(binding) = record.vars.get(name) {
                    return Some(binding.value.clone());
                }
                record.parent.clone()
            };
            current = parent?;
        }
    }

    /// Assigns to the nearest declaration of `name`.
    pub fn assign(scope: &ScopeRef, name: &str, value: Value) -> Result<(), AssignError> {
        let mut current = Rc::clone(scope);
        loop {
            let parent = {
                let mut record = current.borrow_mut();
                if let Some(binding) = record.vars.get_mut(name) {
                    if !binding.mutable {
                        return Err(AssignError::Constant);
                    }
                    binding.value = value;
                    return Ok(());
                }
                record.parent.clone()
            };
            current = parent.ok_or(AssignError::Undeclared)?;
        }
    }

    /// The nearest function (or global) scope, which receives `var`s.
    pub fn function_scope(scope: &ScopeRef) -> ScopeRef {
        let mut current = Rc::clone(scope);
        loop {
            let parent = {
                let record = current.borrow();
                if record.function {
                    None
                } else {
                    record.parent.clone()
                }
            };
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// The `this` value visible from `scope`.
    pub fn this(scope: &ScopeRef) -> Value {
        Self::find(scope, |record| record.this.clone()).unwrap_or(Value::Undefined)
    }

    /// The class owning the running method, if any.
    pub fn home(scope: &ScopeRef) -> Option<Rc<Function>> {
        Self::find(scope, |record| {
            record.this.as_ref()?;
            Some(record.home.as_ref().and_then(Weak::upgrade))
        })
        .flatten()
    }

    /// Copies the current values of `names` into `target`, keeping
    /// mutability. Used to give each loop iteration its own bindings.
    pub fn copy_into(source: &ScopeRef, target: &ScopeRef, names: &[Rc<str>]) {
        let source = source.borrow();
        let mut target = target.borrow_mut();
        for name in names {
            if let Some(binding) = source.vars.get(name) {
                target.vars.insert(Rc::clone(name), binding.clone());
            }
        }
    }

    /// Drops every binding and the parent link so closure cycles are freed.
    pub fn clear(scope: &ScopeRef) {
        let mut record = scope.borrow_mut();
        record.vars.clear();
        record.parent = None;
        record.this = None;
        record.home = None;
    }

    /// Walks outwards until `probe` yields a value.
    fn find<T>(scope: &ScopeRef, probe: impl Fn(&Scope) -> Option<T>) -> Option<T> {
        let mut current = Rc::clone(scope);
        loop {
            let parent = {
                let record = current.borrow();
                if let Some(found) = probe(&record) {
                    return Some(found);
                }
                record.parent.clone()
            };
            current = parent?;
        }
    }
}
