#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-walking evaluator. One [`Interpreter`] is one realm: its global scope
//! and built-ins are created with it and torn down when it is dropped.

use std::{
    cell::RefCell,
    cmp::Ordering,
    rc::{Rc, Weak},
};

use super::{
    ast::*,
    builtins,
    error::{Exception, JsResult},
    scope::{AssignError, Scope, ScopeRef},
    value::{
        ClassData, Function, FunctionKind, MethodFn, Object, PropMap, RegExpData, Value, array_index,
        number_to_string, to_int32, to_uint32,
    },
};

/// Statements and expressions that may be under evaluation at once before a
/// `RangeError` is thrown. Bounds native recursion independently of how
/// much of it each script call uses.
pub const MAX_EVALUATION_NESTING: usize = 1_024;

/// Array elements or string bytes paid for by one operation of the budget.
const ALLOCATION_UNITS_PER_OPERATION: usize = 4;

/// Execution limits for one realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Statements, loop iterations and calls allowed before halting.
    pub max_operations: u64,
    /// Nested script calls allowed before a `RangeError`.
    pub max_call_depth: usize,
    /// Elements of one array or bytes of one string allowed before a
    /// `RangeError`.
    pub max_allocation: usize,
}

/// How a statement completed.
enum Flow {
    /// Fell through.
    Normal,
    /// `return`
    Return(Value),
    /// `break`, optionally labelled.
    Break(Option<Rc<str>>),
    /// `continue`, optionally labelled.
    Continue(Option<Rc<str>>),
}

/// How a pattern introduces its names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindMode {
    /// `let`
    Let,
    /// `const`
    Const,
    /// `var`
    Var,
    /// Plain assignment to existing targets.
    Assign,
}

impl From<VarKind> for BindMode {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => BindMode::Var,
            VarKind::Let => BindMode::Let,
            VarKind::Const => BindMode::Const,
        }
    }
}

/// A resolved assignment target.
enum Reference {
    /// A variable.
    Binding(Rc<str>),
    /// A property of an evaluated object.
    Property(Value, Rc<str>),
}

/// A realm and the machinery to run scripts in it.
pub struct Interpreter {
    /// Global scope.
    global:     ScopeRef,
    /// Execution limits.
    limits:     Limits,
    /// Operations performed so far.
    operations: u64,
    /// Current script call depth.
    depth:      usize,
    /// Statements and expressions currently being evaluated.
    nesting:    usize,
    /// Scopes captured by closures; cleared on drop to free cycles.
    captured:   Vec<Weak<RefCell<Scope>>>,
    /// State of the `Math.random` generator.
    seed:       u64,
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        for scope in self.captured.drain(..) {
            if let Some(scope) = scope.upgrade() {
                Scope::clear(&scope);
            }
        }
        Scope::clear(&self.global);
    }
}

impl Interpreter {
    /// Creates a realm with freshly built globals.
    pub fn new(limits: Limits) -> Self {
        let mut interpreter = Self {
            global: Scope::global(),
            limits,
            operations: 0,
            depth: 0,
            nesting: 0,
            captured: Vec::new(),
            seed: 0x2545_f491_4f6c_dd1d,
        };
        builtins::install(&mut interpreter);
        interpreter
    }

    /// The global scope.
    pub fn global(&self) -> &ScopeRef {
        &self.global
    }

    /// Declares a global binding.
    pub fn define_global(&mut self, name: &str, value: Value) {
        Scope::declare(&self.global, name.into(), value, true);
    }

    /// Runs a program's top-level statements in the global scope.
    pub fn run(&mut self, program: &Program) -> JsResult<()> {
        let global = Rc::clone(&self.global);
        for name in &program.var_names {
            Scope::hoist(&global, name);
        }
        match self.exec_block(&program.body, &global)? {
            Flow::Normal | Flow::Return(_) => Ok(()),
            Flow::Break(_) | Flow::Continue(_) => {
                Err(syntax_error("Illegal break or continue statement"))
            }
        }
    }

    /// Calls the global function `name`.
    pub fn call_global(&mut self, name: &str, args: Vec<Value>) -> JsResult<Value> {
        let callee = Scope::lookup(&self.global, name).ok_or_else(|| reference_error(name))?;
        if !matches!(callee, Value::Function(_)) {
            return Err(type_error(format!("{name} is not a function")));
        }
        self.call(&callee, Value::Undefined, args)
    }

    /// Counts one operation against the budget.
    pub fn tick(&mut self) -> JsResult<()> {
        self.charge(1)
    }

    /// Checks that an array of `length` elements may be created and pays for
    /// it out of the operation budget.
    pub fn allocate_array(&mut self, length: usize) -> JsResult<()> {
        self.allocate(length, "Invalid array length")
    }

    /// Checks that a string of `length` bytes may be created and pays for it
    /// out of the operation budget.
    pub fn allocate_string(&mut self, length: usize) -> JsResult<()> {
        self.allocate(length, "Invalid string length")
    }

    /// Fails when a string of `length` bytes would exceed the allocation
    /// limit, without charging for it.
    pub fn check_string_length(&self, length: usize) -> JsResult<()> {
        if length > self.limits.max_allocation {
            return Err(range_error("Invalid string length"));
        }
        Ok(())
    }

    /// Shared body of the `allocate_*` checks.
    fn allocate(&mut self, units: usize, message: &str) -> JsResult<()> {
        if units > self.limits.max_allocation {
            return Err(range_error(message));
        }
        self.charge((units / ALLOCATION_UNITS_PER_OPERATION) as u64)
    }

    /// Counts `cost` operations against the budget.
    fn charge(&mut self, cost: u64) -> JsResult<()> {
        self.operations = self.operations.saturating_add(cost);
        if self.operations > self.limits.max_operations {
            return Err(Exception::Halt(format!(
                "Execution limit of {} operations exceeded (possible infinite loop)",
                self.limits.max_operations
            )));
        }
        Ok(())
    }

    /// Operations performed so far.
    pub fn operations(&self) -> u64 {
        self.operations
    }

    /// Next value of the deterministic `Math.random` sequence.
    pub fn next_random(&mut self) -> f64 {
        let mut x = self.seed;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.seed = x;
        let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
        bits as f64 / (1u64 << 53) as f64
    }

    /// Remembers a scope captured by a closure.
    fn capture(&mut self, scope: &ScopeRef) {
        let weak = Rc::downgrade(scope);
        if self.captured.last().is_some_and(|last| last.ptr_eq(&weak)) {
            return;
        }
        self.captured.push(weak);
    }

    // ----------------------------------------------------------------------
    // Statements
    // ----------------------------------------------------------------------

    /// Runs statements in `scope`, hoisting function declarations first.
    fn exec_block(&mut self, stmts: &[Stmt], scope: &ScopeRef) -> JsResult<Flow> {
        for stmt in stmts {
            if let Stmt::Function(def) = stmt {
                let func = self.make_closure(def, scope, None);
                if let Some(name) = &def.name {
                    Scope::declare(scope, Rc::clone(name), func, true);
                }
            }
        }
        for stmt in stmts {
            match self.exec(stmt, scope, None)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Runs one statement. `label` is set when the statement is labelled.
    fn exec(&mut self, stmt: &Stmt, scope: &ScopeRef, label: Option<&Rc<str>>) -> JsResult<Flow> {
        self.enter()?;
        let flow = self.exec_stmt(stmt, scope, label);
        self.nesting -= 1;
        flow
    }

    /// Counts one more statement or expression under evaluation.
    fn enter(&mut self) -> JsResult<()> {
        if self.nesting >= MAX_EVALUATION_NESTING {
            return Err(range_error("Maximum call stack size exceeded"));
        }
        self.nesting += 1;
        Ok(())
    }

    /// Body of [`Self::exec`].
    fn exec_stmt(&mut self, stmt: &Stmt, scope: &ScopeRef, label: Option<&Rc<str>>) -> JsResult<Flow> {
        self.tick()?;

        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
            }
            Stmt::Var { kind, decls } => {
                for decl in decls {
                    let value = match &decl.init {
                        Some(init) => self.eval(init, scope)?,
                        None if *kind == VarKind::Var => continue,
                        None => Value::Undefined,
                    };
                    self.bind(&decl.target, value, scope, (*kind).into())?;
                }
            }
            Stmt::Function(_) | Stmt::Empty => {}
            Stmt::Class(def) => {
                let class = self.make_class(def, scope)?;
                if let Some(name) = &def.name {
                    Scope::declare(scope, Rc::clone(name), class, true);
                }
            }
            Stmt::Enum { name, members } => self.exec_enum(name, members, scope)?,
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    return self.exec(consequent, scope, None);
                } else if let Some(alternate) = alternate {
                    return self.exec(alternate, scope, None);
                }
            }
            Stmt::Block(stmts) => {
                let inner = Scope::block(scope);
                return self.exec_block(stmts, &inner);
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => return self.exec_for(init.as_deref(), test.as_ref(), update.as_ref(), body, scope, label),
            Stmt::ForEach {
                of,
                kind,
                target,
                source,
                body,
            } => return self.exec_for_each(*of, *kind, target, source, body, scope, label),
            Stmt::While { test, body } => loop {
                if !self.eval(test, scope)?.truthy() {
                    break;
                }
                if let Some(flow) = self.loop_body(body, scope, label)? {
                    return Ok(flow);
                }
            },
            Stmt::DoWhile { body, test } => loop {
                if let Some(flow) = self.loop_body(body, scope, label)? {
                    return Ok(flow);
                }
                if !self.eval(test, scope)?.truthy() {
                    break;
                }
            },
            Stmt::Break(target) => return Ok(Flow::Break(target.clone())),
            Stmt::Continue(target) => return Ok(Flow::Continue(target.clone())),
            Stmt::Throw(expr) => return Err(Exception::Thrown(self.eval(expr, scope)?)),
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => return self.exec_try(block, param.as_ref(), handler.as_deref(), finalizer.as_deref(), scope),
            Stmt::Switch {
                discriminant,
                cases,
            } => return self.exec_switch(discriminant, cases, scope),
            Stmt::Labeled { label, body } => {
                return match self.exec(body, scope, Some(label))? {
                    Flow::Break(Some(target)) if target == *label => Ok(Flow::Normal),
                    flow => Ok(flow),
                };
            }
        }

        Ok(Flow::Normal)
    }

    /// Runs a loop body once. `Some(flow)` means the loop must stop and its
    /// statement completes with `flow`.
    fn loop_body(
        &mut self,
        body: &Stmt,
        scope: &ScopeRef,
        label: Option<&Rc<str>>,
    ) -> JsResult<Option<Flow>> {
        let own = |target: &Rc<str>| label.is_some_and(|label| label == target);
        Ok(match self.exec(body, scope, None)? {
            Flow::Normal | Flow::Continue(None) => None,
            Flow::Continue(Some(target)) if own(&target) => None,
            Flow::Break(None) => Some(Flow::Normal),
            Flow::Break(Some(target)) if own(&target) => Some(Flow::Normal),
            flow => Some(flow),
        })
    }

    /// C-style `for`, with a fresh copy of `let` bindings per iteration.
    fn exec_for(
        &mut self,
        init: Option<&Stmt>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &ScopeRef,
        label: Option<&Rc<str>>,
    ) -> JsResult<Flow> {
        let loop_scope = Scope::block(scope);
        let mut per_iteration = Vec::new();
        if let Some(init) = init {
            if let Stmt::Var { kind, decls } = init
                && *kind != VarKind::Var
            {
                for decl in decls {
                    super::lower::bound_names(&decl.target, &mut per_iteration);
                }
            }
            self.exec(init, &loop_scope, None)?;
        }

        loop {
            self.tick()?;
            if let Some(test) = test
                && !self.eval(test, &loop_scope)?.truthy()
            {
                break;
            }

            let iteration = if per_iteration.is_empty() {
                Rc::clone(&loop_scope)
            } else {
                let iteration = Scope::block(&loop_scope);
                Scope::copy_into(&loop_scope, &iteration, &per_iteration);
                iteration
            };
            let control = self.loop_body(body, &iteration, label)?;
            if !per_iteration.is_empty() {
                Scope::copy_into(&iteration, &loop_scope, &per_iteration);
            }
            if let Some(flow) = control {
                return Ok(flow);
            }

            if let Some(update) = update {
                self.eval(update, &loop_scope)?;
            }
        }

        Ok(Flow::Normal)
    }

    /// `for..of` over iterables and `for..in` over keys.
    #[allow(clippy::too_many_arguments)]
    fn exec_for_each(
        &mut self,
        of: bool,
        kind: Option<VarKind>,
        target: &Pattern,
        source: &Expr,
        body: &Stmt,
        scope: &ScopeRef,
        label: Option<&Rc<str>>,
    ) -> JsResult<Flow> {
        let source = self.eval(source, scope)?;
        let items = if of {
            self.iterate(&source)?
        } else {
            enumerable_keys(&source)
                .into_iter()
                .map(Value::String)
                .collect()
        };

        for item in items {
            self.tick()?;
            let iteration = Scope::block(scope);
            let mode = kind.map(BindMode::from).unwrap_or(BindMode::Assign);
            self.bind(target, item, &iteration, mode)?;
            if let Some(flow) = self.loop_body(body, &iteration, label)? {
                return Ok(flow);
            }
        }

        Ok(Flow::Normal)
    }

    /// `try`/`catch`/`finally`. Host halts are never caught.
    fn exec_try(
        &mut self,
        block: &[Stmt],
        param: Option<&Pattern>,
        handler: Option<&[Stmt]>,
        finalizer: Option<&[Stmt]>,
        scope: &ScopeRef,
    ) -> JsResult<Flow> {
        let result = self.exec_block(block, &Scope::block(scope));
        let result = match (result, handler) {
            (Err(Exception::Thrown(thrown)), Some(handler)) => {
                let inner = Scope::block(scope);
                match param {
                    Some(param) => self
                        .bind(param, thrown, &inner, BindMode::Let)
                        .and_then(|()| self.exec_block(handler, &inner)),
                    None => self.exec_block(handler, &inner),
                }
            }
            (result, _) => result,
        };

        if let Some(finalizer) = finalizer {
            if let Err(Exception::Halt(reason)) = &result {
                return Err(Exception::Halt(reason.clone()));
            }
            match self.exec_block(finalizer, &Scope::block(scope))? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        result
    }

    /// `switch` with fall-through.
    fn exec_switch(&mut self, discriminant: &Expr, cases: &[SwitchCase], scope: &ScopeRef) -> JsResult<Flow> {
        let value = self.eval(discriminant, scope)?;
        let inner = Scope::block(scope);

        let mut start = None;
        for (index, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test
                && self.eval(test, &inner)?.strict_equals(&value)
            {
                start = Some(index);
                break;
            }
        }
        let Some(start) = start.or_else(|| cases.iter().position(|case| case.test.is_none())) else {
            return Ok(Flow::Normal);
        };

        for case in &cases[start..] {
            for stmt in &case.body {
                match self.exec(stmt, &inner, None)? {
                    Flow::Normal => {}
                    Flow::Break(None) => return Ok(Flow::Normal),
                    flow => return Ok(flow),
                }
            }
        }

        Ok(Flow::Normal)
    }

    /// `enum` declarations become frozen-looking objects with reverse
    /// mappings for numeric members.
    fn exec_enum(&mut self, name: &Rc<str>, members: &[(Rc<str>, Option<Expr>)], scope: &ScopeRef) -> JsResult<()> {
        let object = Rc::new(RefCell::new(Object::default()));
        Scope::declare(scope, Rc::clone(name), Value::Object(Rc::clone(&object)), true);
        let members_scope = Scope::block(scope);
        let mut next = 0.0;

        for (member, init) in members {
            let value = match init {
                Some(init) => self.eval(init, &members_scope)?,
                None => Value::Number(next),
            };
            if let Value::Number(n) = value {
                next = n + 1.0;
                object
                    .borrow_mut()
                    .props
                    .set(number_to_string(n).into(), Value::String(Rc::clone(member)));
            }
            object.borrow_mut().props.set(Rc::clone(member), value.clone());
            Scope::declare(&members_scope, Rc::clone(member), value, false);
        }

        Ok(())
    }

    // ----------------------------------------------------------------------
    // Bindings
    // ----------------------------------------------------------------------

    /// Binds or assigns `value` to `pattern`.
    fn bind(&mut self, pattern: &Pattern, value: Value, scope: &ScopeRef, mode: BindMode) -> JsResult<()> {
        match pattern {
            Pattern::Ident(name) => match mode {
                BindMode::Let => Scope::declare(scope, Rc::clone(name), value, true),
                BindMode::Const => Scope::declare(scope, Rc::clone(name), value, false),
                BindMode::Var => {
                    if Scope::assign(scope, name, value.clone()).is_err() {
                        Scope::declare(&Scope::function_scope(scope), Rc::clone(name), value, true);
                    }
                }
                BindMode::Assign => self.assign_name(name, value, scope)?,
            },
            Pattern::Member(_) => {
                let reference = self.reference(pattern, scope)?;
                self.put(&reference, value, scope)?;
            }
            Pattern::Default(target, default) => {
                let value = match value {
                    Value::Undefined => self.eval(default, scope)?,
                    value => value,
                };
                self.bind(target, value, scope, mode)?;
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        value.to_js_string(),
                        value.to_js_string()
                    )));
                }
                let mut used = Vec::new();
                for (key, target) in props {
                    let key = self.prop_key(key, scope)?;
                    let item = self.get_property(&value, &key)?;
                    self.bind(target, item, scope, mode)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let mut remaining = PropMap::new();
                    for (key, item) in own_entries(&value) {
                        if !used.contains(&key) {
                            remaining.set(key, item);
                        }
                    }
                    self.bind(rest, Value::object(remaining), scope, mode)?;
                }
            }
            Pattern::Array { elems, rest } => {
                let items = self.iterate(&value)?;
                for (index, elem) in elems.iter().enumerate() {
                    if let Some(elem) = elem {
                        let item = items.get(index).cloned().unwrap_or_default();
                        self.bind(elem, item, scope, mode)?;
                    }
                }
                if let Some(rest) = rest {
                    let tail = items.get(elems.len()..).unwrap_or_default().to_vec();
                    self.bind(rest, Value::array(tail), scope, mode)?;
                }
            }
        }
        Ok(())
    }

    /// Assigns to an existing variable.
    fn assign_name(&mut self, name: &str, value: Value, scope: &ScopeRef) -> JsResult<()> {
        match Scope::assign(scope, name, value) {
            Ok(()) => Ok(()),
            Err(AssignError::Undeclared) => Err(reference_error(name)),
            Err(AssignError::Constant) => Err(type_error("Assignment to constant variable.")),
        }
    }

    /// Resolves a simple assignment target.
    fn reference(&mut self, target: &Pattern, scope: &ScopeRef) -> JsResult<Reference> {
        match target {
            Pattern::Ident(name) => Ok(Reference::Binding(Rc::clone(name))),
            Pattern::Member(expr) => match &**expr {
                Expr::Member {
                    object, property, ..
                } => {
                    let base = self.eval(object, scope)?;
                    let key = self.member_key(property, scope)?;
                    Ok(Reference::Property(base, key))
                }
                _ => Err(syntax_error("Invalid assignment target")),
            },
            _ => Err(syntax_error("Invalid assignment target")),
        }
    }

    /// Reads a reference.
    fn get(&mut self, reference: &Reference, scope: &ScopeRef) -> JsResult<Value> {
        match reference {
            Reference::Binding(name) => Scope::lookup(scope, name).ok_or_else(|| reference_error(name)),
            Reference::Property(base, key) => self.get_property(base, key),
        }
    }

    /// Writes a reference.
    fn put(&mut self, reference: &Reference, value: Value, scope: &ScopeRef) -> JsResult<()> {
        match reference {
            Reference::Binding(name) => self.assign_name(name, value, scope),
            Reference::Property(base, key) => self.set_property(base, key, value),
        }
    }

    // ----------------------------------------------------------------------
    // Expressions
    // ----------------------------------------------------------------------

    /// Evaluates an expression.
    pub fn eval(&mut self, expr: &Expr, scope: &ScopeRef) -> JsResult<Value> {
        self.enter()?;
        let value = self.eval_expr(expr, scope);
        self.nesting -= 1;
        value
    }

    /// Body of [`Self::eval`].
    fn eval_expr(&mut self, expr: &Expr, scope: &ScopeRef) -> JsResult<Value> {
        Ok(match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::String(s) => Value::String(Rc::clone(s)),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Undefined => Value::Undefined,
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(index) {
                        let value = self.eval(expr, scope)?;
                        out.push_str(&self.to_string(&value)?);
                        self.check_string_length(out.len())?;
                    }
                }
                Value::from(out)
            }
            Expr::Regex { pattern, flags } => make_regexp(pattern, flags)?,
            Expr::Ident(name) => Scope::lookup(scope, name).ok_or_else(|| reference_error(name))?,
            Expr::This => Scope::this(scope),
            Expr::Super => return Err(syntax_error("'super' keyword unexpected here")),
            Expr::Array(elements) => Value::array(self.eval_elements(elements, scope)?),
            Expr::Object(props) => self.eval_object(props, scope)?,
            Expr::Function(def) => self.make_closure(def, scope, None),
            Expr::Class(def) => self.make_class(def, scope)?,
            Expr::Unary { op, arg } => self.eval_unary(*op, arg, scope)?,
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let reference = self.reference(target, scope)?;
                let old = self.get(&reference, scope)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.put(&reference, Value::Number(new), scope)?;
                Value::Number(if *prefix { new } else { old })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, left, right)?
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                if short_circuits(*op, &left) {
                    left
                } else {
                    self.eval(right, scope)?
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value, scope)?,
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)?
                } else {
                    self.eval(alternate, scope)?
                }
            }
            Expr::Member { .. } | Expr::Call { .. } => self.eval_chain(expr, scope)?.unwrap_or_default(),
            Expr::New { callee, args } => {
                let constructor = self.eval(callee, scope)?;
                let args = self.eval_elements(args, scope)?;
                self.construct(&constructor, args, &describe(callee))?
            }
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, scope)?;
                }
                last
            }
        })
    }

    /// Evaluates a member access or call, returning `None` when an optional
    /// link short-circuits the chain.
    fn eval_chain(&mut self, expr: &Expr, scope: &ScopeRef) -> JsResult<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                if matches!(**object, Expr::Super) {
                    let key = self.member_key(property, scope)?;
                    return Ok(Some(self.super_property(&key, scope)?));
                }
                let Some(base) = self.eval_chain(object, scope)? else {
                    return Ok(None);
                };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let key = self.member_key(property, scope)?;
                Ok(Some(self.get_property(&base, &key)?))
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let (this, func) = match &**callee {
                    Expr::Super => {
                        let args = self.eval_elements(args, scope)?;
                        self.super_call(args, scope)?;
                        return Ok(Some(Value::Undefined));
                    }
                    Expr::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        if matches!(**object, Expr::Super) {
                            let key = self.member_key(property, scope)?;
                            (Scope::this(scope), self.super_property(&key, scope)?)
                        } else {
                            let Some(base) = self.eval_chain(object, scope)? else {
                                return Ok(None);
                            };
                            if *member_optional && base.is_nullish() {
                                return Ok(None);
                            }
                            let key = self.member_key(property, scope)?;
                            let func = self.get_property(&base, &key)?;
                            (base, func)
                        }
                    }
                    other => {
                        let Some(func) = self.eval_chain(other, scope)? else {
                            return Ok(None);
                        };
                        (Value::Undefined, func)
                    }
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                if !matches!(func, Value::Function(_)) {
                    return Err(type_error(format!("{} is not a function", describe(callee))));
                }
                let args = self.eval_elements(args, scope)?;
                Ok(Some(self.call(&func, this, args)?))
            }
            other => Ok(Some(self.eval(other, scope)?)),
        }
    }

    /// Array elements or call arguments, with spreads expanded.
    fn eval_elements(&mut self, elements: &[Element], scope: &ScopeRef) -> JsResult<Vec<Value>> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Element::Expr(expr) => values.push(self.eval(expr, scope)?),
                Element::Spread(expr) => {
                    let source = self.eval(expr, scope)?;
                    let spread = self.iterate(&source)?;
                    self.allocate_array(values.len() + spread.len())?;
                    values.extend(spread);
                }
            }
        }
        Ok(values)
    }

    /// An object literal.
    fn eval_object(&mut self, props: &[Prop], scope: &ScopeRef) -> JsResult<Value> {
        let mut map = PropMap::new();
        for prop in props {
            match prop {
                Prop::KeyValue(key, value) => {
                    let key = self.prop_key(key, scope)?;
                    let value = self.eval(value, scope)?;
                    map.set(key, value);
                }
                Prop::Spread(expr) => {
                    let source = self.eval(expr, scope)?;
                    for (key, value) in own_entries(&source) {
                        map.set(key, value);
                    }
                }
                Prop::Method(key, def) => {
                    let key = self.prop_key(key, scope)?;
                    let method = self.make_closure(def, scope, None);
                    map.set(key, method);
                }
            }
        }
        Ok(Value::object(map))
    }

    /// Prefix operators.
    fn eval_unary(&mut self, op: UnaryOp, arg: &Expr, scope: &ScopeRef) -> JsResult<Value> {
        match op {
            UnaryOp::TypeOf => {
                let value = match arg {
                    Expr::Ident(name) => Scope::lookup(scope, name).unwrap_or_default(),
                    _ => self.eval(arg, scope)?,
                };
                Ok(Value::from(value.type_of()))
            }
            UnaryOp::Delete => {
                if let Expr::Member {
                    object, property, ..
                } = arg
                {
                    let base = self.eval(object, scope)?;
                    let key = self.member_key(property, scope)?;
                    delete_property(&base, &key);
                }
                Ok(Value::Bool(true))
            }
            _ => {
                let value = self.eval(arg, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Minus => Value::Number(-self.to_number(&value)?),
                    UnaryOp::Plus => Value::Number(self.to_number(&value)?),
                    UnaryOp::BitNot => Value::Number(f64::from(!to_int32(self.to_number(&value)?))),
                    _ => Value::Undefined,
                })
            }
        }
    }

    /// Assignment expressions.
    fn eval_assign(&mut self, op: AssignOp, target: &Pattern, value: &Expr, scope: &ScopeRef) -> JsResult<Value> {
        if let AssignOp::Assign = op
            && matches!(target, Pattern::Object { .. } | Pattern::Array { .. })
        {
            let value = self.eval(value, scope)?;
            self.bind(target, value.clone(), scope, BindMode::Assign)?;
            return Ok(value);
        }

        let reference = self.reference(target, scope)?;
        let result = match op {
            AssignOp::Assign => self.eval(value, scope)?,
            AssignOp::Compound(op) => {
                let current = self.get(&reference, scope)?;
                let rhs = self.eval(value, scope)?;
                self.binary(op, current, rhs)?
            }
            AssignOp::Logical(op) => {
                let current = self.get(&reference, scope)?;
                if short_circuits(op, &current) {
                    return Ok(current);
                }
                self.eval(value, scope)?
            }
        };
        self.put(&reference, result.clone(), scope)?;
        Ok(result)
    }

    /// Applies a binary operator.
    pub fn binary(&mut self, op: BinaryOp, left: Value, right: Value) -> JsResult<Value> {
        Ok(match op {
            BinaryOp::Add => {
                let left = self.to_primitive(left)?;
                let right = self.to_primitive(right)?;
                match (&left, &right) {
                    (Value::String(_), _) | (_, Value::String(_)) => {
                        let (left, right) = (left.to_js_string(), right.to_js_string());
                        self.check_string_length(left.len() + right.len())?;
                        Value::from(format!("{left}{right}"))
                    }
                    _ => Value::Number(left.to_number() + right.to_number()),
                }
            }
            BinaryOp::Sub => Value::Number(self.to_number(&left)? - self.to_number(&right)?),
            BinaryOp::Mul => Value::Number(self.to_number(&left)? * self.to_number(&right)?),
            BinaryOp::Div => Value::Number(self.to_number(&left)? / self.to_number(&right)?),
            BinaryOp::Rem => Value::Number(self.to_number(&left)? % self.to_number(&right)?),
            BinaryOp::Exp => Value::Number(self.to_number(&left)?.powf(self.to_number(&right)?)),
            BinaryOp::LooseEq => Value::Bool(left.loose_equals(&right)),
            BinaryOp::LooseNe => Value::Bool(!left.loose_equals(&right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(&right)),
            BinaryOp::StrictNe => Value::Bool(!left.strict_equals(&right)),
            BinaryOp::Lt => Value::Bool(self.compare(left, right)? == Some(Ordering::Less)),
            BinaryOp::Gt => Value::Bool(self.compare(left, right)? == Some(Ordering::Greater)),
            BinaryOp::Le => Value::Bool(matches!(
                self.compare(left, right)?,
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Ge => Value::Bool(matches!(
                self.compare(left, right)?,
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::BitAnd => Value::Number(f64::from(
                to_int32(self.to_number(&left)?) & to_int32(self.to_number(&right)?),
            )),
            BinaryOp::BitOr => Value::Number(f64::from(
                to_int32(self.to_number(&left)?) | to_int32(self.to_number(&right)?),
            )),
            BinaryOp::BitXor => Value::Number(f64::from(
                to_int32(self.to_number(&left)?) ^ to_int32(self.to_number(&right)?),
            )),
            BinaryOp::Shl => Value::Number(f64::from(
                to_int32(self.to_number(&left)?).wrapping_shl(to_uint32(self.to_number(&right)?) & 31),
            )),
            BinaryOp::Shr => Value::Number(f64::from(
                to_int32(self.to_number(&left)?).wrapping_shr(to_uint32(self.to_number(&right)?) & 31),
            )),
            BinaryOp::UShr => Value::Number(f64::from(
                to_uint32(self.to_number(&left)?).wrapping_shr(to_uint32(self.to_number(&right)?) & 31),
            )),
            BinaryOp::In => {
                if !right.is_reference() {
                    return Err(type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        left.to_js_string(),
                        right.to_js_string()
                    )));
                }
                Value::Bool(has_property(&right, &left.to_property_key()))
            }
            BinaryOp::InstanceOf => {
                let Value::Function(constructor) = &right else {
                    return Err(type_error("Right-hand side of 'instanceof' is not callable"));
                };
                Value::Bool(instance_of(&left, constructor))
            }
        })
    }

    /// Relational comparison; `None` when either side is `NaN`.
    fn compare(&mut self, left: Value, right: Value) -> JsResult<Option<Ordering>> {
        let left = self.to_primitive(left)?;
        let right = self.to_primitive(right)?;
        Ok(match (&left, &right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => left.to_number().partial_cmp(&right.to_number()),
        })
    }

    // ----------------------------------------------------------------------
    // Conversions that may run script code
    // ----------------------------------------------------------------------

    /// `String(value)`, honouring class `toString` methods.
    pub fn to_string(&mut self, value: &Value) -> JsResult<Rc<str>> {
        if let Value::Object(object) = value {
            let method = object
                .borrow()
                .class
                .as_ref()
                .and_then(|class| class.find_method("toString"));
            if let Some(method) = method {
                let result = self.call(&method, value.clone(), Vec::new())?;
                return Ok(result.to_js_string());
            }
        }
        Ok(value.to_js_string())
    }

    /// `Number(value)`.
    pub fn to_number(&mut self, value: &Value) -> JsResult<f64> {
        if let Value::Object(object) = value {
            let method = object
                .borrow()
                .class
                .as_ref()
                .and_then(|class| class.find_method("valueOf"));
            if let Some(method) = method {
                let result = self.call(&method, value.clone(), Vec::new())?;
                return Ok(result.to_number());
            }
        }
        Ok(value.to_number())
    }

    /// ToPrimitive with the default hint.
    fn to_primitive(&mut self, value: Value) -> JsResult<Value> {
        match &value {
            Value::Object(object) => {
                let class = object.borrow().class.clone();
                if let Some(class) = class {
                    if let Some(method) = class.find_method("valueOf") {
                        return self.call(&method, value.clone(), Vec::new());
                    }
                    if class.find_method("toString").is_some() {
                        return Ok(Value::String(self.to_string(&value)?));
                    }
                }
                Ok(Value::String(value.to_js_string()))
            }
            Value::Array(_) | Value::Function(_) | Value::Map(_) | Value::Set(_) | Value::RegExp(_) => {
                Ok(Value::String(value.to_js_string()))
            }
            _ => Ok(value),
        }
    }

    /// Resolves a literal or computed property key.
    fn prop_key(&mut self, key: &PropKey, scope: &ScopeRef) -> JsResult<Rc<str>> {
        match key {
            PropKey::Static(name) => Ok(Rc::clone(name)),
            PropKey::Computed(expr) => {
                let value = self.eval(expr, scope)?;
                self.to_string(&value)
            }
        }
    }

    /// Resolves a member access key.
    fn member_key(&mut self, property: &MemberProp, scope: &ScopeRef) -> JsResult<Rc<str>> {
        match property {
            MemberProp::Name(name) => Ok(Rc::clone(name)),
            MemberProp::Computed(expr) => {
                let value = self.eval(expr, scope)?;
                self.to_string(&value)
            }
        }
    }

    // ----------------------------------------------------------------------
    // Properties
    // ----------------------------------------------------------------------

    /// Reads `base[key]`.
    pub fn get_property(&mut self, base: &Value, key: &str) -> JsResult<Value> {
        let method = |family: &[&str], call: MethodFn| {
            if family.contains(&key) {
                Value::Function(Function::method(key, call))
            } else {
                Value::Undefined
            }
        };

        Ok(match base {
            Value::Undefined | Value::Null => {
                return Err(type_error(format!(
                    "Cannot read properties of {} (reading '{key}')",
                    base.to_js_string()
                )));
            }
            Value::Bool(_) => method(builtins::PRIMITIVE_METHODS, builtins::primitive_method),
            Value::Number(_) => method(builtins::NUMBER_METHODS, builtins::number_method),
            Value::String(s) => {
                if key == "length" {
                    Value::Number(s.chars().count() as f64)
                } else if let Some(index) = array_index(key) {
                    s.chars()
                        .nth(index)
                        .map(|c| Value::from(c.to_string()))
                        .unwrap_or_default()
                } else {
                    method(builtins::STRING_METHODS, builtins::string_method)
                }
            }
            Value::Array(items) => {
                if key == "length" {
                    Value::Number(items.borrow().len() as f64)
                } else if let Some(index) = array_index(key) {
                    items.borrow().get(index).cloned().unwrap_or_default()
                } else {
                    method(builtins::ARRAY_METHODS, builtins::array_method)
                }
            }
            Value::Object(object) => {
                let class = {
                    let object = object.borrow();
                    if let Some(value) = object.props.get(key) {
                        return Ok(value.clone());
                    }
                    if let Some(error) = &object.error {
                        match key {
                            "message" => return Ok(Value::String(Rc::clone(&error.message))),
                            "name" => return Ok(Value::String(Rc::clone(&error.name))),
                            "stack" => return Ok(Value::from(format!("{}: {}", error.name, error.message))),
                            _ => {}
                        }
                    }
                    object.class.clone()
                };
                if let Some(class) = class {
                    if let Some(getter) = class.find_getter(key) {
                        return self.call(&getter, base.clone(), Vec::new());
                    }
                    if let Some(found) = class.find_method(key) {
                        return Ok(found);
                    }
                }
                method(builtins::OBJECT_METHODS, builtins::object_method)
            }
            Value::Function(func) => {
                if key == "name" {
                    return Ok(Value::String(Rc::clone(&func.name)));
                }
                if let Some(value) = static_member(func, key) {
                    return Ok(value);
                }
                method(builtins::FUNCTION_METHODS, builtins::function_method)
            }
            Value::Map(entries) => {
                if key == "size" {
                    Value::Number(entries.borrow().len() as f64)
                } else {
                    method(builtins::MAP_METHODS, builtins::map_method)
                }
            }
            Value::Set(values) => {
                if key == "size" {
                    Value::Number(values.borrow().len() as f64)
                } else {
                    method(builtins::SET_METHODS, builtins::set_method)
                }
            }
            Value::RegExp(re) => match key {
                "source" => Value::String(Rc::clone(&re.source)),
                "flags" => Value::String(Rc::clone(&re.flags)),
                "global" => Value::Bool(re.global()),
                "lastIndex" => Value::Number(0.0),
                _ => method(builtins::REGEXP_METHODS, builtins::regexp_method),
            },
        })
    }

    /// Writes `base[key] = value`.
    pub fn set_property(&mut self, base: &Value, key: &str, value: Value) -> JsResult<()> {
        match base {
            Value::Undefined | Value::Null => Err(type_error(format!(
                "Cannot set properties of {} (setting '{key}')",
                base.to_js_string()
            ))),
            Value::Array(items) => {
                let current = items.borrow().len();
                if key == "length" {
                    let length = value.to_number();
                    if length < 0.0 || length.fract() != 0.0 || !length.is_finite() {
                        return Err(range_error("Invalid array length"));
                    }
                    let length = length as usize;
                    if length > current {
                        self.allocate_array(length)?;
                    }
                    items.borrow_mut().resize(length, Value::Undefined);
                } else if let Some(index) = array_index(key) {
                    let mut items = if index >= current {
                        self.allocate_array(index.saturating_add(1))?;
                        let mut items = items.borrow_mut();
                        items.resize(index + 1, Value::Undefined);
                        items
                    } else {
                        items.borrow_mut()
                    };
                    items[index] = value;
                }
                Ok(())
            }
            Value::Object(object) => {
                let class = {
                    let object = object.borrow();
                    if object.props.contains(key) {
                        None
                    } else {
                        object.class.clone()
                    }
                };
                if let Some(class) = class {
                    if let Some(setter) = class.find_setter(key) {
                        self.call(&setter, base.clone(), vec![value])?;
                        return Ok(());
                    }
                    if class.find_getter(key).is_some() {
                        return Err(type_error(format!(
                            "Cannot set property {key} of #<{}> which has only a getter",
                            class.name
                        )));
                    }
                }
                object.borrow_mut().props.set(key.into(), value);
                Ok(())
            }
            Value::Function(func) => {
                func.props.borrow_mut().set(key.into(), value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Values produced by iterating `value` with `for..of` or spread.
    pub fn iterate(&mut self, value: &Value) -> JsResult<Vec<Value>> {
        Ok(match value {
            Value::Array(items) => items.borrow().clone(),
            Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
            Value::Map(entries) => entries
                .borrow()
                .iter()
                .map(|(k, v)| Value::array(vec![k.clone(), v.clone()]))
                .collect(),
            Value::Set(values) => values.borrow().clone(),
            other => {
                return Err(type_error(format!("{} is not iterable", other.to_js_string())));
            }
        })
    }

    // ----------------------------------------------------------------------
    // Functions and classes
    // ----------------------------------------------------------------------

    /// Creates a closure over `scope`.
    fn make_closure(&mut self, def: &Rc<FunctionDef>, scope: &ScopeRef, home: Option<Weak<Function>>) -> Value {
        self.capture(scope);
        Value::Function(Rc::new(Function {
            name:  def.name.clone().unwrap_or_else(|| "".into()),
            kind:  FunctionKind::Closure {
                def: Rc::clone(def),
                env: Rc::clone(scope),
                home,
            },
            props: RefCell::new(PropMap::new()),
        }))
    }

    /// Evaluates a class definition.
    fn make_class(&mut self, def: &Rc<ClassDef>, scope: &ScopeRef) -> JsResult<Value> {
        let parent = match &def.parent {
            Some(expr) => match self.eval(expr, scope)? {
                Value::Function(parent) => Some(parent),
                Value::Null => None,
                other => {
                    return Err(type_error(format!(
                        "Class extends value {} is not a constructor or null",
                        other.to_js_string()
                    )));
                }
            },
            None => None,
        };

        self.capture(scope);
        let class = Rc::new(Function {
            name:  def.name.clone().unwrap_or_else(|| "".into()),
            kind:  FunctionKind::Class(ClassData {
                def: Rc::clone(def),
                env: Rc::clone(scope),
                parent,
                methods: RefCell::new(PropMap::new()),
                getters: RefCell::new(PropMap::new()),
                setters: RefCell::new(PropMap::new()),
            }),
            props: RefCell::new(PropMap::new()),
        });

        let home = Rc::downgrade(&class);
        for method in &def.methods {
            let func = Value::Function(Rc::new(Function {
                name:  Rc::clone(&method.name),
                kind:  FunctionKind::Closure {
                    def:  Rc::clone(&method.func),
                    env:  Rc::clone(scope),
                    home: Some(home.clone()),
                },
                props: RefCell::new(PropMap::new()),
            }));
            if method.is_static {
                class.props.borrow_mut().set(Rc::clone(&method.name), func);
            } else if let Some(data) = class.class_data() {
                let table = match method.kind {
                    MethodKind::Method => &data.methods,
                    MethodKind::Getter => &data.getters,
                    MethodKind::Setter => &data.setters,
                };
                table.borrow_mut().set(Rc::clone(&method.name), func);
            }
        }

        let class_value = Value::Function(Rc::clone(&class));
        for field in def.fields.iter().filter(|field| field.is_static) {
            let field_scope = Scope::function(scope, Some(class_value.clone()), Some(home.clone()));
            let value = match &field.value {
                Some(expr) => self.eval(expr, &field_scope)?,
                None => Value::Undefined,
            };
            class.props.borrow_mut().set(Rc::clone(&field.name), value);
        }

        Ok(class_value)
    }

    /// Calls `callee` with an explicit receiver.
    pub fn call(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> JsResult<Value> {
        match callee {
            Value::Function(func) => self.call_function(func, this, args),
            other => Err(type_error(format!("{} is not a function", other.to_js_string()))),
        }
    }

    /// Calls a function value.
    fn call_function(&mut self, func: &Rc<Function>, this: Value, args: Vec<Value>) -> JsResult<Value> {
        self.tick()?;
        match &func.kind {
            FunctionKind::Closure { def, env, home } => {
                self.invoke(def, env, home.clone(), this, args, Some(func))
            }
            FunctionKind::Native { call, .. } => call(self, &this, &args),
            FunctionKind::Method(call) => call(self, &func.name, &this, &args),
            FunctionKind::Bound {
                target,
                this: bound_this,
                args: bound_args,
            } => {
                let mut all = bound_args.clone();
                all.extend(args);
                self.call_function(target, bound_this.clone(), all)
            }
            FunctionKind::Class(_) => Err(type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                func.name
            ))),
        }
    }

    /// Runs a script function body.
    fn invoke(
        &mut self,
        def: &Rc<FunctionDef>,
        env: &ScopeRef,
        home: Option<Weak<Function>>,
        this: Value,
        args: Vec<Value>,
        itself: Option<&Rc<Function>>,
    ) -> JsResult<Value> {
        if self.depth >= self.limits.max_call_depth {
            return Err(range_error("Maximum call stack size exceeded"));
        }
        self.depth += 1;
        let result = self.invoke_body(def, env, home, this, args, itself);
        self.depth -= 1;
        result
    }

    /// Binds parameters and evaluates the body.
    fn invoke_body(
        &mut self,
        def: &Rc<FunctionDef>,
        env: &ScopeRef,
        home: Option<Weak<Function>>,
        this: Value,
        args: Vec<Value>,
        itself: Option<&Rc<Function>>,
    ) -> JsResult<Value> {
        let scope = if def.is_arrow {
            Scope::function(env, None, None)
        } else {
            Scope::function(env, Some(this), home)
        };

        if let (Some(name), Some(itself), false) = (&def.name, itself, def.is_arrow) {
            Scope::declare(&scope, Rc::clone(name), Value::Function(Rc::clone(itself)), true);
        }
        for name in &def.var_names {
            Scope::hoist(&scope, name);
        }

        let mut args = args.into_iter();
        for param in &def.params {
            let value = args.next().unwrap_or_default();
            self.bind(param, value, &scope, BindMode::Let)?;
        }
        if let Some(rest) = &def.rest {
            self.bind(rest, Value::array(args.collect()), &scope, BindMode::Let)?;
        }

        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }

    /// `new callee(...args)`.
    pub fn construct(&mut self, callee: &Value, args: Vec<Value>, name: &str) -> JsResult<Value> {
        let Value::Function(func) = callee else {
            return Err(type_error(format!("{name} is not a constructor")));
        };
        self.tick()?;

        match &func.kind {
            FunctionKind::Class(_) => {
                let this = Value::Object(Rc::new(RefCell::new(Object {
                    class: Some(Rc::clone(func)),
                    ..Object::default()
                })));
                self.construct_into(func, &this, args)?;
                Ok(this)
            }
            FunctionKind::Native {
                construct: Some(construct),
                ..
            } => construct(self, &Value::Undefined, &args),
            FunctionKind::Closure { def, .. } if !def.is_arrow => {
                let this = Value::object(PropMap::new());
                let result = self.call_function(func, this.clone(), args)?;
                Ok(if result.is_reference() { result } else { this })
            }
            _ => Err(type_error(format!("{name} is not a constructor"))),
        }
    }

    /// Runs `class`'s construction steps on an existing receiver.
    fn construct_into(&mut self, class: &Rc<Function>, this: &Value, args: Vec<Value>) -> JsResult<()> {
        match &class.kind {
            FunctionKind::Class(data) => {
                if data.parent.is_none() {
                    self.init_fields(class, data, this)?;
                }
                match &data.def.constructor {
                    Some(constructor) => {
                        self.invoke(
                            constructor,
                            &data.env,
                            Some(Rc::downgrade(class)),
                            this.clone(),
                            args,
                            None,
                        )?;
                    }
                    None => {
                        if let Some(parent) = &data.parent {
                            self.construct_into(parent, this, args)?;
                            self.init_fields(class, data, this)?;
                        }
                    }
                }
                Ok(())
            }
            FunctionKind::Native { .. } if builtins::is_error_constructor(&class.name) => {
                if let Value::Object(object) = this {
                    let message = match args.first() {
                        Some(Value::Undefined) | None => Rc::from(""),
                        Some(message) => message.to_js_string(),
                    };
                    object.borrow_mut().error = Some(super::value::ErrorData {
                        name: Rc::clone(&class.name),
                        message,
                    });
                }
                Ok(())
            }
            FunctionKind::Closure { def, env, home } if !def.is_arrow => {
                self.invoke(def, env, home.clone(), this.clone(), args, Some(class))?;
                Ok(())
            }
            _ => Err(type_error(format!(
                "Extending built-in {} is not supported",
                class.name
            ))),
        }
    }

    /// Initializes instance fields declared by `class`.
    fn init_fields(&mut self, class: &Rc<Function>, data: &ClassData, this: &Value) -> JsResult<()> {
        for field in data.def.fields.iter().filter(|field| !field.is_static) {
            let scope = Scope::function(&data.env, Some(this.clone()), Some(Rc::downgrade(class)));
            let value = match &field.value {
                Some(expr) => self.eval(expr, &scope)?,
                None => Value::Undefined,
            };
            match this {
                Value::Object(object) => object.borrow_mut().props.set(Rc::clone(&field.name), value),
                other => self.set_property(other, &field.name, value)?,
            }
        }
        Ok(())
    }

    /// `super(...)` inside a derived constructor.
    fn super_call(&mut self, args: Vec<Value>, scope: &ScopeRef) -> JsResult<()> {
        let home = Scope::home(scope).ok_or_else(|| syntax_error("'super' keyword unexpected here"))?;
        let data = home
            .class_data()
            .ok_or_else(|| syntax_error("'super' keyword unexpected here"))?;
        let parent = data
            .parent
            .clone()
            .ok_or_else(|| syntax_error("'super' keyword unexpected here"))?;
        let this = Scope::this(scope);
        self.construct_into(&parent, &this, args)?;
        self.init_fields(&home, data, &this)
    }

    /// `super.name` inside a method.
    fn super_property(&mut self, key: &str, scope: &ScopeRef) -> JsResult<Value> {
        let home = Scope::home(scope).ok_or_else(|| syntax_error("'super' keyword unexpected here"))?;
        let parent = home
            .class_data()
            .and_then(|data| data.parent.clone())
            .ok_or_else(|| syntax_error("'super' keyword unexpected here"))?;
        Ok(parent.find_method(key).unwrap_or_default())
    }
}

/// Whether a logical operator returns its left operand unevaluated.
fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.truthy(),
        LogicalOp::Or => left.truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// Static members of a function or class, including inherited statics.
fn static_member(func: &Rc<Function>, key: &str) -> Option<Value> {
    if let Some(value) = func.props.borrow().get(key) {
        return Some(value.clone());
    }
    let parent = func.class_data()?.parent.as_ref()?;
    static_member(parent, key)
}

/// `key in value`.
fn has_property(value: &Value, key: &str) -> bool {
    match value {
        Value::Object(object) => {
            let object = object.borrow();
            object.props.contains(key)
                || object.class.as_ref().is_some_and(|class| class.find_method(key).is_some())
        }
        Value::Array(items) => {
            key == "length" || array_index(key).is_some_and(|index| index < items.borrow().len())
        }
        Value::Function(func) => func.props.borrow().contains(key),
        _ => false,
    }
}

/// `delete base[key]`.
fn delete_property(base: &Value, key: &str) {
    match base {
        Value::Object(object) => {
            object.borrow_mut().props.remove(key);
        }
        Value::Array(items) => {
            if let Some(index) = array_index(key)
                && let Some(slot) = items.borrow_mut().get_mut(index)
            {
                *slot = Value::Undefined;
            }
        }
        Value::Function(func) => {
            func.props.borrow_mut().remove(key);
        }
        _ => {}
    }
}

/// `value instanceof constructor`.
pub fn instance_of(value: &Value, constructor: &Rc<Function>) -> bool {
    let native = matches!(constructor.kind, FunctionKind::Native { .. });
    let name = &*constructor.name;
    match value {
        Value::Object(object) => {
            let object = object.borrow();
            if let Some(class) = &object.class
                && class.extends(constructor)
            {
                return true;
            }
            if native && name == "Object" {
                return true;
            }
            match &object.error {
                Some(error) if native && builtins::is_error_constructor(name) => {
                    name == "Error" || &*error.name == name
                }
                _ => false,
            }
        }
        Value::Array(_) => native && matches!(name, "Array" | "Object"),
        Value::Map(_) => native && matches!(name, "Map" | "Object"),
        Value::Set(_) => native && matches!(name, "Set" | "Object"),
        Value::RegExp(_) => native && matches!(name, "RegExp" | "Object"),
        Value::Function(_) => native && matches!(name, "Function" | "Object"),
        _ => false,
    }
}

/// Own enumerable `(key, value)` pairs, as used by spread and `Object.entries`.
pub fn own_entries(value: &Value) -> Vec<(Rc<str>, Value)> {
    match value {
        Value::Object(object) => object.borrow().props.ordered(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(index, item)| (Rc::from(index.to_string()), item.clone()))
            .collect(),
        Value::String(s) => s
            .chars()
            .enumerate()
            .map(|(index, c)| (Rc::from(index.to_string()), Value::from(c.to_string())))
            .collect(),
        Value::Function(func) => func.props.borrow().ordered(),
        _ => Vec::new(),
    }
}

/// Keys visited by `for..in`.
fn enumerable_keys(value: &Value) -> Vec<Rc<str>> {
    own_entries(value).into_iter().map(|(key, _)| key).collect()
}

/// Compiles a regular expression literal.
pub fn make_regexp(pattern: &str, flags: &str) -> JsResult<Value> {
    let mut builder = regex::RegexBuilder::new(pattern);
    builder
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'));
    let regex = builder
        .build()
        .map_err(|_| syntax_error(format!("Invalid regular expression: /{pattern}/{flags}")))?;
    Ok(Value::RegExp(Rc::new(RegExpData {
        source: pattern.into(),
        flags: flags.into(),
        regex,
    })))
}

/// Short text naming a callee in error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.to_string(),
        Expr::This => "this".to_string(),
        Expr::Member {
            object, property, ..
        } => match property {
            MemberProp::Name(name) => format!("{}.{name}", describe(object)),
            MemberProp::Computed(_) => format!("{}[...]", describe(object)),
        },
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

/// A thrown `TypeError`.
pub fn type_error(message: impl AsRef<str>) -> Exception {
    Exception::Thrown(Value::error("TypeError", message.as_ref()))
}

/// A thrown `RangeError`.
pub fn range_error(message: impl AsRef<str>) -> Exception {
    Exception::Thrown(Value::error("RangeError", message.as_ref()))
}

/// A thrown `SyntaxError`.
pub fn syntax_error(message: impl AsRef<str>) -> Exception {
    Exception::Thrown(Value::error("SyntaxError", message.as_ref()))
}

/// A thrown `ReferenceError` for an undeclared name.
pub fn reference_error(name: &str) -> Exception {
    Exception::Thrown(Value::error("ReferenceError", &format!("{name} is not defined")))
}
