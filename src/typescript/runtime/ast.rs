#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Owned syntax tree executed by the interpreter. It is immutable once
//! lowered and can be shared by every realm that runs the same program.

use std::rc::Rc;

/// A whole script.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top-level statements.
    pub body:      Vec<Stmt>,
    /// `var` names hoisted to the top-level scope.
    pub var_names: Vec<Rc<str>>,
}

/// Binding keyword of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

/// `pattern = init` inside a declaration.
#[derive(Debug, Clone)]
pub struct Declarator {
    /// Binding target.
    pub target: Pattern,
    /// Initializer, if any.
    pub init:   Option<Expr>,
}

/// A statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// An expression evaluated for its effects.
    Expr(Expr),
    /// `let`, `const` or `var`.
    Var {
        /// Declaration keyword.
        kind:  VarKind,
        /// Declared bindings.
        decls: Vec<Declarator>,
    },
    /// A function declaration, hoisted to the start of its block.
    Function(Rc<FunctionDef>),
    /// A class declaration.
    Class(Rc<ClassDef>),
    /// An `enum` declaration.
    Enum {
        /// Enum name.
        name:    Rc<str>,
        /// Members and their explicit initializers.
        members: Vec<(Rc<str>, Option<Expr>)>,
    },
    /// `return`
    Return(Option<Expr>),
    /// `if`/`else`
    If {
        /// Condition.
        test:       Expr,
        /// Taken branch.
        consequent: Box<Stmt>,
        /// `else` branch.
        alternate:  Option<Box<Stmt>>,
    },
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// C-style `for`.
    For {
        /// Initializer.
        init:   Option<Box<Stmt>>,
        /// Loop condition; absent means forever.
        test:   Option<Expr>,
        /// Update expression.
        update: Option<Expr>,
        /// Loop body.
        body:   Box<Stmt>,
    },
    /// `for (x in obj)` and `for (x of iterable)`.
    ForEach {
        /// True for `for..of`.
        of:     bool,
        /// Binding keyword, absent when assigning to an existing target.
        kind:   Option<VarKind>,
        /// Loop variable.
        target: Pattern,
        /// Iterated value.
        source: Expr,
        /// Loop body.
        body:   Box<Stmt>,
    },
    /// `while`
    While {
        /// Condition.
        test: Expr,
        /// Body.
        body: Box<Stmt>,
    },
    /// `do { } while ()`
    DoWhile {
        /// Body.
        body: Box<Stmt>,
        /// Condition.
        test: Expr,
    },
    /// `break`, optionally labelled.
    Break(Option<Rc<str>>),
    /// `continue`, optionally labelled.
    Continue(Option<Rc<str>>),
    /// `throw`
    Throw(Expr),
    /// `try`/`catch`/`finally`
    Try {
        /// Protected block.
        block:     Vec<Stmt>,
        /// Catch binding.
        param:     Option<Pattern>,
        /// Catch block.
        handler:   Option<Vec<Stmt>>,
        /// Finally block.
        finalizer: Option<Vec<Stmt>>,
    },
    /// `switch`
    Switch {
        /// Value being matched.
        discriminant: Expr,
        /// Cases in source order; `test` is `None` for `default`.
        cases:        Vec<SwitchCase>,
    },
    /// `label: stmt`
    Labeled {
        /// Label name.
        label: Rc<str>,
        /// Labelled statement.
        body:  Box<Stmt>,
    },
    /// Anything with no runtime effect.
    Empty,
}

/// One `case` or `default` arm.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// Case value; `None` for `default`.
    pub test: Option<Expr>,
    /// Statements run on entry.
    pub body: Vec<Stmt>,
}

/// Body of a function.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// A block body.
    Block(Vec<Stmt>),
    /// An arrow function's expression body.
    Expr(Box<Expr>),
}

/// A function, method or arrow.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Declared name, if any.
    pub name:      Option<Rc<str>>,
    /// Positional parameters, possibly with defaults.
    pub params:    Vec<Pattern>,
    /// Rest parameter.
    pub rest:      Option<Pattern>,
    /// Body.
    pub body:      FunctionBody,
    /// Arrow functions take `this` from their surroundings.
    pub is_arrow:  bool,
    /// `var` names hoisted to the function scope.
    pub var_names: Vec<Rc<str>>,
}

/// What a class method definition installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// A plain method.
    Method,
    /// `get name() { }`
    Getter,
    /// `set name(value) { }`
    Setter,
}

/// A class member that is a method or accessor.
#[derive(Debug, Clone)]
pub struct ClassMethod {
    /// Method name.
    pub name:      Rc<str>,
    /// Method body.
    pub func:      Rc<FunctionDef>,
    /// Method, getter or setter.
    pub kind:      MethodKind,
    /// True for `static` methods.
    pub is_static: bool,
}

/// A class field with an optional initializer.
#[derive(Debug, Clone)]
pub struct ClassField {
    /// Field name.
    pub name:      Rc<str>,
    /// Initializer evaluated per instance, or once for statics.
    pub value:     Option<Expr>,
    /// True for `static` fields.
    pub is_static: bool,
}

/// A class declaration or expression.
#[derive(Debug, Clone)]
pub struct ClassDef {
    /// Class name.
    pub name:        Option<Rc<str>>,
    /// The `extends` expression.
    pub parent:      Option<Expr>,
    /// Explicit constructor.
    pub constructor: Option<Rc<FunctionDef>>,
    /// Methods in source order.
    pub methods:     Vec<ClassMethod>,
    /// Fields in source order.
    pub fields:      Vec<ClassField>,
}

/// A property key in an object literal or pattern.
#[derive(Debug, Clone)]
pub enum PropKey {
    /// A literal name, string or number.
    Static(Rc<str>),
    /// `[expr]`
    Computed(Box<Expr>),
}

/// A member of an object literal.
#[derive(Debug, Clone)]
pub enum Prop {
    /// `key: value` and shorthand `key`.
    KeyValue(PropKey, Expr),
    /// `...expr`
    Spread(Expr),
    /// `key() { }`
    Method(PropKey, Rc<FunctionDef>),
}

/// An element of an array literal or argument list.
#[derive(Debug, Clone)]
pub enum Element {
    /// A plain expression.
    Expr(Expr),
    /// `...expr`
    Spread(Expr),
}

/// A binding or assignment target.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// A plain name.
    Ident(Rc<str>),
    /// `obj.prop` or `obj[key]`; only valid as an assignment target.
    Member(Box<Expr>),
    /// `{ a, b: c, ...rest }`
    Object {
        /// Named properties.
        props: Vec<(PropKey, Pattern)>,
        /// Rest target.
        rest:  Option<Box<Pattern>>,
    },
    /// `[a, , b, ...rest]`
    Array {
        /// Elements; `None` for holes.
        elems: Vec<Option<Pattern>>,
        /// Rest target.
        rest:  Option<Box<Pattern>>,
    },
    /// `target = default`
    Default(Box<Pattern>, Box<Expr>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `~`
    BitNot,
    /// `typeof`
    TypeOf,
    /// `void`
    Void,
    /// `delete`
    Delete,
}

/// Binary operators other than the short-circuiting ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `**`
    Exp,
    /// `==`
    LooseEq,
    /// `!=`
    LooseNe,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    UShr,
    /// `in`
    In,
    /// `instanceof`
    InstanceOf,
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `??`
    Nullish,
}

/// Assignment flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`, `*=` and friends.
    Compound(BinaryOp),
    /// `&&=`, `||=`, `??=`
    Logical(LogicalOp),
}

/// `obj.name` or `obj[expr]`.
#[derive(Debug, Clone)]
pub enum MemberProp {
    /// A literal property name.
    Name(Rc<str>),
    /// A computed key.
    Computed(Box<Expr>),
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Number literal.
    Number(f64),
    /// String literal, already unescaped.
    String(Rc<str>),
    /// Template literal; `quasis` has one more element than `exprs`.
    Template {
        /// Cooked string parts.
        quasis: Vec<Rc<str>>,
        /// Substitutions.
        exprs:  Vec<Expr>,
    },
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// `/pattern/flags`
    Regex {
        /// Pattern source.
        pattern: Rc<str>,
        /// Flags.
        flags:   Rc<str>,
    },
    /// A variable reference.
    Ident(Rc<str>),
    /// `this`
    This,
    /// `super`, only valid as a callee or member object.
    Super,
    /// `[a, ...b]`
    Array(Vec<Element>),
    /// `{ a: 1, ...b }`
    Object(Vec<Prop>),
    /// Function or arrow expression.
    Function(Rc<FunctionDef>),
    /// Class expression.
    Class(Rc<ClassDef>),
    /// Prefix operator.
    Unary {
        /// Operator.
        op:  UnaryOp,
        /// Operand.
        arg: Box<Expr>,
    },
    /// `++` / `--`
    Update {
        /// True for `++`.
        increment: bool,
        /// True for the prefix form.
        prefix:    bool,
        /// Updated target.
        target:    Box<Pattern>,
    },
    /// Binary operator.
    Binary {
        /// Operator.
        op:    BinaryOp,
        /// Left operand.
        left:  Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `&&`, `||`, `??`
    Logical {
        /// Operator.
        op:    LogicalOp,
        /// Left operand.
        left:  Box<Expr>,
        /// Right operand, evaluated lazily.
        right: Box<Expr>,
    },
    /// Assignment.
    Assign {
        /// Operator.
        op:     AssignOp,
        /// Target.
        target: Box<Pattern>,
        /// Assigned value.
        value:  Box<Expr>,
    },
    /// `test ? a : b`
    Conditional {
        /// Condition.
        test:       Box<Expr>,
        /// Value when truthy.
        consequent: Box<Expr>,
        /// Value when falsy.
        alternate:  Box<Expr>,
    },
    /// A call.
    Call {
        /// Callee.
        callee:   Box<Expr>,
        /// Arguments.
        args:     Vec<Element>,
        /// `f?.()`
        optional: bool,
    },
    /// `new C(args)`
    New {
        /// Constructor.
        callee: Box<Expr>,
        /// Arguments.
        args:   Vec<Element>,
    },
    /// Property access.
    Member {
        /// Object.
        object:   Box<Expr>,
        /// Property.
        property: MemberProp,
        /// `obj?.prop`
        optional: bool,
    },
    /// `a, b`
    Sequence(Vec<Expr>),
}
