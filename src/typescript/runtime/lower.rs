#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Lowers a tree-sitter TypeScript tree into the interpreter's syntax tree.
//! Type-only constructs that survived reduction are skipped; runtime syntax
//! the interpreter does not implement becomes a [`SyntaxError`].

use std::rc::Rc;

use tree_sitter::Node;

use super::{
    ast::*,
    error::SyntaxError,
    value::number_to_string,
};

/// Result of lowering one node.
type Lowered<T> = Result<T, SyntaxError>;

/// Statement kinds that only carry type information.
const TYPE_ONLY_STATEMENTS: &[&str] = &[
    "interface_declaration",
    "type_alias_declaration",
    "ambient_declaration",
    "function_signature",
    "import_statement",
    "import_alias",
    "debugger_statement",
    "empty_statement",
];

/// Class members that only carry type information.
const TYPE_ONLY_MEMBERS: &[&str] = &[
    "method_signature",
    "abstract_method_signature",
    "index_signature",
    "decorator",
];

/// Wrappers whose first named child is the runtime expression.
const TRANSPARENT_EXPRESSIONS: &[&str] = &[
    "parenthesized_expression",
    "as_expression",
    "satisfies_expression",
    "non_null_expression",
    "await_expression",
];

/// Statements, expressions and patterns that may enclose one another.
pub const MAX_NESTING: usize = 256;

/// Walks a tree and builds the owned syntax tree.
pub struct Lowerer<'a> {
    /// Source the tree was parsed from.
    source: &'a str,
    /// `var` names collected for each enclosing function, innermost last.
    vars:   Vec<Vec<Rc<str>>>,
    /// Constructs currently being lowered.
    depth:  usize,
}

impl<'a> Lowerer<'a> {
    /// Creates a lowerer over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            vars: Vec::new(),
            depth: 0,
        }
    }

    /// Lowers a `program` node.
    pub fn program(&mut self, root: Node<'_>) -> Lowered<Program> {
        self.vars.push(Vec::new());
        let body = self.statements(root)?;
        let var_names = self.vars.pop().unwrap_or_default();
        Ok(Program { body, var_names })
    }

    /// Source text of `node`.
    fn text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    /// A syntax error located at `node`.
    fn error(&self, node: Node<'_>, message: impl Into<String>) -> SyntaxError {
        let position = node.start_position();
        SyntaxError {
            message: message.into(),
            line:    position.row + 1,
            column:  position.column + 1,
        }
    }

    /// Lowers one nested construct, failing once nesting exceeds
    /// [`MAX_NESTING`].
    fn nested<T>(&mut self, node: Node<'_>, lower: impl FnOnce(&mut Self) -> Lowered<T>) -> Lowered<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(node, "Expression nesting too deep"));
        }
        self.depth += 1;
        let lowered = lower(self);
        self.depth -= 1;
        lowered
    }

    /// Error for runtime syntax the interpreter does not implement.
    fn unsupported(&self, node: Node<'_>) -> SyntaxError {
        self.error(node, format!("Unsupported syntax: {}", node.kind()))
    }

    /// A required field.
    fn field<'t>(&self, node: Node<'t>, name: &str) -> Lowered<Node<'t>> {
        node.child_by_field_name(name)
            .ok_or_else(|| self.error(node, format!("Missing {name} in {}", node.kind())))
    }

    /// The statements directly inside `node`.
    fn statements(&mut self, node: Node<'_>) -> Lowered<Vec<Stmt>> {
        named(node)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    /// Lowers one statement.
    fn statement(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        self.nested(node, |this| this.statement_node(node))
    }

    /// Body of [`Self::statement`].
    fn statement_node(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let kind = node.kind();
        if TYPE_ONLY_STATEMENTS.contains(&kind) {
            return Ok(Stmt::Empty);
        }

        Ok(match kind {
            "expression_statement" => match named(node).first() {
                Some(expr) => Stmt::Expr(self.expression(*expr)?),
                None => Stmt::Empty,
            },
            "lexical_declaration" | "variable_declaration" => self.declaration(node)?,
            "function_declaration" => Stmt::Function(self.function(node)?),
            "class_declaration" | "abstract_class_declaration" => Stmt::Class(self.class(node)?),
            "enum_declaration" => self.enumeration(node)?,
            "export_statement" => match node.child_by_field_name("declaration") {
                Some(declaration) => self.statement(declaration)?,
                None => Stmt::Empty,
            },
            "return_statement" => Stmt::Return(match named(node).first() {
                Some(expr) => Some(self.expression(*expr)?),
                None => None,
            }),
            "if_statement" => {
                let test = self.expression(self.field(node, "condition")?)?;
                let consequent = Box::new(self.statement(self.field(node, "consequence")?)?);
                let alternate = match node.child_by_field_name("alternative") {
                    Some(clause) => match named(clause).first() {
                        Some(stmt) => Some(Box::new(self.statement(*stmt)?)),
                        None => None,
                    },
                    None => None,
                };
                Stmt::If {
                    test,
                    consequent,
                    alternate,
                }
            }
            "statement_block" => Stmt::Block(self.statements(node)?),
            "for_statement" => self.for_statement(node)?,
            "for_in_statement" => self.for_each(node)?,
            "while_statement" => Stmt::While {
                test: self.expression(self.field(node, "condition")?)?,
                body: Box::new(self.statement(self.field(node, "body")?)?),
            },
            "do_statement" => Stmt::DoWhile {
                body: Box::new(self.statement(self.field(node, "body")?)?),
                test: self.expression(self.field(node, "condition")?)?,
            },
            "break_statement" => Stmt::Break(self.label(node)),
            "continue_statement" => Stmt::Continue(self.label(node)),
            "throw_statement" => {
                let expr = named(node)
                    .first()
                    .copied()
                    .ok_or_else(|| self.error(node, "throw without a value"))?;
                Stmt::Throw(self.expression(expr)?)
            }
            "try_statement" => self.try_statement(node)?,
            "switch_statement" => self.switch_statement(node)?,
            "labeled_statement" => Stmt::Labeled {
                label: self.text(self.field(node, "label")?).into(),
                body:  Box::new(self.statement(self.field(node, "body")?)?),
            },
            _ => return Err(self.unsupported(node)),
        })
    }

    /// Label of a `break` or `continue`.
    fn label(&self, node: Node<'_>) -> Option<Rc<str>> {
        node.child_by_field_name("label")
            .map(|label| self.text(label).into())
    }

    /// `let`, `const` and `var` declarations.
    fn declaration(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let kind = if node.kind() == "variable_declaration" {
            VarKind::Var
        } else {
            match node.child_by_field_name("kind").map(|k| self.text(k)) {
                Some("const") => VarKind::Const,
                _ => {
                    if self.text(node).trim_start().starts_with("const") {
                        VarKind::Const
                    } else {
                        VarKind::Let
                    }
                }
            }
        };

        let mut decls = Vec::new();
        for declarator in named(node)
            .into_iter()
            .filter(|child| child.kind() == "variable_declarator")
        {
            let target = self.pattern(self.field(declarator, "name")?)?;
            let init = match declarator.child_by_field_name("value") {
                Some(value) => Some(self.expression(value)?),
                None => None,
            };
            if kind == VarKind::Var {
                self.collect_var(&target);
            }
            decls.push(Declarator { target, init });
        }

        Ok(Stmt::Var { kind, decls })
    }

    /// Records the names bound by a `var` pattern.
    fn collect_var(&mut self, pattern: &Pattern) {
        let mut names = Vec::new();
        bound_names(pattern, &mut names);
        if let Some(scope) = self.vars.last_mut() {
            for name in names {
                if !scope.contains(&name) {
                    scope.push(name);
                }
            }
        }
    }

    /// C-style `for`.
    fn for_statement(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let init = match node.child_by_field_name("initializer") {
            Some(init) => match init.kind() {
                "empty_statement" => None,
                "lexical_declaration" | "variable_declaration" => {
                    Some(Box::new(self.declaration(init)?))
                }
                "expression_statement" => Some(Box::new(self.statement(init)?)),
                _ => Some(Box::new(Stmt::Expr(self.expression(init)?))),
            },
            None => None,
        };
        let test = match node.child_by_field_name("condition") {
            Some(test) => match test.kind() {
                "empty_statement" => None,
                "expression_statement" => match named(test).first() {
                    Some(expr) => Some(self.expression(*expr)?),
                    None => None,
                },
                _ => Some(self.expression(test)?),
            },
            None => None,
        };
        let update = match node.child_by_field_name("increment") {
            Some(update) => Some(self.expression(update)?),
            None => None,
        };
        let body = Box::new(self.statement(self.field(node, "body")?)?);

        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    /// `for..in` and `for..of`.
    fn for_each(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let kind = match node.child_by_field_name("kind").map(|k| self.text(k)) {
            Some("var") => Some(VarKind::Var),
            Some("let") => Some(VarKind::Let),
            Some("const") => Some(VarKind::Const),
            _ => None,
        };
        let of = node
            .child_by_field_name("operator")
            .is_some_and(|op| self.text(op) == "of");
        let target = self.pattern(self.field(node, "left")?)?;
        if kind == Some(VarKind::Var) {
            self.collect_var(&target);
        }
        let source = self.expression(self.field(node, "right")?)?;
        let body = Box::new(self.statement(self.field(node, "body")?)?);

        Ok(Stmt::ForEach {
            of,
            kind,
            target,
            source,
            body,
        })
    }

    /// `try`/`catch`/`finally`.
    fn try_statement(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let block = self.statements(self.field(node, "body")?)?;
        let (param, handler) = match node.child_by_field_name("handler") {
            Some(clause) => {
                let param = match clause.child_by_field_name("parameter") {
                    Some(param) => Some(self.pattern(param)?),
                    None => None,
                };
                (param, Some(self.statements(self.field(clause, "body")?)?))
            }
            None => (None, None),
        };
        let finalizer = match node.child_by_field_name("finalizer") {
            Some(clause) => Some(self.statements(self.field(clause, "body")?)?),
            None => None,
        };

        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    /// `switch`.
    fn switch_statement(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let discriminant = self.expression(self.field(node, "value")?)?;
        let mut cases = Vec::new();

        for case in named(self.field(node, "body")?) {
            let test = match case.kind() {
                "switch_case" => Some(self.expression(self.field(case, "value")?)?),
                "switch_default" => None,
                _ => return Err(self.unsupported(case)),
            };
            let mut cursor = case.walk();
            let bodies: Vec<Node<'_>> = case
                .children_by_field_name("body", &mut cursor)
                .filter(|child| !child.is_extra())
                .collect();
            let body = bodies
                .into_iter()
                .map(|stmt| self.statement(stmt))
                .collect::<Lowered<Vec<_>>>()?;
            cases.push(SwitchCase { test, body });
        }

        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    /// `enum Name { A, B = 2 }`
    fn enumeration(&mut self, node: Node<'_>) -> Lowered<Stmt> {
        let name = self.text(self.field(node, "name")?).into();
        let mut members = Vec::new();

        for member in named(self.field(node, "body")?) {
            match member.kind() {
                "enum_assignment" => {
                    let key = self.static_key(self.field(member, "name")?)?;
                    let value = self.expression(self.field(member, "value")?)?;
                    members.push((key, Some(value)));
                }
                _ => members.push((self.static_key(member)?, None)),
            }
        }

        Ok(Stmt::Enum { name, members })
    }

    /// A function, arrow function or method.
    fn function(&mut self, node: Node<'_>) -> Lowered<Rc<FunctionDef>> {
        if self.text(node).trim_start().starts_with("function*")
            || named_or_anonymous(node).iter().any(|child| child.kind() == "*")
        {
            return Err(self.error(node, "Generators are not supported"));
        }

        let is_arrow = node.kind() == "arrow_function";
        let name = match node.child_by_field_name("name") {
            Some(name) => Some(self.text(name).into()),
            None => None,
        };

        self.vars.push(Vec::new());
        let (params, rest) = match node.child_by_field_name("parameters") {
            Some(params) => self.parameters(params)?,
            None => match node.child_by_field_name("parameter") {
                Some(param) => (vec![self.pattern(param)?], None),
                None => (Vec::new(), None),
            },
        };
        let body_node = self.field(node, "body")?;
        let body = if body_node.kind() == "statement_block" {
            FunctionBody::Block(self.statements(body_node)?)
        } else {
            FunctionBody::Expr(Box::new(self.expression(body_node)?))
        };
        let var_names = self.vars.pop().unwrap_or_default();

        Ok(Rc::new(FunctionDef {
            name,
            params,
            rest,
            body,
            is_arrow,
            var_names,
        }))
    }

    /// A `formal_parameters` list.
    fn parameters(&mut self, node: Node<'_>) -> Lowered<(Vec<Pattern>, Option<Pattern>)> {
        let mut params = Vec::new();
        let mut rest = None;

        for param in named(node) {
            let (target, default) = match param.kind() {
                "required_parameter" | "optional_parameter" => {
                    let target = self.field(param, "pattern")?;
                    (target, param.child_by_field_name("value"))
                }
                _ => (param, None),
            };

            match target.kind() {
                "this" => continue,
                "rest_pattern" => {
                    let inner = named(target)
                        .first()
                        .copied()
                        .ok_or_else(|| self.error(target, "Empty rest parameter"))?;
                    rest = Some(self.pattern(inner)?);
                }
                _ => {
                    let mut pattern = self.pattern(target)?;
                    if let Some(default) = default {
                        pattern = Pattern::Default(Box::new(pattern), Box::new(self.expression(default)?));
                    }
                    params.push(pattern);
                }
            }
        }

        Ok((params, rest))
    }

    /// A class declaration or expression.
    fn class(&mut self, node: Node<'_>) -> Lowered<Rc<ClassDef>> {
        let name = node
            .child_by_field_name("name")
            .map(|name| self.text(name).into());

        let mut parent = None;
        if let Some(heritage) = named(node)
            .into_iter()
            .find(|child| child.kind() == "class_heritage")
        {
            for clause in named(heritage) {
                match clause.kind() {
                    "extends_clause" => {
                        parent = Some(self.expression(self.field(clause, "value")?)?);
                    }
                    "implements_clause" => {}
                    _ => parent = Some(self.expression(clause)?),
                }
            }
        }

        let mut constructor = None;
        let mut methods = Vec::new();
        let mut fields = Vec::new();

        for member in named(self.field(node, "body")?) {
            let kind = member.kind();
            if TYPE_ONLY_MEMBERS.contains(&kind) {
                continue;
            }
            let is_static = has_token(member, "static");

            match kind {
                "method_definition" => {
                    let kind = if has_token(member, "get") {
                        MethodKind::Getter
                    } else if has_token(member, "set") {
                        MethodKind::Setter
                    } else {
                        MethodKind::Method
                    };
                    if kind != MethodKind::Method && is_static {
                        return Err(self.error(member, "Static accessors are not supported"));
                    }
                    let name = self.static_key(self.field(member, "name")?)?;
                    let func = self.function(member)?;
                    if &*name == "constructor" && !is_static && kind == MethodKind::Method {
                        constructor = Some(func);
                    } else {
                        methods.push(ClassMethod {
                            name,
                            func,
                            kind,
                            is_static,
                        });
                    }
                }
                "public_field_definition" | "field_definition" => {
                    let name_node = member
                        .child_by_field_name("name")
                        .or_else(|| member.child_by_field_name("property"))
                        .ok_or_else(|| self.error(member, "Field without a name"))?;
                    let name = self.static_key(name_node)?;
                    let value = match member.child_by_field_name("value") {
                        Some(value) => Some(self.expression(value)?),
                        None => None,
                    };
                    fields.push(ClassField {
                        name,
                        value,
                        is_static,
                    });
                }
                _ => return Err(self.unsupported(member)),
            }
        }

        Ok(Rc::new(ClassDef {
            name,
            parent,
            constructor,
            methods,
            fields,
        }))
    }

    /// A property key that must be known statically.
    fn static_key(&mut self, node: Node<'_>) -> Lowered<Rc<str>> {
        match self.property_key(node)? {
            PropKey::Static(key) => Ok(key),
            PropKey::Computed(_) => Err(self.error(node, "Computed member names are not supported here")),
        }
    }

    /// A property key in an object literal, pattern or class.
    fn property_key(&mut self, node: Node<'_>) -> Lowered<PropKey> {
        Ok(match node.kind() {
            "string" => PropKey::Static(self.string_literal(node).into()),
            "number" => PropKey::Static(number_to_string(self.number(node)?).into()),
            "computed_property_name" => {
                let inner = named(node)
                    .first()
                    .copied()
                    .ok_or_else(|| self.error(node, "Empty computed key"))?;
                PropKey::Computed(Box::new(self.expression(inner)?))
            }
            _ => PropKey::Static(self.text(node).into()),
        })
    }

    /// A binding or assignment target.
    fn pattern(&mut self, node: Node<'_>) -> Lowered<Pattern> {
        self.nested(node, |this| this.pattern_node(node))
    }

    /// Body of [`Self::pattern`].
    fn pattern_node(&mut self, node: Node<'_>) -> Lowered<Pattern> {
        Ok(match node.kind() {
            "identifier" | "shorthand_property_identifier_pattern" | "undefined" => {
                Pattern::Ident(self.text(node).into())
            }
            "member_expression" | "subscript_expression" => {
                Pattern::Member(Box::new(self.expression(node)?))
            }
            "parenthesized_expression" | "non_null_expression" => {
                let inner = named(node)
                    .first()
                    .copied()
                    .ok_or_else(|| self.error(node, "Empty parentheses"))?;
                self.pattern(inner)?
            }
            "assignment_pattern" | "object_assignment_pattern" => Pattern::Default(
                Box::new(self.pattern(self.field(node, "left")?)?),
                Box::new(self.expression(self.field(node, "right")?)?),
            ),
            "object_pattern" | "object" => self.object_pattern(node)?,
            "array_pattern" | "array" => self.array_pattern(node)?,
            _ => return Err(self.unsupported(node)),
        })
    }

    /// `{ a, b: c = 1, ...rest }`
    fn object_pattern(&mut self, node: Node<'_>) -> Lowered<Pattern> {
        let mut props = Vec::new();
        let mut rest = None;

        for child in named(node) {
            match child.kind() {
                "shorthand_property_identifier_pattern" | "shorthand_property_identifier" => {
                    let name: Rc<str> = self.text(child).into();
                    props.push((PropKey::Static(Rc::clone(&name)), Pattern::Ident(name)));
                }
                "pair_pattern" | "pair" => {
                    let key = self.property_key(self.field(child, "key")?)?;
                    let value = self.pattern(self.field(child, "value")?)?;
                    props.push((key, value));
                }
                "object_assignment_pattern" => {
                    let left = self.field(child, "left")?;
                    let name: Rc<str> = self.text(left).into();
                    let default = self.expression(self.field(child, "right")?)?;
                    props.push((
                        PropKey::Static(Rc::clone(&name)),
                        Pattern::Default(Box::new(Pattern::Ident(name)), Box::new(default)),
                    ));
                }
                "rest_pattern" | "spread_element" => {
                    let inner = named(child)
                        .first()
                        .copied()
                        .ok_or_else(|| self.error(child, "Empty rest element"))?;
                    rest = Some(Box::new(self.pattern(inner)?));
                }
                _ => return Err(self.unsupported(child)),
            }
        }

        Ok(Pattern::Object { props, rest })
    }

    /// `[a, , b = 1, ...rest]`
    fn array_pattern(&mut self, node: Node<'_>) -> Lowered<Pattern> {
        let mut elems = Vec::new();
        let mut rest = None;
        let mut expecting = true;

        for child in named_or_anonymous(node) {
            match child.kind() {
                "[" | "]" => {}
                "," => {
                    if expecting {
                        elems.push(None);
                    }
                    expecting = true;
                }
                "rest_pattern" | "spread_element" => {
                    let inner = named(child)
                        .first()
                        .copied()
                        .ok_or_else(|| self.error(child, "Empty rest element"))?;
                    rest = Some(Box::new(self.pattern(inner)?));
                    expecting = false;
                }
                _ if child.is_extra() => {}
                _ => {
                    elems.push(Some(self.pattern(child)?));
                    expecting = false;
                }
            }
        }

        Ok(Pattern::Array { elems, rest })
    }

    /// Lowers an expression.
    fn expression(&mut self, node: Node<'_>) -> Lowered<Expr> {
        self.nested(node, |this| this.expression_node(node))
    }

    /// Body of [`Self::expression`].
    fn expression_node(&mut self, node: Node<'_>) -> Lowered<Expr> {
        let kind = node.kind();
        if TRANSPARENT_EXPRESSIONS.contains(&kind) {
            let inner = named(node)
                .first()
                .copied()
                .ok_or_else(|| self.error(node, format!("Empty {kind}")))?;
            return self.expression(inner);
        }

        Ok(match kind {
            "identifier" | "shorthand_property_identifier" => match self.text(node) {
                "undefined" => Expr::Undefined,
                name => Expr::Ident(name.into()),
            },
            "undefined" => Expr::Undefined,
            "this" => Expr::This,
            "super" => Expr::Super,
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "null" => Expr::Null,
            "number" => Expr::Number(self.number(node)?),
            "string" => Expr::String(self.string_literal(node).into()),
            "template_string" => self.template(node)?,
            "regex" => Expr::Regex {
                pattern: self.text(self.field(node, "pattern")?).into(),
                flags:   node
                    .child_by_field_name("flags")
                    .map(|flags| self.text(flags))
                    .unwrap_or_default()
                    .into(),
            },
            "type_assertion" => {
                let inner = named(node)
                    .last()
                    .copied()
                    .ok_or_else(|| self.error(node, "Empty type assertion"))?;
                self.expression(inner)?
            }
            "array" => Expr::Array(self.elements(node)?),
            "object" => self.object(node)?,
            "function_expression" | "function" | "arrow_function" => {
                Expr::Function(self.function(node)?)
            }
            "class" => Expr::Class(self.class(node)?),
            "unary_expression" => {
                let op = match self.text(self.field(node, "operator")?) {
                    "!" => UnaryOp::Not,
                    "-" => UnaryOp::Minus,
                    "+" => UnaryOp::Plus,
                    "~" => UnaryOp::BitNot,
                    "typeof" => UnaryOp::TypeOf,
                    "void" => UnaryOp::Void,
                    "delete" => UnaryOp::Delete,
                    _ => return Err(self.unsupported(node)),
                };
                Expr::Unary {
                    op,
                    arg: Box::new(self.expression(self.field(node, "argument")?)?),
                }
            }
            "update_expression" => {
                let operator = self.field(node, "operator")?;
                let argument = self.field(node, "argument")?;
                Expr::Update {
                    increment: self.text(operator) == "++",
                    prefix:    operator.start_byte() < argument.start_byte(),
                    target:    Box::new(self.pattern(argument)?),
                }
            }
            "binary_expression" => {
                let operator = self.text(self.field(node, "operator")?);
                let left = Box::new(self.expression(self.field(node, "left")?)?);
                let right = Box::new(self.expression(self.field(node, "right")?)?);
                match logical_op(operator) {
                    Some(op) => Expr::Logical { op, left, right },
                    None => Expr::Binary {
                        op: binary_op(operator).ok_or_else(|| self.unsupported(node))?,
                        left,
                        right,
                    },
                }
            }
            "assignment_expression" => Expr::Assign {
                op:     AssignOp::Assign,
                target: Box::new(self.pattern(self.field(node, "left")?)?),
                value:  Box::new(self.expression(self.field(node, "right")?)?),
            },
            "augmented_assignment_expression" => {
                let operator = self.text(self.field(node, "operator")?);
                let base = operator.strip_suffix('=').unwrap_or(operator);
                let op = match logical_op(base) {
                    Some(op) => AssignOp::Logical(op),
                    None => AssignOp::Compound(binary_op(base).ok_or_else(|| self.unsupported(node))?),
                };
                Expr::Assign {
                    op,
                    target: Box::new(self.pattern(self.field(node, "left")?)?),
                    value: Box::new(self.expression(self.field(node, "right")?)?),
                }
            }
            "ternary_expression" => Expr::Conditional {
                test:       Box::new(self.expression(self.field(node, "condition")?)?),
                consequent: Box::new(self.expression(self.field(node, "consequence")?)?),
                alternate:  Box::new(self.expression(self.field(node, "alternative")?)?),
            },
            "call_expression" => {
                let arguments = self.field(node, "arguments")?;
                if arguments.kind() != "arguments" {
                    return Err(self.error(node, "Tagged templates are not supported"));
                }
                Expr::Call {
                    callee:   Box::new(self.expression(self.field(node, "function")?)?),
                    args:     self.elements(arguments)?,
                    optional: is_optional(node),
                }
            }
            "new_expression" => Expr::New {
                callee: Box::new(self.expression(self.field(node, "constructor")?)?),
                args:   match node.child_by_field_name("arguments") {
                    Some(arguments) => self.elements(arguments)?,
                    None => Vec::new(),
                },
            },
            "member_expression" => Expr::Member {
                object:   Box::new(self.expression(self.field(node, "object")?)?),
                property: MemberProp::Name(self.text(self.field(node, "property")?).into()),
                optional: is_optional(node),
            },
            "subscript_expression" => Expr::Member {
                object:   Box::new(self.expression(self.field(node, "object")?)?),
                property: MemberProp::Computed(Box::new(
                    self.expression(self.field(node, "index")?)?,
                )),
                optional: is_optional(node),
            },
            "sequence_expression" => {
                let mut exprs = Vec::new();
                for child in named(node) {
                    match self.expression(child)? {
                        Expr::Sequence(inner) => exprs.extend(inner),
                        expr => exprs.push(expr),
                    }
                }
                Expr::Sequence(exprs)
            }
            _ => return Err(self.unsupported(node)),
        })
    }

    /// Array literal elements or call arguments.
    fn elements(&mut self, node: Node<'_>) -> Lowered<Vec<Element>> {
        named(node)
            .into_iter()
            .map(|child| {
                if child.kind() == "spread_element" {
                    let inner = named(child)
                        .first()
                        .copied()
                        .ok_or_else(|| self.error(child, "Empty spread"))?;
                    Ok(Element::Spread(self.expression(inner)?))
                } else {
                    Ok(Element::Expr(self.expression(child)?))
                }
            })
            .collect()
    }

    /// An object literal.
    fn object(&mut self, node: Node<'_>) -> Lowered<Expr> {
        let mut props = Vec::new();

        for child in named(node) {
            match child.kind() {
                "pair" => {
                    let key = self.property_key(self.field(child, "key")?)?;
                    let value = self.expression(self.field(child, "value")?)?;
                    props.push(Prop::KeyValue(key, value));
                }
                "shorthand_property_identifier" => {
                    let name: Rc<str> = self.text(child).into();
                    props.push(Prop::KeyValue(PropKey::Static(Rc::clone(&name)), Expr::Ident(name)));
                }
                "spread_element" => {
                    let inner = named(child)
                        .first()
                        .copied()
                        .ok_or_else(|| self.error(child, "Empty spread"))?;
                    props.push(Prop::Spread(self.expression(inner)?));
                }
                "method_definition" => {
                    if has_token(child, "get") || has_token(child, "set") {
                        return Err(self.error(child, "Accessor properties are not supported"));
                    }
                    let key = self.property_key(self.field(child, "name")?)?;
                    props.push(Prop::Method(key, self.function(child)?));
                }
                _ => return Err(self.unsupported(child)),
            }
        }

        Ok(Expr::Object(props))
    }

    /// A template literal.
    fn template(&mut self, node: Node<'_>) -> Lowered<Expr> {
        let start = node.start_byte() + 1;
        let end = node.end_byte().saturating_sub(1).max(start);
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut position = start;

        for child in named(node)
            .into_iter()
            .filter(|child| child.kind() == "template_substitution")
        {
            quasis.push(cook(&self.source[position..child.start_byte()]).into());
            let inner = named(child)
                .first()
                .copied()
                .ok_or_else(|| self.error(child, "Empty template substitution"))?;
            exprs.push(self.expression(inner)?);
            position = child.end_byte();
        }
        quasis.push(cook(&self.source[position..end]).into());

        Ok(Expr::Template { quasis, exprs })
    }

    /// Unescaped contents of a string literal.
    fn string_literal(&self, node: Node<'_>) -> String {
        let text = self.text(node);
        let inner = if text.len() >= 2 {
            &text[1..text.len() - 1]
        } else {
            ""
        };
        cook(inner)
    }

    /// Value of a numeric literal.
    fn number(&self, node: Node<'_>) -> Lowered<f64> {
        let text = self.text(node).replace('_', "");
        if text.ends_with('n') {
            return Err(self.error(node, "BigInt literals are not supported"));
        }
        for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
            if let Some(digits) = text.strip_prefix(prefix) {
                return u64::from_str_radix(digits, radix)
                    .map(|value| value as f64)
                    .map_err(|_| self.error(node, format!("Invalid number {text}")));
            }
        }
        text.parse::<f64>()
            .map_err(|_| self.error(node, format!("Invalid number {text}")))
    }
}

/// Named children without comments.
fn named(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// Every child, including punctuation.
fn named_or_anonymous(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Whether `node` has an anonymous `token` child.
fn has_token(node: Node<'_>, token: &str) -> bool {
    named_or_anonymous(node)
        .iter()
        .any(|child| !child.is_named() && child.kind() == token)
}

/// Whether a member access or call uses `?.`.
fn is_optional(node: Node<'_>) -> bool {
    node.child_by_field_name("optional_chain").is_some()
        || named_or_anonymous(node)
            .iter()
            .any(|child| matches!(child.kind(), "optional_chain" | "?."))
}

/// Maps short-circuiting operator text.
fn logical_op(op: &str) -> Option<LogicalOp> {
    match op {
        "&&" => Some(LogicalOp::And),
        "||" => Some(LogicalOp::Or),
        "??" => Some(LogicalOp::Nullish),
        _ => None,
    }
}

/// Maps binary operator text.
fn binary_op(op: &str) -> Option<BinaryOp> {
    Some(match op {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Rem,
        "**" => BinaryOp::Exp,
        "==" => BinaryOp::LooseEq,
        "!=" => BinaryOp::LooseNe,
        "===" => BinaryOp::StrictEq,
        "!==" => BinaryOp::StrictNe,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "&" => BinaryOp::BitAnd,
        "|" => BinaryOp::BitOr,
        "^" => BinaryOp::BitXor,
        "<<" => BinaryOp::Shl,
        ">>" => BinaryOp::Shr,
        ">>>" => BinaryOp::UShr,
        "in" => BinaryOp::In,
        "instanceof" => BinaryOp::InstanceOf,
        _ => return None,
    })
}

/// Names a pattern binds.
pub fn bound_names(pattern: &Pattern, out: &mut Vec<Rc<str>>) {
    match pattern {
        Pattern::Ident(name) => out.push(Rc::clone(name)),
        Pattern::Member(_) => {}
        Pattern::Object { props, rest } => {
            for (_, value) in props {
                bound_names(value, out);
            }
            if let Some(rest) = rest {
                bound_names(rest, out);
            }
        }
        Pattern::Array { elems, rest } => {
            for elem in elems.iter().flatten() {
                bound_names(elem, out);
            }
            if let Some(rest) = rest {
                bound_names(rest, out);
            }
        }
        Pattern::Default(target, _) => bound_names(target, out),
    }
}

/// Resolves escape sequences in string and template literal text.
pub fn cook(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') if !chars.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_unit(&mut out, u32::from_str_radix(&hex, 16).ok());
            }
            Some('u') => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    u32::from_str_radix(&hex, 16).ok()
                } else {
                    let hex: String = chars.by_ref().take(4).collect();
                    u32::from_str_radix(&hex, 16).ok()
                };
                push_code_unit(&mut out, code);
            }
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

/// Appends a decoded escape, replacing lone surrogates.
fn push_code_unit(out: &mut String, code: Option<u32>) {
    out.push(code.and_then(char::from_u32).unwrap_or('\u{fffd}'));
}

#[cfg(test)]
mod tests {
    use super::cook;

    #[test]
    fn cooks_escapes() {
        assert_eq!(cook(r"a\nb"), "a\nb");
        assert_eq!(cook(r"\x41B\u{43}"), "ABC");
        assert_eq!(cook(r#"\"quoted\""#), "\"quoted\"");
        assert_eq!(cook("line\\\ncontinued"), "linecontinued");
    }
}
