#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Finds the function a submission exports for grading.

use std::fmt;

use tree_sitter::Node;

use crate::parser::Parser;

/// How the entry point was exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportForm {
    /// `export function name` or `export default function name`.
    Declaration,
    /// `export const name = (..) => ..` or a function expression.
    Binding,
    /// `export { name }` naming a top-level function.
    Clause,
}

/// The exported function tests are run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Global name the function is bound to once exports are stripped.
    pub name: String,
    /// How it was exported.
    pub form: ExportForm,
    /// 1-based line of the export.
    pub line: usize,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let form = match self.form {
            ExportForm::Declaration => "function declaration",
            ExportForm::Binding => "function binding",
            ExportForm::Clause => "export clause",
        };
        write!(f, "{} ({form}, line {})", self.name, self.line)
    }
}

/// Locates the entry point on the submission's original tree. Exported
/// declarations win over exported bindings, which win over export clauses;
/// within a form the first in source order wins.
pub fn locate(parser: &Parser) -> Option<EntryPoint> {
    let root = parser.root_node();
    let statements = named_children(root);
    let exports: Vec<_> = statements.iter().copied().filter(|s| s.kind() == "export_statement").collect();

    let declared = exports.iter().find_map(|export| {
        let declaration = export.child_by_field_name("declaration")?;
        is_function_declaration(declaration)
            .then(|| entry(parser, declaration, ExportForm::Declaration, *export))
            .flatten()
    });
    if declared.is_some() {
        return declared;
    }

    let bound = exports.iter().find_map(|export| {
        let declaration = export.child_by_field_name("declaration")?;
        function_bindings(declaration)
            .into_iter()
            .next()
            .and_then(|name| entry(parser, name, ExportForm::Binding, *export))
    });
    if bound.is_some() {
        return bound;
    }

    let top_level = top_level_functions(parser, &statements);
    exports
        .iter()
        .filter(|export| export.child_by_field_name("source").is_none())
        .flat_map(|export| {
            named_children(*export)
                .into_iter()
                .filter(|child| child.kind() == "export_clause")
                .flat_map(named_children)
                .filter_map(|specifier| specifier.child_by_field_name("name"))
                .map(move |name| (*export, name))
        })
        .find(|(_, name)| top_level.iter().any(|f| f == parser.text(*name)))
        .and_then(|(export, name)| entry(parser, name, ExportForm::Clause, export))
}

/// Builds an entry point from a name-bearing node.
fn entry(parser: &Parser, node: Node<'_>, form: ExportForm, export: Node<'_>) -> Option<EntryPoint> {
    let name = match node.kind() {
        "identifier" => node,
        _ => node.child_by_field_name("name")?,
    };
    Some(EntryPoint {
        name: parser.text(name).to_string(),
        form,
        line: export.start_position().row + 1,
    })
}

/// Named children of `node`.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// A named function or generator declaration.
fn is_function_declaration(node: Node<'_>) -> bool {
    matches!(node.kind(), "function_declaration" | "generator_function_declaration")
        && node.child_by_field_name("name").is_some()
}

/// Names a `const`/`let`/`var` declaration binds to functions.
fn function_bindings(declaration: Node<'_>) -> Vec<Node<'_>> {
    if !matches!(declaration.kind(), "lexical_declaration" | "variable_declaration") {
        return Vec::new();
    }
    named_children(declaration)
        .into_iter()
        .filter(|d| d.kind() == "variable_declarator")
        .filter(|d| {
            d.child_by_field_name("value")
                .is_some_and(|v| matches!(v.kind(), "arrow_function" | "function_expression" | "function"))
        })
        .filter_map(|d| d.child_by_field_name("name"))
        .filter(|name| name.kind() == "identifier")
        .collect()
}

/// Names of functions declared or bound at the top level, exported or not.
fn top_level_functions(parser: &Parser, statements: &[Node<'_>]) -> Vec<String> {
    let mut names = Vec::new();
    for statement in statements {
        let declaration = match statement.kind() {
            "export_statement" => match statement.child_by_field_name("declaration") {
                Some(declaration) => declaration,
                None => continue,
            },
            _ => *statement,
        };
        if is_function_declaration(declaration) {
            if let Some(name) = declaration.child_by_field_name("name") {
                names.push(parser.text(name).to_string());
            }
        }
        names.extend(function_bindings(declaration).into_iter().map(|n| parser.text(n).to_string()));
    }
    names
}
