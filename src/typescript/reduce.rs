#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Strips TypeScript-only syntax so the remaining text is plain JavaScript.
//!
//! The submission is parsed once and every pass marks byte ranges of the
//! original text for removal. Removed ranges keep their newlines, so a line
//! in the reduced program is the same line in the submission.

use std::fmt;

use anyhow::Result;
use tree_sitter::Node;

use crate::parser::Parser;

/// One named reduction pass, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Interfaces, type aliases, `declare` blocks and overload signatures.
    TypeDeclarations,
    /// `import` statements.
    Imports,
    /// The `export` qualifier, plus export clauses and anonymous defaults.
    Exports,
    /// Generic parameter and argument lists.
    Generics,
    /// Type annotations, optional and definite markers, modifiers and
    /// `implements` clauses.
    Annotations,
    /// `as`, `satisfies` and angle-bracket assertions.
    Assertions,
    /// Trailing non-null `!` markers.
    NonNull,
}

impl Pass {
    /// Every pass, in application order.
    pub const ALL: [Pass; 7] = [
        Pass::TypeDeclarations,
        Pass::Imports,
        Pass::Exports,
        Pass::Generics,
        Pass::Annotations,
        Pass::Assertions,
        Pass::NonNull,
    ];

    /// Short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Pass::TypeDeclarations => "type declarations",
            Pass::Imports => "imports",
            Pass::Exports => "export qualifiers",
            Pass::Generics => "generics",
            Pass::Annotations => "type annotations",
            Pass::Assertions => "type assertions",
            Pass::NonNull => "non-null assertions",
        }
    }

    /// Byte ranges this pass removes from the tree rooted at `nodes`.
    fn ranges(self, nodes: &[Node<'_>]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for node in nodes {
            match self {
                Pass::TypeDeclarations => type_declaration(*node, &mut out),
                Pass::Imports => {
                    if node.kind() == "import_statement" {
                        out.push(span(*node));
                    }
                }
                Pass::Exports => export_qualifier(*node, &mut out),
                Pass::Generics => {
                    if matches!(node.kind(), "type_parameters" | "type_arguments") {
                        out.push(span(*node));
                    }
                }
                Pass::Annotations => annotation(*node, &mut out),
                Pass::Assertions => assertion(*node, &mut out),
                Pass::NonNull => {
                    if node.kind() == "non_null_expression" {
                        if let Some(bang) = last_child(*node).filter(|c| c.kind() == "!") {
                            out.push(span(bang));
                        }
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The reduced program and the passes that changed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Plain JavaScript.
    pub code:  String,
    /// Passes that removed at least one range, in application order.
    pub steps: Vec<Pass>,
}

impl Reduction {
    /// True if the submission was already plain JavaScript.
    pub fn is_unchanged(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Reduces `source` to JavaScript.
pub fn reduce(source: &str) -> Result<Reduction> {
    let parser = Parser::typescript(source)?;
    Ok(reduce_parsed(&parser))
}

/// Reduces an already parsed submission.
pub fn reduce_parsed(parser: &Parser) -> Reduction {
    let nodes = preorder(parser.root_node());

    let mut removed: Vec<(usize, usize)> = Vec::new();
    let mut steps = Vec::new();
    for pass in Pass::ALL {
        let fresh: Vec<_> = pass
            .ranges(&nodes)
            .into_iter()
            .filter(|range| range.0 < range.1 && !covered(&removed, *range))
            .collect();
        if !fresh.is_empty() {
            steps.push(pass);
            removed.extend(fresh);
        }
    }

    Reduction {
        code: strip(parser.code(), removed),
        steps,
    }
}

/// Every node of the tree, parents before children.
fn preorder(root: Node<'_>) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut cursor = root.walk();
    loop {
        nodes.push(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return nodes;
            }
        }
    }
}

/// Byte range of a node.
fn span(node: Node<'_>) -> (usize, usize) {
    (node.start_byte(), node.end_byte())
}

/// The node's last child, named or not.
fn last_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).last()
}

/// True if `range` lies inside a range removed by an earlier pass.
fn covered(removed: &[(usize, usize)], range: (usize, usize)) -> bool {
    removed.iter().any(|&(start, end)| start <= range.0 && range.1 <= end)
}

/// Declarations that only exist at the type level. An exported one takes its
/// `export` statement along.
fn type_declaration(node: Node<'_>, out: &mut Vec<(usize, usize)>) {
    let is_type_only = match node.kind() {
        "interface_declaration" | "type_alias_declaration" | "ambient_declaration" => true,
        "function_signature" | "abstract_method_signature" | "index_signature" => true,
        "method_signature" => node.parent().is_some_and(|p| p.kind() == "class_body"),
        _ => false,
    };
    if !is_type_only {
        return;
    }
    match node.parent() {
        Some(parent) if parent.kind() == "export_statement" => out.push(span(parent)),
        _ => out.push(span(node)),
    }
}

/// `export` keywords in front of declarations; whole statements for export
/// clauses, re-exports and anonymous default exports.
fn export_qualifier(node: Node<'_>, out: &mut Vec<(usize, usize)>) {
    if node.kind() != "export_statement" {
        return;
    }
    match node.child_by_field_name("declaration") {
        Some(declaration) => out.push((node.start_byte(), declaration.start_byte())),
        None => out.push(span(node)),
    }
}

/// Annotations and the modifiers that only make sense with types.
fn annotation(node: Node<'_>, out: &mut Vec<(usize, usize)>) {
    match node.kind() {
        "type_annotation"
        | "asserts_annotation"
        | "type_predicate_annotation"
        | "accessibility_modifier"
        | "override_modifier"
        | "implements_clause" => out.push(span(node)),
        "?" => {
            if node.parent().is_some_and(|p| {
                matches!(p.kind(), "optional_parameter" | "public_field_definition" | "method_definition")
            }) {
                out.push(span(node));
            }
        }
        "!" => {
            if node
                .parent()
                .is_some_and(|p| matches!(p.kind(), "public_field_definition" | "variable_declarator"))
            {
                out.push(span(node));
            }
        }
        "readonly" | "declare" | "abstract" => {
            if !node.is_named() {
                out.push(span(node));
            }
        }
        _ => {}
    }
}

/// `x as T`, `x satisfies T` and `<T>x`.
fn assertion(node: Node<'_>, out: &mut Vec<(usize, usize)>) {
    match node.kind() {
        "as_expression" | "satisfies_expression" => {
            let mut cursor = node.walk();
            if let Some(operand) = node.named_children(&mut cursor).next() {
                out.push((operand.end_byte(), node.end_byte()));
            }
        }
        "type_assertion" => {
            let mut cursor = node.walk();
            if let Some(arguments) = node.children(&mut cursor).find(|c| c.kind() == "type_arguments") {
                out.push(span(arguments));
            }
        }
        _ => {}
    }
}

/// Removes `ranges` from `source`, keeping newlines and separating words that
/// would otherwise run together.
fn strip(source: &str, mut ranges: Vec<(usize, usize)>) -> String {
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end) in merged {
        out.push_str(&source[cursor..start]);
        let newlines = source[start..end].matches('\n').count();
        let next = source[end..].chars().next();
        let joins_words = out.chars().last().is_some_and(is_word) && next.is_some_and(is_word);
        if newlines > 0 {
            out.push_str(&"\n".repeat(newlines));
        } else if joins_words {
            out.push(' ');
        }
        cursor = end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Identifier character.
fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_overlapping_ranges() {
        assert_eq!(strip("abcdef", vec![(1, 3), (2, 4)]), "aef");
        assert_eq!(strip("a\nb\nc", vec![(0, 4)]), "\n\nc");
    }

    #[test]
    fn separates_adjacent_words() {
        assert_eq!(strip("let x:T=1", vec![(5, 7)]), "let x=1");
        assert_eq!(strip("return<T>x", vec![(6, 9)]), "return x");
    }
}
