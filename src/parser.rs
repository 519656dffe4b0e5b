#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-sitter parser wrapper shared by both language families.

use std::fmt::Formatter;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Language, Node, Query, QueryCursor, StreamingIterator, Tree};

use crate::Dict;

/// Grammars the grader knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    /// TypeScript; also accepts plain JavaScript.
    TypeScript,
    /// Rust.
    Rust,
}

impl Grammar {
    /// Returns the compiled tree-sitter language.
    fn language(self) -> Language {
        match self {
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    /// Human-readable grammar name for error messages.
    fn name(self) -> &'static str {
        match self {
            Grammar::TypeScript => "TypeScript",
            Grammar::Rust => "Rust",
        }
    }
}

/// A syntax error located in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    /// 1-based line.
    pub line:    usize,
    /// 1-based column.
    pub column:  usize,
    /// Offending text, or the missing token.
    pub snippet: String,
    /// True if tree-sitter inserted a missing token rather than skipping one.
    pub missing: bool,
}

/// A struct that wraps a tree-sitter parse tree and the source it came from.
#[derive(Clone)]
pub struct Parser {
    /// The source code being parsed.
    code:    String,
    /// The parse tree.
    tree:    Tree,
    /// Which grammar produced the tree.
    grammar: Grammar,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("grammar", &self.grammar)
            .field("bytes", &self.code.len())
            .finish()
    }
}

impl Parser {
    /// Parses `source_code` with `grammar`.
    pub fn new(source_code: impl Into<String>, grammar: Grammar) -> Result<Self> {
        let source_code = source_code.into();
        let mut parser = tree_sitter::Parser::new();
        let language = grammar.language();

        parser
            .set_language(&language)
            .with_context(|| format!("Failed to load {} grammar", grammar.name()))?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing {} code", grammar.name()))?;

        Ok(Self {
            code: source_code,
            tree,
            grammar,
        })
    }

    /// Parses TypeScript or JavaScript.
    pub fn typescript(source_code: impl Into<String>) -> Result<Self> {
        Self::new(source_code, Grammar::TypeScript)
    }

    /// Parses Rust.
    pub fn rust(source_code: impl Into<String>) -> Result<Self> {
        Self::new(source_code, Grammar::Rust)
    }

    /// A getter for parser's source code.
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the grammar in use.
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Returns the parse tree's root node.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        &self.code[node.start_byte()..node.end_byte()]
    }

    /// Returns the first error or missing node in document order, if any.
    pub fn first_syntax_issue(&self) -> Option<SyntaxIssue> {
        let root = self.root_node();
        if !root.has_error() {
            return None;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                let position = node.start_position();
                let snippet = if node.is_missing() {
                    node.kind().to_string()
                } else {
                    self.text(node)
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .chars()
                        .take(20)
                        .collect()
                };
                return Some(SyntaxIssue {
                    line: position.row + 1,
                    column: position.column + 1,
                    snippet,
                    missing: node.is_missing(),
                });
            }

            let mut cursor = node.walk();
            let children: Vec<_> = node
                .children(&mut cursor)
                .filter(|child| child.has_error() || child.is_missing())
                .collect();
            stack.extend(children.into_iter().rev());
        }

        None
    }

    /// Applies a tree sitter query and returns the result as a collection of
    /// HashMaps, in document order.
    ///
    /// * `q`: the tree-sitter query to be applied
    pub fn query(&self, q: &str) -> Result<Vec<Dict>> {
        let mut results = vec![];
        let language = self.grammar.language();
        let query = Query::new(&language, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, self.tree.root_node(), self.code.as_bytes());
        let mut capture_indices = Vec::new();

        for name in query.capture_names() {
            let index = query
                .capture_index_for_name(name)
                .ok_or_else(|| anyhow!("Capture name {name} has no index associated."))?;
            capture_indices.push((index, name.to_string()));
        }

        while let Some(m) = matches.next() {
            let mut result = Dict::new();

            for (index, name) in &capture_indices {
                let value = match m.captures.iter().find(|c| c.index == *index) {
                    Some(v) => v,
                    None => continue,
                };

                let value = value
                    .node
                    .utf8_text(self.code.as_bytes())
                    .with_context(|| {
                        format!(
                            "Cannot match query result indices with source code for capture name: \
                             {name}."
                        )
                    })?;

                result.insert(name.clone(), value.to_string());
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Returns the text of every `capture_name` capture, in document order.
    pub fn captures(&self, q: &str, capture_name: &str) -> Result<Vec<String>> {
        Ok(self
            .query(q)?
            .into_iter()
            .filter_map(|mut row| row.remove(capture_name))
            .collect())
    }
}
