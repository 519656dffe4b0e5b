//! Tree-sitter query strings used by the TypeScript backend.

/// Tree-sitter query that returns callables declared with `function` or bound
/// to a variable, in document order.
/// * `name`: callable name
pub const CALLABLE_QUERY: &str = include_str!("callable.scm");

/// Tree-sitter query that returns declared and called function names, in
/// document order.
/// * `name`: function or method name
pub const CALLED_NAMES_QUERY: &str = include_str!("called_names.scm");

/// Tree-sitter query that returns the constructors used with `new`.
/// * `name`: constructor name, without its namespace
pub const NEW_TARGETS_QUERY: &str = include_str!("new_targets.scm");
