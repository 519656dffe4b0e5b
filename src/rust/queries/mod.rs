//! Tree-sitter query strings used by the Rust rule source.

/// Tree-sitter query that returns struct definitions.
/// * `name`: struct name
pub const STRUCT_QUERY: &str = include_str!("struct_item.scm");

/// Tree-sitter query that returns enum definitions.
/// * `name`: enum name
pub const ENUM_QUERY: &str = include_str!("enum_item.scm");

/// Tree-sitter query that returns function and method definitions, in
/// document order.
/// * `name`: function name
pub const FUNCTION_QUERY: &str = include_str!("function_item.scm");

/// Tree-sitter query that returns the implementing type of `impl` blocks,
/// inherent or trait.
/// * `name`: implementing type, without generic arguments
pub const IMPL_QUERY: &str = include_str!("impl_item.scm");
