//! Template text parser.
//!
//! Parses template strings containing `{attribute}` tokens and
//! `<expand|...>`, `<iif|...>`, `<system|...>` constructs into an AST.
//! The AST is what the interpreter evaluates; it can also be walked by
//! external tooling.

pub mod ast;
pub mod error;
pub mod scan;
mod template;

pub use ast::*;
pub use error::ParseError;
pub use template::parse_template;
