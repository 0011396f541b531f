//! Parse error types for the template language.

use thiserror::Error;

/// An error that occurred while parsing a template string.
///
/// Covers malformed tokens and unterminated constructs; both indicate a
/// broken template and are always fatal.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A syntax error with location information.
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}
