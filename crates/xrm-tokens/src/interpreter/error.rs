//! Error types for template evaluation.

use std::cmp::Ordering;

use thiserror::Error;

use crate::data::DataError;
use crate::parser::ParseError;

/// An error that occurred during template substitution.
///
/// Syntax and format errors indicate a broken template authored by a user and
/// are always fatal. Path errors are recoverable when the engine runs with
/// `suppress_invalid_paths`; a missing attribute is never an error at all, it
/// resolves to an empty string.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template text failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A bad format tag, unknown operator, or unknown system keyword.
    #[error("invalid '{tag}': {message}{}", render_suggestions(suggestions))]
    Format {
        tag: String,
        message: String,
        suggestions: Vec<String>,
    },

    /// A cross-entity hop failed at the data layer.
    #[error("failed to resolve '{path}' on '{entity}'")]
    Path {
        path: String,
        entity: String,
        #[source]
        source: DataError,
    },

    /// A data-access failure outside path traversal (expand queries, the
    /// calling-user fetch, record URLs).
    #[error(transparent)]
    Data(#[from] DataError),

    /// Template nesting exceeded the configured maximum depth.
    #[error("maximum substitution depth {max} exceeded")]
    TooDeep { max: usize },

    /// The caller's cancellation signal fired between token resolutions.
    #[error("substitution cancelled")]
    Cancelled,
}

impl TemplateError {
    /// Build a format error with "did you mean" suggestions drawn from the
    /// given candidate names.
    pub(crate) fn unknown(tag: impl Into<String>, message: impl Into<String>, candidates: &[&str], input: &str) -> Self {
        TemplateError::Format {
            tag: tag.into(),
            message: message.into(),
            suggestions: compute_suggestions(input, candidates),
        }
    }

    pub(crate) fn format(tag: impl Into<String>, message: impl Into<String>) -> Self {
        TemplateError::Format {
            tag: tag.into(),
            message: message.into(),
            suggestions: Vec::new(),
        }
    }
}

fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

/// Rank candidate names by similarity to the input and keep the close ones.
pub fn compute_suggestions(input: &str, candidates: &[&str]) -> Vec<String> {
    let needle = input.to_ascii_lowercase();
    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .filter_map(|candidate| {
            let score = strsim::jaro_winkler(&needle, &candidate.to_ascii_lowercase());
            (score > 0.7).then_some((score, *candidate))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(3)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}
