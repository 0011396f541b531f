//! Template evaluation engine.
//!
//! This module turns parsed templates into output text. It resolves
//! attribute paths against records, expands related-record loops, evaluates
//! conditionals and system tokens, and applies format tags, all through a
//! [`crate::data::DataAccess`] implementation.

mod context;
mod engine;
mod error;
mod evaluator;
pub mod format;
mod lint;
mod resolve;

pub use context::EvalState;
pub use engine::{Engine, EngineOptions};
pub use error::{TemplateError, compute_suggestions};
pub use lint::{LintWarning, lint_template};
