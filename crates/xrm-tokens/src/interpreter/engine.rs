//! The top-level substitution engine.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use bon::Builder;

use super::TemplateError;
use super::context::EvalState;
use super::evaluator::{self, Env};
use crate::data::{DataAccess, MetadataCache};
use crate::parser::parse_template;
use crate::types::Record;

/// Behavior switches for an [`Engine`].
#[derive(Debug, Clone, Builder)]
pub struct EngineOptions {
    /// Namespace this engine answers to. Tokens carrying a different scope
    /// prefix (or any prefix, when this is `None`) pass through verbatim for
    /// a later pass.
    #[builder(into)]
    pub scope: Option<String>,

    /// Resolve failed cross-entity hops to an empty string (logged) instead
    /// of propagating. Use when template correctness cannot be guaranteed,
    /// e.g. free-text paths typed by end users.
    #[builder(default)]
    pub suppress_invalid_paths: bool,

    /// Maximum nesting depth before substitution fails with
    /// [`TemplateError::TooDeep`].
    #[builder(default = 64)]
    pub max_depth: usize,

    /// Optional cancellation signal, checked between token resolutions.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            scope: None,
            suppress_invalid_paths: false,
            max_depth: 64,
            cancel: None,
        }
    }
}

/// Template substitution engine bound to one data-access connection.
///
/// # Example
///
/// ```
/// use xrm_tokens::data::memory::MemoryStore;
/// use xrm_tokens::{Engine, MetadataCache, Record};
///
/// let store = MemoryStore::new();
/// let cache = MetadataCache::new();
/// let record = Record::new("account").with("name", "Acme");
///
/// let engine = Engine::new(&store, &cache);
/// let out = engine.substitute(&record, "Hello {name}!").unwrap();
/// assert_eq!(out, "Hello Acme!");
/// ```
pub struct Engine<'a> {
    data: &'a dyn DataAccess,
    metadata: &'a MetadataCache,
    options: EngineOptions,
}

impl<'a> Engine<'a> {
    /// An engine with default options: unscoped, strict paths, depth 64.
    pub fn new(data: &'a dyn DataAccess, metadata: &'a MetadataCache) -> Self {
        Self::with_options(data, metadata, EngineOptions::default())
    }

    pub fn with_options(
        data: &'a dyn DataAccess,
        metadata: &'a MetadataCache,
        options: EngineOptions,
    ) -> Self {
        Self {
            data,
            metadata,
            options,
        }
    }

    /// Expand every token in `text` against `record`, returning the fully
    /// resolved string.
    ///
    /// Rich-text sources deliver templates with HTML-encoded angle brackets;
    /// those are normalized back to `<`/`>` before parsing. Values spliced
    /// into the output are never re-scanned, so an attribute value that
    /// itself contains braces or token-like text appears unchanged.
    pub fn substitute(&self, record: &Record, text: &str) -> Result<String, TemplateError> {
        let text = decode_angle_entities(text);
        let template = parse_template(&text)?;
        let env = Env {
            data: self.data,
            metadata: self.metadata,
            options: &self.options,
        };
        let mut state = EvalState::new(self.options.max_depth, self.options.cancel.clone());
        evaluator::eval_template(&template, record, &env, &mut state)
    }
}

fn decode_angle_entities(text: &str) -> String {
    if text.contains("&lt;") || text.contains("&gt;") {
        text.replace("&lt;", "<").replace("&gt;", ">")
    } else {
        text.to_string()
    }
}
