//! Evaluation state threaded through recursive substitution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::interpreter::TemplateError;

/// Mutable state carried through one top-level `substitute` call.
///
/// Tracks recursion depth so pathological templates fail with
/// [`TemplateError::TooDeep`] instead of exhausting the call stack, and
/// checks the caller's cancellation signal between token resolutions, since
/// an `expand` over a large collection performs many sequential fetches.
pub struct EvalState {
    depth: usize,
    max_depth: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl EvalState {
    pub fn new(max_depth: usize, cancel: Option<Arc<AtomicBool>>) -> Self {
        Self {
            depth: 0,
            max_depth,
            cancel,
        }
    }

    /// Enter a nested substitution (expand body, iif branch, user template,
    /// lookup hop).
    pub fn enter(&mut self) -> Result<(), TemplateError> {
        if self.depth >= self.max_depth {
            return Err(TemplateError::TooDeep {
                max: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Fail fast if the caller requested cancellation.
    pub fn checkpoint(&self) -> Result<(), TemplateError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(TemplateError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
