//! Static template checking.
//!
//! Catches authoring mistakes without touching the data layer: templates can
//! be validated when they are saved instead of failing at expansion time.
//! Attribute paths cannot be checked statically (they depend on live
//! metadata), but token structure, format tags, operators, and keywords can.

use thiserror::Error;

use super::error::compute_suggestions;
use crate::parser::ast::{
    AttributeRef, FormatTag, IIF_OPERATORS, SYSTEM_KEYWORDS, Segment, TagKind, Template, Token,
    TokenKind,
};
use crate::parser::parse_template;

/// One finding from [`lint_template`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LintWarning {
    /// The template does not parse at all.
    #[error("template does not parse: {message}")]
    Syntax { message: String },

    /// A format tag outside the fixed set.
    #[error("unknown format tag '{tag}'{}", render_suggestions(suggestions))]
    UnknownTag {
        tag: String,
        suggestions: Vec<String>,
    },

    /// An `iif` operator outside eq/neq/lt/gt/le/ge.
    #[error("unknown iif operator '{op}'")]
    UnknownOperator { op: String },

    /// A `system` keyword outside NOW/TODAY/USER/CHAR.
    #[error("unknown system keyword '{keyword}'{}", render_suggestions(suggestions))]
    UnknownKeyword {
        keyword: String,
        suggestions: Vec<String>,
    },

    /// A literal tag argument that must be a number but is not.
    #[error("format tag '{tag}' argument '{argument}' is not a number")]
    BadNumericArgument { tag: String, argument: String },

    /// `Replace` with an empty search text.
    #[error("Replace search text must not be empty")]
    EmptyReplaceSearch,
}

fn render_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

/// Statically check a template, returning every finding.
///
/// An empty result means the template parses and uses only known tags,
/// operators, and keywords. It does not guarantee its attribute paths exist.
pub fn lint_template(text: &str) -> Vec<LintWarning> {
    let normalized = text.replace("&lt;", "<").replace("&gt;", ">");
    let template = match parse_template(&normalized) {
        Ok(t) => t,
        Err(e) => {
            return vec![LintWarning::Syntax {
                message: e.to_string(),
            }];
        }
    };
    let mut warnings = Vec::new();
    walk_template(&template, &mut warnings);
    warnings
}

fn walk_template(template: &Template, warnings: &mut Vec<LintWarning>) {
    for segment in &template.segments {
        if let Segment::Token(token) = segment {
            walk_token(token, warnings);
        }
    }
}

fn walk_token(token: &Token, warnings: &mut Vec<LintWarning>) {
    match &token.kind {
        TokenKind::Attribute(aref) => walk_attribute(aref, warnings),
        TokenKind::Expand(expand) => walk_template(&expand.body, warnings),
        TokenKind::Iif(iif) => {
            if !IIF_OPERATORS
                .iter()
                .any(|op| op.eq_ignore_ascii_case(&iif.op))
            {
                warnings.push(LintWarning::UnknownOperator {
                    op: iif.op.clone(),
                });
            }
            walk_template(&iif.left, warnings);
            walk_template(&iif.right, warnings);
            walk_template(&iif.when_true, warnings);
            walk_template(&iif.when_false, warnings);
        }
        TokenKind::System(system) => {
            if !SYSTEM_KEYWORDS
                .iter()
                .any(|kw| kw.eq_ignore_ascii_case(&system.keyword))
            {
                warnings.push(LintWarning::UnknownKeyword {
                    keyword: system.keyword.clone(),
                    suggestions: compute_suggestions(&system.keyword, SYSTEM_KEYWORDS),
                });
            } else if system.keyword.eq_ignore_ascii_case("user") {
                match parse_template(&system.argument) {
                    Ok(t) => walk_template(&t, warnings),
                    Err(e) => warnings.push(LintWarning::Syntax {
                        message: e.to_string(),
                    }),
                }
            }
        }
    }
}

fn walk_attribute(aref: &AttributeRef, warnings: &mut Vec<LintWarning>) {
    if let Some(template) = &aref.nested {
        walk_template(template, warnings);
    }
    let Some(spec) = &aref.format else { return };
    for tag in &spec.tags {
        walk_tag(tag, warnings);
    }
}

fn walk_tag(tag: &FormatTag, warnings: &mut Vec<LintWarning>) {
    match &tag.kind {
        TagKind::Other(name) => warnings.push(LintWarning::UnknownTag {
            tag: name.clone(),
            suggestions: compute_suggestions(name, TagKind::NAMES),
        }),
        TagKind::MaxLen | TagKind::Left | TagKind::Right => {
            check_numeric(tag, 0, warnings);
        }
        TagKind::SubStr => {
            check_numeric(tag, 0, warnings);
            if literal_arg(tag, 1).is_some_and(|arg| !arg.trim().is_empty()) {
                check_numeric(tag, 1, warnings);
            }
        }
        TagKind::Pad => check_numeric(tag, 1, warnings),
        TagKind::Replace => {
            if literal_arg(tag, 0).is_some_and(|arg| arg.is_empty()) || tag.args.is_empty() {
                warnings.push(LintWarning::EmptyReplaceSearch);
            }
        }
        _ => {}
    }
    for arg in &tag.args {
        walk_template(arg, warnings);
    }
}

/// A literal numeric argument must parse; an argument containing tokens is
/// only knowable at evaluation time and is skipped.
fn check_numeric(tag: &FormatTag, index: usize, warnings: &mut Vec<LintWarning>) {
    if let Some(text) = literal_arg(tag, index)
        && text.trim().parse::<usize>().is_err()
    {
        warnings.push(LintWarning::BadNumericArgument {
            tag: tag.kind.name().to_string(),
            argument: text,
        });
    }
}

/// The argument's text when it contains no tokens, `None` otherwise.
fn literal_arg(tag: &FormatTag, index: usize) -> Option<String> {
    let template = tag.args.get(index)?;
    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Token(_) => return None,
        }
    }
    Some(out)
}
