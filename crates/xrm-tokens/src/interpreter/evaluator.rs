//! Template evaluation engine.
//!
//! Walks a parsed [`Template`], dispatching each token to the matching
//! handler: attribute references go to the resolver, `expand`/`iif`/`system`
//! constructs are handled here. Literal segments are copied straight to the
//! output and resolved values are spliced in as text, never re-scanned.

use std::collections::HashSet;

use chrono::Local;

use super::context::EvalState;
use super::engine::EngineOptions;
use super::error::TemplateError;
use super::{format, resolve};
use crate::data::{ColumnSet, DataAccess, MetadataCache, RelatedQuery};
use crate::parser::ast::{
    Expand, IIF_OPERATORS, Iif, SYSTEM_KEYWORDS, Segment, System, Template, Token, TokenKind,
};
use crate::parser::parse_template;
use crate::types::Record;

/// Everything evaluation borrows from the engine.
pub(crate) struct Env<'a> {
    pub data: &'a dyn DataAccess,
    pub metadata: &'a MetadataCache,
    pub options: &'a EngineOptions,
}

/// Evaluate a template against a record, producing the resolved text.
pub(crate) fn eval_template(
    template: &Template,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    let mut output = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Token(token) => {
                state.checkpoint()?;
                if !scope_matches(token.scope.as_deref(), env.options.scope.as_deref()) {
                    // Not ours; leave the token for a pass with the right scope.
                    output.push_str(&token.raw);
                    continue;
                }
                output.push_str(&eval_token(token, record, env, state)?);
            }
        }
    }
    Ok(output)
}

/// An empty scope and an absent scope mean the same thing: unscoped.
fn scope_matches(token: Option<&str>, engine: Option<&str>) -> bool {
    fn normalize(scope: Option<&str>) -> Option<&str> {
        scope.filter(|s| !s.is_empty())
    }
    normalize(token) == normalize(engine)
}

fn eval_token(
    token: &Token,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    match &token.kind {
        TokenKind::Attribute(aref) => resolve::resolve_attribute(aref, record, env, state),
        TokenKind::Expand(expand) => eval_expand(expand, record, env, state),
        TokenKind::Iif(iif) => eval_iif(iif, record, env, state),
        TokenKind::System(system) => eval_system(system, env, state),
    }
}

/// `<expand|child|relation|format|order|separator|distinct|activeonly|maxcount>`
fn eval_expand(
    expand: &Expand,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    state.enter()?;
    let result = eval_expand_inner(expand, record, env, state);
    state.leave();
    result
}

fn eval_expand_inner(
    expand: &Expand,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    let query = RelatedQuery {
        entity: expand.entity.clone(),
        attribute: expand.attribute.clone(),
        id: record.id,
        active_only: expand.active_only,
        order: expand.order.clone(),
        columns: ColumnSet::All,
        max_count: expand.max_count,
    };
    log::debug!(
        "expanding '{}' records where {} = {}",
        query.entity,
        query.attribute,
        query.id
    );
    let rows = env.data.retrieve_related(&query)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut fragments: Vec<String> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        state.checkpoint()?;
        let rendered = eval_template(&expand.body, row, env, state)?;
        if rendered.is_empty() {
            continue;
        }
        // Dedup happens on the pre-index text; the running index keeps
        // counting over the full retrieved set either way.
        if expand.distinct && !seen.insert(rendered.clone()) {
            continue;
        }
        fragments.push(rendered.replace("##", &(index + 1).to_string()));
    }

    if expand.order.is_empty() {
        fragments.sort();
    }
    Ok(fragments.join(&unescape(&expand.separator, false)))
}

/// `<iif|value1|op|value2|trueresult|falseresult>`
fn eval_iif(
    iif: &Iif,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    let left = eval_template(&iif.left, record, env, state)?;
    let right = eval_template(&iif.right, record, env, state)?;
    let branch = if compare(&left, &iif.op, &right)? {
        &iif.when_true
    } else {
        &iif.when_false
    };
    state.enter()?;
    let result = eval_template(branch, record, env, state);
    state.leave();
    result
}

/// Numeric comparison when both operands parse as decimals, ordinal string
/// comparison otherwise. An empty operand counts as numeric zero.
fn compare(left: &str, op: &str, right: &str) -> Result<bool, TemplateError> {
    let numeric = |s: &str| format::parse_decimal_flexible(if s.is_empty() { "0" } else { s });
    let ordering = match (numeric(left), numeric(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => left.cmp(right),
    };
    match op.to_ascii_lowercase().as_str() {
        "eq" => Ok(ordering.is_eq()),
        "neq" => Ok(ordering.is_ne()),
        "lt" => Ok(ordering.is_lt()),
        "gt" => Ok(ordering.is_gt()),
        "le" => Ok(ordering.is_le()),
        "ge" => Ok(ordering.is_ge()),
        _ => Err(TemplateError::unknown(
            "iif",
            format!("unknown operator '{op}'"),
            IIF_OPERATORS,
            op,
        )),
    }
}

/// `<system|NOW|TODAY|USER|CHAR|argument>`
fn eval_system(
    system: &System,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    match system.keyword.to_ascii_uppercase().as_str() {
        "NOW" => {
            let pattern = default_if_empty(&system.argument, "%Y-%m-%d %H:%M:%S");
            let items = format::strftime_items(pattern)?;
            Ok(Local::now().format_with_items(items.iter()).to_string())
        }
        "TODAY" => {
            let pattern = default_if_empty(&system.argument, "%Y-%m-%d");
            let items = format::strftime_items(pattern)?;
            Ok(Local::now()
                .date_naive()
                .format_with_items(items.iter())
                .to_string())
        }
        "USER" => {
            let user_id = env.data.current_user_id()?;
            let user = env.data.retrieve("systemuser", user_id, &ColumnSet::All)?;
            let template = parse_template(&system.argument)?;
            state.enter()?;
            let result = eval_template(&template, &user, env, state);
            state.leave();
            result
        }
        "CHAR" => Ok(unescape(&system.argument, true)),
        other => Err(TemplateError::unknown(
            "system",
            format!("unknown system keyword '{other}'"),
            SYSTEM_KEYWORDS,
            other,
        )),
    }
}

fn default_if_empty<'a>(argument: &'a str, default: &'a str) -> &'a str {
    if argument.trim().is_empty() {
        default
    } else {
        argument
    }
}

/// Turn `\n`/`\r` escapes into control characters; `CHAR` additionally
/// un-escapes `\t`.
pub(crate) fn unescape(text: &str, with_tab: bool) -> String {
    let out = text.replace("\\n", "\n").replace("\\r", "\r");
    if with_tab { out.replace("\\t", "\t") } else { out }
}
