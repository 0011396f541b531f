//! Dotted attribute-path resolution.
//!
//! Resolves `{path.to.attribute|format}` against a record. The first segment
//! is read off the current record; when it holds a lookup reference and more
//! segments remain, the referenced record is fetched (projecting only the
//! next-needed attribute) and resolution recurses on it. A missing attribute
//! anywhere on the path is not an error: partial projections are expected,
//! and the token resolves to an empty string.

use rust_decimal::Decimal;
use uuid::Uuid;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::context::EvalState;
use super::error::TemplateError;
use super::evaluator::{Env, eval_template};
use super::format;
use crate::data::{ColumnSet, DataError};
use crate::parser::ast::{AttributeRef, FormatTag};
use crate::types::{Record, Reference, Value};

/// Resolve an attribute token to its formatted string value.
pub(crate) fn resolve_attribute(
    aref: &AttributeRef,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    resolve_path(aref, record, 0, env, state)
}

fn resolve_path(
    aref: &AttributeRef,
    record: &Record,
    index: usize,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    // Path exhausted: a trailing construct runs against the record we
    // hopped to, with the format tags applied to its output.
    if index >= aref.path.len() {
        let Some(template) = &aref.nested else {
            return Ok(String::new());
        };
        state.enter()?;
        let result = eval_template(template, record, env, state);
        state.leave();
        return apply_tags(&result?, aref, record, env, state);
    }

    let attribute = &aref.path[index];
    let Some(value) = record.get(attribute) else {
        log::trace!("'{}' not present on '{}'", attribute, record.entity);
        return Ok(String::new());
    };
    let value = value.unaliased();

    let remaining = aref.path.len() - index - 1;
    if remaining == 0 && aref.nested.is_none() {
        return format_terminal(value, attribute, record, aref, env, state);
    }

    // With exactly one segment left and a raw-value format, the original
    // engine reads the target attribute off the current record instead of
    // fetching. Preserved as-is; the trigger condition is deliberate.
    if remaining == 1 && aref.nested.is_none() && format_base(aref).eq_ignore_ascii_case("<value>")
    {
        let last = &aref.path[index + 1];
        let text = record
            .get(last)
            .map(|v| v.unaliased().raw_string())
            .unwrap_or_default();
        return apply_tags(&text, aref, record, env, state);
    }

    let (target_entity, target_id) = match value {
        Value::Reference(reference) => (reference.entity.clone(), reference.id),
        other => {
            // A bare id continues the path only if metadata names the
            // lookup's target entity.
            let Ok(id) = Uuid::parse_str(other.raw_string().trim()) else {
                return Ok(String::new());
            };
            match env.metadata.attribute(env.data, &record.entity, attribute) {
                Ok(Some(meta)) => match meta.related_entity {
                    Some(entity) => (entity, id),
                    None => return Ok(String::new()),
                },
                Ok(None) => return Ok(String::new()),
                Err(e) => return hop_failure(aref, record, e, env),
            }
        }
    };

    let columns = if remaining == 0 {
        // The trailing construct may reference anything on the target.
        ColumnSet::All
    } else {
        ColumnSet::single(aref.path[index + 1].clone())
    };

    state.enter()?;
    let result = match env.data.retrieve(&target_entity, target_id, &columns) {
        Ok(next) => resolve_path(aref, &next, index + 1, env, state),
        Err(e) => hop_failure(aref, record, e, env),
    };
    state.leave();
    result
}

fn hop_failure(
    aref: &AttributeRef,
    record: &Record,
    source: DataError,
    env: &Env<'_>,
) -> Result<String, TemplateError> {
    let path = aref.path.join(".");
    if env.options.suppress_invalid_paths {
        log::warn!(
            "suppressed failure resolving '{}' on '{}': {}",
            path,
            record.entity,
            source
        );
        Ok(String::new())
    } else {
        Err(TemplateError::Path {
            path,
            entity: record.entity.clone(),
            source,
        })
    }
}

fn format_base(aref: &AttributeRef) -> &str {
    aref.format.as_ref().map(|f| f.base.trim()).unwrap_or("")
}

/// Produce the final string for a terminal attribute + record pair.
fn format_terminal(
    value: &Value,
    attribute: &str,
    record: &Record,
    aref: &AttributeRef,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    let base = format_base(aref);
    let text = if base.eq_ignore_ascii_case("<value>") {
        value.raw_string()
    } else if base.eq_ignore_ascii_case("<recordurl>") {
        let reference = match value {
            Value::Reference(r) => r.clone(),
            _ => Reference::new(record.entity.clone(), record.id),
        };
        env.data.record_url(&reference)?
    } else if base.eq_ignore_ascii_case("<entity>") {
        match value {
            Value::Reference(r) => r.entity.clone(),
            _ => record.entity.clone(),
        }
    } else if base.is_empty() {
        display_string(value, attribute, record, env)
    } else {
        format_with(value, base, attribute, record, env)?
    };

    apply_tags(&text, aref, record, env, state)
}

/// Apply the extracted extra format tags in their original order. Tag
/// arguments may contain nested tokens; they are substituted first.
fn apply_tags(
    text: &str,
    aref: &AttributeRef,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<String, TemplateError> {
    let Some(spec) = &aref.format else {
        return Ok(text.to_string());
    };
    let mut out = text.to_string();
    for tag in &spec.tags {
        let args = eval_tag_args(tag, record, env, state)?;
        out = format::apply(&out, &tag.kind, &args)?;
    }
    Ok(out)
}

fn eval_tag_args(
    tag: &FormatTag,
    record: &Record,
    env: &Env<'_>,
    state: &mut EvalState,
) -> Result<Vec<String>, TemplateError> {
    tag.args
        .iter()
        .map(|arg| eval_template(arg, record, env, state))
        .collect()
}

/// The display rendition used when no explicit format is given: the
/// server-computed display string when present, otherwise the best label the
/// value and metadata can produce.
fn display_string(value: &Value, attribute: &str, record: &Record, env: &Env<'_>) -> String {
    if let Some(text) = record.formatted(attribute) {
        return text.to_string();
    }
    match value {
        Value::Reference(r) => r.name.clone().unwrap_or_else(|| r.id.to_string()),
        Value::OptionSet(code) => option_label(record, attribute, *code, env),
        Value::MultiOptionSet(codes) => codes
            .iter()
            .map(|code| option_label(record, attribute, *code, env))
            .collect::<Vec<_>>()
            .join("; "),
        Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        other => other.raw_string(),
    }
}

/// Option label via the metadata cache; metadata is best-effort display
/// enrichment, so lookup failures fall back to the numeric code.
fn option_label(record: &Record, attribute: &str, code: i64, env: &Env<'_>) -> String {
    match env
        .metadata
        .option_label(env.data, &record.entity, attribute, code)
    {
        Ok(Some(label)) => label,
        Ok(None) => code.to_string(),
        Err(e) => {
            log::debug!(
                "no option label for {}.{} = {}: {}",
                record.entity,
                attribute,
                code,
                e
            );
            code.to_string()
        }
    }
}

/// Apply an explicit base format, auto-detecting the value's shape: dates
/// format as dates, integers as integers, decimals as decimals, and anything
/// else treats the format as a `{0}`-style wrapper.
fn format_with(
    value: &Value,
    base: &str,
    attribute: &str,
    record: &Record,
    env: &Env<'_>,
) -> Result<String, TemplateError> {
    match value {
        Value::DateTime(dt) => {
            let items = format::strftime_items(base)?;
            Ok(dt.format_with_items(items.iter()).to_string())
        }
        Value::Int(n) => Ok(format_number(Decimal::from(*n), base)),
        Value::Decimal(d) | Value::Money(d) => Ok(format_number(*d, base)),
        Value::String(s) => format_string_auto(s, base),
        other => format_string_auto(&display_string(other, attribute, record, env), base),
    }
}

/// Auto-detect the shape of an already-stringified value.
fn format_string_auto(text: &str, base: &str) -> Result<String, TemplateError> {
    let trimmed = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        let items = format::strftime_items(base)?;
        return Ok(dt.format_with_items(items.iter()).to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        let items = format::strftime_items(base)?;
        return Ok(dt.format_with_items(items.iter()).to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let items = format::strftime_items(base)?;
        return Ok(date.format_with_items(items.iter()).to_string());
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(format_number(Decimal::from(n), base));
    }
    if let Some(d) = format::parse_decimal_flexible(trimmed) {
        return Ok(format_number(d, base));
    }
    Ok(if base.contains("{0}") {
        base.replace("{0}", text)
    } else {
        text.to_string()
    })
}

/// Small numeric pattern dialect: `N2`/`F2` fixed-precision forms and
/// `0.00`-style patterns set the decimal places; anything else falls back to
/// the `{0}` wrapper or the plain number.
fn format_number(value: Decimal, pattern: &str) -> String {
    if let Some(precision) = pattern
        .strip_prefix(['N', 'n', 'F', 'f'])
        .and_then(|rest| rest.parse::<usize>().ok())
    {
        return format!("{value:.precision$}");
    }
    if pattern.chars().all(|c| matches!(c, '0' | '#' | '.' | ',')) && !pattern.is_empty() {
        let precision = match pattern.find('.') {
            Some(dot) => pattern[dot + 1..]
                .chars()
                .take_while(|c| matches!(c, '0' | '#'))
                .count(),
            None => 0,
        };
        return format!("{value:.precision$}");
    }
    if pattern.contains("{0}") {
        return pattern.replace("{0}", &value.normalize().to_string());
    }
    value.normalize().to_string()
}
