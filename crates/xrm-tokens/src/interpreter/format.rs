//! Post-processing format tags.
//!
//! Applies one extracted `<Tag|args>` to already-resolved text. Arguments
//! arrive as plain strings; the evaluator substitutes any nested tokens in
//! them before calling in here. Lengths and positions count user-visible
//! grapheme clusters, not bytes.

use chrono::format::{Item, StrftimeItems};
use rust_decimal::Decimal;
use unicode_segmentation::UnicodeSegmentation;

use super::TemplateError;
use crate::parser::ast::TagKind;

/// Parse a strftime-style date pattern, rejecting invalid specifiers up
/// front. chrono would otherwise surface them as a panic at render time.
pub(crate) fn strftime_items(pattern: &str) -> Result<Vec<Item<'_>>, TemplateError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(TemplateError::format(
            "date format",
            format!("'{pattern}' is not a valid date format"),
        ));
    }
    Ok(items)
}

/// Apply a single format tag to `text`.
///
/// Bad numeric arguments, out-of-range substring indices, an empty `Replace`
/// search string, and tags outside the fixed set are all
/// [`TemplateError::Format`]: silent no-ops would mask template authoring
/// mistakes.
pub fn apply(text: &str, kind: &TagKind, args: &[String]) -> Result<String, TemplateError> {
    match kind {
        TagKind::MaxLen | TagKind::Left => Ok(take_left(text, parse_len(kind, args, 0)?)),
        TagKind::Right => Ok(take_right(text, parse_len(kind, args, 0)?)),
        TagKind::Trim => Ok(trim(text, args.first(), true, true)),
        TagKind::TrimStart => Ok(trim(text, args.first(), true, false)),
        TagKind::TrimEnd => Ok(trim(text, args.first(), false, true)),
        TagKind::SubStr => substr(text, args),
        TagKind::Pad => pad(text, args),
        TagKind::Math => math(text, args),
        TagKind::Replace => replace(text, args),
        TagKind::Upper => Ok(text.to_uppercase()),
        TagKind::Lower => Ok(text.to_lowercase()),
        TagKind::Other(name) => Err(TemplateError::unknown(
            name.clone(),
            "unrecognized format tag",
            TagKind::NAMES,
            name,
        )),
    }
}

/// Parse a decimal, accepting both `.` and `,` as the decimal separator.
///
/// Users type numbers in either convention; a lone comma is normalized to a
/// point before parsing. This is deliberate, not an oversight.
pub fn parse_decimal_flexible(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let normalized = if text.contains(',') && !text.contains('.') {
        text.replace(',', ".")
    } else {
        text.to_string()
    };
    normalized.parse().ok()
}

fn graphemes(text: &str) -> Vec<&str> {
    text.graphemes(true).collect()
}

fn take_left(text: &str, n: usize) -> String {
    graphemes(text).into_iter().take(n).collect()
}

fn take_right(text: &str, n: usize) -> String {
    let clusters = graphemes(text);
    let skip = clusters.len().saturating_sub(n);
    clusters.into_iter().skip(skip).collect()
}

/// Strip whitespace, or a specific substring (case-insensitive) from the
/// selected ends.
fn trim(text: &str, needle: Option<&String>, start: bool, end: bool) -> String {
    match needle.map(String::as_str).filter(|s| !s.is_empty()) {
        None => {
            let mut out = text;
            if start {
                out = out.trim_start();
            }
            if end {
                out = out.trim_end();
            }
            out.to_string()
        }
        Some(needle) => {
            let mut out = text;
            if start && let Some(rest) = strip_ignore_case(out, needle, true) {
                out = rest;
            }
            if end && let Some(rest) = strip_ignore_case(out, needle, false) {
                out = rest;
            }
            out.to_string()
        }
    }
}

/// Case-insensitively strip `needle` from one end of `text`, splitting at
/// `text`'s own char boundaries. The candidate slice covers as many chars as
/// the needle has; a case fold that changes a needle's length therefore
/// never matches, it cannot split inside a character.
fn strip_ignore_case<'a>(text: &'a str, needle: &str, from_start: bool) -> Option<&'a str> {
    let take = needle.chars().count();
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    if take == 0 || boundaries.len() < take {
        return None;
    }
    let (head, tail) = if from_start {
        text.split_at(boundaries.get(take).copied().unwrap_or(text.len()))
    } else {
        text.split_at(boundaries[boundaries.len() - take])
    };
    let candidate = if from_start { head } else { tail };
    if candidate.to_lowercase() == needle.to_lowercase() {
        Some(if from_start { tail } else { head })
    } else {
        None
    }
}

fn substr(text: &str, args: &[String]) -> Result<String, TemplateError> {
    let start = parse_len(&TagKind::SubStr, args, 0)?;
    let clusters = graphemes(text);
    if start > clusters.len() {
        return Err(TemplateError::format(
            "SubStr",
            format!("start {start} is beyond the end of a {}-character string", clusters.len()),
        ));
    }
    match args.get(1).map(String::as_str).filter(|s| !s.trim().is_empty()) {
        None => Ok(clusters[start..].concat()),
        Some(_) => {
            let len = parse_len(&TagKind::SubStr, args, 1)?;
            if start + len > clusters.len() {
                return Err(TemplateError::format(
                    "SubStr",
                    format!(
                        "range {start}..{} is beyond the end of a {}-character string",
                        start + len,
                        clusters.len()
                    ),
                ));
            }
            Ok(clusters[start..start + len].concat())
        }
    }
}

/// `Pad|L|n|[padtext]`: repeatedly concatenate the pad text on the chosen
/// side until the result is at least `n` clusters long.
fn pad(text: &str, args: &[String]) -> Result<String, TemplateError> {
    let side = args.first().map(String::as_str).unwrap_or("");
    let left = if side.eq_ignore_ascii_case("l") {
        true
    } else if side.eq_ignore_ascii_case("r") {
        false
    } else {
        return Err(TemplateError::format(
            "Pad",
            format!("side must be L or R, got '{side}'"),
        ));
    };

    let target = parse_len(&TagKind::Pad, args, 1)?;
    let filler = match args.get(2).map(String::as_str).filter(|s| !s.is_empty()) {
        Some(f) => f,
        None => " ",
    };

    let mut out = text.to_string();
    while out.graphemes(true).count() < target {
        if left {
            out.insert_str(0, filler);
        } else {
            out.push_str(filler);
        }
    }
    Ok(out)
}

/// `Math|op|[value]`: decimal arithmetic on the resolved text.
fn math(text: &str, args: &[String]) -> Result<String, TemplateError> {
    let op = args.first().map(String::as_str).unwrap_or("").trim().to_string();
    let left = parse_decimal_flexible(if text.trim().is_empty() { "0" } else { text })
        .ok_or_else(|| TemplateError::format("Math", format!("'{text}' is not a number")))?;

    let operand = |args: &[String]| -> Result<Decimal, TemplateError> {
        let raw = args
            .get(1)
            .ok_or_else(|| TemplateError::format("Math", format!("operator '{op}' needs a value")))?;
        parse_decimal_flexible(raw)
            .ok_or_else(|| TemplateError::format("Math", format!("'{raw}' is not a number")))
    };

    let divide = |a: Decimal, b: Decimal| -> Result<Decimal, TemplateError> {
        a.checked_div(b)
            .ok_or_else(|| TemplateError::format("Math", "division by zero"))
    };

    let result = match op.to_ascii_uppercase().as_str() {
        "+" => left + operand(args)?,
        "-" => left - operand(args)?,
        "*" => left * operand(args)?,
        "/" => divide(left, operand(args)?)?,
        "DIV" => divide(left, operand(args)?)?.trunc(),
        "MOD" => {
            let right = operand(args)?;
            left - right * divide(left, right)?.trunc()
        }
        "ROUND" => left.round(),
        "ABS" => left.abs(),
        _ => {
            return Err(TemplateError::unknown(
                "Math",
                format!("unknown operator '{op}'"),
                &["+", "-", "*", "/", "DIV", "MOD", "ROUND", "ABS"],
                &op,
            ));
        }
    };

    Ok(result.normalize().to_string())
}

fn replace(text: &str, args: &[String]) -> Result<String, TemplateError> {
    let old = args.first().map(String::as_str).unwrap_or("");
    if old.is_empty() {
        return Err(TemplateError::format("Replace", "search text must not be empty"));
    }
    let new = args.get(1).map(String::as_str).unwrap_or("");
    Ok(text.replace(old, new))
}

/// Parse a length/position argument, failing with the offending tag and text.
fn parse_len(kind: &TagKind, args: &[String], index: usize) -> Result<usize, TemplateError> {
    let raw = args.get(index).map(String::as_str).unwrap_or("").trim();
    raw.parse().map_err(|_| {
        TemplateError::format(
            kind.name().to_string(),
            format!("'{raw}' is not a valid length"),
        )
    })
}
