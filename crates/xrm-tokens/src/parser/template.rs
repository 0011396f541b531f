//! Template string parser built on winnow.
//!
//! Parses template text into an AST. Handles:
//! - Literal text segments
//! - `{[scope:]path[|format]}` attribute tokens
//! - `<[scope:]expand|...>`, `<[scope:]iif|...>`, `<[scope:]system|...>`
//! - Format-tag extraction from the `|format` segment
//! - Nested delimiters: pipes and dots inside balanced `{}`/`<>` are opaque
//!
//! A `{` always starts a token and an unbalanced one is a fatal error. A `<`
//! only starts a token when a construct keyword (with optional scope prefix)
//! follows; anything else is literal text, including the reserved `PowerFx`
//! and `random` prefixes, which have no defined behavior.

use winnow::combinator::{alt, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::any;

use super::ast::{
    AttributeRef, Expand, FormatSpec, FormatTag, Iif, Segment, System, TagKind, Template, Token,
    TokenKind,
};
use super::error::ParseError;
use super::scan;
use crate::data::OrderBy;

/// Parse a template string into an AST.
pub fn parse_template(input: &str) -> Result<Template, ParseError> {
    let mut remaining = input;
    match template(&mut remaining) {
        Ok(t) => {
            if remaining.is_empty() {
                Ok(t)
            } else {
                let (line, column) = position_of(input, remaining);
                Err(ParseError::Syntax {
                    line,
                    column,
                    message: format!(
                        "unexpected character: '{}'",
                        remaining.chars().next().unwrap_or('?')
                    ),
                })
            }
        }
        Err(e) => {
            let (line, column) = position_of(input, remaining);
            Err(ParseError::Syntax {
                line,
                column,
                message: format!("malformed token: {e}"),
            })
        }
    }
}

/// Line and column of the first unconsumed character.
fn position_of(original: &str, remaining: &str) -> (usize, usize) {
    let consumed = &original[..original.len() - remaining.len()];
    let line = consumed.matches('\n').count() + 1;
    let column = match consumed.rfind('\n') {
        Some(pos) => consumed.len() - pos,
        None => consumed.len() + 1,
    };
    (line, column)
}

fn template(input: &mut &str) -> ModalResult<Template> {
    let segments: Vec<Segment> = repeat(0.., segment).parse_next(input)?;
    Ok(Template {
        segments: merge_literals(segments),
    })
}

/// Collapse runs of adjacent literal segments.
fn merge_literals(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (merged.last_mut(), segment) {
            (Some(Segment::Literal(prev)), Segment::Literal(text)) => prev.push_str(&text),
            (_, other) => merged.push(other),
        }
    }
    merged
}

fn segment(input: &mut &str) -> ModalResult<Segment> {
    alt((token_segment, literal_char)).parse_next(input)
}

fn literal_char(input: &mut &str) -> ModalResult<Segment> {
    any.map(|c: char| Segment::Literal(c.to_string()))
        .parse_next(input)
}

fn token_segment(input: &mut &str) -> ModalResult<Segment> {
    let ((scope, kind), raw) = alt((brace_token, construct_token))
        .with_taken()
        .parse_next(input)?;
    Ok(Segment::Token(Token {
        scope,
        raw: raw.to_string(),
        kind,
    }))
}

/// `{[scope:]path[|format]}`. Commits once the opening brace is consumed.
fn brace_token(input: &mut &str) -> ModalResult<(Option<String>, TokenKind)> {
    '{'.parse_next(input)?;
    let content = balanced_until(input, '{', '}')?;
    let (scope, aref) = parse_brace_content(content).map_err(|_| cut())?;
    Ok((scope, TokenKind::Attribute(aref)))
}

/// `<[scope:]keyword|args>`. Backtracks until the keyword and pipe match,
/// then commits.
fn construct_token(input: &mut &str) -> ModalResult<(Option<String>, TokenKind)> {
    '<'.parse_next(input)?;
    let (scope, keyword) = construct_prefix(input)?;
    let args = balanced_until(input, '<', '>')?;
    let kind = match keyword {
        "expand" => TokenKind::Expand(build_expand(args).map_err(|_| cut())?),
        "iif" => TokenKind::Iif(build_iif(args).map_err(|_| cut())?),
        _ => TokenKind::System(build_system(args)),
    };
    Ok((scope, kind))
}

const CONSTRUCT_KEYWORDS: [&str; 3] = ["expand", "iif", "system"];

/// Consume `[scope:]keyword|`, or backtrack if the text after `<` is not a
/// construct invocation.
fn construct_prefix<'i>(input: &mut &'i str) -> ModalResult<(Option<String>, &'static str)> {
    let source = *input;

    for keyword in CONSTRUCT_KEYWORDS {
        if let Some(rest) = source.strip_prefix(keyword)
            && let Some(rest) = rest.strip_prefix('|')
        {
            *input = rest;
            return Ok((None, keyword));
        }
    }

    if let Some(colon) = source.find(':') {
        let scope = &source[..colon];
        if !scope.is_empty() && scope.chars().all(is_scope_char) {
            let after = &source[colon + 1..];
            for keyword in CONSTRUCT_KEYWORDS {
                if let Some(rest) = after.strip_prefix(keyword)
                    && let Some(rest) = rest.strip_prefix('|')
                {
                    *input = rest;
                    return Ok((Some(scope.to_string()), keyword));
                }
            }
        }
    }

    Err(backtrack())
}

fn is_scope_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Consume input up to and including the matching `close`, counting nested
/// `open`/`close` pairs, and return the enclosed text. Running out of input
/// before the depth returns to zero is fatal: the construct is unterminated.
fn balanced_until<'i>(input: &mut &'i str, open: char, close: char) -> ModalResult<&'i str> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        if c == close {
            if depth == 0 {
                let enclosed = &input[..i];
                *input = &input[i + close.len_utf8()..];
                return Ok(enclosed);
            }
            depth -= 1;
        } else if c == open {
            depth += 1;
        }
    }
    Err(cut())
}

fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

/// Split brace-token content into scope, dotted path, optional trailing
/// construct, and format spec.
fn parse_brace_content(content: &str) -> Result<(Option<String>, AttributeRef), String> {
    // A scope prefix is only recognized when its ':' precedes any '<' or '|'
    // (so colons inside nested constructs or format strings don't count) and
    // the prefix is a plain identifier, same as construct scopes.
    let (scope, rest) = match content.find(':') {
        Some(pos)
            if pos > 0
                && content.find('<').is_none_or(|p| pos < p)
                && content.find('|').is_none_or(|p| pos < p)
                && content[..pos].chars().all(is_scope_char) =>
        {
            (Some(content[..pos].to_string()), &content[pos + 1..])
        }
        _ => (None, content),
    };

    // The format segment starts at the first pipe outside nested brackets;
    // a pipe belonging to a trailing construct is guarded by its '<'.
    let (path_part, format_part) = match scan::find_top_level(rest, '|') {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };

    // A construct as the final path segment: {ref.<expand|...>}
    let (head, nested_src) = match scan::find_top_level(path_part, '<') {
        Some(pos) => (path_part[..pos].trim_end_matches('.'), Some(&path_part[pos..])),
        None => (path_part, None),
    };

    if head.is_empty() && nested_src.is_none() {
        return Err("empty attribute path".to_string());
    }

    let path: Vec<String> = if head.is_empty() {
        Vec::new()
    } else {
        head.split('.').map(|s| s.trim().to_string()).collect()
    };
    if path.iter().any(String::is_empty) {
        return Err(format!("empty path segment in '{head}'"));
    }

    let nested = nested_src
        .map(|src| parse_template(src).map_err(|e| e.to_string()))
        .transpose()?;
    let format = format_part.map(parse_format_spec).transpose()?;

    Ok((
        scope,
        AttributeRef {
            path,
            nested,
            format,
        },
    ))
}

/// Extract embedded `<Tag|args>` / `<Tag=args>` / `<Tag>` groups from a
/// format string, left to right, leaving the core format behind.
fn parse_format_spec(format: &str) -> Result<FormatSpec, String> {
    let mut base = format.to_string();
    let mut tags = Vec::new();
    loop {
        match find_first_tag(&base)? {
            Some((start, end, tag)) => {
                base.replace_range(start..end, "");
                tags.push(tag);
            }
            None => break,
        }
    }
    Ok(FormatSpec { base, tags })
}

/// The `<value>`, `<recordurl>` and `<entity>` sentinels stay in the base
/// format; they select a rendition, they don't post-process text.
fn is_sentinel(name: &str) -> bool {
    name.eq_ignore_ascii_case("value")
        || name.eq_ignore_ascii_case("recordurl")
        || name.eq_ignore_ascii_case("entity")
}

/// Locate the leftmost tag-shaped `<...>` group in a format string.
///
/// Returns the byte range of the whole group and the parsed tag. Groups whose
/// name is a sentinel, not a plain word, or whose closing bracket is missing
/// are left in place.
fn find_first_tag(source: &str) -> Result<Option<(usize, usize, FormatTag)>, String> {
    let mut search_from = 0usize;
    while let Some(offset) = source[search_from..].find('<') {
        let start = search_from + offset;
        let Some(inner_len) = balanced_len(&source[start + 1..]) else {
            return Ok(None);
        };
        let inner = &source[start + 1..start + 1 + inner_len];
        let end = start + 1 + inner_len + 1;

        let (name, args_src) = match inner.find(['|', '=']) {
            Some(pos) => (&inner[..pos], Some(&inner[pos + 1..])),
            None => (inner, None),
        };

        if !is_sentinel(name) && !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            let args = match args_src {
                Some(src) => scan::split_top_level(src, '|')
                    .into_iter()
                    .map(|arg| parse_template(arg).map_err(|e| e.to_string()))
                    .collect::<Result<Vec<Template>, String>>()?,
                None => Vec::new(),
            };
            let tag = FormatTag {
                kind: TagKind::parse(name),
                args,
            };
            return Ok(Some((start, end, tag)));
        }

        search_from = end;
    }
    Ok(None)
}

/// Length of the text enclosed by an already-opened `<`, or `None` when the
/// matching `>` never appears.
fn balanced_len(source: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in source.char_indices() {
        if c == '>' {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        } else if c == '<' {
            depth += 1;
        }
    }
    None
}

fn build_expand(args: &str) -> Result<Expand, String> {
    let entity = scan::separated_part(args, '|', 1).trim().to_string();
    let attribute = scan::separated_part(args, '|', 2).trim().to_string();
    if entity.is_empty() || attribute.is_empty() {
        return Err("expand requires a child entity and a relation attribute".to_string());
    }

    let body = parse_template(scan::separated_part(args, '|', 3)).map_err(|e| e.to_string())?;
    let order = parse_order(scan::separated_part(args, '|', 4))?;
    let separator = scan::separated_part(args, '|', 5).to_string();
    let distinct = scan::separated_part(args, '|', 6)
        .trim()
        .eq_ignore_ascii_case("true");
    let active_only = scan::separated_part(args, '|', 7)
        .trim()
        .eq_ignore_ascii_case("true");

    let max_raw = scan::separated_part(args, '|', 8).trim();
    let max_count = if max_raw.is_empty() {
        None
    } else {
        Some(
            max_raw
                .parse::<usize>()
                .map_err(|_| format!("invalid maxcount '{max_raw}'"))?,
        )
    };

    Ok(Expand {
        entity,
        attribute,
        body,
        order,
        separator,
        distinct,
        active_only,
        max_count,
    })
}

/// `attribute[/ASC|DESC]` entries separated by commas.
fn parse_order(source: &str) -> Result<Vec<OrderBy>, String> {
    source
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (attribute, direction) = part.split_once('/').unwrap_or((part, "ASC"));
            let descending = if direction.eq_ignore_ascii_case("desc") {
                true
            } else if direction.eq_ignore_ascii_case("asc") {
                false
            } else {
                return Err(format!("invalid sort direction '{direction}'"));
            };
            Ok(OrderBy {
                attribute: attribute.trim().to_string(),
                descending,
            })
        })
        .collect()
}

fn build_iif(args: &str) -> Result<Iif, String> {
    let part = |n| scan::separated_part(args, '|', n);
    let sub = |n| parse_template(part(n)).map_err(|e: ParseError| e.to_string());
    Ok(Iif {
        left: sub(1)?,
        op: part(2).trim().to_string(),
        right: sub(3)?,
        when_true: sub(4)?,
        when_false: sub(5)?,
    })
}

fn build_system(args: &str) -> System {
    System {
        keyword: scan::separated_part(args, '|', 1).trim().to_string(),
        argument: scan::separated_part(args, '|', 2).to_string(),
    }
}
