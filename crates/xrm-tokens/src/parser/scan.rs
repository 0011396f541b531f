//! Nesting-aware string scanning primitives.
//!
//! Template arguments are pipe-separated, but an argument may itself contain
//! nested `{...}` tokens or `<...>` constructs whose own pipes must not count
//! as separators. These helpers treat any region inside balanced braces or
//! angle brackets as opaque. Public so external tooling can reuse them.

/// Signed difference between the first occurrence of `a` and of `b`.
///
/// A needle that does not occur counts as found at the end of the string, so
/// callers can ask "does `a` occur before `b`" without special-casing absence.
pub fn compare_positions(source: &str, a: &str, b: &str) -> isize {
    let pos_a = source.find(a).unwrap_or(source.len());
    let pos_b = source.find(b).unwrap_or(source.len());
    pos_a as isize - pos_b as isize
}

/// Split on `separator`, ignoring separators nested inside `{}` or `<>`.
pub fn split_top_level(source: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut brace_depth = 0usize;
    let mut angle_depth = 0usize;
    let mut start = 0usize;

    for (i, c) in source.char_indices() {
        match c {
            '{' => brace_depth += 1,
            '}' => brace_depth = brace_depth.saturating_sub(1),
            '<' => angle_depth += 1,
            '>' => angle_depth = angle_depth.saturating_sub(1),
            c if c == separator && brace_depth == 0 && angle_depth == 0 => {
                parts.push(&source[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
}

/// The `n`-th (1-based) `separator`-delimited segment of `source`, with
/// separators inside balanced brackets not counting. Out-of-range `n`
/// yields an empty string.
pub fn separated_part(source: &str, separator: char, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    split_top_level(source, separator)
        .get(n - 1)
        .copied()
        .unwrap_or("")
}

/// The byte position of the first `needle` at bracket depth zero, if any.
///
/// The depth check happens before the needle character's own bookkeeping, so
/// searching for `<` finds the first top-level opening bracket itself.
pub fn find_top_level(source: &str, needle: char) -> Option<usize> {
    let mut brace_depth = 0usize;
    let mut angle_depth = 0usize;
    for (i, c) in source.char_indices() {
        if c == needle && brace_depth == 0 && angle_depth == 0 {
            return Some(i);
        }
        match c {
            '{' => brace_depth += 1,
            '}' => brace_depth = brace_depth.saturating_sub(1),
            '<' => angle_depth += 1,
            '>' => angle_depth = angle_depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}
