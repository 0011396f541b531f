//! Public AST types for parsed templates.
//!
//! These types are public to enable external tooling (linters, editors).

use crate::data::OrderBy;

/// A parsed template string containing segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

/// A segment within a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text (nothing to substitute).
    Literal(String),
    /// A substitutable token.
    Token(Token),
}

/// One token, with the raw source span it was parsed from.
///
/// The raw span is kept so a token whose scope does not match the engine's
/// scope can be emitted back verbatim, untouched for a later pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Optional namespace prefix (`scope:` inside the delimiters).
    pub scope: Option<String>,
    /// The full original text of the token, delimiters included.
    pub raw: String,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `{path|format}` attribute reference.
    Attribute(AttributeRef),
    /// `<expand|...>` sub-collection loop.
    Expand(Expand),
    /// `<iif|...>` conditional.
    Iif(Iif),
    /// `<system|...>` built-in value.
    System(System),
}

/// A dotted attribute path with an optional trailing format.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRef {
    /// Dot-separated path segments. The last segment is the attribute that is
    /// read; earlier segments are lookup hops.
    pub path: Vec<String>,
    /// A construct appearing as the final path segment (`{ref.<expand|...>}`),
    /// evaluated against the record the path hops to.
    pub nested: Option<Template>,
    pub format: Option<FormatSpec>,
}

/// The format segment of an attribute token: a core format string plus any
/// embedded post-processing tags, in their original left-to-right order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSpec {
    /// The format string with all extra tags stripped, e.g. a date or numeric
    /// pattern, or one of the sentinels `<value>`, `<recordurl>`, `<entity>`.
    pub base: String,
    pub tags: Vec<FormatTag>,
}

/// One post-processing format tag.
///
/// Arguments are templates because they may contain nested tokens, e.g.
/// `<Math|+|{qty}>`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatTag {
    pub kind: TagKind,
    pub args: Vec<Template>,
}

/// The fixed set of post-processing tags.
#[derive(Debug, Clone, PartialEq)]
pub enum TagKind {
    MaxLen,
    Left,
    Right,
    Trim,
    TrimStart,
    TrimEnd,
    SubStr,
    Pad,
    Math,
    Replace,
    Upper,
    Lower,
    /// A tag name outside the fixed set. Kept through parsing and rejected at
    /// evaluation, so authoring mistakes fail loudly instead of no-opping.
    Other(String),
}

impl TagKind {
    /// The recognized tag names, for error suggestions.
    pub const NAMES: &'static [&'static str] = &[
        "MaxLen",
        "Left",
        "Right",
        "Trim",
        "TrimStart",
        "TrimEnd",
        "SubStr",
        "Pad",
        "Math",
        "Replace",
        "Upper",
        "Lower",
    ];

    /// Parse a tag name, case-insensitively.
    pub fn parse(name: &str) -> TagKind {
        match name.to_ascii_lowercase().as_str() {
            "maxlen" => TagKind::MaxLen,
            "left" => TagKind::Left,
            "right" => TagKind::Right,
            "trim" => TagKind::Trim,
            "trimstart" => TagKind::TrimStart,
            "trimend" => TagKind::TrimEnd,
            "substr" => TagKind::SubStr,
            "pad" => TagKind::Pad,
            "math" => TagKind::Math,
            "replace" => TagKind::Replace,
            "upper" => TagKind::Upper,
            "lower" => TagKind::Lower,
            _ => TagKind::Other(name.to_string()),
        }
    }

    /// The canonical name of this tag.
    pub fn name(&self) -> &str {
        match self {
            TagKind::MaxLen => "MaxLen",
            TagKind::Left => "Left",
            TagKind::Right => "Right",
            TagKind::Trim => "Trim",
            TagKind::TrimStart => "TrimStart",
            TagKind::TrimEnd => "TrimEnd",
            TagKind::SubStr => "SubStr",
            TagKind::Pad => "Pad",
            TagKind::Math => "Math",
            TagKind::Replace => "Replace",
            TagKind::Upper => "Upper",
            TagKind::Lower => "Lower",
            TagKind::Other(name) => name,
        }
    }
}

/// `<expand|child|relation|format|order|separator|distinct|activeonly|maxcount>`
#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    /// Logical name of the child entity.
    pub entity: String,
    /// Lookup attribute on the child pointing back at the current record.
    pub attribute: String,
    /// Template rendered once per child record.
    pub body: Template,
    /// Explicit ordering; empty means "sort rendered fragments alphabetically".
    pub order: Vec<OrderBy>,
    /// Separator joined between fragments, `\n`/`\r` escapes un-escaped first.
    pub separator: String,
    /// Keep only string-unique rendered fragments.
    pub distinct: bool,
    /// Restrict to active child records.
    pub active_only: bool,
    /// Cap on the number of retrieved child records.
    pub max_count: Option<usize>,
}

/// `<iif|value1|op|value2|trueresult|falseresult>`
///
/// Operands and branches are all templates, substituted against the current
/// record before use. The operator is validated at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Iif {
    pub left: Template,
    pub op: String,
    pub right: Template,
    pub when_true: Template,
    pub when_false: Template,
}

/// `<system|keyword|argument>`
///
/// The argument's meaning depends on the keyword: a date format for
/// NOW/TODAY, a sub-template for USER, an escape string for CHAR. It is kept
/// raw here and interpreted at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub keyword: String,
    pub argument: String,
}

/// The recognized `system` keywords, for error suggestions.
pub const SYSTEM_KEYWORDS: &[&str] = &["NOW", "TODAY", "USER", "CHAR"];

/// The recognized `iif` operators, for error suggestions.
pub const IIF_OPERATORS: &[&str] = &["eq", "neq", "lt", "gt", "le", "ge"];
