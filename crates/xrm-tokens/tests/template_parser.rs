//! Integration tests for template parsing.

use xrm_tokens::parser::ast::{Segment, TagKind, TokenKind};
use xrm_tokens::parse_template;

// =============================================================================
// Literals and Tokens
// =============================================================================

#[test]
fn parse_literal_only() {
    let template = parse_template("no tokens here.").unwrap();
    assert_eq!(template.segments.len(), 1);
    assert_eq!(
        template.segments[0],
        Segment::Literal("no tokens here.".to_string())
    );
}

#[test]
fn parse_empty_input() {
    let template = parse_template("").unwrap();
    assert!(template.segments.is_empty());
}

#[test]
fn parse_simple_attribute() {
    let template = parse_template("Hello {name}!").unwrap();
    assert_eq!(template.segments.len(), 3);
    let Segment::Token(token) = &template.segments[1] else {
        panic!("expected a token at position 1");
    };
    assert_eq!(token.scope, None);
    assert_eq!(token.raw, "{name}");
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    assert_eq!(aref.path, vec!["name".to_string()]);
    assert!(aref.format.is_none());
    assert!(aref.nested.is_none());
}

#[test]
fn parse_dotted_path() {
    let template = parse_template("{parentaccountid.primarycontactid.fullname}").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    assert_eq!(
        aref.path,
        vec![
            "parentaccountid".to_string(),
            "primarycontactid".to_string(),
            "fullname".to_string()
        ]
    );
}

#[test]
fn parse_scoped_attribute_keeps_raw_span() {
    let template = parse_template("{fax:recipient}").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    assert_eq!(token.scope.as_deref(), Some("fax"));
    assert_eq!(token.raw, "{fax:recipient}");
}

#[test]
fn scope_must_be_an_identifier() {
    let template = parse_template("{order no:name}").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    assert_eq!(token.scope, None);
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    assert_eq!(aref.path, vec!["order no:name".to_string()]);
}

#[test]
fn adjacent_literals_merge() {
    let template = parse_template("a < b and c > d").unwrap();
    assert_eq!(template.segments.len(), 1);
}

// =============================================================================
// Format Specs
// =============================================================================

#[test]
fn parse_format_with_tags() {
    let template = parse_template("{name|<Left|3>}").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    let spec = aref.format.as_ref().unwrap();
    assert_eq!(spec.base, "");
    assert_eq!(spec.tags.len(), 1);
    assert_eq!(spec.tags[0].kind, TagKind::Left);
}

#[test]
fn format_tags_strip_out_of_base() {
    let template = parse_template("{createdon|%Y-%m-%d<MaxLen|10>}").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    let spec = aref.format.as_ref().unwrap();
    assert_eq!(spec.base, "%Y-%m-%d");
    assert_eq!(spec.tags[0].kind, TagKind::MaxLen);
}

#[test]
fn sentinels_stay_in_base() {
    for sentinel in ["<value>", "<recordurl>", "<entity>"] {
        let template = parse_template(&format!("{{ref|{sentinel}}}")).unwrap();
        let Segment::Token(token) = &template.segments[0] else {
            panic!("expected a token");
        };
        let TokenKind::Attribute(aref) = &token.kind else {
            panic!("expected an attribute token");
        };
        let spec = aref.format.as_ref().unwrap();
        assert_eq!(spec.base, sentinel);
        assert!(spec.tags.is_empty());
    }
}

#[test]
fn tag_names_parse_case_insensitively() {
    assert_eq!(TagKind::parse("maxlen"), TagKind::MaxLen);
    assert_eq!(TagKind::parse("TRIMSTART"), TagKind::TrimStart);
    assert_eq!(
        TagKind::parse("Sparkle"),
        TagKind::Other("Sparkle".to_string())
    );
}

#[test]
fn tag_arguments_may_contain_tokens() {
    let template = parse_template("{price|<Math|+|{shipping}>}").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    let tag = &aref.format.as_ref().unwrap().tags[0];
    assert_eq!(tag.kind, TagKind::Math);
    assert_eq!(tag.args.len(), 2);
    assert!(matches!(tag.args[1].segments[0], Segment::Token(_)));
}

// =============================================================================
// Constructs
// =============================================================================

#[test]
fn parse_expand() {
    let template =
        parse_template("<expand|contact|parentcustomerid|{fullname}|fullname|, |true|true|5>")
            .unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Expand(expand) = &token.kind else {
        panic!("expected an expand token");
    };
    assert_eq!(expand.entity, "contact");
    assert_eq!(expand.attribute, "parentcustomerid");
    assert_eq!(expand.order.len(), 1);
    assert_eq!(expand.order[0].attribute, "fullname");
    assert!(!expand.order[0].descending);
    assert_eq!(expand.separator, ", ");
    assert!(expand.distinct);
    assert!(expand.active_only);
    assert_eq!(expand.max_count, Some(5));
}

#[test]
fn parse_expand_descending_order() {
    let template =
        parse_template("<expand|task|regardingobjectid|{subject}|createdon/DESC, subject|; |||>")
            .unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Expand(expand) = &token.kind else {
        panic!("expected an expand token");
    };
    assert_eq!(expand.order.len(), 2);
    assert!(expand.order[0].descending);
    assert!(!expand.order[1].descending);
    assert_eq!(expand.max_count, None);
}

#[test]
fn parse_iif() {
    let template = parse_template("<iif|{revenue}|gt|1000|big|small>").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Iif(iif) = &token.kind else {
        panic!("expected an iif token");
    };
    assert_eq!(iif.op, "gt");
    assert!(matches!(iif.left.segments[0], Segment::Token(_)));
}

#[test]
fn parse_system() {
    let template = parse_template("<system|TODAY|%d.%m.%Y>").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::System(system) = &token.kind else {
        panic!("expected a system token");
    };
    assert_eq!(system.keyword, "TODAY");
    assert_eq!(system.argument, "%d.%m.%Y");
}

#[test]
fn parse_scoped_construct() {
    let template = parse_template("<mail:system|NOW|>").unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    assert_eq!(token.scope.as_deref(), Some("mail"));
    assert_eq!(token.raw, "<mail:system|NOW|>");
}

#[test]
fn nested_construct_as_final_path_segment() {
    let template =
        parse_template("{parentaccountid.<expand|contact|parentcustomerid|{fullname}||, |||>}")
            .unwrap();
    let Segment::Token(token) = &template.segments[0] else {
        panic!("expected a token");
    };
    let TokenKind::Attribute(aref) = &token.kind else {
        panic!("expected an attribute token");
    };
    assert_eq!(aref.path, vec!["parentaccountid".to_string()]);
    let nested = aref.nested.as_ref().unwrap();
    assert!(matches!(
        &nested.segments[0],
        Segment::Token(t) if matches!(t.kind, TokenKind::Expand(_))
    ));
}

// =============================================================================
// Non-Tokens and Errors
// =============================================================================

#[test]
fn html_markup_is_literal() {
    let template = parse_template("<b>bold</b> and <br/>").unwrap();
    assert_eq!(template.segments.len(), 1);
    assert!(matches!(&template.segments[0], Segment::Literal(_)));
}

#[test]
fn reserved_prefixes_are_literal() {
    let template = parse_template("<PowerFx|Sum(1,2)>").unwrap();
    assert!(
        template
            .segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    );
}

#[test]
fn unterminated_brace_is_an_error() {
    assert!(parse_template("{name").is_err());
}

#[test]
fn unterminated_construct_is_an_error() {
    assert!(parse_template("<iif|1|eq|1|a|b").is_err());
}

#[test]
fn empty_brace_is_an_error() {
    assert!(parse_template("{}").is_err());
    assert!(parse_template("{|N2}").is_err());
}

#[test]
fn empty_path_segment_is_an_error() {
    assert!(parse_template("{a..b}").is_err());
}

#[test]
fn error_displays_location() {
    let err = parse_template("{bad").unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("syntax error at "), "got '{text}'");
}
