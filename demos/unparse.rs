//! A minimal pretty-printer from `Clause<String>` back to bpeg surface syntax
//! (SPEC_FULL §10.4), covering the representative clause set spec §8 property 2's
//! round-trip test exercises. Not a full inverse of every construct `bpeg.rs` can
//! build — demo-grade only, grounded on
//! `examples/original_source/bootpeg/grammars/bpeg.py`'s `unparse` singledispatch
//! (one case per `Clause` variant, a `top` flag controlling when a `Sequence`/
//! `Choice` needs wrapping parens).

use std::rc::Rc;

use pegboot::dialect::bpeg::Bpeg;
use pegboot::{Clause, Dialect};

/// Escape a literal body the way `dialect::bpeg`'s `unescape` expects to read it
/// back: backslash and the delimiting quote are backslash-escaped, `\n`/`\t`/`\r`
/// spelled out, everything else passed through.
fn quote(v: &str) -> String {
    let mut out = String::from("\"");
    for ch in v.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render `clause` as bpeg concrete syntax. `top` suppresses the parentheses a
/// nested `Sequence`/`Choice` would otherwise need — the same role the Python
/// original's `top=True` plays for a rule's own top-level expression.
pub fn unparse(clause: &Rc<Clause<String>>, top: bool) -> String {
    match &**clause {
        Clause::Empty => "\"\"".to_string(),
        Clause::Any(k) => ".".repeat(*k),
        Clause::Value(v) => quote(v),
        Clause::Range(lo, hi) => format!("{} - {}", quote(lo), quote(hi)),
        Clause::Reference(name) => name.to_string(),
        Clause::Sequence(children) => {
            let body = children
                .iter()
                .map(|c| unparse(c, false))
                .collect::<Vec<_>>()
                .join(" ");
            if top {
                body
            } else {
                format!("({body})")
            }
        }
        Clause::Choice(children) => {
            let body = children
                .iter()
                .map(|c| unparse(c, false))
                .collect::<Vec<_>>()
                .join(" | ");
            if top {
                body
            } else {
                format!("({body})")
            }
        }
        Clause::Entail(children) => {
            let body = children
                .iter()
                .map(|c| unparse(c, false))
                .collect::<Vec<_>>()
                .join(" ");
            format!("~ {body}")
        }
        Clause::Repeat(child) => format!("{}+", unparse(child, false)),
        Clause::Not(child) => format!("!{}", unparse(child, false)),
        Clause::And(child) => format!("&{}", unparse(child, false)),
        Clause::Capture(child, name, variadic) => {
            let star = if *variadic { "*" } else { "" };
            format!("{star}{name}={}", unparse(child, false))
        }
        Clause::Transform(child, action) => format!("{} {{ {action} }}", unparse(child, true)),
    }
}

/// Parse a small grammar, unparse its top rule's body, then re-parse that
/// unparsed text as a standalone rule and check it reproduces the same
/// clause — a live run of spec §8 property 2 (round-trip) on one rule.
fn main() {
    let source = "top:\n    | (\"a\" \"b\")+ !.\n";
    let bpeg = Bpeg::new();
    let grammar = bpeg.parse_grammar(source).expect("demo grammar parses");
    let original = grammar.rules[0].body.clone();
    let rendered = unparse(&original, true);
    println!("original : {source}");
    println!("unparsed : {rendered}");

    let roundtrip_source = format!("parse_test:\n    | {rendered}\n");
    let roundtrip_grammar = bpeg
        .parse_grammar(&roundtrip_source)
        .expect("unparsed text parses back");
    let roundtrip = roundtrip_grammar.rules[0].body.clone();
    assert_eq!(original, roundtrip, "unparse(parse(c)) must equal c");
    println!("round-trip OK");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparses_a_literal_and_a_range() {
        assert_eq!(unparse(&Rc::new(Clause::Value("hi".into())), true), "\"hi\"");
        assert_eq!(
            unparse(&Rc::new(Clause::Range("a".into(), "z".into())), true),
            "\"a\" - \"z\""
        );
    }

    #[test]
    fn parenthesizes_nested_sequence_and_choice() {
        let seq = Clause::sequence([
            Rc::new(Clause::Value("a".into())),
            Rc::new(Clause::Value("b".into())),
        ]);
        assert_eq!(unparse(&Rc::new(Clause::Repeat(seq)), true), "(\"a\" \"b\")+");
    }
}
