//! The alternate dialect (spec §6): `name <- e1 / e2` definitions, `/` for
//! choice, `[x-y]` for ranges, `e?`/`e*`/`e+` for the three repetition
//! variants, free-form (newline-insensitive) layout. Semantics map 1-to-1
//! onto the same clause algebra `bpeg` builds, so this reuses `bpeg`'s
//! [`BootValue`]/[`ActionTable`] wholesale, adding only the one action
//! (`range_bracket`) its bracket syntax needs that `bpeg` does not.
//!
//! Hand-built directly (spec §4.5's "statically-typed host" option), the same
//! way [`bpeg::minimal_parser`] is: this dialect never bootstraps itself from
//! its own text, since (unlike the primary surface syntax) nothing requires
//! it to be self-describing.

use std::rc::Rc;

use crate::action::ActionTable;
use crate::clause::Clause;
use crate::dialect::bpeg::{self, unescape};
use crate::dialect::values::{find, raw};
use crate::dialect::BootValue;
use crate::error::ActionError;
use crate::matching::Capture;
use crate::{Dialect, Grammar, ParseFailure, Parser, ParserOptions, Rule};

fn lit(s: &str) -> Rc<Clause<String>> {
    Rc::new(Clause::Value(s.to_string()))
}

fn any1() -> Rc<Clause<String>> {
    Rc::new(Clause::Any(1))
}

fn not_(c: Rc<Clause<String>>) -> Rc<Clause<String>> {
    Rc::new(Clause::Not(c))
}

fn cap(c: Rc<Clause<String>>, name: &str) -> Rc<Clause<String>> {
    Rc::new(Clause::Capture(c, name.into(), false))
}

fn capv(c: Rc<Clause<String>>, name: &str) -> Rc<Clause<String>> {
    Rc::new(Clause::Capture(c, name.into(), true))
}

fn transform(c: Rc<Clause<String>>, action: &str) -> Rc<Clause<String>> {
    Rc::new(Clause::Transform(c, action.into()))
}

fn neg(cs: impl IntoIterator<Item = Rc<Clause<String>>>) -> Rc<Clause<String>> {
    let mut parts: Vec<Rc<Clause<String>>> = cs.into_iter().map(not_).collect();
    parts.push(any1());
    Clause::sequence(parts)
}

fn reference(name: &str) -> Rc<Clause<String>> {
    Clause::reference(name)
}

/// One whitespace character or a `#`-to-end-of-line comment; never
/// zero-length, so it is safe as [`Clause::Repeat`]'s child.
fn ws_item() -> Rc<Clause<String>> {
    Clause::choice([
        lit(" "),
        lit("\n"),
        lit("\t"),
        lit("\r"),
        Clause::sequence([lit("#"), Clause::repeat_star(neg([lit("\n")]))]),
    ])
}

/// Zero or more [`ws_item`]: the free-form layout this dialect allows between
/// any two tokens, including across rule definitions (unlike `bpeg`, nothing
/// here is indentation- or newline-sensitive).
fn ws0() -> Rc<Clause<String>> {
    Clause::repeat_star(ws_item())
}

/// The rules of the alternate dialect (spec §6), hand-built the same way
/// [`bpeg::minimal_rules`] is. Reuses `bpeg`'s action identifiers wherever the
/// same clause is being built (`value_literal`, `not_clause`, `choice_pair`,
/// ...), so [`actions`] only has to add the one production `bpeg` has no
/// equivalent for (`[x-y]` brackets).
fn rules() -> Vec<Rule<String>> {
    let identifier_char = || {
        Clause::choice(
            "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_"
                .chars()
                .map(|ch| lit(&ch.to_string())),
        )
    };
    let identifier = Rule::new("identifier", Rc::new(Clause::Repeat(identifier_char())));

    let quoted = |quote: &str| {
        Clause::sequence([
            lit(quote),
            Clause::repeat_star(Clause::choice([
                Clause::sequence([lit("\\"), any1()]),
                neg([lit(quote)]),
            ])),
            lit(quote),
        ])
    };
    let literal = Rule::new("literal", Clause::choice([quoted("\""), quoted("'")]));

    // A single bracket-range bound: one raw character, or a `\x` escape pair,
    // excluding the bracket's own delimiters.
    let bracket_char = || {
        Clause::choice([
            Clause::sequence([lit("\\"), any1()]),
            neg([lit("]"), lit("-")]),
        ])
    };

    let atom = Rule::new(
        "atom",
        Clause::choice([
            transform(Clause::choice([lit("\"\""), lit("''")]), "empty_clause"),
            transform(lit("."), "any_one"),
            transform(
                Clause::sequence([
                    lit("["),
                    cap(bracket_char(), "lo"),
                    lit("-"),
                    cap(bracket_char(), "hi"),
                    lit("]"),
                ]),
                "range_bracket",
            ),
            transform(cap(reference("literal"), "literal"), "value_literal"),
            Clause::sequence([
                not_(Clause::sequence([
                    reference("identifier"),
                    ws0(),
                    lit("<-"),
                ])),
                transform(cap(reference("identifier"), "name"), "reference_clause"),
            ]),
            Clause::sequence([
                lit("("),
                ws0(),
                reference("expr"),
                ws0(),
                lit(")"),
            ]),
        ]),
    );

    let prefix = Rule::new(
        "prefix",
        Clause::choice([
            transform(
                Clause::sequence([lit("!"), cap(reference("atom"), "expr")]),
                "not_clause",
            ),
            transform(
                Clause::sequence([lit("&"), cap(reference("atom"), "expr")]),
                "and_clause",
            ),
            reference("atom"),
        ]),
    );

    let postfix = Rule::new(
        "postfix",
        Clause::choice([
            transform(
                Clause::sequence([cap(reference("prefix"), "expr"), lit("?")]),
                "optional_clause",
            ),
            transform(
                Clause::sequence([cap(reference("prefix"), "expr"), lit("*")]),
                "repeat_star",
            ),
            transform(
                Clause::sequence([cap(reference("prefix"), "expr"), lit("+")]),
                "repeat_one_or_more",
            ),
            reference("prefix"),
        ]),
    );

    let capture = Rule::new(
        "capture",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(Clause::choice([lit("*"), Rc::new(Clause::Empty)]), "variadic"),
                    cap(reference("identifier"), "name"),
                    lit("="),
                    cap(reference("postfix"), "expr"),
                ]),
                "capture_clause",
            ),
            reference("postfix"),
        ]),
    );

    let sequence = Rule::new(
        "sequence",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(reference("sequence"), "head"),
                    ws0(),
                    cap(reference("capture"), "tail"),
                ]),
                "sequence_pair",
            ),
            reference("capture"),
        ]),
    );

    // Action bodies are identical to `bpeg`'s (balanced braces, raw text).
    let action_body = Rule::new(
        "action_body",
        Rc::new(Clause::Repeat(Clause::choice([
            neg([lit("{"), lit("}")]),
            Clause::sequence([
                lit("{"),
                reference("action_body"),
                Rc::new(Clause::Entail(vec![lit("}")])),
            ]),
        ]))),
    );
    let action = Rule::new(
        "action",
        transform(
            Clause::sequence([
                lit("{"),
                cap(reference("action_body"), "body"),
                Rc::new(Clause::Entail(vec![lit("}")])),
            ]),
            "action_body_text",
        ),
    );

    let transform_rule = Rule::new(
        "transform",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(reference("sequence"), "expr"),
                    ws0(),
                    cap(reference("action"), "action"),
                ]),
                "transform_clause",
            ),
            reference("sequence"),
        ]),
    );

    let choice = Rule::new(
        "choice",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(reference("choice"), "first"),
                    ws0(),
                    lit("/"),
                    ws0(),
                    cap(reference("transform"), "otherwise"),
                ]),
                "choice_pair",
            ),
            reference("transform"),
        ]),
    );
    let expr = Rule::new("expr", reference("choice"));

    let rule = Rule::new(
        "rule",
        transform(
            Clause::sequence([
                cap(reference("identifier"), "name"),
                ws0(),
                lit("<-"),
                ws0(),
                cap(reference("expr"), "body"),
            ]),
            "rule_construct",
        ),
    );
    let top = Rule::new(
        "top",
        Clause::sequence([
            transform(
                capv(
                    Rc::new(Clause::Repeat(Clause::sequence([ws0(), reference("rule")]))),
                    "rules",
                ),
                "grammar_construct",
            ),
            ws0(),
            not_(any1()),
        ]),
    );

    vec![
        top,
        rule,
        expr,
        choice,
        transform_rule,
        action,
        action_body,
        sequence,
        capture,
        postfix,
        prefix,
        atom,
        literal,
        identifier,
    ]
}

fn single_bracket_char(action: &str, value: &crate::matching::Value<String, BootValue>) -> Result<String, ActionError> {
    let raw_text = raw(action, value)?;
    let unescaped = unescape(action, &raw_text)?;
    if unescaped.chars().count() != 1 {
        return Err(ActionError {
            action: action.into(),
            message: "a bracket range bound must be exactly one character".into(),
        });
    }
    Ok(unescaped)
}

/// `bpeg`'s action table plus `range_bracket`, the one construct this
/// dialect's concrete syntax has that `bpeg` does not (bare bracket bounds
/// instead of quoted literals).
pub fn actions() -> ActionTable<String, BootValue> {
    let mut table = bpeg::actions();
    table.register("range_bracket", |caps: &[Capture<String, BootValue>]| {
        let lo = single_bracket_char("range_bracket", find(caps, "lo")?)?;
        let hi = single_bracket_char("range_bracket", find(caps, "hi")?)?;
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        Ok(BootValue::Clause(Rc::new(Clause::Range(lo, hi))))
    });
    table
}

/// The hand-built parser for the alternate dialect.
pub fn parser() -> Parser<String, BootValue> {
    let grammar = Grammar::new(rules());
    Parser::bind(grammar, actions(), ParserOptions::default())
        .expect("the hand-built alternate-dialect grammar must bind cleanly")
}

/// The alternate `<-`/`/` dialect (spec §6). Stateless and cheap to build
/// repeatedly, unlike [`bpeg::Bpeg`], since there is no bootstrap to cache.
#[derive(Default)]
pub struct Peg;

impl Peg {
    pub fn new() -> Self {
        Peg
    }
}

impl Dialect<String> for Peg {
    fn parse_grammar(&self, source: &str) -> Result<Grammar<String>, ParseFailure> {
        bpeg::parse_with(&parser(), source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_trivial_rule() {
        let grammar = bpeg::parse_with(&parser(), "top <- \"hi\"\n").unwrap();
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.rules[0].name.as_ref(), "top");
    }

    #[test]
    fn parses_choice_and_range_and_repetition() {
        let grammar = bpeg::parse_with(
            &parser(),
            "digit <- [0-9]\nnumber <- digit+\ntop <- number / \"x\"\n",
        )
        .unwrap();
        assert_eq!(grammar.rules.len(), 3);
    }

    #[test]
    fn does_not_swallow_the_next_rule_header_as_a_reference() {
        let grammar = bpeg::parse_with(&parser(), "a <- \"x\"\nb <- a\n").unwrap();
        assert_eq!(grammar.rules.len(), 2);
        assert_eq!(grammar.rules[1].name.as_ref(), "b");
    }

    #[test]
    fn parses_the_alternate_dialect_reference_grammar() {
        let source = include_str!("peg_reference.peg");
        let grammar = bpeg::parse_with(&parser(), source).unwrap();
        assert!(!grammar.rules.is_empty());
        assert_eq!(grammar.top().map(|n| n.as_ref()), Some("top"));
    }
}
