//! The primary surface syntax (spec §4.5/§6, C5) and its bootstrap (C6).
//!
//! [`minimal_parser`] is a hand-built [`Parser`] — clauses constructed
//! directly in Rust, exactly as `apegs/boot.py`'s `min_parser` constructs its
//! rules by calling `Value`/`Sequence`/`Choice`/... directly rather than
//! parsing anything. It is just barely enough to parse [`GRAMMAR_SOURCE`],
//! the bpeg surface syntax described *in* the bpeg surface syntax. Feeding
//! that source through `minimal_parser` yields a full [`Grammar`]; binding
//! that grammar with the same action table yields a bootstrapped [`Parser`]
//! that parses arbitrary bpeg source, including [`GRAMMAR_SOURCE`] itself
//! (the fixpoint of spec §8 property 1). [`Bpeg`] drives that bootstrap once,
//! lazily, and implements [`crate::Dialect`] with the result.

use std::cell::OnceCell;
use std::rc::Rc;

use crate::action::ActionTable;
use crate::clause::Clause;
use crate::dialect::values::{clause_of, find, raw, rule_of, rules_of, text_of};
use crate::dialect::BootValue;
use crate::error::ActionError;
use crate::matching::{Capture, Value};
use crate::{Dialect, Grammar, ParseFailure, Parser, ParserOptions, Rule};

/// The bpeg surface syntax, describing itself (spec §4.5 "a textual grammar
/// resource shipped with the system"). Transliterated from `apegs/boot.py`'s
/// `min_parser` into the surface syntax it builds, rather than kept only as
/// Rust builder calls, so the fixpoint property has something non-trivial to
/// prove: parsing this text with [`minimal_parser`] and with the parser it
/// produces must agree.
pub const GRAMMAR_SOURCE: &str = include_str!("bpeg.peg");

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

/// `Sequence(Not(c) for c in cs, Any(1))`: match one element that is none of
/// `cs` (`apegs/boot.py`'s `neg` helper).
fn neg(cs: impl IntoIterator<Item = Rc<Clause<String>>>) -> Rc<Clause<String>> {
    let mut parts: Vec<Rc<Clause<String>>> = cs.into_iter().map(not_).collect();
    parts.push(any1());
    Clause::sequence(parts)
}

fn reference(name: &str) -> Rc<Clause<String>> {
    Clause::reference(name)
}

/// `Choice(Value(" "), Empty())`: the optional single space `apegs/boot.py`
/// splices between juxtaposed sequence elements.
fn spaces() -> Rc<Clause<String>> {
    Clause::choice([lit(" "), Rc::new(Clause::Empty)])
}

/// The hand-built grammar underlying [`minimal_parser`] (spec §4.5: "a
/// minimal hand-coded grammar — built by directly constructing clause
/// values"). One rule per production of the bpeg surface syntax, lowest
/// precedence (`atom`) to highest (`top`), mirroring `apegs/boot.py`'s
/// `min_parser` rule order.
fn minimal_rules() -> Vec<Rule<String>> {
    let identifier_char = || {
        Clause::choice(
            "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_"
                .chars()
                .map(|ch| lit(&ch.to_string())),
        )
    };
    let end_line = Rule::new(
        "end_line",
        Clause::sequence([
            spaces(),
            Clause::choice([
                Clause::sequence([lit("#"), Rc::new(Clause::Repeat(neg([lit("\n")])))]),
                Rc::new(Clause::Empty),
            ]),
            Clause::choice([lit("\n"), not_(any1())]),
        ]),
    );
    // Like `end_line`, but never zero-length: used only where it is itself the
    // child of a `Repeat` (spec §3 invariant 2 forbids repeating a nullable
    // clause; `end_line`'s own EOF branch is nullable by the binder's
    // conservative check, so the top-level "skip blank lines" loop uses this
    // stricter variant instead, requiring an actual newline each iteration).
    let blank_line = Rule::new(
        "blank_line",
        Clause::sequence([
            spaces(),
            Clause::choice([
                Clause::sequence([lit("#"), Rc::new(Clause::Repeat(neg([lit("\n")])))]),
                Rc::new(Clause::Empty),
            ]),
            lit("\n"),
        ]),
    );
    let identifier = Rule::new("identifier", Rc::new(Clause::Repeat(identifier_char())));

    // `atom`: literal forms with no sub-clauses of their own. A quoted body
    // allows `\` followed by any one character (an escape, unescaped later by
    // `unescape` in the `value_literal`/`range_clause` actions) so a literal
    // can still spell its own delimiter, a backslash, or a control character
    // like `\n` without needing a raw byte embedded in the grammar source.
    let quoted = |quote: &str| {
        Clause::sequence([
            lit(quote),
            Rc::new(Clause::Repeat(Clause::choice([
                Clause::sequence([lit("\\"), any1()]),
                neg([lit(quote)]),
            ]))),
            lit(quote),
        ])
    };
    let literal = Clause::choice([quoted("\""), quoted("'")]);
    let atom = Rule::new(
        "atom",
        Clause::choice([
            transform(
                Clause::choice([lit("\"\""), lit("''")]),
                "empty_clause",
            ),
            transform(lit("."), "any_one"),
            transform(
                Clause::sequence([
                    cap(literal.clone(), "lo"),
                    spaces(),
                    lit("-"),
                    spaces(),
                    cap(literal.clone(), "hi"),
                ]),
                "range_clause",
            ),
            transform(cap(literal, "literal"), "value_literal"),
            transform(cap(reference("identifier"), "name"), "reference_clause"),
        ]),
    );

    // `prefix`: clauses with an unambiguous, non-zero prefix token.
    let prefix = Rule::new(
        "prefix",
        Clause::choice([
            transform(
                Clause::sequence([
                    lit("!"),
                    cap(Rc::new(Clause::Entail(vec![reference("prefix")])), "expr"),
                ]),
                "not_clause",
            ),
            transform(
                Clause::sequence([
                    lit("&"),
                    cap(Rc::new(Clause::Entail(vec![reference("prefix")])), "expr"),
                ]),
                "and_clause",
            ),
            Clause::sequence([
                lit("("),
                spaces(),
                Rc::new(Clause::Entail(vec![Clause::sequence([
                    reference("expr"),
                    spaces(),
                    lit(")"),
                ])])),
            ]),
            transform(
                Clause::sequence([
                    lit("["),
                    spaces(),
                    cap(
                        Rc::new(Clause::Entail(vec![Clause::sequence([
                            reference("expr"),
                            spaces(),
                            lit("]"),
                        ])])),
                        "expr",
                    ),
                ]),
                "optional_clause",
            ),
            transform(
                Clause::sequence([
                    // Captured raw (no nested `Transform`: the surface syntax
                    // only lets `{action}` attach to a whole rule alternative,
                    // not to an arbitrary sub-expression) and read back as a
                    // flag by the action itself, by comparing to `"*"`.
                    cap(Clause::choice([lit("*"), Rc::new(Clause::Empty)]), "variadic"),
                    cap(reference("identifier"), "name"),
                    lit("="),
                    cap(Rc::new(Clause::Entail(vec![reference("expr")])), "expr"),
                ]),
                "capture_clause",
            ),
            reference("atom"),
        ]),
    );

    // `repeat`: left-recursive only through `prefix` on the right, so not
    // actually left-recursive; kept as its own rule to mirror precedence.
    let repeat = Rule::new(
        "repeat",
        Clause::choice([
            transform(
                Clause::sequence([cap(reference("prefix"), "expr"), lit("+")]),
                "repeat_one_or_more",
            ),
            transform(
                Clause::sequence([cap(reference("prefix"), "expr"), lit("*")]),
                "repeat_star",
            ),
            reference("prefix"),
        ]),
    );

    // `sequence`/`choice`: genuinely left-recursive (spec §4.2 seed-and-grow).
    let sequence = Rule::new(
        "sequence",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(reference("sequence"), "head"),
                    spaces(),
                    cap(reference("repeat"), "tail"),
                ]),
                "sequence_pair",
            ),
            transform(
                Clause::sequence([
                    cap(reference("sequence"), "head"),
                    spaces(),
                    lit("~"),
                    spaces(),
                    cap(Rc::new(Clause::Entail(vec![reference("sequence")])), "tail"),
                ]),
                "sequence_entail_pair",
            ),
            transform(
                Clause::sequence([
                    lit("~"),
                    spaces(),
                    cap(Rc::new(Clause::Entail(vec![reference("sequence")])), "seq"),
                ]),
                "entail_commit",
            ),
            reference("repeat"),
        ]),
    );
    let choice = Rule::new(
        "choice",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(reference("choice"), "first"),
                    spaces(),
                    lit("|"),
                    spaces(),
                    cap(Rc::new(Clause::Entail(vec![reference("sequence")])), "otherwise"),
                ]),
                "choice_pair",
            ),
            reference("sequence"),
        ]),
    );
    let expr = Rule::new("expr", reference("choice"));

    // Action bodies: balanced `{ ... }`, captured as raw text.
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

    let rule_choice = Rule::new(
        "rule_choice",
        Clause::choice([
            transform(
                Clause::sequence([
                    lit("| "),
                    cap(reference("expr"), "expr"),
                    spaces(),
                    cap(reference("action"), "action"),
                ]),
                "transform_clause",
            ),
            Clause::sequence([lit("| "), reference("expr")]),
        ]),
    );
    let rule_body = Rule::new(
        "rule_body",
        Clause::choice([
            transform(
                Clause::sequence([
                    cap(reference("rule_body"), "first"),
                    cap(
                        Clause::sequence([lit("    "), reference("rule_choice"), reference("end_line")]),
                        "otherwise",
                    ),
                ]),
                "choice_pair",
            ),
            Clause::sequence([lit("    "), reference("rule_choice"), reference("end_line")]),
        ]),
    );
    let rule = Rule::new(
        "rule",
        transform(
            Clause::sequence([
                cap(reference("identifier"), "name"),
                lit(":"),
                reference("end_line"),
                cap(reference("rule_body"), "body"),
            ]),
            "rule_construct",
        ),
    );
    let top = Rule::new(
        "top",
        Clause::sequence([
            transform(
                capv(
                    Rc::new(Clause::Repeat(Clause::choice([
                        reference("rule"),
                        reference("blank_line"),
                    ]))),
                    "rules",
                ),
                "grammar_construct",
            ),
            not_(any1()),
        ]),
    );

    vec![
        top, rule, rule_body, rule_choice, action, action_body, expr, choice, sequence, repeat,
        prefix, atom, identifier, end_line, blank_line,
    ]
}

/// Undo the `\x` escaping `quoted`'s grammar allows: `\n`/`\t`/`\r` become
/// their control character, anything else (`\\`, `\"`, `\'`, ...) becomes the
/// literal character that follows the backslash. Shared with [`crate::dialect::peg`],
/// whose `[x-y]` bracket syntax allows the same escapes for its bounds.
pub(crate) fn unescape(action: &str, s: &str) -> Result<String, ActionError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {
                return Err(ActionError {
                    action: action.into(),
                    message: "trailing backslash with nothing to escape".into(),
                })
            }
        }
    }
    Ok(out)
}

fn single_char(action: &str, value: &Value<String, BootValue>) -> Result<String, ActionError> {
    let s = raw(action, value)?;
    if s.len() < 2 {
        return Err(ActionError {
            action: action.into(),
            message: "a range bound must be a quoted literal".into(),
        });
    }
    let unescaped = unescape(action, &s[1..s.len() - 1])?;
    if unescaped.chars().count() != 1 {
        return Err(ActionError {
            action: action.into(),
            message: "a range bound must be exactly one character".into(),
        });
    }
    Ok(unescaped)
}

/// The bootstrap action namespace (spec §4.3's "statically-typed host"
/// option): one boxed closure per clause constructor, keyed exactly as
/// `apegs/boot.py`'s `apegs_globals` keys its clause classes, so a
/// `Transform`'s action identifier (itself produced by this same grammar)
/// always resolves to the right builder.
pub fn actions() -> ActionTable<String, BootValue> {
    let mut table = ActionTable::new();

    table.register("empty_clause", |_caps: &[Capture<String, BootValue>]| {
        Ok(BootValue::Clause(Rc::new(Clause::Empty)))
    });
    table.register("any_one", |_caps: &[Capture<String, BootValue>]| {
        Ok(BootValue::Clause(Rc::new(Clause::Any(1))))
    });
    table.register("value_literal", |caps: &[Capture<String, BootValue>]| {
        let quoted = raw("value_literal", find(caps, "literal")?)?;
        if quoted.len() < 2 {
            return Err(ActionError {
                action: "value_literal".into(),
                message: "a literal must be quoted".into(),
            });
        }
        let s = unescape("value_literal", &quoted[1..quoted.len() - 1])?;
        Ok(BootValue::Clause(Rc::new(Clause::Value(s))))
    });
    table.register("range_clause", |caps: &[Capture<String, BootValue>]| {
        let lo = single_char("range_clause", find(caps, "lo")?)?;
        let hi = single_char("range_clause", find(caps, "hi")?)?;
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        Ok(BootValue::Clause(Rc::new(Clause::Range(lo, hi))))
    });
    table.register(
        "reference_clause",
        |caps: &[Capture<String, BootValue>]| {
            let name = raw("reference_clause", find(caps, "name")?)?;
            Ok(BootValue::Clause(Clause::reference(name)))
        },
    );
    table.register("not_clause", |caps: &[Capture<String, BootValue>]| {
        let expr = clause_of("not_clause", find(caps, "expr")?)?;
        Ok(BootValue::Clause(Rc::new(Clause::Not(expr))))
    });
    table.register("and_clause", |caps: &[Capture<String, BootValue>]| {
        let expr = clause_of("and_clause", find(caps, "expr")?)?;
        Ok(BootValue::Clause(Rc::new(Clause::And(expr))))
    });
    table.register("optional_clause", |caps: &[Capture<String, BootValue>]| {
        let expr = clause_of("optional_clause", find(caps, "expr")?)?;
        Ok(BootValue::Clause(Clause::optional(expr)))
    });
    table.register("capture_clause", |caps: &[Capture<String, BootValue>]| {
        let expr = clause_of("capture_clause", find(caps, "expr")?)?;
        let name = raw("capture_clause", find(caps, "name")?)?;
        let variadic = raw("capture_clause", find(caps, "variadic")?)? == "*";
        Ok(BootValue::Clause(Rc::new(Clause::Capture(
            expr,
            name.into(),
            variadic,
        ))))
    });
    table.register(
        "repeat_one_or_more",
        |caps: &[Capture<String, BootValue>]| {
            let expr = clause_of("repeat_one_or_more", find(caps, "expr")?)?;
            Ok(BootValue::Clause(Rc::new(Clause::Repeat(expr))))
        },
    );
    table.register("repeat_star", |caps: &[Capture<String, BootValue>]| {
        let expr = clause_of("repeat_star", find(caps, "expr")?)?;
        Ok(BootValue::Clause(Clause::repeat_star(expr)))
    });
    table.register("sequence_pair", |caps: &[Capture<String, BootValue>]| {
        let head = clause_of("sequence_pair", find(caps, "head")?)?;
        let tail = clause_of("sequence_pair", find(caps, "tail")?)?;
        Ok(BootValue::Clause(Clause::sequence([head, tail])))
    });
    table.register(
        "sequence_entail_pair",
        |caps: &[Capture<String, BootValue>]| {
            let head = clause_of("sequence_entail_pair", find(caps, "head")?)?;
            let tail = clause_of("sequence_entail_pair", find(caps, "tail")?)?;
            Ok(BootValue::Clause(Clause::sequence([
                head,
                Rc::new(Clause::Entail(vec![tail])),
            ])))
        },
    );
    table.register("entail_commit", |caps: &[Capture<String, BootValue>]| {
        let seq = clause_of("entail_commit", find(caps, "seq")?)?;
        Ok(BootValue::Clause(Rc::new(Clause::Entail(vec![seq]))))
    });
    table.register("choice_pair", |caps: &[Capture<String, BootValue>]| {
        let first = clause_of("choice_pair", find(caps, "first")?)?;
        let otherwise = clause_of("choice_pair", find(caps, "otherwise")?)?;
        Ok(BootValue::Clause(Clause::choice([first, otherwise])))
    });
    table.register(
        "action_body_text",
        |caps: &[Capture<String, BootValue>]| {
            let body = find(caps, "body")?;
            Ok(BootValue::Text(raw("action_body_text", body)?))
        },
    );
    table.register(
        "transform_clause",
        |caps: &[Capture<String, BootValue>]| {
            let expr = clause_of("transform_clause", find(caps, "expr")?)?;
            let action = text_of("transform_clause", find(caps, "action")?)?;
            Ok(BootValue::Clause(Rc::new(Clause::Transform(
                expr,
                action.trim().into(),
            ))))
        },
    );
    table.register("rule_construct", |caps: &[Capture<String, BootValue>]| {
        let name = raw("rule_construct", find(caps, "name")?)?;
        let body = clause_of("rule_construct", find(caps, "body")?)?;
        Ok(BootValue::Rule(Rule::new(name, body)))
    });
    table.register(
        "grammar_construct",
        |caps: &[Capture<String, BootValue>]| {
            let rules = rules_of("grammar_construct", find(caps, "rules")?)?;
            Ok(BootValue::Grammar(Grammar::new(rules)))
        },
    );

    table
}

/// The hand-built parser of spec §4.5: just enough to parse [`GRAMMAR_SOURCE`].
pub fn minimal_parser() -> Parser<String, BootValue> {
    let grammar = Grammar::new(minimal_rules());
    Parser::bind(grammar, actions(), ParserOptions::default())
        .expect("the hand-built minimal grammar must bind cleanly")
}

/// Run one bootstrap step: parse `source` with `parser`, extract the
/// resulting [`Grammar`] from the single top-level [`BootValue::Grammar`]
/// result (spec §4.5/§6 step b/d).
pub fn parse_with(
    parser: &Parser<String, BootValue>,
    source: &str,
) -> Result<Grammar<String>, ParseFailure> {
    match parser.parse_report(&source.to_string())? {
        Value::Action(v) => match &*v {
            BootValue::Grammar(g) => Ok(g.clone()),
            _ => Err(internal_failure(source, "top-level result was not a Grammar")),
        },
        _ => Err(internal_failure(source, "top-level result was not transformed")),
    }
}

fn internal_failure(source: &str, message: &str) -> ParseFailure {
    ParseFailure::new(message.to_string(), source.to_string(), String::new(), 0, Vec::new())
}

/// The primary dialect (spec §6): bootstraps once, lazily, on first use, then
/// reuses the resulting parser for every subsequent grammar it is asked to
/// parse (spec §5 "invocation of a built parser on independent inputs must be
/// [thread-safe]" — irrelevant here since `Rc`-based clauses are single
/// threaded, but idempotent reuse still matters for perf).
#[derive(Default)]
pub struct Bpeg {
    bootstrapped: OnceCell<Parser<String, BootValue>>,
}

impl Bpeg {
    pub fn new() -> Self {
        Self::default()
    }

    fn parser(&self) -> Result<&Parser<String, BootValue>, ParseFailure> {
        if let Some(p) = self.bootstrapped.get() {
            return Ok(p);
        }
        let parser = crate::bootstrap::bootstrap(GRAMMAR_SOURCE)?;
        let _ = self.bootstrapped.set(parser);
        Ok(self.bootstrapped.get().unwrap())
    }
}

impl Dialect<String> for Bpeg {
    fn parse_grammar(&self, source: &str) -> Result<Grammar<String>, ParseFailure> {
        let parser = self.parser()?;
        parse_with(parser, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_parser_parses_its_own_grammar_source() {
        let grammar = parse_with(&minimal_parser(), GRAMMAR_SOURCE).unwrap();
        assert!(!grammar.rules.is_empty());
        assert_eq!(grammar.top().map(|n| n.as_ref()), Some("top"));
    }

    #[test]
    fn minimal_parser_parses_a_trivial_user_grammar() {
        let grammar = parse_with(&minimal_parser(), "top:\n    | \"hi\"\n").unwrap();
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.rules[0].name.as_ref(), "top");
    }
}
