//! Spec §8 properties 3-8 plus scenarios S1, S2, and S4, all exercised through
//! the public API: build a grammar by hand (bypassing any dialect, the way
//! `src/lib.rs`'s own doctest does) or through `dialect::bpeg`, bind it, and
//! check the resulting behavior.

use std::rc::Rc;

use indoc::indoc;
use pegboot::dialect::bpeg::Bpeg;
use pegboot::{
    create_parser, ActionTable, BindError, Clause, Dialect, Failure, Grammar, ParseOutcomeError,
    Parser, ParserOptions, Rule, Value,
};
use pretty_assertions::assert_eq;

fn lit(s: &str) -> Rc<Clause<String>> {
    Rc::new(Clause::Value(s.to_string()))
}

/// Property 3: determinism. The same grammar and input always produce the same
/// outcome, including on repeated failing parses.
#[test]
fn determinism_repeated_parses_agree() {
    let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
        "top",
        Rc::new(Clause::Transform(
            Clause::sequence([lit("a"), lit("b")]),
            "ok".into(),
        )),
    )]);
    let mut actions: ActionTable<String, ()> = ActionTable::new();
    actions.register("ok", |_caps| Ok(()));
    let parser = Parser::bind(grammar, actions, ParserOptions::default()).unwrap();

    let first = parser.parse(&"ab".to_string());
    let second = parser.parse(&"ab".to_string());
    assert!(first.is_ok());
    assert!(second.is_ok());

    let first_err = parser.parse(&"ax".to_string()).unwrap_err();
    let second_err = parser.parse(&"ax".to_string()).unwrap_err();
    assert_eq!(failure_at(&first_err), failure_at(&second_err));
}

fn failure_at(err: &ParseOutcomeError<String>) -> Option<usize> {
    match err {
        ParseOutcomeError::Match(f) => Some(f.at()),
        ParseOutcomeError::Unpack(_) => None,
    }
}

/// Property 4 / scenario equivalent of S4: `top: | "a" ~ "b" | "a" "c"` on
/// input `"ac"` must fail fatally at the position `"b"` was required, not fall
/// through to the second alternative.
#[test]
fn entail_commits_past_the_second_alternative() {
    let source = indoc! {r#"
        top:
            | "a" ~ "b"
            | "a" "c"
    "#};
    let parser = build(source);
    let err = parser.parse(&"ac".to_string()).unwrap_err();
    match err {
        ParseOutcomeError::Match(Failure::Fatal(f)) => assert_eq!(f.at, 1),
        other => panic!("expected a fatal failure at index 1, got {other:?}"),
    }
}

/// Scenario S4: a bare commit with no continuation still commits, and still
/// fails (there is nothing after `~` to match).
#[test]
fn bare_commit_with_no_continuation_fails_fatally() {
    let source = indoc! {r#"
        top:
            | ~ "x"
    "#};
    let parser = build(source);
    let err = parser.parse(&"".to_string()).unwrap_err();
    assert!(matches!(err, ParseOutcomeError::Match(Failure::Fatal(_))));
}

/// Property 5: left recursion grows. `e: | e "+" e | "x"` on `"x+x+x"`
/// succeeds and nests left-associatively three atoms deep.
#[test]
fn left_recursion_grows_left_associatively() {
    let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
        "e",
        Rc::new(Clause::Transform(
            Clause::choice([
                Clause::sequence([
                    Clause::reference("e"),
                    lit("+"),
                    Clause::reference("e"),
                ]),
                lit("x"),
            ]),
            "ok".into(),
        )),
    )]);
    let mut actions: ActionTable<String, ()> = ActionTable::new();
    actions.register("ok", |_caps| Ok(()));
    let parser = Parser::bind(grammar, actions, ParserOptions::default()).unwrap();
    assert!(parser.parse(&"x+x+x".to_string()).is_ok());
    assert!(parser.parse(&"x+x+".to_string()).is_err());
}

/// Property 6: `[e]` and `e*` desugar to structurally equal rule bodies.
#[test]
fn optional_and_star_desugar_identically() {
    let bracket = indoc! {r#"
        top:
            | [" "+]
    "#};
    let star = indoc! {r#"
        top:
            | " "*
    "#};
    let bpeg = Bpeg::new();
    let bracket_grammar = bpeg.parse_grammar(bracket).unwrap();
    let star_grammar = bpeg.parse_grammar(star).unwrap();
    assert_eq!(bracket_grammar.rules[0].body, star_grammar.rules[0].body);
}

/// Property 7: a `Choice` whose alternatives disagree on captured names must
/// be rejected at bind time.
#[test]
fn capture_signature_mismatch_is_rejected_at_bind_time() {
    let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
        "top",
        Clause::choice([
            Rc::new(Clause::Capture(lit("a"), "x".into(), false)),
            lit("a"),
        ]),
    )]);
    let actions: ActionTable<String, ()> = ActionTable::new();
    let err = Parser::bind(grammar, actions, ParserOptions::default()).unwrap_err();
    assert!(matches!(err, BindError::CaptureSignatureMismatch { .. }));
}

/// Property 8: an action whose declared parameters don't match its clause's
/// capture signature must be rejected at bind time.
#[test]
fn action_signature_mismatch_is_rejected_at_bind_time() {
    let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
        "top",
        Rc::new(Clause::Transform(
            Rc::new(Clause::Capture(lit("a"), "x".into(), false)),
            "wants_y".into(),
        )),
    )]);
    let mut actions: ActionTable<String, ()> = ActionTable::new();
    actions.register_checked("wants_y", ["y"], |_caps| Ok(()));
    let err = Parser::bind(grammar, actions, ParserOptions::default()).unwrap_err();
    assert!(matches!(err, BindError::ActionSignatureMismatch { .. }));
}

/// Scenario S1: `top: | a=(.*) { (a, a) }` on `"bcde"` yields `("bcde", "bcde")`.
#[test]
fn s1_pairs_a_capture_with_itself() {
    let source = indoc! {r#"
        top:
            | a=(.*) { pair }
    "#};
    let bpeg = Bpeg::new();
    let grammar = bpeg.parse_grammar(source).unwrap();
    let mut actions: ActionTable<String, (String, String)> = ActionTable::new();
    actions.register_checked("pair", ["a"], |caps| {
        let a = pegboot::action::capture_value(caps, "a").unwrap();
        let text = match a {
            Value::Raw(s) => s.clone(),
            _ => panic!("expected a raw capture"),
        };
        Ok((text.clone(), text))
    });
    let parser = Parser::bind(grammar, actions, ParserOptions::default()).unwrap();
    let result = parser.parse(&"bcde".to_string()).unwrap();
    match result {
        Value::Action(pair) => assert_eq!(*pair, ("bcde".to_string(), "bcde".to_string())),
        other => panic!("expected an action value, got {other:?}"),
    }
}

/// Scenario S2: `top: | a=(.) !. { a }` on `"b"` yields `"b"`; on `"bb"` fails
/// at index 1 (the trailing `!.` rejects the second character).
#[test]
fn s2_single_character_with_end_of_input_guard() {
    let source = indoc! {r#"
        top:
            | a=. !. { identity }
    "#};
    let bpeg = Bpeg::new();
    let grammar = bpeg.parse_grammar(source).unwrap();
    let mut actions: ActionTable<String, String> = ActionTable::new();
    actions.register_checked("identity", ["a"], |caps| {
        let a = pegboot::action::capture_value(caps, "a").unwrap();
        match a {
            Value::Raw(s) => Ok(s.clone()),
            other => panic!("expected a raw capture, got {other:?}"),
        }
    });
    let parser = create_parser::<String, String>(
        source,
        &bpeg,
        actions.clone(),
        ParserOptions::default(),
    )
    .unwrap();
    let _ = grammar;

    let ok = parser.parse(&"b".to_string()).unwrap();
    assert!(matches!(ok, Value::Action(ref s) if **s == "b"));

    let err = parser.parse_report(&"bb".to_string()).unwrap_err();
    assert_eq!(err.index, 1);
}

fn build(source: &str) -> Parser<String, ()> {
    let actions: ActionTable<String, ()> = ActionTable::new();
    create_parser::<String, ()>(source, &Bpeg::new(), actions, ParserOptions::default()).unwrap()
}
