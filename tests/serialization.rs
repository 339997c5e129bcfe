//! Spec §6 "Persisted state" / §8 scenario S6: a `Parser` is serialized as
//! `(rules, actions)` — here, as its `Grammar` plus the caller's own action
//! namespace, since an `ActionTable` of boxed closures cannot itself be
//! serialized. Deserializing the `Grammar` and re-binding it against the same
//! action namespace must reconstruct a parser that parses identical inputs to
//! equal results as the original.

use std::rc::Rc;

use pegboot::{ActionTable, Clause, Grammar, ParserOptions, Rule, Value};

fn lit(s: &str) -> Rc<Clause<String>> {
    Rc::new(Clause::Value(s.to_string()))
}

#[test]
fn serialized_grammar_round_trips_through_json() {
    let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
        "top",
        Clause::sequence([lit("a"), Clause::reference("rest")]),
    ), Rule::new("rest", Clause::choice([lit("b"), lit("c")]))]);

    let json = serde_json::to_string(&grammar).unwrap();
    let restored: Grammar<String> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.rules.len(), grammar.rules.len());
    for (original, restored) in grammar.rules.iter().zip(&restored.rules) {
        assert_eq!(original.name, restored.name);
        assert_eq!(original.body, restored.body);
    }

    let actions: ActionTable<String, ()> = ActionTable::new();
    let original_parser =
        pegboot::Parser::bind(grammar, actions.clone(), ParserOptions::default()).unwrap();
    let restored_parser =
        pegboot::Parser::bind(restored, actions, ParserOptions::default()).unwrap();

    for input in ["ab", "ac", "ad"] {
        let a = original_parser.parse(&input.to_string());
        let b = restored_parser.parse(&input.to_string());
        assert_eq!(a.is_ok(), b.is_ok());
    }
}

/// Grammars built through the bpeg dialect serialize identically: the
/// `Grammar` produced by the bootstrapped parser contains no leftover
/// references to the parser or its action table.
#[test]
fn dialect_produced_grammar_serializes() {
    use pegboot::dialect::bpeg::Bpeg;
    use pegboot::dialect::BootValue;
    use pegboot::Dialect;

    let bpeg = Bpeg::new();
    let grammar = bpeg.parse_grammar("top:\n    | \"hi\" { greet }\n").unwrap();
    let json = serde_json::to_string(&grammar).unwrap();
    let restored: Grammar<String> = serde_json::from_str(&json).unwrap();

    let mut actions: ActionTable<String, BootValue> = ActionTable::new();
    actions.register("greet", |_caps| Ok(BootValue::Text("hi".to_string())));
    let parser = pegboot::Parser::bind(restored, actions, ParserOptions::default()).unwrap();
    let result = parser.parse(&"hi".to_string());
    assert!(matches!(result, Ok(Value::Action(v)) if matches!(&*v, BootValue::Text(s) if s == "hi")));
}
