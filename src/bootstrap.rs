//! The bootstrap driver (spec §4.5/§6, C6): construct the minimal hand-built
//! parser, parse the surface grammar's own source with it, bind the result
//! into a full parser, then verify that re-parsing the same source with that
//! full parser reaches a fixpoint (spec §8 property 1) before handing the
//! parser back to a caller. Grounded on `apegs/boot.py`'s `min_parser` ->
//! `import_parser` two-step, generalized here into an explicit iterate-to-a-
//! fixpoint loop so the property is actually checked, not assumed.

use tracing::instrument;

use crate::dialect::{bpeg, BootValue};
use crate::{Grammar, ParseFailure, Parser, ParserOptions};

/// The bootstrap loop never converges in practice past the second iteration
/// (minimal parser -> bootstrapped parser -> same bootstrapped parser is
/// already a fixpoint); this bounds the verification loop generously rather
/// than looping forever on a grammar bug.
const MAX_ITERATIONS: usize = 8;

/// Everything [`bootstrap`] can fail with: the dialect's own source failed to
/// parse (a bug in [`bpeg::GRAMMAR_SOURCE`] or the minimal grammar), the
/// resulting grammar failed to bind (a bug in an action), or the fixpoint
/// never stabilized within [`MAX_ITERATIONS`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error(transparent)]
    Bind(#[from] crate::BindError),
    #[error("bootstrap did not reach a fixpoint within {0} iterations")]
    Diverged(usize),
}

impl From<BootstrapError> for ParseFailure {
    /// [`bpeg::Bpeg`] reports bootstrap failures through [`Dialect::parse_grammar`],
    /// whose contract is a [`ParseFailure`]; a bind or divergence failure here is
    /// a defect in the shipped grammar itself, not in the caller's source, but
    /// still needs to surface through that single error channel.
    fn from(err: BootstrapError) -> Self {
        match err {
            BootstrapError::Parse(f) => f,
            other => ParseFailure::new(other.to_string(), String::new(), String::new(), 0, Vec::new()),
        }
    }
}

fn rule_set_eq(a: &Grammar<String>, b: &Grammar<String>) -> bool {
    a.rules.len() == b.rules.len()
        && a.rules
            .iter()
            .zip(&b.rules)
            .all(|(ra, rb)| ra.name == rb.name && ra.body == rb.body)
}

/// Run the bootstrap (spec §4.5 steps a-d), verifying the fixpoint (spec §8
/// property 1) before returning. `source` is almost always [`bpeg::GRAMMAR_SOURCE`]
/// itself, but the driver takes it as a parameter so the fixpoint check can be
/// exercised against it directly in tests.
#[instrument(level = "debug", skip_all)]
pub fn bootstrap(source: &str) -> Result<Parser<String, BootValue>, BootstrapError> {
    // (a) the minimal hand-built grammar.
    let minimal = bpeg::minimal_parser();
    // (b) parse the surface grammar's own source with it.
    let mut grammar = bpeg::parse_with(&minimal, source)?;
    // (c) bind actions to get a fully-featured parser.
    let mut parser = Parser::bind(grammar.clone(), bpeg::actions(), ParserOptions::default())?;

    // (d) iterate: parse `source` again with the parser we just built, and
    // check the rule set stopped changing.
    for iteration in 1..=MAX_ITERATIONS {
        tracing::trace!(iteration, rules = grammar.rules.len(), "bootstrap iteration");
        let next_grammar = bpeg::parse_with(&parser, source)?;
        if rule_set_eq(&grammar, &next_grammar) {
            return Ok(parser);
        }
        let next_parser = Parser::bind(next_grammar.clone(), bpeg::actions(), ParserOptions::default())?;
        grammar = next_grammar;
        parser = next_parser;
    }
    Err(BootstrapError::Diverged(MAX_ITERATIONS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_reaches_a_fixpoint_on_its_own_grammar_source() {
        let parser = bootstrap(bpeg::GRAMMAR_SOURCE).unwrap();
        // The bootstrapped parser must itself be able to re-parse the source
        // that built it (spec §8 property 1, exercised end to end).
        let grammar = bpeg::parse_with(&parser, bpeg::GRAMMAR_SOURCE).unwrap();
        assert_eq!(grammar.top().map(|n| n.as_ref()), Some("top"));
    }

    #[test]
    fn bootstrapped_parser_parses_a_user_grammar() {
        let parser = bootstrap(bpeg::GRAMMAR_SOURCE).unwrap();
        let grammar = bpeg::parse_with(&parser, "top:\n    | \"a\" \"b\" { sequence_pair }\n").unwrap();
        assert_eq!(grammar.rules.len(), 1);
    }
}
