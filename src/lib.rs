//! A self-hosting PEG parser generator (spec §1-§9; ambient stack in SPEC_FULL §10).
//!
//! A user writes a grammar in a textual surface syntax; [`create_parser`] compiles
//! it into a runtime [`Parser`] that, given input of some [`domain::Input`]
//! sequence type, either produces a transformed value or a structured failure.
//! The grammar engine itself — the [`clause`] algebra, the [`interpreter`]'s
//! memoized top-down matcher with left recursion, and the [`action`] binder — is
//! the core; the surface syntax, an alternate PEG dialect, and bootstrapping the
//! grammar's own self-description live under [`dialect`] and [`bootstrap`].
//!
//! ```
//! use pegboot::{Clause, ActionTable, Grammar, Parser, ParserOptions, Rule};
//! use std::rc::Rc;
//!
//! let rules = vec![Rule::new("top", Rc::new(Clause::Transform(
//!     Clause::sequence([Rc::new(Clause::Value("hi".to_string()))]),
//!     "greet".into(),
//! )))];
//! let grammar: Grammar<String> = Grammar::new(rules);
//! let mut actions: ActionTable<String, String> = ActionTable::new();
//! actions.register("greet", |_caps| Ok("hi".to_string()));
//! let parser: Parser<String, String> = Parser::bind(grammar, actions, ParserOptions::default()).unwrap();
//! assert!(parser.parse(&"hi".to_string()).is_ok());
//! ```

pub mod action;
pub mod bootstrap;
pub mod clause;
pub mod dialect;
pub mod domain;
pub mod error;
pub mod interpreter;
pub mod matching;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

pub use action::{ActionFn, ActionTable};
pub use clause::{Clause, ClauseError, ClauseValue};
pub use domain::Input;
pub use error::{BindError, Failure, MatchFailure, ParseFailure, ParseOutcomeError, UnpackError};
pub use interpreter::Memo;
pub use matching::{Capture, Match, Value};

/// A named clause, the unit a [`Grammar`] is built from (spec §3).
///
/// `Serialize`/`Deserialize` back the "persisted state" contract of spec §6:
/// a `Parser` is not itself serializable (its action table holds boxed
/// closures), but its `Grammar` is pure data, and re-binding a deserialized
/// `Grammar` against the same action namespace reconstructs an equivalent
/// `Parser` (spec §8 scenario S6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule<D: ClauseValue> {
    pub name: Rc<str>,
    pub body: Rc<Clause<D>>,
}

impl<D: ClauseValue> Rule<D> {
    pub fn new(name: impl Into<Rc<str>>, body: Rc<Clause<D>>) -> Self {
        Rule {
            name: name.into(),
            body,
        }
    }
}

/// An ordered list of [`Rule`]s; the first is the entry ("top") rule (spec §3).
/// A pure data aggregate — no validation happens until it is bound into a
/// [`Parser`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Grammar<D: ClauseValue> {
    pub rules: Vec<Rule<D>>,
}

impl<D: ClauseValue> Grammar<D> {
    pub fn new(rules: Vec<Rule<D>>) -> Self {
        Grammar { rules }
    }

    /// The entry rule's name, if the grammar has any rules at all.
    pub fn top(&self) -> Option<&Rc<str>> {
        self.rules.first().map(|r| &r.name)
    }

    fn as_pairs(&self) -> Vec<(Rc<str>, Rc<Clause<D>>)> {
        self.rules
            .iter()
            .map(|r| (r.name.clone(), r.body.clone()))
            .collect()
    }
}

/// Knobs a caller can set when binding a [`Parser`] (SPEC_FULL §10.3). The core
/// itself reads no ambient configuration (no env vars, no files): every field
/// here is passed explicitly by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParserOptions {
    /// Cooperative cancellation (spec §5): caps the number of `Reference` entries
    /// a single `parse` call may perform before failing fatally. `None` (the
    /// default) means unbounded.
    pub step_budget: Option<usize>,
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_budget(mut self, budget: usize) -> Self {
        self.step_budget = Some(budget);
        self
    }
}

/// A [`Grammar`] bound to a mapping from action identifier to compiled callable
/// (spec §3/§4.4, C4). Binding is eager: every invariant that can be checked
/// without an input is checked once here, so `parse` only ever fails for
/// input-dependent reasons.
pub struct Parser<Inp: Input, A> {
    top: Rc<str>,
    rules: interpreter::RuleTable<Inp::Value>,
    actions: ActionTable<Inp::Value, A>,
    options: ParserOptions,
}

impl<Inp: Input, A: Clone> Parser<Inp, A> {
    /// Bind `grammar` and `actions` into a callable parser, running every check
    /// of spec §7's "Binding error"/"Domain-validation error" classes eagerly.
    #[instrument(level = "debug", skip_all, fields(rules = grammar.rules.len()))]
    pub fn bind(
        grammar: Grammar<Inp::Value>,
        actions: ActionTable<Inp::Value, A>,
        options: ParserOptions,
    ) -> Result<Self, BindError>
    where
        Inp::Value: Input<Value = Inp::Value>,
    {
        let top = grammar.top().cloned().ok_or(BindError::EmptyGrammar)?;
        let pairs = grammar.as_pairs();

        for (name, body) in &pairs {
            tracing::debug!(rule = %name, "binding rule");
            body.validate()?;
        }
        action::verify_references_resolve(&pairs)?;
        action::verify_choice_captures(&pairs)?;
        action::verify_action_signatures(&pairs, &actions)?;
        let nullable = action::nullable_rules(&pairs);
        action::verify_no_repeat_of_nullable(&pairs, &nullable)?;

        let rules: interpreter::RuleTable<Inp::Value> = pairs.into_iter().collect();

        Ok(Parser {
            top,
            rules,
            actions,
            options,
        })
    }

    /// Run a full parse of `input`, returning the unpacked top-level result or a
    /// structured failure (spec §4.4 steps 1-3). Does not render a [`ParseFailure`]
    /// diagnostic — use [`Parser::parse_report`] when `input` can supply a
    /// `(line, caret)` rendering via [`Input::context`].
    pub fn parse(&self, input: &Inp) -> Result<Value<Inp::Value, A>, ParseOutcomeError<Inp::Value>> {
        let top_ref = Clause::reference(self.top.clone());
        let mut memo = Memo::with_step_budget(self.options.step_budget);
        let m = interpreter::match_clause(&top_ref, input, 0, &mut memo, &self.rules, &self.actions)?;
        unpack(m)
    }

    /// [`Parser::parse`], but on failure renders a [`ParseFailure`] using
    /// `input`'s own [`Input::context`] and the failure's rule path (spec §4.4
    /// step 4).
    pub fn parse_report(&self, input: &Inp) -> Result<Value<Inp::Value, A>, ParseFailure> {
        self.parse(input).map_err(|err| report(input, err))
    }
}

/// Unpack a top-level match (spec §4.4 step 3 / §7 "Unpack failure"): fail if any
/// capture remains unconsumed, fail unless exactly one result was produced, else
/// return it. No exception for a zero-length or otherwise un-transformed top
/// match: spec §3 invariant 6 requires "exactly one result", and spec §7 names
/// zero results as its own design-error kind, unconditionally — matching
/// `front.py`'s `unpack()`, which raises on `not match.results` regardless of
/// whether captures are also empty.
fn unpack<D: ClauseValue, A>(
    m: Match<D, A>,
) -> Result<Value<D, A>, ParseOutcomeError<D>> {
    if !m.captures.is_empty() {
        return Err(UnpackError::UnusedCaptures(m.captures.len()).into());
    }
    match m.results.len() {
        0 => Err(UnpackError::NoResult.into()),
        1 => Ok(m.results.into_iter().next().unwrap()),
        n => Err(UnpackError::TooManyResults(n).into()),
    }
}

/// Render a [`ParseOutcomeError`] into the user-facing [`ParseFailure`] of spec
/// §7: message, source context, failing index, rule path.
fn report<Inp: Input, A>(
    input: &Inp,
    err: ParseOutcomeError<Inp::Value>,
) -> ParseFailure {
    match err {
        ParseOutcomeError::Unpack(u) => {
            let (line, caret) = input.context(0);
            ParseFailure::new(u.to_string(), line, caret, 0, Vec::new())
        }
        ParseOutcomeError::Match(failure) => {
            let mf = failure.match_failure();
            let path = mf.rule_path();
            let root = mf.root_cause();
            let message = if failure.is_fatal() {
                format!("committed: expected {:?}", root.clause)
            } else {
                format!("expected {:?}", root.clause)
            };
            let (line, caret) = input.context(mf.at);
            ParseFailure::new(message, line, caret, mf.at, path)
        }
    }
}

/// A dialect: a fixed parser from grammar source text to a [`Grammar`] over some
/// clause-literal domain `D` (spec §4.5/§6). `create_parser` takes one of these so
/// callers can choose the primary surface syntax ([`dialect::bpeg`]) or the
/// alternate PEG syntax ([`dialect::peg`]) without the core depending on either.
pub trait Dialect<D: ClauseValue> {
    fn parse_grammar(&self, source: &str) -> Result<Grammar<D>, ParseFailure>;
}

/// The top-level entry point (spec §2 "Control flow"): hand a grammar source and
/// a dialect to obtain a [`Grammar`], then bind `actions` into it.
#[instrument(level = "debug", skip_all)]
pub fn create_parser<Inp: Input, A: Clone>(
    source: &str,
    dialect: &impl Dialect<Inp::Value>,
    actions: ActionTable<Inp::Value, A>,
    options: ParserOptions,
) -> Result<Parser<Inp, A>, CreateParserError>
where
    Inp::Value: Input<Value = Inp::Value>,
{
    let grammar = dialect.parse_grammar(source)?;
    Ok(Parser::bind(grammar, actions, options)?)
}

/// Everything [`create_parser`] can fail with: the dialect rejected the source,
/// or the resulting grammar failed to bind.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CreateParserError {
    #[error(transparent)]
    Dialect(#[from] ParseFailure),
    #[error(transparent)]
    Bind(#[from] BindError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Rc<Clause<String>> {
        Rc::new(Clause::Value(s.to_string()))
    }

    #[test]
    fn binds_and_parses_a_trivial_grammar() {
        let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
            "top",
            Rc::new(Clause::Transform(lit("hi"), "ok".into())),
        )]);
        let mut actions: ActionTable<String, ()> = ActionTable::new();
        actions.register("ok", |_caps| Ok(()));
        let parser: Parser<String, ()> =
            Parser::bind(grammar, actions, ParserOptions::default()).unwrap();
        let result = parser.parse(&"hi".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_unresolved_reference_at_bind_time() {
        let grammar: Grammar<String> =
            Grammar::new(vec![Rule::new("top", Clause::reference("missing"))]);
        let actions: ActionTable<String, ()> = ActionTable::new();
        let err = Parser::<String, ()>::bind(grammar, actions, ParserOptions::default())
            .unwrap_err();
        assert!(matches!(err, BindError::UnresolvedReference(_)));
    }

    #[test]
    fn reports_failure_with_index_and_line() {
        let grammar: Grammar<String> = Grammar::new(vec![Rule::new("top", lit("hi"))]);
        let actions: ActionTable<String, ()> = ActionTable::new();
        let parser: Parser<String, ()> =
            Parser::bind(grammar, actions, ParserOptions::default()).unwrap();
        let err = parser.parse_report(&"bye".to_string()).unwrap_err();
        assert_eq!(err.index, 0);
    }

    #[test]
    fn step_budget_permits_a_small_left_recursive_parse() {
        // `loopy: | loopy "x" | "x"` seeds on "x" then grows once per extra "x";
        // a generous budget should not interfere with a small, legitimate parse.
        let grammar: Grammar<String> = Grammar::new(vec![Rule::new(
            "loopy",
            Rc::new(Clause::Transform(
                Clause::choice([
                    Clause::sequence([Clause::reference("loopy"), lit("x")]),
                    lit("x"),
                ]),
                "ok".into(),
            )),
        )]);
        let mut actions: ActionTable<String, ()> = ActionTable::new();
        actions.register("ok", |_caps| Ok(()));
        let options = ParserOptions::new().with_step_budget(50);
        let parser: Parser<String, ()> = Parser::bind(grammar, actions, options).unwrap();
        let result = parser.parse(&"xxx".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn step_budget_of_zero_fails_fatally_immediately() {
        let grammar: Grammar<String> = Grammar::new(vec![Rule::new("top", lit("x"))]);
        let actions: ActionTable<String, ()> = ActionTable::new();
        let options = ParserOptions::new().with_step_budget(0);
        let parser: Parser<String, ()> = Parser::bind(grammar, actions, options).unwrap();
        let err = parser.parse(&"x".to_string()).unwrap_err();
        match err {
            ParseOutcomeError::Match(Failure::Fatal(_)) => {}
            other => panic!("expected a fatal match failure, got {other:?}"),
        }
    }
}
