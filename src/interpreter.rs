//! The memoized top-down match interpreter (spec §4.2, C2).
//!
//! `match_clause` is a single recursive function dispatching on [`Clause`]'s
//! variants — the same shape as the teacher's `parse_expr` in
//! `backtracking_parser.rs` (match on the expression enum, recurse, consult a
//! memo keyed by position). Rust's enum-match dispatch is already "compiled" in
//! the sense spec §9 asks for (no runtime tag lookup beyond the match itself;
//! nothing is re-parsed or re-interpreted per call), so there is no separate
//! closure-compilation pass: the recursion *is* the compiled matcher.
//!
//! Deep left recursion or long `Sequence`/`Choice` chains can recurse arbitrarily
//! deeply (spec §5 "Suspension points"); every call is wrapped in
//! `stacker::maybe_grow`, exactly as the teacher guards `parse_expr` and
//! `intermediate_to_final`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::action::ActionTable;
use crate::clause::Clause;
use crate::domain::Input;
use crate::error::{Failure, MatchFailure};
use crate::matching::{Match, Value};

/// Rule name -> rule body, the resolved form of a [`crate::Grammar`]'s rule list
/// used during matching (spec §3 "Rule").
pub type RuleTable<D> = HashMap<Rc<str>, Rc<Clause<D>>>;

/// One memo entry's state (spec §3 "Memo"): `InProgress` is the seed-and-grow
/// sentinel ("rule currently under seed expansion, treat as failure"); absence
/// from the map (not modeled as a variant) is the third state.
enum MemoState<D: crate::clause::ClauseValue, A> {
    InProgress,
    Done(Result<Match<D, A>, MatchFailure<D>>),
}

/// The per-parse memo (spec §3): keyed by `(position, rule_name)`, owned
/// exclusively by one top-level parse invocation and discarded at its end.
pub struct Memo<D: crate::clause::ClauseValue, A> {
    entries: HashMap<(usize, Rc<str>), MemoState<D, A>>,
    /// Cooperative cancellation (spec §5): counts `Reference` entries; `None`
    /// means unbounded. Set from [`crate::ParserOptions::step_budget`].
    step_budget: Option<usize>,
    steps: usize,
}

impl<D: crate::clause::ClauseValue, A> Memo<D, A> {
    pub fn new() -> Self {
        Memo {
            entries: HashMap::new(),
            step_budget: None,
            steps: 0,
        }
    }

    pub fn with_step_budget(step_budget: Option<usize>) -> Self {
        Memo {
            entries: HashMap::new(),
            step_budget,
            steps: 0,
        }
    }
}

impl<D: crate::clause::ClauseValue, A> Default for Memo<D, A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard size for `stacker::maybe_grow`, matching the teacher's
/// `backtracking_parser.rs` call sites (32KiB red zone, 1MiB fresh stack chunk).
const STACK_RED_ZONE: usize = 32 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// Match `clause` against `input` starting at `at`. Returns the match on success,
/// or a [`Failure`] describing why and whether it is fatal (spec §4.2).
pub fn match_clause<Inp, A>(
    clause: &Rc<Clause<Inp::Value>>,
    input: &Inp,
    at: usize,
    memo: &mut Memo<Inp::Value, A>,
    rules: &RuleTable<Inp::Value>,
    actions: &ActionTable<Inp::Value, A>,
) -> Result<Match<Inp::Value, A>, Failure<Inp::Value>>
where
    Inp: Input,
    A: Clone,
{
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
        match_clause_inner(clause, input, at, memo, rules, actions)
    })
}

fn match_clause_inner<Inp, A>(
    clause: &Rc<Clause<Inp::Value>>,
    input: &Inp,
    at: usize,
    memo: &mut Memo<Inp::Value, A>,
    rules: &RuleTable<Inp::Value>,
    actions: &ActionTable<Inp::Value, A>,
) -> Result<Match<Inp::Value, A>, Failure<Inp::Value>>
where
    Inp: Input,
    A: Clone,
{
    match &**clause {
        Clause::Value(v) => {
            let len = Inp::value_len(v);
            if at + len <= input.seq_len() && input.slice(at, len) == *v {
                Ok(Match::plain(at, len))
            } else {
                Err(MatchFailure::new(at, clause.clone()).into())
            }
        }
        Clause::Range(lo, hi) => {
            let len = Inp::value_len(lo);
            if at + len <= input.seq_len() {
                let candidate = input.slice(at, len);
                if Inp::compare_values(&candidate, lo) != std::cmp::Ordering::Less
                    && Inp::compare_values(&candidate, hi) != std::cmp::Ordering::Greater
                {
                    return Ok(Match::plain(at, len));
                }
            }
            Err(MatchFailure::new(at, clause.clone()).into())
        }
        Clause::Empty => Ok(Match::plain(at, 0)),
        Clause::Any(k) => {
            if at + k <= input.seq_len() {
                Ok(Match::plain(at, *k))
            } else {
                Err(MatchFailure::new(at, clause.clone()).into())
            }
        }
        Clause::Sequence(children) => match_sequence(children, input, at, memo, rules, actions),
        Clause::Choice(children) => {
            let mut last_failure = None;
            for child in children {
                match match_clause(child, input, at, memo, rules, actions) {
                    Ok(m) => return Ok(m),
                    Err(Failure::Fatal(f)) => return Err(Failure::Fatal(f)),
                    Err(Failure::Recoverable(f)) => last_failure = Some(f),
                }
            }
            Err(last_failure
                .unwrap_or_else(|| MatchFailure::new(at, clause.clone()))
                .into())
        }
        Clause::Repeat(child) => {
            // Require one success (possibly zero-length); then keep consuming
            // only while each further iteration both starts before EOF and
            // itself advances the position, so a child that is nullable only
            // at some positions (e.g. an end-of-input marker) cannot spin
            // forever once reached (spec §9 "Repeat termination", guards a+b).
            let mut acc = match_clause(child, input, at, memo, rules, actions)?;
            loop {
                let next_start = acc.end();
                if next_start >= input.seq_len() {
                    break;
                }
                match match_clause(child, input, next_start, memo, rules, actions) {
                    Ok(next) if next.length > 0 => acc = acc.concat(next),
                    Ok(_) => break,
                    Err(Failure::Fatal(f)) => return Err(Failure::Fatal(f)),
                    Err(Failure::Recoverable(_)) => break,
                }
            }
            Ok(acc)
        }
        Clause::Not(child) => match match_clause(child, input, at, memo, rules, actions) {
            Ok(_) => Err(MatchFailure::new(at, clause.clone()).into()),
            Err(Failure::Fatal(f)) => Err(Failure::Fatal(f)),
            Err(Failure::Recoverable(_)) => Ok(Match::plain(at, 0)),
        },
        Clause::And(child) => {
            match_clause(child, input, at, memo, rules, actions)?;
            Ok(Match::plain(at, 0))
        }
        Clause::Entail(children) => {
            match_sequence(children, input, at, memo, rules, actions).map_err(Failure::into_fatal)
        }
        Clause::Capture(child, name, variadic) => {
            let m = match_clause(child, input, at, memo, rules, actions)?;
            let value = if *variadic {
                Value::List(m.results.clone())
            } else {
                match m.results.len() {
                    0 => Value::Raw(input.slice(m.at, m.length)),
                    1 => m.results[0].clone(),
                    _ => {
                        return Err(Failure::Fatal(MatchFailure::new(at, clause.clone())));
                    }
                }
            };
            Ok(Match {
                at: m.at,
                length: m.length,
                results: Vec::new(),
                captures: vec![(name.clone(), value)],
            })
        }
        Clause::Transform(child, action_name) => {
            let m = match_clause(child, input, at, memo, rules, actions)?;
            let action = actions.get(action_name).ok_or_else(|| {
                Failure::Fatal(MatchFailure::new(at, clause.clone()))
            })?;
            match action(&m.captures) {
                Ok(value) => Ok(Match {
                    at: m.at,
                    length: m.length,
                    results: vec![Value::Action(Rc::new(value))],
                    captures: Vec::new(),
                }),
                Err(_err) => Err(Failure::Fatal(MatchFailure::new(at, clause.clone()))),
            }
        }
        Clause::Reference(name) => match_reference(name, input, at, memo, rules, actions, clause),
    }
}

/// Shared by `Sequence` and `Entail` (spec §4.2: "Entail ... match like Sequence").
/// `Entail` differs only in what it does with a resulting `Err`, handled by its
/// caller via [`Failure::into_fatal`].
fn match_sequence<Inp, A>(
    children: &[Rc<Clause<Inp::Value>>],
    input: &Inp,
    at: usize,
    memo: &mut Memo<Inp::Value, A>,
    rules: &RuleTable<Inp::Value>,
    actions: &ActionTable<Inp::Value, A>,
) -> Result<Match<Inp::Value, A>, Failure<Inp::Value>>
where
    Inp: Input,
    A: Clone,
{
    let mut children_iter = children.iter();
    let head = children_iter
        .next()
        .expect("Sequence/Entail always has at least one child");
    let mut acc = match_clause(head, input, at, memo, rules, actions)?;
    for child in children_iter {
        let next = match_clause(child, input, acc.end(), memo, rules, actions)?;
        acc = acc.concat(next);
    }
    Ok(acc)
}

/// `Reference` matching: the seed-and-grow left-recursion fixpoint (spec §4.2).
fn match_reference<Inp, A>(
    name: &Rc<str>,
    input: &Inp,
    at: usize,
    memo: &mut Memo<Inp::Value, A>,
    rules: &RuleTable<Inp::Value>,
    actions: &ActionTable<Inp::Value, A>,
    ref_clause: &Rc<Clause<Inp::Value>>,
) -> Result<Match<Inp::Value, A>, Failure<Inp::Value>>
where
    Inp: Input,
    A: Clone,
{
    memo.steps += 1;
    if let Some(budget) = memo.step_budget {
        if memo.steps > budget {
            tracing::debug!(rule = %name, steps = memo.steps, budget, "step budget exceeded");
            return Err(Failure::Fatal(MatchFailure::new(at, ref_clause.clone())));
        }
    }

    let key = (at, name.clone());

    if let Some(state) = memo.entries.get(&key) {
        return match state {
            MemoState::InProgress => Err(MatchFailure::new(at, ref_clause.clone()).into()),
            MemoState::Done(Ok(m)) => Ok(m.clone()),
            MemoState::Done(Err(f)) => {
                Err(Failure::Recoverable(f.clone().wrapped_by(at, ref_clause.clone())))
            }
        };
    }

    let body = rules
        .get(name)
        .unwrap_or_else(|| panic!("Reference({name:?}) not resolved against the grammar"))
        .clone();

    tracing::trace!(rule = %name, at, "seed: inserting InProgress sentinel");
    memo.entries.insert(key.clone(), MemoState::InProgress);

    let mut best: Option<Match<Inp::Value, A>> = None;
    let mut best_end: isize = at as isize - 1;
    let mut last_failure: Option<MatchFailure<Inp::Value>> = None;

    loop {
        // A recursive self-reference to `(at, name)` inside this very call looks
        // itself up via the map access above: on the first iteration it sees the
        // `InProgress` sentinel and fails (the seed); from the second iteration on
        // it sees the previous iteration's `Done` match and can build past it
        // (the grow). We deliberately do *not* reset the entry to `InProgress`
        // between iterations — doing so would make every iteration re-see only
        // the seed and never grow.
        match match_clause(&body, input, at, memo, rules, actions) {
            Ok(m) if m.end() as isize > best_end => {
                best_end = m.end() as isize;
                tracing::trace!(rule = %name, at, new_end = best_end, "grow: rule extended its match");
                best = Some(m.clone());
                memo.entries
                    .insert(key.clone(), MemoState::Done(Ok(m)));
            }
            Ok(_) => break,
            Err(Failure::Fatal(f)) => {
                memo.entries.remove(&key);
                return Err(Failure::Fatal(f));
            }
            Err(Failure::Recoverable(f)) => {
                last_failure = Some(f);
                break;
            }
        }
    }

    match best {
        Some(m) => {
            memo.entries.insert(key, MemoState::Done(Ok(m.clone())));
            Ok(m)
        }
        None => {
            let failure = last_failure.unwrap_or_else(|| MatchFailure::new(at, ref_clause.clone()));
            memo.entries
                .insert(key, MemoState::Done(Err(failure.clone())));
            Err(Failure::Recoverable(
                failure.wrapped_by(at, ref_clause.clone()),
            ))
        }
    }
}
