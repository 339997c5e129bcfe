//! The tagged clause algebra (spec §3, §4.1).
//!
//! A [`Clause`] is the unit a grammar is built from. Clauses are value-typed and
//! structurally compared: two clauses built independently but with equal shape are
//! equal, which is what lets the fixpoint property (spec §8.1) compare a grammar
//! against itself across bootstrap iterations.
//!
//! Clauses form a graph, not a tree: [`Clause::Reference`] names a rule rather than
//! owning it, so a grammar can be mutually or self recursive without Rust needing a
//! cyclic owned data structure. See [`crate::Grammar`] for how names are resolved.

use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// An atomic or composite match operation.
///
/// Composite variants hold their children behind `Rc` so that a clause built once
/// (e.g. during bootstrap) can be shared across rules without cloning the subtree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clause<D: ClauseValue> {
    /// Match the literal element sequence `v` (length >= 1).
    Value(D),
    /// Match a slice of length `len(lo) == len(hi)` whose value lies in `[lo, hi]`.
    Range(D, D),
    /// Match zero elements; always succeeds.
    Empty,
    /// Match any `k` elements (`k >= 1`).
    Any(usize),
    /// Match each child in order, concatenating matches.
    Sequence(Vec<Rc<Clause<D>>>),
    /// Try children left to right; succeed with the first.
    Choice(Vec<Rc<Clause<D>>>),
    /// Match the child one or more times, greedily.
    Repeat(Rc<Clause<D>>),
    /// Succeed with zero length iff the child would fail (non-fatally).
    Not(Rc<Clause<D>>),
    /// Succeed with zero length iff the child would succeed; discards its captures.
    And(Rc<Clause<D>>),
    /// Match like [`Clause::Sequence`], but promote any non-fatal inner failure to fatal.
    Entail(Vec<Rc<Clause<D>>>),
    /// Match the child and bind a named capture from its result.
    Capture(Rc<Clause<D>>, Rc<str>, bool),
    /// Match the child, then replace its results with the named action's return value.
    Transform(Rc<Clause<D>>, Rc<str>),
    /// Indirectly match the rule bound to `name` in the enclosing grammar.
    Reference(Rc<str>),
}

/// Bound on the element-sequence values a [`Clause`] can hold as literals
/// (`Value`/`Range` operands). Kept separate from [`crate::domain::Input`] because a
/// clause's literal is a single *value* (e.g. one `String`), not the input stream.
pub trait ClauseValue: Clone + std::fmt::Debug + PartialEq + Eq + std::hash::Hash + Serialize + for<'de> Deserialize<'de> {}

impl<T> ClauseValue for T where
    T: Clone + std::fmt::Debug + PartialEq + Eq + std::hash::Hash + Serialize + for<'de> Deserialize<'de>
{
}

/// A design-time error in how a clause is built, independent of any input.
/// Raised eagerly (spec §7 "Domain-validation error"), never while matching.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClauseError {
    #[error("Range bounds have unequal length ({0} vs {1})")]
    RangeLengthMismatch(usize, usize),
    #[error("Range lower bound is greater than its upper bound")]
    RangeUnordered,
    #[error("Any(0) matches zero elements; use Empty instead")]
    AnyZero,
    #[error("Repeat's child clause can match zero-length, which would loop forever")]
    RepeatOfEmptyish,
}

impl<D: ClauseValue> Clause<D> {
    /// Build a `Sequence`, sharing children via `Rc`.
    pub fn sequence(children: impl IntoIterator<Item = Rc<Clause<D>>>) -> Rc<Clause<D>> {
        Rc::new(Clause::Sequence(children.into_iter().collect()))
    }

    /// Build a `Choice`.
    pub fn choice(children: impl IntoIterator<Item = Rc<Clause<D>>>) -> Rc<Clause<D>> {
        Rc::new(Clause::Choice(children.into_iter().collect()))
    }

    /// Build a `Reference` clause.
    pub fn reference(name: impl Into<Rc<str>>) -> Rc<Clause<D>> {
        Rc::new(Clause::Reference(name.into()))
    }

    /// `Choice(Repeat(c), Empty)` — the "zero or more" desugaring used by the
    /// surface syntax's `e*` and `[e]`/`e+` combination (spec §6, property 6).
    pub fn repeat_star(child: Rc<Clause<D>>) -> Rc<Clause<D>> {
        Clause::choice([Rc::new(Clause::Repeat(child)), Rc::new(Clause::Empty)])
    }

    /// `Choice(e, Empty)` — the "optional" desugaring for `[e]`.
    pub fn optional(child: Rc<Clause<D>>) -> Rc<Clause<D>> {
        Clause::choice([child, Rc::new(Clause::Empty)])
    }

    /// The capture signature (spec §4.1): the set of names this clause binds to an
    /// enclosing `Transform`. `Choice` requires every alternative to agree; that
    /// check lives in the binder ([`crate::action`]), not here, because it needs to
    /// report a [`ClauseError`]-adjacent `BindError` with context about *which*
    /// alternative disagreed.
    pub fn capture_signature(self: &Rc<Self>) -> BTreeSet<Rc<str>> {
        match &**self {
            Clause::Value(_)
            | Clause::Range(_, _)
            | Clause::Any(_)
            | Clause::Empty
            | Clause::And(_)
            | Clause::Not(_)
            | Clause::Reference(_)
            | Clause::Transform(_, _) => BTreeSet::new(),
            Clause::Sequence(children) | Clause::Entail(children) => children
                .iter()
                .flat_map(|c| c.capture_signature())
                .collect(),
            Clause::Choice(children) => children
                .first()
                .map(|c| c.capture_signature())
                .unwrap_or_default(),
            Clause::Repeat(child) => child.capture_signature(),
            Clause::Capture(_, name, _) => BTreeSet::from([name.clone()]),
        }
    }

    /// Validate the domain invariants of spec §3 that can be checked locally, without
    /// resolving any `Reference` against a grammar: `Range` bound ordering/length and
    /// `Any(0)`. The remaining invariant (`Repeat` of a possibly-empty clause) needs
    /// whole-grammar nullability analysis and is checked in
    /// [`crate::action::nullable_rules`] at parser-build time instead, since a
    /// `Repeat(Reference(name))` cannot be judged without knowing whether `name`'s
    /// rule is nullable.
    pub fn validate(self: &Rc<Self>) -> Result<(), ClauseError>
    where
        D: crate::domain::Input<Value = D>,
    {
        match &**self {
            Clause::Range(lo, hi) => {
                let (lo_len, hi_len) = (D::value_len(lo), D::value_len(hi));
                if lo_len != hi_len {
                    return Err(ClauseError::RangeLengthMismatch(lo_len, hi_len));
                }
                if D::compare_values(hi, lo) == std::cmp::Ordering::Less {
                    return Err(ClauseError::RangeUnordered);
                }
                Ok(())
            }
            Clause::Any(0) => Err(ClauseError::AnyZero),
            Clause::Sequence(children) | Clause::Entail(children) | Clause::Choice(children) => {
                children.iter().try_for_each(|c| c.validate())
            }
            Clause::Not(child) | Clause::And(child) | Clause::Transform(child, _) => {
                child.validate()
            }
            Clause::Capture(child, _, _) => child.validate(),
            Clause::Repeat(child) => child.validate(),
            _ => Ok(()),
        }
    }

    /// Conservative, grammar-unaware check for "might match zero-length input":
    /// used by [`crate::action::nullable_rules`] as the base case of its fixpoint.
    /// `Reference` defers to the caller's resolved nullability set.
    pub(crate) fn can_match_empty(self: &Rc<Self>, nullable: &std::collections::HashSet<Rc<str>>) -> bool {
        match &**self {
            Clause::Empty | Clause::Not(_) | Clause::And(_) => true,
            Clause::Value(_) | Clause::Any(_) | Clause::Range(_, _) => false,
            Clause::Reference(name) => nullable.contains(name),
            Clause::Sequence(children) | Clause::Entail(children) => {
                children.iter().all(|c| c.can_match_empty(nullable))
            }
            Clause::Choice(children) => children.iter().any(|c| c.can_match_empty(nullable)),
            Clause::Repeat(child) => child.can_match_empty(nullable),
            Clause::Capture(child, _, _) | Clause::Transform(child, _) => {
                child.can_match_empty(nullable)
            }
        }
    }
}
