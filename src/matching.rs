//! The [`Match`] record and its concatenation (spec §3).

use std::rc::Rc;

/// A value produced either by a `Transform`'s action, by an uncaptured terminal
/// (the raw slice of input it covered), or by a variadic `Capture` (the ordered
/// list of its child's results, spec §4.2).
#[derive(Clone, Debug)]
pub enum Value<D: crate::clause::ClauseValue, A> {
    /// A literal slice of the input, as produced by an uncaptured terminal match.
    Raw(D),
    /// The return value of a user action.
    Action(Rc<A>),
    /// The ordered results of a variadic (`*name=`) capture's child.
    List(Vec<Value<D, A>>),
}

/// A named capture threaded from a sub-match up to an enclosing `Transform`.
pub type Capture<D, A> = (Rc<str>, Value<D, A>);

/// An immutable record of a successful match (spec §3).
///
/// `results` accumulates `Transform` outputs that have not yet been consumed by an
/// enclosing capture or the top-level unpack; `captures` accumulates named values
/// not yet consumed by an enclosing `Transform`. A well-formed top-level match ends
/// with exactly one result and zero captures (invariant 6).
#[derive(Clone, Debug)]
pub struct Match<D: crate::clause::ClauseValue, A> {
    pub at: usize,
    pub length: usize,
    pub results: Vec<Value<D, A>>,
    pub captures: Vec<Capture<D, A>>,
}

impl<D: crate::clause::ClauseValue, A> Match<D, A> {
    /// A zero-length (or otherwise resultless) successful match at `at`.
    pub fn plain(at: usize, length: usize) -> Self {
        Match {
            at,
            length,
            results: Vec::new(),
            captures: Vec::new(),
        }
    }

    pub fn end(&self) -> usize {
        self.at + self.length
    }

    /// Concatenate two adjacent matches (spec §3 invariant 5): `self.end() == other.at`.
    /// Lengths add; results and captures concatenate in order.
    ///
    /// Panics on non-adjacency: every call site in [`crate::interpreter`] constructs
    /// `other` by matching starting exactly at `self.end()`, so non-adjacency would
    /// indicate an interpreter bug, not a user-facing parse failure.
    pub fn concat(mut self, mut other: Match<D, A>) -> Match<D, A> {
        debug_assert_eq!(
            self.end(),
            other.at,
            "match concatenation requires adjacency"
        );
        self.length += other.length;
        self.results.append(&mut other.results);
        self.captures.append(&mut other.captures);
        self
    }
}
