//! The error taxonomy of spec §7 / SPEC_FULL §10.1.
//!
//! Two failure kinds drive matching itself (`MatchFailure` recoverable, promoted to
//! fatal by `Entail`/action errors); two more are raised eagerly, independent of any
//! particular input (`BindError` at parser construction, and the clause-level
//! `ClauseError` reused from [`crate::clause`]). All of it is `thiserror`-derived, in
//! place of the teacher's bare-string `ParseError`.

use std::fmt;
use std::rc::Rc;

use crate::clause::{Clause, ClauseError};

/// A recoverable match failure at a position, against a clause. Feeds `Choice`
/// fallback; chains into a `source` when one match failure re-raises another
/// (e.g. `Sequence` propagating a child's failure, or `Reference` wrapping the
/// rule body's failure to extend the rule path).
#[derive(Debug, Clone)]
pub struct MatchFailure<D: crate::clause::ClauseValue> {
    pub at: usize,
    pub clause: Rc<Clause<D>>,
    pub cause: Option<Box<MatchFailure<D>>>,
}

impl<D: crate::clause::ClauseValue> MatchFailure<D> {
    pub fn new(at: usize, clause: Rc<Clause<D>>) -> Self {
        MatchFailure {
            at,
            clause,
            cause: None,
        }
    }

    /// Wrap `self` as the cause of a new failure raised against `clause` at `at`,
    /// used by `Reference` to extend the rule path (spec §4.2 step 5).
    pub fn wrapped_by(self, at: usize, clause: Rc<Clause<D>>) -> Self {
        MatchFailure {
            at,
            clause,
            cause: Some(Box::new(self)),
        }
    }

    /// Walk `self` and its cause chain, collecting the names of every `Reference`
    /// clause encountered, in the order a failure propagated through them
    /// (outermost rule first). This is the "rule path" of spec §4.4/§7.
    pub fn rule_path(&self) -> Vec<Rc<str>> {
        let mut path = Vec::new();
        let mut current = Some(self);
        while let Some(failure) = current {
            if let Clause::Reference(name) = &*failure.clause {
                path.push(name.clone());
            }
            current = failure.cause.as_deref();
        }
        path
    }

    /// The innermost (deepest) failure in the cause chain: usually the most
    /// specific description of what actually failed to match.
    pub fn root_cause(&self) -> &MatchFailure<D> {
        let mut current = self;
        while let Some(cause) = &current.cause {
            current = cause;
        }
        current
    }
}

impl<D: crate::clause::ClauseValue> fmt::Display for MatchFailure<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {:?} at index {}", self.clause, self.at)
    }
}

impl<D: crate::clause::ClauseValue> std::error::Error for MatchFailure<D> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// An error raised while running a `Transform`'s action (spec §4.2: "any exception
/// during the action is promoted to fatal failure at `at`").
#[derive(Debug, Clone, thiserror::Error)]
#[error("action {action} failed: {message}")]
pub struct ActionError {
    pub action: Rc<str>,
    pub message: String,
}

/// The outcome of attempting to match a clause: either progress, or one of the two
/// failure kinds of spec §4.2. Fatal failures never feed `Choice` fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Failure<D: crate::clause::ClauseValue> {
    #[error(transparent)]
    Recoverable(#[from] MatchFailure<D>),
    #[error("committed: {0}")]
    Fatal(MatchFailure<D>),
}

impl<D: crate::clause::ClauseValue> Failure<D> {
    pub fn at(&self) -> usize {
        match self {
            Failure::Recoverable(f) | Failure::Fatal(f) => f.at,
        }
    }

    pub fn match_failure(&self) -> &MatchFailure<D> {
        match self {
            Failure::Recoverable(f) | Failure::Fatal(f) => f,
        }
    }

    /// Promote a recoverable failure to fatal, as `Entail` does.
    pub fn into_fatal(self) -> Failure<D> {
        match self {
            Failure::Recoverable(f) | Failure::Fatal(f) => Failure::Fatal(f),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Failure::Fatal(_))
    }
}

/// An error detected eagerly when a [`crate::Parser`] is built, before any input is
/// matched (spec §7 "Binding error" / "Domain-validation error").
#[derive(Debug, Clone, thiserror::Error)]
pub enum BindError {
    #[error("grammar has no rules; a parser needs at least a top rule")]
    EmptyGrammar,
    #[error("rule {0:?} is referenced but not defined in this grammar")]
    UnresolvedReference(Rc<str>),
    #[error(
        "choice alternatives disagree on captures: first alternative binds {first:?}, another binds {other:?}"
    )]
    CaptureSignatureMismatch {
        first: Vec<Rc<str>>,
        other: Vec<Rc<str>>,
    },
    #[error(
        "action {action:?} declares parameters {declared:?} but its clause captures {actual:?}"
    )]
    ActionSignatureMismatch {
        action: Rc<str>,
        declared: Vec<Rc<str>>,
        actual: Vec<Rc<str>>,
    },
    #[error("action {0:?} is used by a Transform but not registered in the action table")]
    UnknownAction(Rc<str>),
    #[error("rule {0:?} can match zero-length input and is repeated, which would loop forever")]
    RepeatOfNullableRule(Rc<str>),
    #[error(transparent)]
    Clause(#[from] ClauseError),
}

/// The user-facing top-level failure (spec §4.4/§7): message, source context, the
/// failing index, and the rule path.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}\n{caret}\n{line}")]
pub struct ParseFailure {
    pub message: String,
    /// The source line containing `index`, for the rendered diagnostic.
    pub line: String,
    /// A `^` caret aligned under `index` within `line`.
    pub caret: String,
    pub index: usize,
    pub path: Vec<Rc<str>>,
}

impl ParseFailure {
    /// Build the rendered form from a failing index, a `(line, caret)` pair
    /// already computed by the input domain ([`crate::domain::Input::context`]),
    /// and a human-readable message; the rule path is attached separately by the
    /// caller (the facade, which has access to the cause chain).
    pub fn new(message: String, line: String, caret: String, index: usize, path: Vec<Rc<str>>) -> Self {
        ParseFailure {
            message,
            line,
            caret,
            index,
            path,
        }
    }
}

/// A top-level "unpack" failure (spec §7): extra captures, too many results, or no
/// result at all, after an otherwise successful top-level match.
///
/// [`UnpackError::NoResult`] is raised unconditionally by [`crate::Parser::parse`]'s
/// unpack step whenever the top match produced zero results, including when it
/// also produced zero captures — a grammar whose top rule never reaches a
/// `{action}` has no single value to return, per spec §4.4 step 3 and §3
/// invariant 6 ("yields exactly one result").
#[derive(Debug, Clone, thiserror::Error)]
pub enum UnpackError {
    #[error("found {0} unused captures after parsing; transform them into a result first")]
    UnusedCaptures(usize),
    #[error("found {0} results after parsing; a single top-level result is required")]
    TooManyResults(usize),
    #[error("found no result after parsing; every branch must end in exactly one result")]
    NoResult,
}

/// Everything a top-level [`crate::Parser::parse`] invocation can fail with: a
/// match that never completed, or one that completed but didn't unpack cleanly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseOutcomeError<D: crate::clause::ClauseValue> {
    #[error(transparent)]
    Match(#[from] Failure<D>),
    #[error(transparent)]
    Unpack(#[from] UnpackError),
}
