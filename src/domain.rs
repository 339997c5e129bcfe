//! The generic input domain (spec §3/§C7): "any element type supporting length,
//! slicing, equality, and order". Generalizes the teacher's `Token` trait (a single
//! token per element) to "a sequence sliceable by element-count range".
//!
//! A literal used inside a clause (a `Value`'s `v`, a `Range`'s `lo`/`hi`) is itself
//! a value of the domain — for text, a literal is just a shorter string. Both
//! provided implementations therefore set `Value = Self`: slicing the whole input
//! and comparing two literals use the same element-count-indexed operations.

use std::cmp::Ordering;

/// A sequence type a [`crate::Clause`] can match over.
///
/// Implemented here for `String` (indexed by `char`, so `at`/`length` count
/// characters, not bytes) and for `Vec<T>` (indexed by element, requiring `T: Ord`
/// so `Range` has something to compare). Implementers outside this crate can add
/// their own, e.g. a token stream from a separate lexer.
pub trait Input: Clone {
    /// The value type a `Value`/`Range` clause literal holds for this domain.
    type Value: crate::clause::ClauseValue;

    /// Number of elements in the whole input.
    fn seq_len(&self) -> usize;

    /// The sub-sequence `[at, at+len)`, as a `Self::Value`. Panics if out of bounds;
    /// callers (the interpreter) always bounds-check first.
    fn slice(&self, at: usize, len: usize) -> Self::Value;

    /// Number of elements a literal value covers, counted the same way `seq_len`
    /// counts the whole input (e.g. by `char` for text, not by byte).
    fn value_len(value: &Self::Value) -> usize;

    /// Three-way comparison between two literal values, used by `Range` clauses.
    fn compare_values(a: &Self::Value, b: &Self::Value) -> Ordering;

    /// The source line containing `index` and a caret string pointing at `index`
    /// within it, for `ParseFailure`'s rendered diagnostic (spec §7). Generalizes
    /// the front-end's `context()` helper across domains: text gets its actual
    /// enclosing line, anything else falls back to a short element window.
    fn context(&self, index: usize) -> (String, String);
}

impl Input for String {
    type Value = String;

    fn seq_len(&self) -> usize {
        self.chars().count()
    }

    fn slice(&self, at: usize, len: usize) -> String {
        self.chars().skip(at).take(len).collect()
    }

    fn value_len(value: &String) -> usize {
        value.chars().count()
    }

    fn compare_values(a: &String, b: &String) -> Ordering {
        a.as_str().cmp(b.as_str())
    }

    fn context(&self, index: usize) -> (String, String) {
        let chars: Vec<char> = self.chars().collect();
        let line_start = chars[..index.min(chars.len())]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|p| p + 1)
            .unwrap_or(0);
        let line_end = chars[index.min(chars.len())..]
            .iter()
            .position(|&c| c == '\n')
            .map(|p| index + p)
            .unwrap_or(chars.len());
        let line: String = chars[line_start..line_end].iter().collect();
        let caret = format!("{}^", " ".repeat(index.saturating_sub(line_start)));
        (line, caret)
    }
}

impl<T> Input for Vec<T>
where
    T: crate::clause::ClauseValue + Ord,
{
    type Value = Vec<T>;

    fn seq_len(&self) -> usize {
        self.len()
    }

    fn slice(&self, at: usize, len: usize) -> Vec<T> {
        self[at..at + len].to_vec()
    }

    fn value_len(value: &Vec<T>) -> usize {
        value.len()
    }

    fn compare_values(a: &Vec<T>, b: &Vec<T>) -> Ordering {
        a.as_slice().cmp(b.as_slice())
    }

    /// No notion of "lines" for a bare element sequence: render a short debug
    /// window of elements around `index`, the way the front-end's `context()`
    /// falls back to `str(source[index-5:index])` for non-text domains.
    fn context(&self, index: usize) -> (String, String) {
        let at = index.min(self.len());
        let start = at.saturating_sub(5);
        let end = (at + 5).min(self.len());
        let line = format!("{:?}", &self[start..end]);
        let caret = format!("{}^", " ".repeat(format!("{:?}", &self[start..at]).len()));
        (line, caret)
    }
}
