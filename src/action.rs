//! The action binder (spec §4.3): compiles each `Transform`'s action identifier
//! into a callable of its declared captures, and verifies grammar-wide binding
//! invariants (capture agreement in `Choice`, action/capture signature match,
//! `Repeat`-of-nullable-rule) before any input is matched.
//!
//! Per spec §4.3's "statically-typed host" option, an action here is not a second
//! embedded expression language: it is a named, boxed closure over the capture map,
//! exactly the shape `boot.py`'s `apegs_globals`/`apply()` pattern uses for its
//! bootstrap actions (the action namespace *is* the clause-constructor set).

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::clause::Clause;
use crate::error::{ActionError, BindError};
use crate::matching::{Capture, Value};

/// A single compiled action: a pure function of the named captures in scope plus
/// the (implicit, closed-over) action namespace, returning one value or an error
/// that becomes a fatal failure at the `Transform`'s position (spec §4.2).
pub type ActionFn<D, A> = dyn Fn(&[Capture<D, A>]) -> Result<A, ActionError>;

/// The name -> callable mapping a [`crate::Parser`] binds into its rules.
#[derive(Clone)]
pub struct ActionTable<D: crate::clause::ClauseValue, A> {
    actions: HashMap<Rc<str>, Rc<ActionFn<D, A>>>,
    /// Declared capture-name parameters, for actions registered via
    /// [`ActionTable::register_checked`]; absent for plain [`ActionTable::register`].
    declared: HashMap<Rc<str>, Vec<Rc<str>>>,
}

impl<D: crate::clause::ClauseValue, A> Default for ActionTable<D, A> {
    fn default() -> Self {
        ActionTable {
            actions: HashMap::new(),
            declared: HashMap::new(),
        }
    }
}

impl<D: crate::clause::ClauseValue, A> ActionTable<D, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under `name`. A second registration under the same name
    /// replaces the first, mirroring how Python keyword-argument action namespaces
    /// (`**actions`) behave on repeated keys.
    pub fn register(
        &mut self,
        name: impl Into<Rc<str>>,
        action: impl Fn(&[Capture<D, A>]) -> Result<A, ActionError> + 'static,
    ) -> &mut Self {
        self.actions.insert(name.into(), Rc::new(action));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Rc<ActionFn<D, A>>> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// The declared capture-name parameters of a registered action, if tracked.
    /// Actions registered via [`ActionTable::register_checked`] carry this; plain
    /// [`ActionTable::register`] does not (the action alone can't report its own
    /// signature), so [`verify_action_signatures`] only checks actions registered
    /// the checked way.
    pub fn declared_params(&self, name: &str) -> Option<&[Rc<str>]> {
        self.declared.get(name).map(Vec::as_slice)
    }

    /// Register an action together with the capture names it declares, enabling
    /// spec §4.3's "verifies each action's declared parameters equal the capture
    /// signature" / property 8 check at bind time.
    pub fn register_checked(
        &mut self,
        name: impl Into<Rc<str>>,
        params: impl IntoIterator<Item = impl Into<Rc<str>>>,
        action: impl Fn(&[Capture<D, A>]) -> Result<A, ActionError> + 'static,
    ) -> &mut Self {
        let name = name.into();
        self.declared
            .insert(name.clone(), params.into_iter().map(Into::into).collect());
        self.actions.insert(name, Rc::new(action));
        self
    }
}

/// Verify spec §4.1's "in a `Choice`, every alternative must declare the same set
/// of capture names" (property 7), across every `Choice` clause reachable from
/// `rules`, including through `Reference`s (so indirection doesn't hide a
/// mismatch).
pub fn verify_choice_captures<D: crate::clause::ClauseValue>(
    rules: &[(Rc<str>, Rc<Clause<D>>)],
) -> Result<(), BindError> {
    fn walk<D: crate::clause::ClauseValue>(clause: &Rc<Clause<D>>) -> Result<(), BindError> {
        match &**clause {
            Clause::Choice(children) => {
                let mut children_iter = children.iter();
                if let Some(first) = children_iter.next() {
                    let expected = first.capture_signature();
                    for other in children_iter {
                        let actual = other.capture_signature();
                        if actual != expected {
                            return Err(BindError::CaptureSignatureMismatch {
                                first: expected.into_iter().collect(),
                                other: actual.into_iter().collect(),
                            });
                        }
                    }
                }
                children.iter().try_for_each(walk)
            }
            Clause::Sequence(children) | Clause::Entail(children) => {
                children.iter().try_for_each(walk)
            }
            Clause::Repeat(child)
            | Clause::Not(child)
            | Clause::And(child)
            | Clause::Capture(child, _, _)
            | Clause::Transform(child, _) => walk(child),
            Clause::Value(_)
            | Clause::Range(_, _)
            | Clause::Empty
            | Clause::Any(_)
            | Clause::Reference(_) => Ok(()),
        }
    }
    rules.iter().try_for_each(|(_, body)| walk(body))
}

/// Verify spec §4.3's action/capture-signature agreement (property 8) for every
/// `Transform` reachable from `rules`, against actions registered with
/// [`ActionTable::register_checked`].
pub fn verify_action_signatures<D: crate::clause::ClauseValue, A>(
    rules: &[(Rc<str>, Rc<Clause<D>>)],
    actions: &ActionTable<D, A>,
) -> Result<(), BindError> {
    fn walk<D: crate::clause::ClauseValue, A>(
        clause: &Rc<Clause<D>>,
        actions: &ActionTable<D, A>,
    ) -> Result<(), BindError> {
        match &**clause {
            Clause::Transform(child, action_name) => {
                if !actions.contains(action_name) {
                    return Err(BindError::UnknownAction(action_name.clone()));
                }
                if let Some(declared) = actions.declared_params(action_name) {
                    let actual: HashSet<Rc<str>> = child.capture_signature();
                    let declared_set: HashSet<Rc<str>> = declared.iter().cloned().collect();
                    if actual != declared_set {
                        return Err(BindError::ActionSignatureMismatch {
                            action: action_name.clone(),
                            declared: declared.to_vec(),
                            actual: actual.into_iter().collect(),
                        });
                    }
                }
                walk(child, actions)
            }
            Clause::Sequence(children) | Clause::Entail(children) | Clause::Choice(children) => {
                children.iter().try_for_each(|c| walk(c, actions))
            }
            Clause::Repeat(child) | Clause::Not(child) | Clause::And(child) => walk(child, actions),
            Clause::Capture(child, _, _) => walk(child, actions),
            Clause::Value(_) | Clause::Range(_, _) | Clause::Empty | Clause::Any(_) | Clause::Reference(_) => {
                Ok(())
            }
        }
    }
    rules.iter().try_for_each(|(_, body)| walk(body, actions))
}

/// Verify spec §3 invariant 4: every `Reference` resolves to a rule bound in the
/// grammar.
pub fn verify_references_resolve<D: crate::clause::ClauseValue>(
    rules: &[(Rc<str>, Rc<Clause<D>>)],
) -> Result<(), BindError> {
    let names: HashSet<&str> = rules.iter().map(|(name, _)| name.as_ref()).collect();
    fn walk<'a, D: crate::clause::ClauseValue>(
        clause: &'a Rc<Clause<D>>,
        names: &HashSet<&str>,
    ) -> Result<(), BindError> {
        match &**clause {
            Clause::Reference(name) => {
                if names.contains(name.as_ref()) {
                    Ok(())
                } else {
                    Err(BindError::UnresolvedReference(name.clone()))
                }
            }
            Clause::Sequence(children) | Clause::Entail(children) | Clause::Choice(children) => {
                children.iter().try_for_each(|c| walk(c, names))
            }
            Clause::Repeat(child)
            | Clause::Not(child)
            | Clause::And(child)
            | Clause::Capture(child, _, _)
            | Clause::Transform(child, _) => walk(child, names),
            Clause::Value(_) | Clause::Range(_, _) | Clause::Empty | Clause::Any(_) => Ok(()),
        }
    }
    rules.iter().try_for_each(|(_, body)| walk(body, &names))
}

/// Compute the set of rule names that can match zero-length input, by fixpoint
/// over [`Clause::can_match_empty`] (spec §3 invariant 2, checked grammar-wide
/// since a `Repeat(Reference(name))` can only be judged once `name`'s nullability
/// is known). Also used to reject `Repeat` of a nullable rule (property 2 sibling
/// check, spec §7 "Domain-validation error").
pub fn nullable_rules<D: crate::clause::ClauseValue>(
    rules: &[(Rc<str>, Rc<Clause<D>>)],
) -> HashSet<Rc<str>> {
    let mut nullable: HashSet<Rc<str>> = HashSet::new();
    loop {
        let mut grew = false;
        for (name, body) in rules {
            if !nullable.contains(name) && body.can_match_empty(&nullable) {
                nullable.insert(name.clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    nullable
}

/// Check every `Repeat` clause against the grammar's nullable-rule set.
pub fn verify_no_repeat_of_nullable<D: crate::clause::ClauseValue>(
    rules: &[(Rc<str>, Rc<Clause<D>>)],
    nullable: &HashSet<Rc<str>>,
) -> Result<(), BindError> {
    fn walk<D: crate::clause::ClauseValue>(
        clause: &Rc<Clause<D>>,
        nullable: &HashSet<Rc<str>>,
        in_rule: &Rc<str>,
    ) -> Result<(), BindError> {
        match &**clause {
            Clause::Repeat(child) => {
                if child.can_match_empty(nullable) {
                    return Err(BindError::RepeatOfNullableRule(in_rule.clone()));
                }
                walk(child, nullable, in_rule)
            }
            Clause::Sequence(children) | Clause::Entail(children) | Clause::Choice(children) => {
                children.iter().try_for_each(|c| walk(c, nullable, in_rule))
            }
            Clause::Not(child) | Clause::And(child) | Clause::Capture(child, _, _) | Clause::Transform(child, _) => {
                walk(child, nullable, in_rule)
            }
            Clause::Value(_) | Clause::Range(_, _) | Clause::Empty | Clause::Any(_) | Clause::Reference(_) => Ok(()),
        }
    }
    rules
        .iter()
        .try_for_each(|(name, body)| walk(body, nullable, name))
}

/// Build the capture-value map a `Transform`'s action sees from the ordered
/// captures its child produced.
pub fn capture_value<'a, D: crate::clause::ClauseValue, A>(
    captures: &'a [Capture<D, A>],
    name: &str,
) -> Option<&'a Value<D, A>> {
    captures
        .iter()
        .find(|(capture_name, _)| capture_name.as_ref() == name)
        .map(|(_, value)| value)
}
