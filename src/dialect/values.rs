//! [`BootValue`]: the dynamic value every bootstrap/dialect action produces or
//! consumes, plus the accessors that pull a typed value back out of a
//! [`Value`]/[`Capture`]. Grounded on `apegs/boot.py`'s `apegs_globals` (a
//! name -> clause-constructor map used as the bootstrap action namespace) and
//! on `apegs/interpret.py`'s untyped capture values — Rust needs a concrete
//! sum type where Python just passed objects around.

use std::rc::Rc;

use crate::clause::Clause;
use crate::error::ActionError;
use crate::matching::{Capture, Value};
use crate::{Grammar, Rule};

/// Everything a grammar-building action (§4.5/§6) can produce: a clause under
/// construction, a finished rule or grammar, a bare piece of text (an
/// identifier or an action body), or a flag (e.g. `variadic`).
#[derive(Clone, Debug)]
pub enum BootValue {
    Clause(Rc<Clause<String>>),
    Rule(Rule<String>),
    Grammar(Grammar<String>),
    Text(String),
    Bool(bool),
}

fn action_error(action: &str, message: impl Into<String>) -> ActionError {
    ActionError {
        action: action.into(),
        message: message.into(),
    }
}

/// Find a named capture, the way `boot.py`'s actions take captures as keyword
/// arguments.
pub fn find<'a>(
    captures: &'a [Capture<String, BootValue>],
    name: &str,
) -> Result<&'a Value<String, BootValue>, ActionError> {
    crate::action::capture_value(captures, name)
        .ok_or_else(|| action_error(name, format!("capture {name:?} missing")))
}

/// The raw slice an uncaptured terminal produced (spec §4.2 Capture rule: "if
/// `c` produced no results, the value is the literal input slice").
pub fn raw(action: &str, value: &Value<String, BootValue>) -> Result<String, ActionError> {
    match value {
        Value::Raw(s) => Ok(s.clone()),
        _ => Err(action_error(action, "expected a raw captured slice")),
    }
}

/// Unwrap a single [`BootValue`] out of a transform-produced capture.
pub fn boot(action: &str, value: &Value<String, BootValue>) -> Result<BootValue, ActionError> {
    match value {
        Value::Action(v) => Ok((**v).clone()),
        _ => Err(action_error(action, "expected a transformed value")),
    }
}

pub fn clause_of(action: &str, value: &Value<String, BootValue>) -> Result<Rc<Clause<String>>, ActionError> {
    match boot(action, value)? {
        BootValue::Clause(c) => Ok(c),
        _ => Err(action_error(action, "expected a clause value")),
    }
}

pub fn text_of(action: &str, value: &Value<String, BootValue>) -> Result<String, ActionError> {
    match boot(action, value)? {
        BootValue::Text(s) => Ok(s),
        _ => Err(action_error(action, "expected a text value")),
    }
}

pub fn bool_of(action: &str, value: &Value<String, BootValue>) -> Result<bool, ActionError> {
    match boot(action, value)? {
        BootValue::Bool(b) => Ok(b),
        _ => Err(action_error(action, "expected a bool value")),
    }
}

pub fn rule_of(action: &str, value: &Value<String, BootValue>) -> Result<Rule<String>, ActionError> {
    match boot(action, value)? {
        BootValue::Rule(r) => Ok(r),
        _ => Err(action_error(action, "expected a rule value")),
    }
}

/// Unwrap the ordered list a variadic capture produced (spec §4.2): each
/// element is itself one transform's output, here always a `Rule`.
pub fn rules_of(action: &str, value: &Value<String, BootValue>) -> Result<Vec<Rule<String>>, ActionError> {
    match value {
        Value::List(items) => items.iter().map(|item| rule_of(action, item)).collect(),
        _ => Err(action_error(action, "expected a variadic list of rules")),
    }
}
