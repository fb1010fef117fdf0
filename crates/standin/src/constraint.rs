//! Argument constraints.
//!
//! A [`Constraint`] is a single-argument predicate with a description used in
//! failure messages. Expectations hold one constraint per expected argument.
//! Raw literals passed where a constraint is expected are wrapped by
//! [`crate::Arg`]: `Null` becomes [`IsAnything`], anything else [`IsEqual`].

use crate::value::{Value, ValueKind};
use regex::Regex;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Predicate over one call argument
pub trait Constraint {
    /// Whether the argument satisfies this constraint
    fn matches(&self, value: &Value) -> bool;

    /// Human-readable description for diagnostics
    fn description(&self) -> String;
}

impl fmt::Debug for dyn Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({})", self.description())
    }
}

impl<C: Constraint + ?Sized> Constraint for Box<C> {
    fn matches(&self, value: &Value) -> bool {
        (**self).matches(value)
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

impl<C: Constraint + ?Sized> Constraint for Rc<C> {
    fn matches(&self, value: &Value) -> bool {
        (**self).matches(value)
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

/// Matches any value, including `Null`
#[derive(Debug, Clone, Copy, Default)]
pub struct IsAnything;

impl Constraint for IsAnything {
    fn matches(&self, _value: &Value) -> bool {
        true
    }

    fn description(&self) -> String {
        "ANYTHING".to_string()
    }
}

/// Matches only `Null`
#[derive(Debug, Clone, Copy, Default)]
pub struct IsNull;

impl Constraint for IsNull {
    fn matches(&self, value: &Value) -> bool {
        value.is_null()
    }

    fn description(&self) -> String {
        "null".to_string()
    }
}

/// Matches anything but `Null`
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNull;

impl Constraint for NotNull {
    fn matches(&self, value: &Value) -> bool {
        !value.is_null()
    }

    fn description(&self) -> String {
        "NOT null".to_string()
    }
}

/// Structural equality (identity for object references)
#[derive(Debug, Clone)]
pub struct IsEqual {
    expected: Value,
}

impl IsEqual {
    /// Match values equal to `expected`
    #[must_use]
    pub fn new(expected: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Constraint for IsEqual {
    fn matches(&self, value: &Value) -> bool {
        *value == self.expected
    }

    fn description(&self) -> String {
        format!("<{}>", self.expected)
    }
}

/// Inverse of [`IsEqual`]
#[derive(Debug, Clone)]
pub struct NotEqual {
    unexpected: Value,
}

impl NotEqual {
    /// Match values different from `unexpected`
    #[must_use]
    pub fn new(unexpected: impl Into<Value>) -> Self {
        Self {
            unexpected: unexpected.into(),
        }
    }
}

impl Constraint for NotEqual {
    fn matches(&self, value: &Value) -> bool {
        *value != self.unexpected
    }

    fn description(&self) -> String {
        format!("NOT <{}>", self.unexpected)
    }
}

/// Membership in a fixed set of values
#[derive(Debug, Clone)]
pub struct IsIn {
    candidates: Vec<Value>,
}

impl IsIn {
    /// Match any of `candidates`
    #[must_use]
    pub fn new<V: Into<Value>>(candidates: impl IntoIterator<Item = V>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

impl Constraint for IsIn {
    fn matches(&self, value: &Value) -> bool {
        self.candidates.contains(value)
    }

    fn description(&self) -> String {
        format!("IN {}", Value::List(self.candidates.clone()))
    }
}

/// Exclusion from a fixed set of values
#[derive(Debug, Clone)]
pub struct NotIn {
    excluded: Vec<Value>,
}

impl NotIn {
    /// Match anything outside `excluded`
    #[must_use]
    pub fn new<V: Into<Value>>(excluded: impl IntoIterator<Item = V>) -> Self {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }
}

impl Constraint for NotIn {
    fn matches(&self, value: &Value) -> bool {
        !self.excluded.contains(value)
    }

    fn description(&self) -> String {
        format!("NOT IN {}", Value::List(self.excluded.clone()))
    }
}

/// Case-insensitive string equality
#[derive(Debug, Clone)]
pub struct IsEqualIgnoreCase {
    expected: String,
}

impl IsEqualIgnoreCase {
    /// Match strings equal to `expected` ignoring case
    #[must_use]
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Constraint for IsEqualIgnoreCase {
    fn matches(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| s.to_lowercase() == self.expected.to_lowercase())
    }

    fn description(&self) -> String {
        format!("<{}> ignoring case", self.expected)
    }
}

/// String equality after collapsing whitespace runs and trimming
#[derive(Debug, Clone)]
pub struct IsEqualIgnoreWhiteSpace {
    expected: String,
}

impl IsEqualIgnoreWhiteSpace {
    /// Match strings equal to `expected` modulo whitespace
    #[must_use]
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Constraint for IsEqualIgnoreWhiteSpace {
    fn matches(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| squash_whitespace(s) == squash_whitespace(&self.expected))
    }

    fn description(&self) -> String {
        format!("<{}> ignoring whitespace", self.expected)
    }
}

/// Regular-expression match against a string argument
#[derive(Debug, Clone)]
pub struct IsMatch {
    pattern: Regex,
}

impl IsMatch {
    /// Compile `pattern`
    ///
    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Constraint for IsMatch {
    fn matches(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| self.pattern.is_match(s))
    }

    fn description(&self) -> String {
        format!("matching /{}/", self.pattern.as_str())
    }
}

/// Matches values of one [`ValueKind`]
#[derive(Debug, Clone, Copy)]
pub struct IsTypeOf {
    kind: ValueKind,
}

impl IsTypeOf {
    /// Match values of `kind`
    #[must_use]
    pub const fn new(kind: ValueKind) -> Self {
        Self { kind }
    }
}

impl Constraint for IsTypeOf {
    fn matches(&self, value: &Value) -> bool {
        value.kind() == self.kind
    }

    fn description(&self) -> String {
        format!("typeof <{}>", self.kind)
    }
}

/// Numeric value within `delta` of `expected`
#[derive(Debug, Clone, Copy)]
pub struct IsCloseTo {
    expected: f64,
    delta: f64,
}

impl IsCloseTo {
    /// Match numbers in `expected ± delta`
    #[must_use]
    pub const fn new(expected: f64, delta: f64) -> Self {
        Self { expected, delta }
    }
}

impl Constraint for IsCloseTo {
    fn matches(&self, value: &Value) -> bool {
        value
            .as_f64()
            .is_some_and(|v| (v - self.expected).abs() <= self.delta)
    }

    fn description(&self) -> String {
        format!("<{}> ± {}", self.expected, self.delta)
    }
}

/// String prefix
#[derive(Debug, Clone)]
pub struct StartsWith {
    prefix: String,
}

impl StartsWith {
    /// Match strings starting with `prefix`
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Constraint for StartsWith {
    fn matches(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| s.starts_with(&self.prefix))
    }

    fn description(&self) -> String {
        format!("starts with <{}>", self.prefix)
    }
}

/// Substring of a string, or element of a list
#[derive(Debug, Clone)]
pub struct Contains {
    needle: Value,
}

impl Contains {
    /// Match strings containing `needle` or lists holding it
    #[must_use]
    pub fn new(needle: impl Into<Value>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl Constraint for Contains {
    fn matches(&self, value: &Value) -> bool {
        match (value, &self.needle) {
            (Value::Str(haystack), Value::Str(needle)) => haystack.contains(needle.as_str()),
            (Value::List(items), needle) => items.contains(needle),
            _ => false,
        }
    }

    fn description(&self) -> String {
        format!("contains <{}>", self.needle)
    }
}

/// Applies a constraint to one field of a map argument
#[derive(Debug)]
pub struct PropertyIs {
    field: String,
    inner: Box<dyn Constraint>,
}

impl PropertyIs {
    /// Match maps whose `field` satisfies `inner`
    #[must_use]
    pub fn new(field: impl Into<String>, inner: impl Into<crate::Arg>) -> Self {
        Self {
            field: field.into(),
            inner: inner.into().into_constraint(),
        }
    }
}

impl Constraint for PropertyIs {
    fn matches(&self, value: &Value) -> bool {
        value
            .as_map()
            .and_then(|fields| fields.get(&self.field))
            .is_some_and(|field| self.inner.matches(field))
    }

    fn description(&self) -> String {
        format!("property {} is {}", self.field, self.inner.description())
    }
}

/// Logical negation
#[derive(Debug)]
pub struct Not {
    inner: Box<dyn Constraint>,
}

impl Not {
    /// Negate `inner`
    #[must_use]
    pub fn new(inner: impl Into<crate::Arg>) -> Self {
        Self {
            inner: inner.into().into_constraint(),
        }
    }
}

impl Constraint for Not {
    fn matches(&self, value: &Value) -> bool {
        !self.inner.matches(value)
    }

    fn description(&self) -> String {
        format!("NOT {}", self.inner.description())
    }
}

/// Both constraints hold
#[derive(Debug)]
pub struct And {
    left: Box<dyn Constraint>,
    right: Box<dyn Constraint>,
}

impl And {
    /// Conjunction of two constraints
    #[must_use]
    pub fn new(left: impl Into<crate::Arg>, right: impl Into<crate::Arg>) -> Self {
        Self {
            left: left.into().into_constraint(),
            right: right.into().into_constraint(),
        }
    }
}

impl Constraint for And {
    fn matches(&self, value: &Value) -> bool {
        self.left.matches(value) && self.right.matches(value)
    }

    fn description(&self) -> String {
        format!("({}) AND ({})", self.left.description(), self.right.description())
    }
}

/// Either constraint holds
#[derive(Debug)]
pub struct Or {
    left: Box<dyn Constraint>,
    right: Box<dyn Constraint>,
}

impl Or {
    /// Disjunction of two constraints
    #[must_use]
    pub fn new(left: impl Into<crate::Arg>, right: impl Into<crate::Arg>) -> Self {
        Self {
            left: left.into().into_constraint(),
            right: right.into().into_constraint(),
        }
    }
}

impl Constraint for Or {
    fn matches(&self, value: &Value) -> bool {
        self.left.matches(value) || self.right.matches(value)
    }

    fn description(&self) -> String {
        format!("({}) OR ({})", self.left.description(), self.right.description())
    }
}

/// Closure-backed constraint with an explicit description
pub struct Predicate {
    description: String,
    check: Box<dyn Fn(&Value) -> bool>,
}

impl Predicate {
    /// Wrap `check`, described as `description` in failures
    #[must_use]
    pub fn new(description: impl Into<String>, check: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            description: description.into(),
            check: Box::new(check),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Constraint for Predicate {
    fn matches(&self, value: &Value) -> bool {
        (self.check)(value)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Accepts every argument and remembers the last one it saw.
///
/// Clones share the captured slot, so keep one handle in the test and pass
/// another to the expectation.
#[derive(Debug, Clone, Default)]
pub struct Collect {
    captured: Rc<RefCell<Option<Value>>>,
}

impl Collect {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last argument seen, if any
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.captured.borrow().clone()
    }
}

impl Constraint for Collect {
    fn matches(&self, value: &Value) -> bool {
        *self.captured.borrow_mut() = Some(value.clone());
        true
    }

    fn description(&self) -> String {
        "ANYTHING (collected)".to_string()
    }
}
