//! Registered expectations.

use crate::args::{ArgMatcher, Args, Mismatch};
use crate::proxy::TypeName;
use crate::result::{Exception, MockError, MockResult};
use crate::value::Value;

/// Values written back into output positions of a matching call.
///
/// The optional signature lists the parameter types of the targeted member;
/// proxies use it to pick between overloads and to validate the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutValues {
    signature: Option<Vec<TypeName>>,
    values: Vec<Option<Value>>,
}

impl OutValues {
    /// Empty payload without a signature
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty payload for a member with these parameter types
    #[must_use]
    pub fn with_signature<S: Into<TypeName>>(signature: impl IntoIterator<Item = S>) -> Self {
        Self {
            signature: Some(signature.into_iter().map(Into::into).collect()),
            values: Vec::new(),
        }
    }

    /// Write `value` into argument position `index` (0-based)
    #[must_use]
    pub fn set(mut self, index: usize, value: impl Into<Value>) -> Self {
        if self.values.len() <= index {
            self.values.resize(index + 1, None);
        }
        self.values[index] = Some(value.into());
        self
    }

    /// Declared parameter types, if any
    #[must_use]
    pub fn signature(&self) -> Option<&[TypeName]> {
        self.signature.as_deref()
    }

    /// Output positions and their values
    pub fn outputs(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_ref().map(|v| (index, v)))
    }

    fn write_into(&self, args: &mut [Value]) {
        for (index, value) in self.outputs() {
            if let Some(slot) = args.get_mut(index) {
                *slot = value.clone();
            }
        }
    }
}

/// What a matching call produces
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Return a value
    Return(Value),
    /// Fail with a canned exception
    Raise(Exception),
    /// Write output arguments, then return a value
    Out {
        /// Return value
        value: Value,
        /// Output payload
        out: OutValues,
    },
}

impl Outcome {
    /// The value this outcome returns, if it returns one
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Return(value) | Self::Out { value, .. } => Some(value),
            Self::Raise(_) => None,
        }
    }
}

/// "This method must be called `required` times with matching arguments"
#[derive(Debug)]
pub struct Expectation {
    method: String,
    args: ArgMatcher,
    required: usize,
    satisfied: usize,
    outcome: Outcome,
}

impl Expectation {
    pub(crate) fn new(method: &str, args: Args, required: usize, outcome: Outcome) -> Self {
        Self {
            method: method.to_string(),
            args: args.into_matcher(),
            required,
            satisfied: 0,
            outcome,
        }
    }

    /// Expected method name
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Calls required before verification passes
    #[must_use]
    pub const fn required(&self) -> usize {
        self.required
    }

    /// Matching calls seen so far
    #[must_use]
    pub const fn satisfied(&self) -> usize {
        self.satisfied
    }

    /// Whether further calls can still match
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.satisfied < self.required
    }

    /// Expected argument count, `None` for a wildcard
    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        self.args.arity()
    }

    /// Canned result
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub(crate) fn check(&self, args: &[Value]) -> Result<(), Mismatch> {
        self.args.check(args)
    }

    pub(crate) fn fulfil(&mut self, args: &mut [Value]) -> MockResult<Value> {
        debug_assert!(self.is_open());
        self.satisfied += 1;
        match &self.outcome {
            Outcome::Return(value) => Ok(value.clone()),
            Outcome::Raise(exception) => Err(MockError::Raised(exception.clone())),
            Outcome::Out { value, out } => {
                out.write_into(args);
                Ok(value.clone())
            }
        }
    }
}
