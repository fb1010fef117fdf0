//! The expectation/stub engine.
//!
//! A [`Mock`] holds an ordered list of expectations and a stub table. Calls are
//! routed through [`Mock::invoke`], which matches them against open
//! expectations first and falls back to stubs; [`Mock::verify`] then checks
//! that every expected call happened.
//!
//! A `Mock` is plain single-threaded state. Drive it from the thread that owns
//! the test.
//!
//! ## Example
//!
//! ```
//! use standin::{args, IsAnything, Mock, Value};
//!
//! let mut mock = Mock::new("greeter");
//! mock.expect_and_return("greet", "hi ada", args!["ada", IsAnything]);
//!
//! let answer = mock.call("greet", vec![Value::from("ada"), Value::Null]).unwrap();
//! assert_eq!(answer, Value::from("hi ada"));
//! mock.verify().unwrap();
//! ```

mod expectation;
mod stub;

pub use expectation::{Expectation, OutValues, Outcome};
pub use stub::{RotatingQueue, StubBinding, StubTable};

use crate::args::{Args, Mismatch};
use crate::result::{Exception, MockResult, VerifyError};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Construction-time settings for a [`Mock`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Name used as prefix in diagnostics
    pub name: String,
    /// Fail calls to methods that have neither expectations nor stubs
    pub strict: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "Mock".to_string(),
            strict: false,
        }
    }
}

impl MockConfig {
    /// Create a default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mock name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set strict mode
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Expectation and stub registry for one collaborator
#[derive(Debug)]
pub struct Mock {
    name: String,
    strict: bool,
    expectations: Vec<Expectation>,
    stubs: StubTable,
}

impl Default for Mock {
    fn default() -> Self {
        Self::with_config(MockConfig::default())
    }
}

impl Mock {
    /// Create a lenient mock
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(MockConfig::new().with_name(name))
    }

    /// Create a mock from a config
    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            name: config.name,
            strict: config.strict,
            expectations: Vec::new(),
            stubs: StubTable::default(),
        }
    }

    /// Mock name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether unexpected calls fail
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Toggle strict mode
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Registered expectations, in registration order
    #[must_use]
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    /// Expectations still waiting for calls
    pub fn pending(&self) -> impl Iterator<Item = &Expectation> {
        self.expectations.iter().filter(|e| e.is_open())
    }

    /// Whether `method` has a stub binding
    #[must_use]
    pub fn has_stub(&self, method: &str) -> bool {
        self.stubs.contains(method)
    }

    /// Stub bindings
    #[must_use]
    pub const fn stubs(&self) -> &StubTable {
        &self.stubs
    }

    fn register(&mut self, method: &str, args: Args, required: usize, outcome: Outcome) {
        tracing::debug!(
            mock = %self.name,
            method,
            required,
            arity = ?args.arity(),
            "registered expectation"
        );
        self.expectations
            .push(Expectation::new(method, args, required, outcome));
    }

    /// Expect one call
    pub fn expect(&mut self, method: &str, args: impl Into<Args>) {
        self.expect_times(1, method, args);
    }

    /// Expect `count` calls
    pub fn expect_times(&mut self, count: usize, method: &str, args: impl Into<Args>) {
        self.register(method, args.into(), count, Outcome::Return(Value::Null));
    }

    /// Expect one call returning `value`
    pub fn expect_and_return(&mut self, method: &str, value: impl Into<Value>, args: impl Into<Args>) {
        self.expect_and_return_times(1, method, value, args);
    }

    /// Expect `count` calls, each returning `value`
    pub fn expect_and_return_times(
        &mut self,
        count: usize,
        method: &str,
        value: impl Into<Value>,
        args: impl Into<Args>,
    ) {
        self.register(method, args.into(), count, Outcome::Return(value.into()));
    }

    /// Expect one call failing with `exception`
    pub fn expect_and_throw(&mut self, method: &str, exception: Exception, args: impl Into<Args>) {
        self.expect_and_throw_times(1, method, exception, args);
    }

    /// Expect `count` calls, each failing with `exception`
    pub fn expect_and_throw_times(
        &mut self,
        count: usize,
        method: &str,
        exception: Exception,
        args: impl Into<Args>,
    ) {
        self.register(method, args.into(), count, Outcome::Raise(exception));
    }

    /// Expect one call that writes `out` into its output arguments and
    /// returns `value`.
    ///
    /// Repeated registrations answer calls in FIFO order among those whose
    /// `args` accept the call. Register with [`Args::any`] to have each answer
    /// consumed by the next call whatever its input values; an explicit
    /// argument list also filters on those values.
    pub fn expect_and_return_out(
        &mut self,
        method: &str,
        value: impl Into<Value>,
        out: OutValues,
        args: impl Into<Args>,
    ) {
        let outcome = Outcome::Out {
            value: value.into(),
            out,
        };
        self.register(method, args.into(), 1, outcome);
    }

    /// Any call to `method` fails immediately
    pub fn expect_no_call(&mut self, method: &str) {
        self.register(method, Args::any(), 0, Outcome::Return(Value::Null));
    }

    /// Answer every otherwise unmatched call to `method` with `value`
    pub fn setup_result(&mut self, method: &str, value: impl Into<Value>) {
        tracing::debug!(mock = %self.name, method, "stubbed fixed result");
        self.stubs.set_fixed(method, value.into());
    }

    /// Append `value` to `method`'s round-robin answers
    pub fn setup_result_in_order(&mut self, method: &str, value: impl Into<Value>) {
        self.setup_result_in_order_times(method, value, 1);
    }

    /// Append `value`, repeated `count` times, to `method`'s round-robin answers
    pub fn setup_result_in_order_times(&mut self, method: &str, value: impl Into<Value>, count: usize) {
        tracing::debug!(mock = %self.name, method, count, "stubbed rotating result");
        self.stubs.push_in_order(method, value.into(), count);
    }

    /// Answer calls to `method` whose arguments equal `key` with `value`;
    /// other argument tuples get `Null`
    pub fn setup_result_for_params(&mut self, method: &str, value: impl Into<Value>, key: Vec<Value>) {
        tracing::debug!(mock = %self.name, method, arity = key.len(), "stubbed keyed result");
        self.stubs.set_for_params(method, key, value.into());
    }

    /// Convenience wrapper around [`Mock::invoke`] for owned arguments
    pub fn call(&mut self, method: &str, mut args: Vec<Value>) -> MockResult<Value> {
        self.invoke(method, &mut args)
    }

    /// Route one call through the registry.
    ///
    /// Output payloads of a matching expectation are written into `args`.
    ///
    /// # Errors
    ///
    /// `MockError::Raised` for a bound exception, `MockError::Verify` for an
    /// overflow, argument mismatch, no-call violation or strict-mode surprise.
    pub fn invoke(&mut self, method: &str, args: &mut [Value]) -> MockResult<Value> {
        let mut registered = false;
        let mut total_required = 0;
        let mut mismatches = Vec::new();

        for index in 0..self.expectations.len() {
            let expectation = &self.expectations[index];
            if expectation.method() != method {
                continue;
            }
            registered = true;
            total_required += expectation.required();
            if !expectation.is_open() {
                continue;
            }
            match expectation.check(args) {
                Ok(()) => {
                    tracing::trace!(mock = %self.name, method, index, "matched expectation");
                    return self.expectations[index].fulfil(args);
                }
                Err(mismatch) => mismatches.push(mismatch),
            }
        }

        if !registered {
            return self.unexpected(method, args);
        }

        if total_required == 0 {
            return Err(self.fail(VerifyError::new(
                format!("{}.{method}() called", self.name),
                0,
                1,
            )));
        }

        if let Some(value) = self.stubs.answer(method, args) {
            tracing::trace!(mock = %self.name, method, "expectations exhausted, answered by stub");
            return Ok(value);
        }

        if let Some(mismatch) = pick_mismatch(mismatches) {
            return Err(self.fail(mismatch_error(method, mismatch)));
        }

        Err(self.fail(VerifyError::new(
            format!("{method}() called too many times"),
            total_required,
            total_required + 1,
        )))
    }

    fn unexpected(&mut self, method: &str, args: &[Value]) -> MockResult<Value> {
        if let Some(value) = self.stubs.answer(method, args) {
            tracing::trace!(mock = %self.name, method, "answered by stub");
            return Ok(value);
        }
        if self.strict {
            return Err(self.fail(VerifyError::new(
                format!("{}.{method}() called", self.name),
                0,
                1,
            )));
        }
        tracing::trace!(mock = %self.name, method, "unexpected call ignored");
        Ok(Value::Null)
    }

    fn fail(&self, err: VerifyError) -> crate::MockError {
        tracing::debug!(mock = %self.name, reason = %err.reason, "verification failed");
        err.into()
    }

    /// Check that every expected call happened.
    ///
    /// Counts are aggregated per method name and reported in order of first
    /// registration.
    ///
    /// # Errors
    ///
    /// `MockError::Verify` for the first method that was never called or not
    /// called enough times.
    pub fn verify(&self) -> MockResult<()> {
        let mut checked: Vec<&str> = Vec::new();
        for expectation in &self.expectations {
            let method = expectation.method();
            if checked.contains(&method) {
                continue;
            }
            checked.push(method);

            let (required, satisfied) = self
                .expectations
                .iter()
                .filter(|e| e.method() == method)
                .fold((0, 0), |(r, s), e| (r + e.required(), s + e.satisfied()));
            if satisfied >= required {
                continue;
            }
            let reason = if satisfied == 0 {
                format!("{}.{method}() never called", self.name)
            } else {
                format!("{}.{method}() not called enough times", self.name)
            };
            return Err(self.fail(VerifyError::new(reason, required, satisfied)));
        }
        tracing::trace!(mock = %self.name, "verified");
        Ok(())
    }
}

/// Prefer a candidate whose arity matched (its constraint failure is the more
/// precise diagnostic); otherwise cite the first-registered candidate.
fn pick_mismatch(mismatches: Vec<Mismatch>) -> Option<Mismatch> {
    let first_parameter = mismatches
        .iter()
        .position(|m| matches!(m, Mismatch::Parameter { .. }));
    let mut mismatches = mismatches;
    match first_parameter {
        Some(index) => Some(mismatches.swap_remove(index)),
        None => mismatches.into_iter().next(),
    }
}

fn mismatch_error(method: &str, mismatch: Mismatch) -> VerifyError {
    match mismatch {
        Mismatch::Arity { expected, actual } => VerifyError::new(
            format!("{method}() called with incorrect number of parameters"),
            expected,
            actual,
        ),
        Mismatch::Parameter {
            index,
            description,
            actual,
        } => VerifyError::new(
            format!("{method}() called with incorrect parameter ({})", index + 1),
            description,
            actual,
        ),
    }
}
