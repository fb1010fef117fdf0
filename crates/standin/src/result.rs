//! Result and error types for standin.

use crate::value::Value;
use thiserror::Error;

/// Result type for standin operations
pub type MockResult<T> = Result<T, MockError>;

/// Errors that can occur while arranging, invoking or verifying a mock
#[derive(Debug, Error)]
pub enum MockError {
    /// Expectation violated (invoke time or verify time)
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Canned exception bound with `expect_and_throw`
    #[error("{0}")]
    Raised(#[from] Exception),

    /// Member absent from the mocked type, or only reachable variadically
    #[error("method {name} not defined")]
    MissingMethod {
        /// Member name
        name: String,
    },

    /// Member exists but cannot be intercepted
    #[error("{label} {name} is not virtual")]
    NotVirtual {
        /// "Method" or "Property"
        label: String,
        /// Member name
        name: String,
    },

    /// Canned value cannot be returned by the member
    #[error("method {name} returns a {declared}")]
    WrongReturnType {
        /// Member name
        name: String,
        /// Declared return type
        declared: String,
    },

    /// Mocked class offers no parameterless constructor
    #[error("cannot create a stand-in for {type_name}: no parameterless constructor")]
    UnsupportedConstruction {
        /// Mocked type name
        type_name: String,
    },

    /// `ignore` on a member that has no base implementation to fall through to
    #[error("member {name} has no base implementation to fall through to")]
    NoBaseImplementation {
        /// Member name
        name: String,
    },

    /// Raw call to a member that runs its base body
    #[error("member {name} is ignored; its base body only runs through the proxy instance")]
    IgnoredMember {
        /// Member name
        name: String,
    },

    /// Value could not be converted
    #[error("value conversion failed: {message}")]
    Conversion {
        /// Error message
        message: String,
    },

    /// serde bridge error
    #[error("value conversion failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl MockError {
    /// The verification diagnostic, if this is one
    #[must_use]
    pub const fn as_verify(&self) -> Option<&VerifyError> {
        match self {
            Self::Verify(err) => Some(err),
            _ => None,
        }
    }

    /// The raised exception, if this is one
    #[must_use]
    pub const fn as_raised(&self) -> Option<&Exception> {
        match self {
            Self::Raised(exc) => Some(exc),
            _ => None,
        }
    }
}

/// Structured verification failure: what went wrong, what was expected,
/// what actually happened
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}\nexpected:<{expected}>\n but was:<{actual}>")]
pub struct VerifyError {
    /// Human-readable reason
    pub reason: String,
    /// Expected count, arity or constraint description
    pub expected: Value,
    /// Observed count, arity or argument
    pub actual: Value,
}

impl VerifyError {
    /// Create a new verification failure
    #[must_use]
    pub fn new(reason: impl Into<String>, expected: impl Into<Value>, actual: impl Into<Value>) -> Self {
        Self {
            reason: reason.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Canned error raised by a matching expectation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct Exception {
    /// Error category, e.g. `"IoError"`
    pub kind: String,
    /// Error message
    pub message: String,
}

impl Exception {
    /// Create a new exception
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
