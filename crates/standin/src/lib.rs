//! Standin: Dynamic Test Doubles for Rust
//!
//! Standin records what a collaborator is expected to receive, answers calls
//! with canned results, and verifies afterwards that every expected call
//! happened.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    STANDIN Architecture                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐         │
//! │   │ #[mockable]│    │ Dispatcher │    │ Mock       │         │
//! │   │ proxy      │───►│ (variadic, │───►│ expectations│        │
//! │   │ instance   │    │  defaults) │    │ + stubs    │         │
//! │   └────────────┘    └────────────┘    └────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use standin::{mockable, DynamicMock, Value};
//!
//! #[mockable]
//! pub trait Greeter {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! fn welcome(greeter: &dyn Greeter) -> String {
//!     format!("{}!", greeter.greet("ada"))
//! }
//!
//! let greeter = DynamicMock::<MockGreeter>::new();
//! greeter
//!     .expect_and_return("greet", "hello ada", standin::args!["ada"])
//!     .unwrap();
//! assert_eq!(welcome(greeter.mock_instance().unwrap()), "hello ada!");
//! greeter.verify().unwrap();
//! ```
//!
//! Mocks are single-threaded. Drive each one from the thread that owns the
//! test.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

extern crate self as standin;

mod args;
mod constraint;
mod mock;
mod result;
mod value;

/// Proxy layer: descriptors, dispatch and the `DynamicMock` front end
pub mod proxy;

pub use args::{Arg, Args};
pub use constraint::{
    And, Collect, Constraint, Contains, IsAnything, IsCloseTo, IsEqual, IsEqualIgnoreCase,
    IsEqualIgnoreWhiteSpace, IsIn, IsMatch, IsNull, IsTypeOf, Not, NotEqual, NotIn, NotNull, Or,
    Predicate, PropertyIs, StartsWith,
};
pub use mock::{
    Expectation, Mock, MockConfig, OutValues, Outcome, RotatingQueue, StubBinding, StubTable,
};
pub use proxy::{
    catch_failure, from_fn, Dispatcher, DynamicMock, Interceptor, Invocation, MemberInfo,
    MemberKind, Mockable, ParamInfo, ParamMode, ProxyType, ProxyTypeCache, TypeDescriptor,
    TypeKind, TypeName,
};
pub use result::{Exception, MockError, MockResult, VerifyError};
pub use value::{ObjectRef, Value, ValueKind};

// Re-export the attribute macro when the `derive` feature is enabled
#[cfg(feature = "derive")]
pub use standin_derive::mockable;

/// Items used by `#[mockable]` expansions. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use crate::proxy::support::{completed, decode, encode, raise, returned, returned_result};
}

#[cfg(test)]
mod tests {
    use super::*;

    mod reexport_tests {
        use super::*;

        #[test]
        fn test_args_macro_builds_exact_list() {
            let expected = args!["a", IsAnything, 3];
            assert_eq!(expected.arity(), Some(3));
        }

        #[test]
        fn test_vals_macro() {
            assert_eq!(vals![1, "two"], vec![Value::from(1), Value::from("two")]);
            assert!(vals![].is_empty());
        }
    }

    #[cfg(feature = "derive")]
    mod derive_tests {
        use super::*;

        #[mockable]
        trait Counter {
            fn bump(&self, by: u32) -> u32;

            fn bump_twice(&self, by: u32) -> u32 {
                self.bump(by) + self.bump(by)
            }
        }

        #[test]
        fn test_macro_expands_inside_crate() {
            let counter = DynamicMock::<MockCounter>::new();
            counter.setup_result("bump", 2).unwrap();
            counter.ignore("bump_twice").unwrap();
            assert_eq!(counter.mock_instance().unwrap().bump_twice(5), 4);
        }
    }
}
