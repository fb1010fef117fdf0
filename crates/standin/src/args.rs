//! Expected-argument lists.
//!
//! Registration methods take [`Args`]: either a wildcard ([`Args::any`]) that
//! accepts any argument count and values, or an explicit list built with the
//! [`args!`](crate::args) macro where each entry is a literal or a constraint.

use crate::constraint::{
    And, Collect, Constraint, Contains, IsAnything, IsCloseTo, IsEqual, IsEqualIgnoreCase,
    IsEqualIgnoreWhiteSpace, IsIn, IsMatch, IsNull, IsTypeOf, Not, NotEqual, NotIn, NotNull, Or,
    Predicate, PropertyIs, StartsWith,
};
use crate::value::{ObjectRef, Value};
use std::fmt;
use std::rc::Rc;

/// One expected argument: a literal to compare against, or a constraint
pub enum Arg {
    /// Literal; `Null` matches anything, other values match by equality
    Value(Value),
    /// Explicit constraint
    Constraint(Box<dyn Constraint>),
}

impl Arg {
    /// Wrap a caller-defined constraint
    #[must_use]
    pub fn constraint(constraint: impl Constraint + 'static) -> Self {
        Self::Constraint(Box::new(constraint))
    }

    /// Resolve to the constraint used for matching
    #[must_use]
    pub fn into_constraint(self) -> Box<dyn Constraint> {
        match self {
            Self::Value(Value::Null) => Box::new(IsAnything),
            Self::Value(value) => Box::new(IsEqual::new(value)),
            Self::Constraint(constraint) => constraint,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Constraint(constraint) => f
                .debug_tuple("Constraint")
                .field(&constraint.description())
                .finish(),
        }
    }
}

macro_rules! impl_arg_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(v: $t) -> Self {
                    Self::Value(Value::from(v))
                }
            }
        )*
    };
}

impl_arg_from_value!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, char, String, (),
    ObjectRef
);

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Self::Value(Value::from(v))
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Self::Value(Value::from(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(v: Vec<T>) -> Self {
        Self::Value(Value::from(v))
    }
}

macro_rules! impl_arg_from_constraint {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(c: $t) -> Self {
                    Self::Constraint(Box::new(c))
                }
            }
        )*
    };
}

impl_arg_from_constraint!(
    IsAnything,
    IsNull,
    NotNull,
    IsEqual,
    NotEqual,
    IsIn,
    NotIn,
    IsEqualIgnoreCase,
    IsEqualIgnoreWhiteSpace,
    IsMatch,
    IsTypeOf,
    IsCloseTo,
    StartsWith,
    Contains,
    PropertyIs,
    Not,
    And,
    Or,
    Predicate,
    Collect,
    Rc<dyn Constraint>
);

impl From<Box<dyn Constraint>> for Arg {
    fn from(c: Box<dyn Constraint>) -> Self {
        Self::Constraint(c)
    }
}

/// Expected argument list of an expectation
#[derive(Debug)]
pub enum Args {
    /// Any argument count and values
    Any,
    /// Exactly these arguments, position by position
    Exact(Vec<Arg>),
}

impl Args {
    /// Wildcard: any argument count and values
    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    /// No arguments at all
    #[must_use]
    pub const fn none() -> Self {
        Self::Exact(Vec::new())
    }

    /// Expected argument count, `None` for the wildcard
    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Any => None,
            Self::Exact(args) => Some(args.len()),
        }
    }

    pub(crate) fn into_matcher(self) -> ArgMatcher {
        match self {
            Self::Any => ArgMatcher::Any,
            Self::Exact(args) => {
                ArgMatcher::Exact(args.into_iter().map(Arg::into_constraint).collect())
            }
        }
    }
}

impl From<Vec<Arg>> for Args {
    fn from(args: Vec<Arg>) -> Self {
        Self::Exact(args)
    }
}

/// Why a call's arguments were rejected by one expectation
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mismatch {
    /// Different argument count
    Arity { expected: usize, actual: usize },
    /// Constraint at `index` (0-based) rejected `actual`
    Parameter {
        index: usize,
        description: String,
        actual: Value,
    },
}

/// Resolved constraints of one expectation
#[derive(Debug)]
pub(crate) enum ArgMatcher {
    Any,
    Exact(Vec<Box<dyn Constraint>>),
}

impl ArgMatcher {
    pub(crate) fn arity(&self) -> Option<usize> {
        match self {
            Self::Any => None,
            Self::Exact(constraints) => Some(constraints.len()),
        }
    }

    pub(crate) fn check(&self, args: &[Value]) -> Result<(), Mismatch> {
        let Self::Exact(constraints) = self else {
            return Ok(());
        };
        if constraints.len() != args.len() {
            return Err(Mismatch::Arity {
                expected: constraints.len(),
                actual: args.len(),
            });
        }
        for (index, (constraint, arg)) in constraints.iter().zip(args).enumerate() {
            if !constraint.matches(arg) {
                return Err(Mismatch::Parameter {
                    index,
                    description: constraint.description(),
                    actual: arg.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Build an explicit [`Args`] list from literals and constraints
///
/// ```
/// use standin::{args, IsAnything};
///
/// let expected = args!["hello", IsAnything];
/// assert_eq!(expected.arity(), Some(2));
/// assert_eq!(args![].arity(), Some(0));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Args::none()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Args::from(::std::vec![$($crate::Arg::from($arg)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vals;

    #[test]
    fn test_null_literal_wraps_to_anything() {
        let constraint = Arg::from(Value::Null).into_constraint();
        assert!(constraint.matches(&Value::from("whatever")));
        assert_eq!(constraint.description(), "ANYTHING");
    }

    #[test]
    fn test_literal_wraps_to_equality() {
        let constraint = Arg::from("abc").into_constraint();
        assert!(constraint.matches(&Value::from("abc")));
        assert!(!constraint.matches(&Value::from("abd")));
        assert_eq!(constraint.description(), "<abc>");
    }

    #[test]
    fn test_none_option_wraps_to_anything() {
        let constraint = Arg::from(None::<String>).into_constraint();
        assert!(constraint.matches(&Value::from(1)));
    }

    #[test]
    fn test_custom_constraint() {
        let arg = Arg::constraint(Predicate::new("positive", |v| {
            v.as_i64().is_some_and(|i| i > 0)
        }));
        let constraint = arg.into_constraint();
        assert!(constraint.matches(&Value::from(3)));
        assert!(!constraint.matches(&Value::from(-3)));
    }

    #[test]
    fn test_wildcard_matches_any_arity() {
        let matcher = Args::any().into_matcher();
        assert_eq!(matcher.arity(), None);
        assert_eq!(matcher.check(&[]), Ok(()));
        assert_eq!(matcher.check(&vals![1, 2, 3]), Ok(()));
    }

    #[test]
    fn test_arity_mismatch() {
        let matcher = args!["a"].into_matcher();
        assert_eq!(
            matcher.check(&vals!["a", "b"]),
            Err(Mismatch::Arity {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_parameter_mismatch_reports_first_failure() {
        let matcher = args!["hello", IsAnything, 3].into_matcher();
        assert_eq!(matcher.check(&vals!["hello", Value::Null, 3]), Ok(()));
        assert_eq!(
            matcher.check(&vals!["world", Value::Null, 4]),
            Err(Mismatch::Parameter {
                index: 0,
                description: "<hello>".to_string(),
                actual: Value::from("world"),
            })
        );
    }
}
