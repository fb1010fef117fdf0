//! Call routing from a generated proxy into its interceptor.

use super::cache::ProxyType;
use super::descriptor::TypeName;
use crate::mock::Mock;
use crate::result::MockResult;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// One intercepted call
#[derive(Debug)]
pub struct Invocation<'a> {
    /// Member name
    pub member: &'a str,
    /// Arguments, variadic tail already collapsed; output positions are
    /// written back to the caller
    pub args: &'a mut [Value],
    /// Declared parameter types, empty for members the descriptor lacks
    pub arg_types: &'a [TypeName],
}

/// Low-level dispatch hook behind a proxy.
///
/// The default interceptor is the [`Mock`] engine. Supplying another one
/// through [`DynamicMock::with_interceptor`](crate::DynamicMock::with_interceptor)
/// bypasses expectations and stubs entirely.
pub trait Interceptor {
    /// Answer one call
    fn intercept(&self, invocation: &mut Invocation<'_>) -> MockResult<Value>;
}

impl Interceptor for RefCell<Mock> {
    fn intercept(&self, invocation: &mut Invocation<'_>) -> MockResult<Value> {
        self.borrow_mut().invoke(invocation.member, invocation.args)
    }
}

/// Interceptor backed by a closure, see [`from_fn`]
pub struct FromFn<F>(F);

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FromFn")
    }
}

impl<F> Interceptor for FromFn<F>
where
    F: Fn(&mut Invocation<'_>) -> MockResult<Value>,
{
    fn intercept(&self, invocation: &mut Invocation<'_>) -> MockResult<Value> {
        (self.0)(invocation)
    }
}

/// Wrap a closure as an [`Interceptor`]
pub const fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&mut Invocation<'_>) -> MockResult<Value>,
{
    FromFn(f)
}

/// Handle a proxy instance forwards its calls through
#[derive(Clone)]
pub struct Dispatcher {
    interceptor: Rc<dyn Interceptor>,
    proxy: Arc<ProxyType>,
    ignored: Rc<RefCell<BTreeSet<String>>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("proxy", &self.proxy.name())
            .field("ignored", &self.ignored.borrow())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub(crate) fn new(
        interceptor: Rc<dyn Interceptor>,
        proxy: Arc<ProxyType>,
        ignored: Rc<RefCell<BTreeSet<String>>>,
    ) -> Self {
        Self {
            interceptor,
            proxy,
            ignored,
        }
    }

    /// Proxy type this dispatcher serves
    #[must_use]
    pub fn proxy_type(&self) -> &ProxyType {
        &self.proxy
    }

    /// Whether calls to `member` should run the base body instead
    #[must_use]
    pub fn is_ignored(&self, member: &str) -> bool {
        self.ignored.borrow().contains(member)
    }

    /// Forward one call.
    ///
    /// Trailing variadic arguments are collapsed into a single `List` first.
    /// A `Null` answer becomes the declared return type's default value.
    pub fn dispatch(&self, member: &str, args: &mut Vec<Value>) -> MockResult<Value> {
        let info = self.proxy.resolve_call(member, args.len());
        if let Some(info) = info.filter(|info| info.is_variadic()) {
            let tail = args.split_off(info.fixed_arity());
            args.push(Value::List(tail));
        }
        let arg_types: Vec<TypeName> = info
            .map(|info| info.param_types().cloned().collect())
            .unwrap_or_default();

        let mut invocation = Invocation {
            member,
            args: args.as_mut_slice(),
            arg_types: &arg_types,
        };
        let result = self.interceptor.intercept(&mut invocation)?;
        tracing::trace!(proxy = %self.proxy.name(), member, "dispatched");

        match (result, info) {
            (Value::Null, Some(info)) => Ok(info.returns.default_value()),
            (result, _) => Ok(result),
        }
    }
}
