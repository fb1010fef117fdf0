//! Dynamic proxies: stand-in objects that route calls into a [`Mock`].
//!
//! A [`Mockable`] type describes its members through a [`TypeDescriptor`] and
//! knows how to build itself around a [`Dispatcher`]. [`DynamicMock`] pairs
//! such a type with a private `Mock` engine, validates every registration
//! against the descriptor, and hands out the proxy instance on demand.
//!
//! `#[mockable]` generates the `Mockable` impl for traits. Anything else can
//! implement it by hand:
//!
//! ```
//! use standin::{args, Dispatcher, DynamicMock, MemberInfo, Mockable, TypeDescriptor, Value};
//!
//! #[derive(Debug)]
//! struct Clock {
//!     dispatcher: Dispatcher,
//! }
//!
//! impl Clock {
//!     fn now(&self) -> i64 {
//!         self.dispatcher
//!             .dispatch("now", &mut Vec::new())
//!             .ok()
//!             .and_then(|v| v.as_i64())
//!             .unwrap_or_default()
//!     }
//! }
//!
//! impl Mockable for Clock {
//!     fn descriptor() -> TypeDescriptor {
//!         TypeDescriptor::interface("Clock").member(MemberInfo::method("now").returns("i64"))
//!     }
//!
//!     fn instantiate(dispatcher: Dispatcher) -> Self {
//!         Self { dispatcher }
//!     }
//! }
//!
//! let clock = DynamicMock::<Clock>::new();
//! clock.expect_and_return("now", 1_700_000_000, args![]).unwrap();
//! assert_eq!(clock.mock_instance().unwrap().now(), 1_700_000_000);
//! clock.verify().unwrap();
//! ```

mod cache;
mod descriptor;
mod dispatch;
#[doc(hidden)]
pub mod support;

pub use cache::{ProxyType, ProxyTypeCache};
pub use descriptor::{MemberInfo, MemberKind, ParamInfo, ParamMode, TypeDescriptor, TypeKind, TypeName};
pub use dispatch::{from_fn, Dispatcher, FromFn, Interceptor, Invocation};
pub use support::catch_failure;

use crate::args::Args;
use crate::mock::{Mock, OutValues};
use crate::result::{Exception, MockError, MockResult};
use crate::value::Value;
use std::cell::{OnceCell, Ref, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A type a proxy can be generated for
pub trait Mockable: Sized + 'static {
    /// Members and construction of the type
    fn descriptor() -> TypeDescriptor;

    /// Build a proxy instance forwarding every call through `dispatcher`
    fn instantiate(dispatcher: Dispatcher) -> Self;
}

/// Stand-in for `M` backed by its own expectation engine
pub struct DynamicMock<M: Mockable> {
    mock: Rc<RefCell<Mock>>,
    interceptor: Rc<dyn Interceptor>,
    proxy: Arc<ProxyType>,
    ignored: Rc<RefCell<BTreeSet<String>>>,
    instance: OnceCell<M>,
}

impl<M: Mockable> fmt::Debug for DynamicMock<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicMock")
            .field("mock", &self.mock.borrow())
            .field("proxy", &self.proxy.name())
            .field("ignored", &self.ignored.borrow())
            .field("instantiated", &self.instance.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<M: Mockable> Default for DynamicMock<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Mockable> DynamicMock<M> {
    /// Create a stand-in named `"Mock" + type name`
    #[must_use]
    pub fn new() -> Self {
        let proxy = ProxyTypeCache::global().get_or_generate::<M>();
        let name = format!("Mock{}", proxy.name());
        Self::from_proxy(proxy, name)
    }

    /// Create a stand-in with an explicit name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_proxy(ProxyTypeCache::global().get_or_generate::<M>(), name.into())
    }

    /// Create a stand-in whose proxy type comes from `cache`
    #[must_use]
    pub fn with_cache(cache: &ProxyTypeCache, name: Option<&str>) -> Self {
        let proxy = cache.get_or_generate::<M>();
        let name = name.map_or_else(|| format!("Mock{}", proxy.name()), ToString::to_string);
        Self::from_proxy(proxy, name)
    }

    fn from_proxy(proxy: Arc<ProxyType>, name: String) -> Self {
        let mock = Rc::new(RefCell::new(Mock::new(name)));
        Self {
            interceptor: mock.clone(),
            mock,
            proxy,
            ignored: Rc::default(),
            instance: OnceCell::new(),
        }
    }

    /// Route calls through `interceptor` instead of the expectation engine.
    ///
    /// Registrations are still validated and recorded, but calls never reach
    /// them.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptor = Rc::new(interceptor);
        self.instance = OnceCell::new();
        self
    }

    /// Stand-in name used in diagnostics
    #[must_use]
    pub fn name(&self) -> String {
        self.mock.borrow().name().to_string()
    }

    /// Interception table for `M`
    #[must_use]
    pub fn proxy_type(&self) -> &ProxyType {
        &self.proxy
    }

    /// The underlying engine, for inspection
    #[must_use]
    pub fn mock(&self) -> Ref<'_, Mock> {
        self.mock.borrow()
    }

    /// Whether unexpected calls fail
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.mock.borrow().is_strict()
    }

    /// Toggle strict mode
    pub fn set_strict(&self, strict: bool) {
        self.mock.borrow_mut().set_strict(strict);
    }

    /// A dispatcher bound to this stand-in
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Rc::clone(&self.interceptor),
            Arc::clone(&self.proxy),
            Rc::clone(&self.ignored),
        )
    }

    /// The proxy instance, created on first access.
    ///
    /// # Errors
    ///
    /// `UnsupportedConstruction` when `M` is a class without a parameterless
    /// constructor.
    pub fn mock_instance(&self) -> MockResult<&M> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance);
        }
        self.check_constructible()?;
        Ok(self
            .instance
            .get_or_init(|| M::instantiate(self.dispatcher())))
    }

    /// A new owned proxy sharing this stand-in's engine, for code under test
    /// that takes ownership or needs `&mut self`
    ///
    /// # Errors
    ///
    /// `UnsupportedConstruction` as for [`DynamicMock::mock_instance`].
    pub fn new_instance(&self) -> MockResult<M> {
        self.check_constructible()?;
        Ok(M::instantiate(self.dispatcher()))
    }

    fn check_constructible(&self) -> MockResult<()> {
        if let TypeKind::Class {
            default_constructor: false,
        } = self.proxy.kind()
        {
            tracing::debug!(type_name = %self.proxy.name(), "no parameterless constructor");
            return Err(MockError::UnsupportedConstruction {
                type_name: self.proxy.name().to_string(),
            });
        }
        Ok(())
    }

    /// Let calls to `member` run its base body instead of the engine
    ///
    /// # Errors
    ///
    /// `MissingMethod`, `NotVirtual`, or `NoBaseImplementation` when no
    /// overload of `member` has a base body.
    pub fn ignore(&self, member: &str) -> MockResult<()> {
        let candidates = self.overridable(member, None)?;
        if !candidates.iter().any(|m| m.has_base) {
            return Err(MockError::NoBaseImplementation {
                name: member.to_string(),
            });
        }
        tracing::debug!(mock = %self.name(), member, "ignored member");
        self.ignored.borrow_mut().insert(member.to_string());
        Ok(())
    }

    /// Overridable members named `name` with `arity` parameters.
    ///
    /// A member whose every candidate is sealed yields `NotVirtual`.
    fn overridable(&self, name: &str, arity: Option<usize>) -> MockResult<Vec<&MemberInfo>> {
        let missing = || MockError::MissingMethod {
            name: name.to_string(),
        };
        let named: Vec<&MemberInfo> = self.proxy.visible(name).collect();
        if named.is_empty() {
            return Err(missing());
        }
        let shaped: Vec<&MemberInfo> = match arity {
            Some(count) => named
                .into_iter()
                .filter(|m| m.params.len() == count)
                .collect(),
            None => named,
        };
        let Some(first) = shaped.first() else {
            return Err(missing());
        };
        let open: Vec<&MemberInfo> = shaped.iter().copied().filter(|m| m.overridable).collect();
        if open.is_empty() {
            return Err(MockError::NotVirtual {
                label: first.kind.label().to_string(),
                name: name.to_string(),
            });
        }
        Ok(open)
    }

    fn check_return(&self, name: &str, candidates: &[&MemberInfo], value: &Value) -> MockResult<()> {
        if candidates.iter().any(|m| m.returns.accepts(value)) {
            return Ok(());
        }
        let declared = candidates
            .first()
            .map(|m| m.returns.to_string())
            .unwrap_or_default();
        Err(MockError::WrongReturnType {
            name: name.to_string(),
            declared,
        })
    }

    fn validate(&self, method: &str, args: &Args, value: Option<&Value>) -> MockResult<()> {
        let candidates = self.overridable(method, args.arity())?;
        match value {
            Some(value) => self.check_return(method, &candidates, value),
            None => Ok(()),
        }
    }

    /// Expect one call
    pub fn expect(&self, method: &str, args: impl Into<Args>) -> MockResult<()> {
        self.expect_times(1, method, args)
    }

    /// Expect `count` calls
    pub fn expect_times(&self, count: usize, method: &str, args: impl Into<Args>) -> MockResult<()> {
        let args = args.into();
        self.validate(method, &args, None)?;
        self.mock.borrow_mut().expect_times(count, method, args);
        Ok(())
    }

    /// Expect one call returning `value`
    pub fn expect_and_return(
        &self,
        method: &str,
        value: impl Into<Value>,
        args: impl Into<Args>,
    ) -> MockResult<()> {
        self.expect_and_return_times(1, method, value, args)
    }

    /// Expect `count` calls returning `value`
    pub fn expect_and_return_times(
        &self,
        count: usize,
        method: &str,
        value: impl Into<Value>,
        args: impl Into<Args>,
    ) -> MockResult<()> {
        let (value, args) = (value.into(), args.into());
        self.validate(method, &args, Some(&value))?;
        self.mock
            .borrow_mut()
            .expect_and_return_times(count, method, value, args);
        Ok(())
    }

    /// Expect one call failing with `exception`
    pub fn expect_and_throw(
        &self,
        method: &str,
        exception: Exception,
        args: impl Into<Args>,
    ) -> MockResult<()> {
        self.expect_and_throw_times(1, method, exception, args)
    }

    /// Expect `count` calls failing with `exception`
    pub fn expect_and_throw_times(
        &self,
        count: usize,
        method: &str,
        exception: Exception,
        args: impl Into<Args>,
    ) -> MockResult<()> {
        let args = args.into();
        self.validate(method, &args, None)?;
        self.mock
            .borrow_mut()
            .expect_and_throw_times(count, method, exception, args);
        Ok(())
    }

    /// Expect one call writing `out` into its output arguments.
    ///
    /// With a signature, the overload whose parameter types match is
    /// targeted; each registration answers exactly one call, oldest first.
    pub fn expect_and_return_out(
        &self,
        method: &str,
        value: impl Into<Value>,
        out: OutValues,
        args: impl Into<Args>,
    ) -> MockResult<()> {
        let (value, args) = (value.into(), args.into());
        let mut candidates = self.overridable(method, args.arity())?;
        if let Some(signature) = out.signature() {
            candidates.retain(|m| m.param_types().eq(signature.iter()));
            if candidates.is_empty() {
                return Err(MockError::MissingMethod {
                    name: method.to_string(),
                });
            }
        }
        self.check_return(method, &candidates, &value)?;
        self.mock
            .borrow_mut()
            .expect_and_return_out(method, value, out, args);
        Ok(())
    }

    /// Any call to `method` fails
    pub fn expect_no_call(&self, method: &str) -> MockResult<()> {
        self.overridable(method, None)?;
        self.mock.borrow_mut().expect_no_call(method);
        Ok(())
    }

    /// Answer unmatched calls to `method` with `value`
    pub fn setup_result(&self, method: &str, value: impl Into<Value>) -> MockResult<()> {
        let value = value.into();
        self.validate(method, &Args::any(), Some(&value))?;
        self.mock.borrow_mut().setup_result(method, value);
        Ok(())
    }

    /// Append `value` to `method`'s round-robin answers
    pub fn setup_result_in_order(&self, method: &str, value: impl Into<Value>) -> MockResult<()> {
        self.setup_result_in_order_times(method, value, 1)
    }

    /// Append `value`, repeated `count` times, to `method`'s round-robin answers
    pub fn setup_result_in_order_times(
        &self,
        method: &str,
        value: impl Into<Value>,
        count: usize,
    ) -> MockResult<()> {
        let value = value.into();
        self.validate(method, &Args::any(), Some(&value))?;
        self.mock
            .borrow_mut()
            .setup_result_in_order_times(method, value, count);
        Ok(())
    }

    /// Answer calls to `method` whose arguments equal `key`
    pub fn setup_result_for_params(
        &self,
        method: &str,
        value: impl Into<Value>,
        key: Vec<Value>,
    ) -> MockResult<()> {
        let value = value.into();
        let candidates = self.overridable(method, Some(key.len()))?;
        self.check_return(method, &candidates, &value)?;
        self.mock
            .borrow_mut()
            .setup_result_for_params(method, value, key);
        Ok(())
    }

    /// Call `method` through the proxy's dispatcher.
    ///
    /// # Errors
    ///
    /// `IgnoredMember` when `method` was passed to [`DynamicMock::ignore`];
    /// base bodies live on the proxy instance, so call it there.
    pub fn call(&self, method: &str, mut args: Vec<Value>) -> MockResult<Value> {
        let dispatcher = self.dispatcher();
        if dispatcher.is_ignored(method) {
            return Err(MockError::IgnoredMember {
                name: method.to_string(),
            });
        }
        dispatcher.dispatch(method, &mut args)
    }

    /// Check that every expected call happened
    pub fn verify(&self) -> MockResult<()> {
        self.mock.borrow().verify()
    }
}
