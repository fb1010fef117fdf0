//! Failure surfacing for generated proxies.
//!
//! Trait methods have fixed signatures, so a proxy cannot hand a
//! [`MockError`] back through its return value. Instead it stores the error in
//! a thread-local slot and panics with the rendered message; the test fails
//! with a readable report, and [`catch_failure`] turns the unwind back into
//! the structured error.

use crate::result::{Exception, MockError, MockResult};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static PENDING: RefCell<Option<MockError>> = const { RefCell::new(None) };
}

/// Abort the current proxied call with `error`
pub fn raise(error: MockError) -> ! {
    let message = error.to_string();
    PENDING.with(|slot| *slot.borrow_mut() = Some(error));
    panic!("{message}")
}

/// Run `f`, converting a proxy failure raised inside it into `Err`.
///
/// Panics that did not come from a proxy keep unwinding.
pub fn catch_failure<T>(f: impl FnOnce() -> T) -> MockResult<T> {
    PENDING.with(|slot| slot.borrow_mut().take());
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Ok(value),
        Err(payload) => match PENDING.with(|slot| slot.borrow_mut().take()) {
            Some(error) => Err(error),
            None => panic::resume_unwind(payload),
        },
    }
}

/// Encode an argument, raising on values the bridge cannot carry
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Value {
    Value::encode(value).unwrap_or_else(|err| raise(err))
}

/// Decode a value, raising on a shape mismatch
pub fn decode<T: DeserializeOwned>(value: Value) -> T {
    value.decode().unwrap_or_else(|err| raise(err))
}

/// Unwrap a dispatch result for a plain return type
pub fn returned<T: DeserializeOwned>(result: MockResult<Value>) -> T {
    match result {
        Ok(value) => decode(value),
        Err(err) => raise(err),
    }
}

/// Unwrap a dispatch result for a `Result<T, E>` return type.
///
/// Bound exceptions become `Err(E::from(exception))`; every other failure
/// still unwinds.
pub fn returned_result<T, E>(result: MockResult<Value>) -> Result<T, E>
where
    T: DeserializeOwned,
    E: From<Exception>,
{
    match result {
        Ok(value) => Ok(decode(value)),
        Err(MockError::Raised(exception)) => Err(E::from(exception)),
        Err(err) => raise(err),
    }
}

/// Unwrap a dispatch result whose value is discarded
pub fn completed(result: MockResult<Value>) {
    if let Err(err) = result {
        raise(err);
    }
}
