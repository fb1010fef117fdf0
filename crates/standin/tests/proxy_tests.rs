//! End-to-end tests for `#[mockable]` proxies driven through `DynamicMock`.

#![cfg(feature = "derive")]

use serde::{Deserialize, Serialize};
use standin::{
    args, catch_failure, mockable, Args, Collect, DynamicMock, Exception, IsAnything, MemberInfo,
    MockError, Mockable, OutValues, PropertyIs, ProxyTypeCache, Value,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub sku: String,
    pub qty: u32,
}

#[derive(Debug, PartialEq)]
pub struct GatewayError(String);

impl From<Exception> for GatewayError {
    fn from(exception: Exception) -> Self {
        Self(exception.message)
    }
}

#[mockable]
pub trait PaymentGateway {
    fn charge(&self, account: &str, cents: u64) -> Result<String, GatewayError>;
    fn balance(&self, account: &str) -> u64;
    fn history(&self, account: &str) -> Vec<Order>;
    fn parse_amount(&self, text: &str, cents: &mut u64) -> bool;
    fn record(&mut self, order: Order);

    fn describe(&self, account: &str) -> String {
        format!("{} has {}", account, self.balance(account))
    }
}

#[mockable(name = "FakeClock")]
trait Clock {
    fn now(&self) -> u64;
}

#[mockable]
pub trait Named {
    fn name(&self) -> String;

    fn greeting(&self) -> String {
        format!("hello {}", self.name())
    }
}

#[mockable(bases(Named))]
pub trait Employee: Named + std::fmt::Debug {
    fn badge(&self) -> u64;
    fn reserve(&self, next_id: &mut u64) -> bool;
}

fn introduce(employee: &dyn Employee) -> String {
    format!("{} #{}", employee.greeting(), employee.badge())
}

fn checkout(gateway: &dyn PaymentGateway, account: &str, cents: u64) -> Result<String, GatewayError> {
    if gateway.balance(account) < cents {
        return Err(GatewayError("insufficient funds".to_string()));
    }
    gateway.charge(account, cents)
}

fn gateway() -> DynamicMock<MockPaymentGateway> {
    DynamicMock::with_cache(&ProxyTypeCache::new(), None)
}

// ============================================================================
// Returns and exceptions
// ============================================================================

#[test]
fn checkout_charges_when_funded() {
    let mock = gateway();
    mock.expect_and_return("balance", 1_000, args!["ada"]).unwrap();
    mock.expect_and_return("charge", "tx-1", args!["ada", 500]).unwrap();

    let receipt = checkout(mock.mock_instance().unwrap(), "ada", 500);
    assert_eq!(receipt, Ok("tx-1".to_string()));
    mock.verify().unwrap();
}

#[test]
fn bound_exception_becomes_err() {
    let mock = gateway();
    mock.setup_result("balance", 1_000).unwrap();
    mock.expect_and_throw("charge", Exception::new("Declined", "card expired"), Args::any())
        .unwrap();

    let receipt = checkout(mock.mock_instance().unwrap(), "ada", 10);
    assert_eq!(receipt, Err(GatewayError("card expired".to_string())));
    mock.verify().unwrap();
}

#[test]
fn unbound_calls_return_declared_defaults() {
    let mock = gateway();
    let instance = mock.mock_instance().unwrap();
    assert_eq!(instance.balance("ada"), 0);
    assert!(instance.history("ada").is_empty());
    assert_eq!(instance.describe("ada"), "");
    mock.verify().unwrap();
}

#[test]
fn structured_returns_decode() {
    let mock = gateway();
    let orders = vec![Order {
        sku: "A-1".to_string(),
        qty: 2,
    }];
    mock.setup_result("history", Value::encode(&orders).unwrap())
        .unwrap();
    assert_eq!(mock.mock_instance().unwrap().history("ada"), orders);
}

// ============================================================================
// Argument matching
// ============================================================================

#[test]
fn struct_arguments_match_by_field() {
    let mock = gateway();
    let captured = Collect::new();
    mock.expect("record", args![PropertyIs::new("sku", "A-1")]).unwrap();
    mock.expect("record", args![captured.clone()]).unwrap();

    let mut instance = mock.new_instance().unwrap();
    instance.record(Order {
        sku: "A-1".to_string(),
        qty: 1,
    });
    instance.record(Order {
        sku: "B-2".to_string(),
        qty: 3,
    });

    mock.verify().unwrap();
    let second: Order = captured.value().unwrap().decode().unwrap();
    assert_eq!(second.qty, 3);
}

#[test]
#[should_panic(expected = "charge() called with incorrect parameter (2)")]
fn argument_mismatch_unwinds_code_under_test() {
    let mock = gateway();
    mock.setup_result("balance", 1_000).unwrap();
    mock.expect_and_return("charge", "tx", args!["ada", 500]).unwrap();
    let _ = checkout(mock.mock_instance().unwrap(), "ada", 900);
}

#[test]
fn overflow_is_recoverable_with_catch_failure() {
    let mock = gateway();
    mock.expect_and_return("balance", 5, args![IsAnything]).unwrap();
    let instance = mock.mock_instance().unwrap();
    assert_eq!(instance.balance("ada"), 5);

    let err = catch_failure(|| instance.balance("ada")).unwrap_err();
    let err = err.as_verify().unwrap();
    assert_eq!(err.reason, "balance() called too many times");
    assert_eq!((err.expected.clone(), err.actual.clone()), (Value::from(1), Value::from(2)));
}

// ============================================================================
// Out parameters
// ============================================================================

#[test]
fn out_values_are_written_back() {
    let mock = gateway();
    mock.expect_and_return_out(
        "parse_amount",
        true,
        OutValues::with_signature(["&str", "&mut u64"]).set(1, 1_999),
        args!["19.99", IsAnything],
    )
    .unwrap();

    let mut cents = 0;
    assert!(mock.mock_instance().unwrap().parse_amount("19.99", &mut cents));
    assert_eq!(cents, 1_999);
    mock.verify().unwrap();
}

#[test]
fn out_values_are_consumed_in_order() {
    let mock = gateway();
    for amount in [100u64, 200] {
        mock.expect_and_return_out("parse_amount", true, OutValues::new().set(1, amount), Args::any())
            .unwrap();
    }
    let instance = mock.mock_instance().unwrap();
    let mut cents = 0;
    instance.parse_amount("same", &mut cents);
    assert_eq!(cents, 100);
    instance.parse_amount("same", &mut cents);
    assert_eq!(cents, 200);
    mock.verify().unwrap();
}

// ============================================================================
// Ignore and fall-through
// ============================================================================

#[test]
fn ignored_member_runs_default_body() {
    let mock = gateway();
    mock.setup_result("balance", 42).unwrap();
    mock.ignore("describe").unwrap();
    assert_eq!(mock.mock_instance().unwrap().describe("ada"), "ada has 42");
}

#[test]
fn ignore_without_default_body_fails() {
    let err = gateway().ignore("balance").unwrap_err();
    assert!(matches!(err, MockError::NoBaseImplementation { .. }));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn registrations_are_checked_against_the_trait() {
    let mock = gateway();
    assert_eq!(
        mock.expect("refund", args![]).unwrap_err().to_string(),
        "method refund not defined"
    );
    assert!(matches!(
        mock.expect("charge", args!["ada"]),
        Err(MockError::MissingMethod { .. })
    ));
    assert_eq!(
        mock.setup_result("balance", "plenty").unwrap_err().to_string(),
        "method balance returns a u64"
    );
    assert!(mock.setup_result("charge", "tx").is_ok());
}

#[test]
fn descriptor_reflects_the_trait() {
    let descriptor = MockPaymentGateway::descriptor();
    assert_eq!(descriptor.name, "PaymentGateway");
    let parse = descriptor
        .members
        .iter()
        .find(|m| m.name == "parse_amount")
        .unwrap();
    let types: Vec<_> = parse.param_types().map(ToString::to_string).collect();
    assert_eq!(types, vec!["&str", "&mut u64"]);
    assert_eq!(parse.returns.as_str(), "bool");

    let describe: &MemberInfo = descriptor.members.iter().find(|m| m.name == "describe").unwrap();
    assert!(describe.has_base);
}

// ============================================================================
// Strict mode, naming and caching
// ============================================================================

#[test]
fn strict_mode_rejects_unregistered_calls() {
    let mock = gateway();
    mock.set_strict(true);
    mock.expect_and_return("balance", 1, args!["ada"]).unwrap();
    let instance = mock.mock_instance().unwrap();
    assert_eq!(instance.balance("ada"), 1);

    let err = catch_failure(|| instance.history("ada")).unwrap_err();
    assert_eq!(err.as_verify().unwrap().reason, "MockPaymentGateway.history() called");
}

#[test]
fn proxy_name_can_be_overridden() {
    let clock = DynamicMock::<FakeClock>::named("clock");
    clock.expect_and_return("now", 7, args![]).unwrap();
    assert_eq!(clock.mock_instance().unwrap().now(), 7);
    assert_eq!(clock.name(), "clock");
    assert_eq!(DynamicMock::<FakeClock>::new().name(), "MockClock");
}

#[test]
fn proxy_types_are_cached_per_type() {
    let cache = ProxyTypeCache::new();
    let first = DynamicMock::<MockPaymentGateway>::with_cache(&cache, Some("first"));
    let second = DynamicMock::<MockPaymentGateway>::with_cache(&cache, Some("second"));
    assert_eq!(cache.len(), 1);
    assert!(cache.contains::<MockPaymentGateway>());

    first.expect("balance", args!["ada"]).unwrap();
    second.mock_instance().unwrap().balance("ada");
    assert!(first.verify().is_err());
    assert!(second.verify().is_ok());
}

#[test]
fn boxed_proxies_share_the_engine() {
    let mock = gateway();
    mock.expect_and_return_times(2, "balance", 9, Args::any()).unwrap();
    let boxed: Box<dyn PaymentGateway> = Box::new(mock.new_instance().unwrap());
    assert_eq!(boxed.balance("a"), 9);
    assert_eq!(mock.mock_instance().unwrap().balance("b"), 9);
    mock.verify().unwrap();
}

// ============================================================================
// Inherited traits
// ============================================================================

#[test]
fn supertrait_members_route_through_the_same_engine() {
    let mock = DynamicMock::<MockEmployee>::with_cache(&ProxyTypeCache::new(), None);
    mock.expect_and_return("name", "ada", args![]).unwrap();
    mock.expect_and_return("badge", 7, args![]).unwrap();
    mock.ignore("greeting").unwrap();

    assert_eq!(introduce(mock.mock_instance().unwrap()), "hello ada #7");
    mock.verify().unwrap();
}

#[test]
fn supertrait_descriptor_is_inherited() {
    let descriptor = MockEmployee::descriptor();
    assert_eq!(descriptor.bases.len(), 1);
    assert_eq!(descriptor.bases[0].name, "Named");

    let mock = DynamicMock::<MockEmployee>::with_cache(&ProxyTypeCache::new(), None);
    assert_eq!(mock.proxy_type().visible("name").count(), 1);
    assert_eq!(
        mock.setup_result("name", 3).unwrap_err().to_string(),
        "method name returns a String"
    );
    assert!(matches!(
        mock.expect("surname", args![]),
        Err(MockError::MissingMethod { .. })
    ));
}

#[test]
fn unbound_supertrait_member_returns_default() {
    let mock = DynamicMock::<MockEmployee>::with_cache(&ProxyTypeCache::new(), None);
    let instance = mock.mock_instance().unwrap();
    assert_eq!(instance.name(), "");
    assert_eq!(instance.greeting(), "");
}

// ============================================================================
// Wide integers
// ============================================================================

#[test]
fn wide_unsigned_returns_survive_the_proxy() {
    let mock = DynamicMock::<MockEmployee>::with_cache(&ProxyTypeCache::new(), None);
    mock.expect_and_return("badge", u64::MAX, args![]).unwrap();
    assert_eq!(mock.mock_instance().unwrap().badge(), u64::MAX);
    mock.verify().unwrap();
}

#[test]
fn wide_unsigned_out_params_write_back() {
    let mock = DynamicMock::<MockEmployee>::with_cache(&ProxyTypeCache::new(), None);
    let instance = mock.new_instance().unwrap();

    let mut untouched = u64::MAX;
    assert!(!instance.reserve(&mut untouched));
    assert_eq!(untouched, u64::MAX);

    mock.expect_and_return_out("reserve", true, OutValues::new().set(0, u64::MAX - 1), Args::any())
        .unwrap();
    let mut next = 0;
    assert!(instance.reserve(&mut next));
    assert_eq!(next, u64::MAX - 1);
    mock.verify().unwrap();
}
