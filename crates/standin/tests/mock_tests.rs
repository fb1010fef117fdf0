//! Behavioral tests for the `Mock` engine through the public API.

use standin::{
    args, vals, And, Args, Contains, Exception, IsAnything, IsCloseTo, IsEqual, IsIn, IsMatch,
    IsNull, IsTypeOf, Mock, MockConfig, MockError, Not, Or, Predicate, StartsWith, Value,
    ValueKind, VerifyError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("standin=trace")
        .with_test_writer()
        .try_init();
}

fn verify_error(err: MockError) -> VerifyError {
    match err {
        MockError::Verify(err) => err,
        other => panic!("expected a verification failure, got {other}"),
    }
}

// ============================================================================
// Expectation counting
// ============================================================================

#[test]
fn untouched_mock_verifies() {
    init_tracing();
    let mut mock = Mock::new("mymock");
    mock.call("whatever", vals![1, "two"]).unwrap();
    mock.verify().unwrap();
}

#[test]
fn single_expectation_lifecycle() {
    init_tracing();
    let mut mock = Mock::new("mymock");
    mock.expect("m", args![]);
    mock.call("m", vals![]).unwrap();
    mock.verify().unwrap();

    let err = verify_error(mock.call("m", vals![]).unwrap_err());
    assert_eq!(
        err.to_string(),
        "m() called too many times\nexpected:<1>\n but was:<2>"
    );
}

#[test]
fn never_called_reports_counts() {
    let mut mock = Mock::new("mymock");
    mock.expect("m", args![]);
    let err = verify_error(mock.verify().unwrap_err());
    assert_eq!(err.reason, "mymock.m() never called");
    assert_eq!((err.expected, err.actual), (Value::from(1), Value::from(0)));
}

#[test]
fn partially_satisfied_reports_aggregate_counts() {
    let mut mock = Mock::new("mymock");
    for _ in 0..3 {
        mock.expect("m", args![]);
    }
    mock.call("m", vals![]).unwrap();
    mock.call("m", vals![]).unwrap();
    let err = verify_error(mock.verify().unwrap_err());
    assert_eq!(err.reason, "mymock.m() not called enough times");
    assert_eq!((err.expected, err.actual), (Value::from(3), Value::from(2)));
    assert_eq!(mock.pending().count(), 1);
}

#[test]
fn expect_no_call_fails_immediately() {
    let mut mock = Mock::new("mymock");
    mock.expect_no_call("m");
    let err = verify_error(mock.call("m", vals![]).unwrap_err());
    assert_eq!(err.reason, "mymock.m() called");
    assert_eq!((err.expected, err.actual), (Value::from(0), Value::from(1)));
    mock.verify().unwrap();
}

#[test]
fn different_methods_interleave_freely() {
    let mut mock = Mock::new("mymock");
    mock.set_strict(true);
    mock.expect("a", args![]);
    mock.expect("b", args![]);
    mock.expect("a", args![]);
    mock.call("b", vals![]).unwrap();
    mock.call("a", vals![]).unwrap();
    mock.call("a", vals![]).unwrap();
    mock.verify().unwrap();
}

// ============================================================================
// Constraints
// ============================================================================

#[test]
fn parameter_mismatch_cites_position() {
    let mut mock = Mock::new("mymock");
    mock.expect("m", args![IsEqual::new("hello"), IsAnything]);
    mock.call("m", vals!["hello", Value::Null]).unwrap();

    let mut mock = Mock::new("mymock");
    mock.expect("m", args![IsEqual::new("hello"), IsAnything]);
    let err = verify_error(mock.call("m", vals!["world", Value::Null]).unwrap_err());
    assert_eq!(err.reason, "m() called with incorrect parameter (1)");
}

#[test]
fn built_in_constraints_compose() {
    let mut mock = Mock::new("mymock");
    mock.expect(
        "search",
        args![
            And::new(StartsWith::new("user:"), IsMatch::new(r"^user:\d+$").unwrap()),
            Or::new(IsNull, IsIn::new([10, 20, 50])),
            Not::new(Contains::new("secret")),
            IsCloseTo::new(0.5, 0.01),
            IsTypeOf::new(ValueKind::List),
        ]
    );
    mock.call(
        "search",
        vals!["user:42", 20, "public", 0.505, vals![1, 2]],
    )
    .unwrap();
    mock.verify().unwrap();
}

#[test]
fn predicate_descriptions_surface_in_failures() {
    let mut mock = Mock::new("mymock");
    mock.expect(
        "retry",
        args![Predicate::new("an even attempt", |v| v.as_i64().is_some_and(|i| i % 2 == 0))],
    );
    let err = verify_error(mock.call("retry", vals![3]).unwrap_err());
    assert_eq!(err.expected, Value::from("an even attempt"));
    assert_eq!(err.actual, Value::from(3));
}

// ============================================================================
// Stubs
// ============================================================================

#[test]
fn rotating_stub_cycles() {
    let mut mock = Mock::new("mymock");
    mock.setup_result_in_order("m", "a");
    mock.setup_result_in_order("m", "b");
    let answers: Vec<Value> = (0..4).map(|_| mock.call("m", vals![]).unwrap()).collect();
    assert_eq!(answers, vals!["a", "b", "a", "b"]);
}

#[test]
fn keyed_stub_matches_exact_arguments() {
    let mut mock = Mock::new("mymock");
    mock.setup_result_for_params("m", "hello", vals!["abc"]);
    assert_eq!(mock.call("m", vals!["xyz"]).unwrap(), Value::Null);
    assert_eq!(mock.call("m", vals!["abc"]).unwrap(), Value::from("hello"));
}

#[test]
fn keyed_stub_separates_wide_unsigned_keys() {
    let mut mock = Mock::new("mymock");
    mock.setup_result_for_params("lookup", "max", vals![u64::MAX]);
    assert_eq!(mock.call("lookup", vals![u64::MAX - 1]).unwrap(), Value::Null);
    assert_eq!(mock.call("lookup", vals![u64::MAX]).unwrap(), Value::from("max"));

    mock.expect("record", args![u64::MAX]);
    let err = verify_error(mock.call("record", vals![u64::MAX - 1]).unwrap_err());
    assert_eq!(err.reason, "record() called with incorrect parameter (1)");
}

#[test]
fn stubs_do_not_count_towards_verification() {
    let mut mock = Mock::new("mymock");
    mock.setup_result("m", 1);
    mock.setup_result_in_order_times("n", 2, 3);
    assert!(mock.has_stub("m"));
    mock.verify().unwrap();
}

// ============================================================================
// Strict mode and configuration
// ============================================================================

#[test]
fn strict_mode_rejects_unknown_methods() {
    init_tracing();
    let mut mock = Mock::with_config(MockConfig::new().with_name("mymock").with_strict(true));
    mock.expect("x", args![]);
    mock.expect("y", args![]);
    mock.call("x", vals![]).unwrap();
    mock.call("y", vals![]).unwrap();
    let err = verify_error(mock.call("z", vals![]).unwrap_err());
    assert_eq!(err.reason, "mymock.z() called");
}

#[test]
fn config_round_trips_through_json() {
    let config = MockConfig::new().with_name("db").with_strict(true);
    let json = serde_json::to_string(&config).unwrap();
    let parsed: MockConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn thrown_exceptions_count_as_calls() {
    let mut mock = Mock::new("mymock");
    mock.expect_and_throw_times(2, "open", Exception::new("IoError", "busy"), Args::any());
    for _ in 0..2 {
        let err = mock.call("open", vals!["/tmp"]).unwrap_err();
        assert_eq!(err.as_raised().unwrap().kind, "IoError");
    }
    mock.verify().unwrap();
    assert_eq!(mock.expectations().len(), 1);
}
