//! Comparing values of different types with `!=` is true, not an error.

#[test]
fn cross_type_inequality_is_true_not_an_error() {
    let (value, error) = cloudy::run("<test>", "1 != \"1\"\n");
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "true");
}
