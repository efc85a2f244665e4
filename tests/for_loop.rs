//! A `for` loop prints each value it walks over and itself evaluates to null.

#[test]
fn for_loop_produces_null_and_prints_each_value() {
    let (value, error) = cloudy::run("<test>", "for i = 0 to 5: print(i)\n");
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "null");
}
