//! `in` and `not in` test membership, including on strings.

use pretty_assertions::assert_eq;

#[test]
fn in_and_not_in_test_membership() {
    let (value, error) = cloudy::run("<test>", "(\"a\" in \"cat\") and (\"z\" not in \"cat\")\n");
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "true");
}
