//! Dicts preserve insertion order, and re-assigning an existing key updates
//! it in place rather than moving it to the end.

use pretty_assertions::assert_eq;

#[test]
fn dict_round_trips_insertion_order() {
    let src = "var d = {\"a\": 1, \"b\": 2}\nd[\"a\"] = 3\nd\n";
    let (value, error) = cloudy::run("<test>", src);
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "{\"a\": 3, \"b\": 2}");
}
