//! `+` on two lists concatenates them into a new list.

#[test]
fn list_concatenation_builds_a_new_list() {
    let (value, error) = cloudy::run("<test>", "[1, 2] + [3, 4]\n");
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "[1, 2, 3, 4]");
}
