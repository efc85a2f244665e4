//! `del` on an indexed list expression removes that element.

use pretty_assertions::assert_eq;

#[test]
fn del_removes_a_list_element() {
    let src = "var l = [1, 2, 3]\ndel l[1]\nl\n";
    let (value, error) = cloudy::run("<test>", src);
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "[1, 3]");
}
