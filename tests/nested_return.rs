//! `return` unwinds to the nearest enclosing function call, not just the
//! nearest enclosing loop.

use pretty_assertions::assert_eq;

#[test]
fn nested_return_exits_the_function_not_the_loop() {
    let src = "\
func first_even(items):
    for i = 0 to len(items):
        if items[i] % 2 == 0:
            return items[i]
    return -1
first_even([1, 3, 4, 5])
";
    let (value, error) = cloudy::run("<test>", src);
    assert!(error.is_none(), "{:?}", error);
    assert_eq!(value.unwrap().to_string(), "4");
}
