//! Calling a function with the wrong number of arguments is an error.

#[test]
fn argument_count_mismatch_is_an_error() {
    let (_, error) = cloudy::run("<test>", "func add(a, b): a + b\nadd(1)\n");
    assert!(error.is_some());
}
