//! Referencing a name that was never bound is a runtime error.

#[test]
fn undefined_name_is_an_error() {
    let (_, error) = cloudy::run("<test>", "totally_unbound\n");
    assert!(error.is_some());
}
