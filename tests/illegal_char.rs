//! A character the lexer doesn't recognise is reported as an error.

#[test]
fn illegal_character_is_reported() {
    let (_, error) = cloudy::run("<test>", "var x = 1 $ 2\n");
    assert!(error.is_some());
}
