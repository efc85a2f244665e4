//! Cloudy: a small, dynamically-typed, indentation-sensitive scripting language.
//!
//! [`run`] is the single entry point external callers (a CLI, a REPL, the `run`
//! built-in itself) use to execute a script from source text.

pub mod ast;
pub mod builtins;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod token;
pub mod value;

use std::cell::RefCell;
use std::rc::Rc;

use context::{Context, SymbolTable};
use error::CloudyError;
use interpreter::Interpreter;
use value::{Value, ValueKind};

fn global_symbol_table() -> Rc<RefCell<SymbolTable>> {
    let table = Rc::new(RefCell::new(SymbolTable::new(None)));
    {
        let mut t = table.borrow_mut();
        t.set("null", Value::null());
        t.set("true", Value::bool(true));
        t.set("false", Value::bool(false));
        for name in builtins::NAMES {
            t.set(name, Value::new(ValueKind::BuiltinFunction(name.to_string())));
        }
    }
    table
}

/// Lexes, parses and interprets `source`, returning the value of the final
/// top-level statement (or `Null`) and, on failure, the error that stopped
/// execution. Matches the reference pipeline: an empty token stream (source
/// with no real tokens) evaluates to an empty string with no error.
pub fn run(filename: &str, source: &str) -> (Option<Value>, Option<CloudyError>) {
    let tokens = match lexer::tokenize(filename, source) {
        Ok(t) => t,
        Err(e) => return (None, Some(e)),
    };

    if tokens.len() == 1 {
        // Only EOF: nothing to execute.
        return (Some(Value::string("")), None);
    }

    let ast = match parser::parse(tokens) {
        Ok(a) => a,
        Err(e) => return (None, Some(e)),
    };

    let ctx = Context::new_global(global_symbol_table());
    let interpreter = Interpreter::new();
    let result = interpreter.visit(&ast, ctx);

    match result.error {
        Some(e) => (None, Some(e)),
        None => (result.value, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_returns_empty_string() {
        let (value, error) = run("<test>", "");
        assert!(error.is_none());
        assert_eq!(value.unwrap().to_string(), "");
    }

    #[test]
    fn arithmetic_precedence() {
        let (value, error) = run("<test>", "2 + 3 * 4");
        assert!(error.is_none(), "{:?}", error);
        assert_eq!(value.unwrap().to_string(), "14");
    }

    #[test]
    fn recursive_factorial() {
        let src = "func fact(n):\n    if n <= 1: return 1\n    return n * fact(n - 1)\nfact(5)\n";
        let (value, error) = run("<test>", src);
        assert!(error.is_none(), "{:?}", error);
        assert_eq!(value.unwrap().to_string(), "120");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let (value, error) = run("<test>", "1 / 0");
        assert!(value.is_none());
        assert!(error.is_some());
    }

    #[test]
    fn while_break_stops_loop_early() {
        let src = "var i = 0\nwhile i < 3:\n    if i == 1: break\n    i = i + 1\ni\n";
        let (value, error) = run("<test>", src);
        assert!(error.is_none(), "{:?}", error);
        assert_eq!(value.unwrap().to_string(), "1");
    }

    #[test]
    fn string_repeat_and_index() {
        let (value, error) = run("<test>", "var s = \"ab\" * 3\ns[4]\n");
        assert!(error.is_none(), "{:?}", error);
        assert_eq!(value.unwrap().to_string(), "a");
    }

    #[test]
    fn string_index_out_of_range() {
        let (_, error) = run("<test>", "var s = \"ab\" * 3\ns[10]\n");
        assert!(error.is_some());
    }
}
