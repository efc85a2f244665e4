//! The named built-in callables exposed to Cloudy programs.

use std::io::{self, Write};
use std::rc::Rc;

use crate::context::Context;
use crate::error::{CloudyError, ErrorKind};
use crate::position::Span;
use crate::value::{Value, ValueKind};

pub const NAMES: &[&str] = &[
    "print", "print_ret", "input", "input_int", "clear", "is_number", "is_string", "is_bool",
    "is_list", "is_function", "append", "pop", "extend", "len", "type", "run",
];

fn arity_error(span: &Span, name: &str, expected: usize, got: usize) -> CloudyError {
    CloudyError::new(
        ErrorKind::ArgumentCount,
        span.start.clone(),
        span.end.clone(),
        format!("'{}' expected {} argument(s), got {}", name, expected, got),
    )
}

fn type_error(span: &Span, details: impl Into<String>) -> CloudyError {
    CloudyError::new(ErrorKind::TypeMismatch, span.start.clone(), span.end.clone(), details)
}

pub fn call(name: &str, args: &[Value], span: &Span, ctx: &Rc<Context>) -> Result<Value, CloudyError> {
    match name {
        "print" => {
            expect_arity(span, name, args, 1)?;
            println!("{}", args[0]);
            Ok(Value::null())
        }
        "print_ret" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::string(args[0].to_string()))
        }
        "input" => {
            expect_arity(span, name, args, 0)?;
            Ok(Value::string(read_line()))
        }
        "input_int" => {
            expect_arity(span, name, args, 0)?;
            loop {
                let line = read_line();
                if let Ok(n) = line.trim().parse::<i64>() {
                    return Ok(Value::int(n));
                }
                println!("Must be an integer.");
            }
        }
        "clear" => {
            expect_arity(span, name, args, 0)?;
            print!("\x1B[2J\x1B[H");
            io::stdout().flush().ok();
            Ok(Value::null())
        }
        "is_number" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::bool(matches!(args[0].kind, ValueKind::Int(_) | ValueKind::Float(_))))
        }
        "is_string" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::bool(matches!(args[0].kind, ValueKind::String(_))))
        }
        "is_bool" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::bool(matches!(args[0].kind, ValueKind::Bool(_))))
        }
        "is_list" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::bool(matches!(args[0].kind, ValueKind::List(_))))
        }
        "is_function" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::bool(matches!(args[0].kind, ValueKind::Function(_) | ValueKind::BuiltinFunction(_))))
        }
        "append" => {
            expect_arity(span, name, args, 2)?;
            match &args[0].kind {
                ValueKind::List(l) => {
                    l.borrow_mut().push(args[1].clone());
                    Ok(Value::null())
                }
                other => Err(type_error(span, format!("'append' expects a list, got {}", other_name(other)))),
            }
        }
        "pop" => {
            expect_arity(span, name, args, 2)?;
            let idx = match &args[1].kind {
                ValueKind::Int(n) => *n,
                _ => return Err(type_error(span, "'pop' index must be an Int")),
            };
            match &args[0].kind {
                ValueKind::List(l) => {
                    let mut list = l.borrow_mut();
                    let len = list.len() as i64;
                    let resolved = if idx < 0 { idx + len } else { idx };
                    if resolved >= 0 && resolved < len {
                        Ok(list.remove(resolved as usize))
                    } else {
                        Err(CloudyError::new(ErrorKind::IndexOutOfRange, span.start.clone(), span.end.clone(), "list index out of range"))
                    }
                }
                other => Err(type_error(span, format!("'pop' expects a list, got {}", other_name(other)))),
            }
        }
        "extend" => {
            expect_arity(span, name, args, 2)?;
            match (&args[0].kind, &args[1].kind) {
                (ValueKind::List(a), ValueKind::List(b)) => {
                    a.borrow_mut().extend(b.borrow().iter().cloned());
                    Ok(Value::null())
                }
                _ => Err(type_error(span, "'extend' expects two lists")),
            }
        }
        "len" => {
            expect_arity(span, name, args, 1)?;
            args[0].len().map(Value::int)
        }
        "type" => {
            expect_arity(span, name, args, 1)?;
            Ok(Value::string(args[0].type_name()))
        }
        "run" => {
            expect_arity(span, name, args, 1)?;
            let filename = match &args[0].kind {
                ValueKind::String(s) => s.clone(),
                _ => return Err(type_error(span, "'run' expects a filename string")),
            };
            let source = std::fs::read_to_string(&filename)
                .map_err(|e| CloudyError::new(ErrorKind::Runtime, span.start.clone(), span.end.clone(), format!("failed to load '{}': {}", filename, e)))?;
            let (value, error) = crate::run(&filename, &source);
            if let Some(e) = error {
                return Err(CloudyError::new(ErrorKind::Runtime, span.start.clone(), span.end.clone(), format!("failed to finish executing '{}': {}", filename, e)));
            }
            Ok(value.unwrap_or_else(Value::null))
        }
        _ => {
            let _ = ctx;
            Err(CloudyError::new(ErrorKind::UndefinedName, span.start.clone(), span.end.clone(), format!("'{}' is not a built-in function", name)))
        }
    }
}

fn expect_arity(span: &Span, name: &str, args: &[Value], expected: usize) -> Result<(), CloudyError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(arity_error(span, name, expected, args.len()))
    }
}

fn other_name(kind: &ValueKind) -> &'static str {
    match kind {
        ValueKind::Int(_) => "int",
        ValueKind::Float(_) => "float",
        ValueKind::Bool(_) => "bool",
        ValueKind::String(_) => "string",
        ValueKind::Null => "null",
        ValueKind::List(_) => "list",
        ValueKind::Dict(_) => "dict",
        ValueKind::Function(_) | ValueKind::BuiltinFunction(_) => "function",
    }
}

fn read_line() -> String {
    let mut line = String::new();
    io::stdin().read_line(&mut line).ok();
    line.trim_end_matches(['\n', '\r']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SymbolTable;
    use std::cell::RefCell;

    fn dummy_ctx() -> Rc<Context> {
        Context::new_global(Rc::new(RefCell::new(SymbolTable::new(None))))
    }

    fn dummy_span() -> Span {
        use crate::position::Position;
        let p = Position::new(0, 0, 0, Rc::new("<test>".into()), Rc::new(String::new()));
        Span::new(p.clone(), p)
    }

    #[test]
    fn len_reports_type_mismatch_for_unsupported_types() {
        let ctx = dummy_ctx();
        let span = dummy_span();
        let result = call("len", &[Value::int(1)], &span, &ctx);
        assert!(result.is_err());
    }

    #[test]
    fn append_mutates_list_in_place() {
        let ctx = dummy_ctx();
        let span = dummy_span();
        let list = Value::list(vec![Value::int(1)]);
        call("append", &[list.clone(), Value::int(2)], &span, &ctx).unwrap();
        assert_eq!(list.len().unwrap(), 2);
    }
}
