//! Runtime value model and per-variant operator dispatch.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Node;
use crate::context::Context;
use crate::error::{CloudyError, ErrorKind};
use crate::position::{Position, Span};

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub name: Option<String>,
    pub arg_names: Vec<String>,
    pub body: Node,
    pub should_auto_return: bool,
    pub captured_context: Rc<Context>,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Vec<(String, Value)>>>),
    Function(Rc<FunctionData>),
    BuiltinFunction(String),
}

/// A tagged runtime value carrying the span it was produced at and the context
/// it was produced in (used only to build runtime error tracebacks).
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub pos_start: Position,
    pub pos_end: Position,
    pub context: Option<Rc<Context>>,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind.loosely_eq(&other.kind)
    }
}

fn dummy_pos() -> Position {
    Position::new(0, 0, 0, Rc::new("<internal>".to_string()), Rc::new(String::new()))
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Value { kind, pos_start: dummy_pos(), pos_end: dummy_pos(), context: None }
    }

    pub fn int(v: i64) -> Self {
        Value::new(ValueKind::Int(v))
    }

    pub fn float(v: f64) -> Self {
        Value::new(ValueKind::Float(v))
    }

    pub fn bool(v: bool) -> Self {
        Value::new(ValueKind::Bool(v))
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::new(ValueKind::String(v.into()))
    }

    pub fn null() -> Self {
        Value::new(ValueKind::Null)
    }

    pub fn list(elements: Vec<Value>) -> Self {
        Value::new(ValueKind::List(Rc::new(RefCell::new(elements))))
    }

    pub fn dict(pairs: Vec<(String, Value)>) -> Self {
        Value::new(ValueKind::Dict(Rc::new(RefCell::new(pairs))))
    }

    pub fn with_pos(mut self, start: Position, end: Position) -> Self {
        self.pos_start = start;
        self.pos_end = end;
        self
    }

    pub fn with_context(mut self, ctx: Rc<Context>) -> Self {
        self.context = Some(ctx);
        self
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Int(_) => "int",
            ValueKind::Float(_) => "float",
            ValueKind::Bool(_) => "bool",
            ValueKind::String(_) => "string",
            ValueKind::Null => "null",
            ValueKind::List(_) => "list",
            ValueKind::Dict(_) => "dict",
            ValueKind::Function(_) => "function",
            ValueKind::BuiltinFunction(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match &self.kind {
            ValueKind::Int(n) => *n != 0,
            ValueKind::Float(n) => *n != 0.0,
            ValueKind::Bool(b) => *b,
            ValueKind::String(s) => !s.is_empty(),
            ValueKind::Null => false,
            ValueKind::List(l) => !l.borrow().is_empty(),
            ValueKind::Dict(d) => !d.borrow().is_empty(),
            ValueKind::Function(_) | ValueKind::BuiltinFunction(_) => true,
        }
    }

    fn illegal_op(&self, other: &Value, op: &str) -> CloudyError {
        CloudyError::new(
            ErrorKind::IllegalOperation,
            self.pos_start.clone(),
            other.pos_end.clone(),
            format!("cannot apply '{}' to {} and {}", op, self.type_name(), other.type_name()),
        )
    }

    fn as_f64(&self) -> Option<f64> {
        match &self.kind {
            ValueKind::Int(n) => Some(*n as f64),
            ValueKind::Float(n) => Some(*n),
            ValueKind::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    fn is_integral(&self) -> bool {
        matches!(&self.kind, ValueKind::Int(_) | ValueKind::Bool(_))
    }

    fn numeric_result(&self, other: &Value, int_val: i64, float_val: f64) -> Value {
        if self.is_integral() && other.is_integral() {
            Value::int(int_val)
        } else {
            Value::float(float_val)
        }
    }

    pub fn add(&self, other: &Value) -> Result<Value, CloudyError> {
        match (&self.kind, &other.kind) {
            (ValueKind::String(a), ValueKind::String(b)) => Ok(Value::string(format!("{}{}", a, b))),
            (ValueKind::List(a), ValueKind::List(b)) => {
                let mut merged = a.borrow().clone();
                merged.extend(b.borrow().iter().cloned());
                Ok(Value::list(merged))
            }
            _ if self.numeric() && other.numeric() => {
                let af = self.as_f64().unwrap();
                let bf = other.as_f64().unwrap();
                let ai = as_i64(self);
                let bi = as_i64(other);
                Ok(self.numeric_result(other, ai.wrapping_add(bi), af + bf))
            }
            _ => Err(self.illegal_op(other, "+")),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, CloudyError> {
        if self.numeric() && other.numeric() {
            let af = self.as_f64().unwrap();
            let bf = other.as_f64().unwrap();
            Ok(self.numeric_result(other, as_i64(self).wrapping_sub(as_i64(other)), af - bf))
        } else {
            Err(self.illegal_op(other, "-"))
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value, CloudyError> {
        match (&self.kind, &other.kind) {
            (ValueKind::String(s), ValueKind::Int(n)) | (ValueKind::Int(n), ValueKind::String(s)) => {
                Ok(Value::string(s.repeat((*n).max(0) as usize)))
            }
            (ValueKind::List(l), ValueKind::Int(n)) | (ValueKind::Int(n), ValueKind::List(l)) => {
                let base = l.borrow().clone();
                let mut out = Vec::new();
                for _ in 0..(*n).max(0) {
                    out.extend(base.iter().cloned());
                }
                Ok(Value::list(out))
            }
            _ if self.numeric() && other.numeric() => {
                let af = self.as_f64().unwrap();
                let bf = other.as_f64().unwrap();
                Ok(self.numeric_result(other, as_i64(self).wrapping_mul(as_i64(other)), af * bf))
            }
            _ => Err(self.illegal_op(other, "*")),
        }
    }

    pub fn div(&self, other: &Value) -> Result<Value, CloudyError> {
        if !(self.numeric() && other.numeric()) {
            return Err(self.illegal_op(other, "/"));
        }
        let bf = other.as_f64().unwrap();
        if bf == 0.0 {
            return Err(self.div_by_zero(other));
        }
        Ok(Value::float(self.as_f64().unwrap() / bf))
    }

    pub fn floordiv(&self, other: &Value) -> Result<Value, CloudyError> {
        if !(self.numeric() && other.numeric()) {
            return Err(self.illegal_op(other, "//"));
        }
        let bf = other.as_f64().unwrap();
        if bf == 0.0 {
            return Err(self.div_by_zero(other));
        }
        let result = (self.as_f64().unwrap() / bf).floor();
        Ok(self.numeric_result(other, result as i64, result))
    }

    pub fn modu(&self, other: &Value) -> Result<Value, CloudyError> {
        if !(self.numeric() && other.numeric()) {
            return Err(self.illegal_op(other, "%"));
        }
        let bf = other.as_f64().unwrap();
        if bf == 0.0 {
            return Err(self.div_by_zero(other));
        }
        let af = self.as_f64().unwrap();
        let result = af - bf * (af / bf).floor();
        Ok(self.numeric_result(other, result as i64, result))
    }

    pub fn pow(&self, other: &Value) -> Result<Value, CloudyError> {
        if !(self.numeric() && other.numeric()) {
            return Err(self.illegal_op(other, "**"));
        }
        let af = self.as_f64().unwrap();
        let bf = other.as_f64().unwrap();
        if self.is_integral() && other.is_integral() && as_i64(other) >= 0 {
            let exponent = as_i64(other).min(u32::MAX as i64) as u32;
            Ok(Value::int(as_i64(self).wrapping_pow(exponent)))
        } else {
            Ok(Value::float(af.powf(bf)))
        }
    }

    fn div_by_zero(&self, other: &Value) -> CloudyError {
        CloudyError::new(
            ErrorKind::DivisionByZero,
            self.pos_start.clone(),
            other.pos_end.clone(),
            "division by zero",
        )
    }

    fn numeric(&self) -> bool {
        matches!(&self.kind, ValueKind::Int(_) | ValueKind::Float(_) | ValueKind::Bool(_))
    }

    pub fn eq_value(&self, other: &Value) -> Result<Value, CloudyError> {
        Ok(Value::bool(self.loosely_eq(other)))
    }

    pub fn ne_value(&self, other: &Value) -> Result<Value, CloudyError> {
        Ok(Value::bool(!self.loosely_eq(other)))
    }

    fn loosely_eq(&self, other: &Value) -> bool {
        self.kind.loosely_eq(&other.kind)
    }

    fn compare(&self, other: &Value, op: &str) -> Result<bool, CloudyError> {
        if self.numeric() && other.numeric() {
            let a = self.as_f64().unwrap();
            let b = other.as_f64().unwrap();
            Ok(match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                ">=" => a >= b,
                _ => unreachable!(),
            })
        } else if let (ValueKind::String(a), ValueKind::String(b)) = (&self.kind, &other.kind) {
            Ok(match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                ">=" => a >= b,
                _ => unreachable!(),
            })
        } else {
            Err(self.illegal_op(other, op))
        }
    }

    pub fn lt(&self, other: &Value) -> Result<Value, CloudyError> {
        self.compare(other, "<").map(Value::bool)
    }
    pub fn lte(&self, other: &Value) -> Result<Value, CloudyError> {
        self.compare(other, "<=").map(Value::bool)
    }
    pub fn gt(&self, other: &Value) -> Result<Value, CloudyError> {
        self.compare(other, ">").map(Value::bool)
    }
    pub fn gte(&self, other: &Value) -> Result<Value, CloudyError> {
        self.compare(other, ">=").map(Value::bool)
    }

    pub fn and(&self, other: &Value) -> Result<Value, CloudyError> {
        Ok(Value::bool(self.is_truthy() && other.is_truthy()))
    }

    pub fn or(&self, other: &Value) -> Result<Value, CloudyError> {
        Ok(Value::bool(self.is_truthy() || other.is_truthy()))
    }

    pub fn contains(&self, other: &Value) -> Result<Value, CloudyError> {
        match (&self.kind, &other.kind) {
            (ValueKind::String(needle), ValueKind::String(hay)) => Ok(Value::bool(hay.contains(needle.as_str()))),
            (_, ValueKind::List(l)) => Ok(Value::bool(l.borrow().iter().any(|v| v.loosely_eq(self)))),
            _ => Err(CloudyError::new(
                ErrorKind::TypeMismatch,
                self.pos_start.clone(),
                other.pos_end.clone(),
                format!("'in' requires a string or list, found {}", other.type_name()),
            )),
        }
    }

    pub fn negate(&self) -> Result<Value, CloudyError> {
        match &self.kind {
            ValueKind::Int(n) => Ok(Value::int(-n)),
            ValueKind::Float(n) => Ok(Value::float(-n)),
            ValueKind::Bool(b) => Ok(Value::int(if *b { -1 } else { 0 })),
            _ => Err(CloudyError::new(
                ErrorKind::IllegalOperation,
                self.pos_start.clone(),
                self.pos_end.clone(),
                format!("cannot negate {}", self.type_name()),
            )),
        }
    }

    pub fn logical_not(&self) -> Value {
        Value::bool(!self.is_truthy())
    }

    pub fn index(&self, idx: &Value) -> Result<Value, CloudyError> {
        match (&self.kind, &idx.kind) {
            (ValueKind::List(l), ValueKind::Int(i)) => {
                let list = l.borrow();
                resolve_index(list.len(), *i)
                    .map(|i| list[i].clone())
                    .ok_or_else(|| self.index_out_of_range(idx))
            }
            (ValueKind::String(s), ValueKind::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                resolve_index(chars.len(), *i)
                    .map(|i| Value::string(chars[i].to_string()))
                    .ok_or_else(|| self.index_out_of_range(idx))
            }
            (ValueKind::Dict(d), ValueKind::String(key)) => d
                .borrow()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    CloudyError::new(
                        ErrorKind::Runtime,
                        self.pos_start.clone(),
                        idx.pos_end.clone(),
                        format!("key '{}' not found", key),
                    )
                }),
            _ => Err(CloudyError::new(
                ErrorKind::TypeMismatch,
                self.pos_start.clone(),
                idx.pos_end.clone(),
                format!("cannot index {} with {}", self.type_name(), idx.type_name()),
            )),
        }
    }

    pub fn index_assign(&self, idx: &Value, value: Value) -> Result<(), CloudyError> {
        match (&self.kind, &idx.kind) {
            (ValueKind::List(l), ValueKind::Int(i)) => {
                let mut list = l.borrow_mut();
                let len = list.len();
                match resolve_index(len, *i) {
                    Some(i) => {
                        list[i] = value;
                        Ok(())
                    }
                    None => Err(self.index_out_of_range(idx)),
                }
            }
            (ValueKind::Dict(d), ValueKind::String(key)) => {
                let mut pairs = d.borrow_mut();
                if let Some(entry) = pairs.iter_mut().find(|(k, _)| k == key) {
                    entry.1 = value;
                } else {
                    pairs.push((key.clone(), value));
                }
                Ok(())
            }
            _ => Err(CloudyError::new(
                ErrorKind::TypeMismatch,
                self.pos_start.clone(),
                idx.pos_end.clone(),
                format!("cannot assign into {} with {}", self.type_name(), idx.type_name()),
            )),
        }
    }

    fn index_out_of_range(&self, _idx: &Value) -> CloudyError {
        CloudyError::new(
            ErrorKind::IndexOutOfRange,
            self.pos_start.clone(),
            self.pos_end.clone(),
            format!("{} index out of range", self.type_name()),
        )
    }

    pub fn len(&self) -> Result<i64, CloudyError> {
        match &self.kind {
            ValueKind::String(s) => Ok(s.chars().count() as i64),
            ValueKind::List(l) => Ok(l.borrow().len() as i64),
            ValueKind::Dict(d) => Ok(d.borrow().len() as i64),
            _ => Err(CloudyError::new(
                ErrorKind::TypeMismatch,
                self.pos_start.clone(),
                self.pos_end.clone(),
                format!("object of type {} has no len()", self.type_name()),
            )),
        }
    }

    pub fn as_span(&self) -> Span {
        Span::new(self.pos_start.clone(), self.pos_end.clone())
    }
}

/// Renders a float the way Python's `str()` does: a whole number still carries
/// a trailing `.0`, matching `Number.__repr__`'s `str(self.value)`.
fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

fn as_i64(v: &Value) -> i64 {
    match &v.kind {
        ValueKind::Int(n) => *n,
        ValueKind::Bool(b) => {
            if *b {
                1
            } else {
                0
            }
        }
        ValueKind::Float(n) => *n as i64,
        _ => 0,
    }
}

/// Resolves a possibly-negative index against `len`, Python-style (`-1` is the last element).
fn resolve_index(len: usize, i: i64) -> Option<usize> {
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved >= 0 && (resolved as usize) < len {
        Some(resolved as usize)
    } else {
        None
    }
}

impl ValueKind {
    fn loosely_eq(&self, other: &ValueKind) -> bool {
        match (self, other) {
            (ValueKind::Int(a), ValueKind::Int(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Float(b)) | (ValueKind::Float(b), ValueKind::Int(a)) => *a as f64 == *b,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::Int(a), ValueKind::Bool(b)) | (ValueKind::Bool(b), ValueKind::Int(a)) => {
                *a == if *b { 1 } else { 0 }
            }
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::List(a), ValueKind::List(b)) => {
                let a = a.borrow();
                let b = b.borrow();
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loosely_eq(y))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Int(n) => write!(f, "{}", n),
            ValueKind::Float(n) => write!(f, "{}", format_float(*n)),
            ValueKind::Bool(b) => write!(f, "{}", b),
            ValueKind::String(s) => write!(f, "{}", s),
            ValueKind::Null => write!(f, "null"),
            ValueKind::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.repr())?;
                }
                write!(f, "]")
            }
            ValueKind::Dict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v.repr())?;
                }
                write!(f, "}}")
            }
            ValueKind::Function(func) => {
                write!(f, "<function {}>", func.name.as_deref().unwrap_or("<anonymous>"))
            }
            ValueKind::BuiltinFunction(name) => write!(f, "<built-in function {}>", name),
        }
    }
}

impl Value {
    /// A repr-like rendering used for nested elements inside list/dict display.
    fn repr(&self) -> String {
        match &self.kind {
            ValueKind::String(s) => format!("\"{}\"", s),
            _ => self.to_string(),
        }
    }
}
