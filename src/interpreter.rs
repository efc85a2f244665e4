//! Tree-walking interpreter: visits AST nodes, threading values and control-flow signals.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{BinOp, Node, NumberLit, UnaryOp};
use crate::builtins;
use crate::context::{Context, SymbolTable};
use crate::error::{CloudyError, ErrorKind};
use crate::value::{FunctionData, Value, ValueKind};

/// The outcome of visiting a node: at most one of value/error/a control-flow signal is set.
#[derive(Debug, Default)]
pub struct RTResult {
    pub value: Option<Value>,
    pub error: Option<CloudyError>,
    pub function_return_value: Option<Value>,
    pub loop_should_continue: bool,
    pub loop_should_break: bool,
}

impl RTResult {
    pub fn success(value: Value) -> Self {
        RTResult { value: Some(value), ..Default::default() }
    }

    pub fn success_return(value: Value) -> Self {
        RTResult { function_return_value: Some(value), ..Default::default() }
    }

    pub fn success_continue() -> Self {
        RTResult { loop_should_continue: true, ..Default::default() }
    }

    pub fn success_break() -> Self {
        RTResult { loop_should_break: true, ..Default::default() }
    }

    pub fn failure(error: CloudyError) -> Self {
        RTResult { error: Some(error), ..Default::default() }
    }

    pub fn should_return(&self) -> bool {
        self.error.is_some() || self.function_return_value.is_some() || self.loop_should_continue || self.loop_should_break
    }
}

/// Propagates an `RTResult` that should_return() out of the enclosing function early.
macro_rules! register {
    ($res:expr) => {{
        let r = $res;
        if r.should_return() {
            return RTResult { error: r.error, function_return_value: r.function_return_value,
                loop_should_continue: r.loop_should_continue, loop_should_break: r.loop_should_break, value: None };
        }
        r.value.unwrap()
    }};
}

pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Interpreter
    }

    pub fn visit(&self, node: &Node, ctx: Rc<Context>) -> RTResult {
        match node {
            Node::Number { value, span } => {
                let v = match value {
                    NumberLit::Int(n) => Value::int(*n),
                    NumberLit::Float(n) => Value::float(*n),
                };
                RTResult::success(v.with_pos(span.start.clone(), span.end.clone()).with_context(ctx))
            }
            Node::Bool { value, span } => {
                RTResult::success(Value::bool(*value).with_pos(span.start.clone(), span.end.clone()).with_context(ctx))
            }
            Node::String { value, span } => {
                RTResult::success(Value::string(value.clone()).with_pos(span.start.clone(), span.end.clone()).with_context(ctx))
            }
            Node::List { elements, span } => {
                let mut values = Vec::new();
                for el in elements {
                    let v = register!(self.visit(el, ctx.clone()));
                    values.push(v);
                }
                RTResult::success(Value::list(values).with_pos(span.start.clone(), span.end.clone()).with_context(ctx))
            }
            Node::Dict { pairs, span } => {
                let mut out = Vec::new();
                for (k, v) in pairs {
                    let key = register!(self.visit(k, ctx.clone()));
                    let key_str = match &key.kind {
                        ValueKind::String(s) => s.clone(),
                        _ => {
                            return RTResult::failure(CloudyError::new(
                                ErrorKind::TypeMismatch,
                                key.pos_start.clone(),
                                key.pos_end.clone(),
                                "dict keys must be strings",
                            ))
                        }
                    };
                    let val = register!(self.visit(v, ctx.clone()));
                    out.push((key_str, val));
                }
                RTResult::success(Value::dict(out).with_pos(span.start.clone(), span.end.clone()).with_context(ctx))
            }
            Node::VarAccess { name, span } => {
                let found = ctx.symbol_table.borrow().get(name);
                match found {
                Some(v) => RTResult::success(v.with_pos(span.start.clone(), span.end.clone()).with_context(ctx)),
                None => RTResult::failure(CloudyError::new(
                    ErrorKind::UndefinedName,
                    span.start.clone(),
                    span.end.clone(),
                    format!("'{}' is not defined", name),
                )
                .with_context(&ctx)),
                }
            }
            Node::VarAssign { name, value, span } => {
                let v = register!(self.visit(value, ctx.clone()));
                ctx.symbol_table.borrow_mut().set(name, v.clone());
                RTResult::success(v.with_pos(span.start.clone(), span.end.clone()))
            }
            Node::IndexAssign { target, index, value, span } => {
                let data = register!(self.visit(target, ctx.clone()));
                let idx = register!(self.visit(index, ctx.clone()));
                let val = register!(self.visit(value, ctx.clone()));
                match data.index_assign(&idx, val) {
                    Ok(()) => RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone())),
                    Err(e) => RTResult::failure(e.with_context(&ctx)),
                }
            }
            Node::Del { target, span } => self.visit_del(target, span, ctx),
            Node::Index { data, index, span } => {
                let d = register!(self.visit(data, ctx.clone()));
                let i = register!(self.visit(index, ctx.clone()));
                match d.index(&i) {
                    Ok(v) => RTResult::success(v.with_pos(span.start.clone(), span.end.clone()).with_context(ctx)),
                    Err(e) => RTResult::failure(e.with_context(&ctx)),
                }
            }
            Node::BinOp { left, op, right, span } => {
                let l = register!(self.visit(left, ctx.clone()));
                let r = register!(self.visit(right, ctx.clone()));
                let result = match op {
                    BinOp::Add => l.add(&r),
                    BinOp::Sub => l.sub(&r),
                    BinOp::Mul => l.mul(&r),
                    BinOp::Div => l.div(&r),
                    BinOp::FDiv => l.floordiv(&r),
                    BinOp::Mod => l.modu(&r),
                    BinOp::Pow => l.pow(&r),
                    BinOp::Eq => l.eq_value(&r),
                    BinOp::Ne => l.ne_value(&r),
                    BinOp::Lt => l.lt(&r),
                    BinOp::Lte => l.lte(&r),
                    BinOp::Gt => l.gt(&r),
                    BinOp::Gte => l.gte(&r),
                    BinOp::And => l.and(&r),
                    BinOp::Or => l.or(&r),
                    BinOp::In => l.contains(&r),
                    BinOp::NotIn => l.contains(&r).map(|v| Value::bool(!v.is_truthy())),
                };
                match result {
                    Ok(v) => RTResult::success(v.with_pos(span.start.clone(), span.end.clone()).with_context(ctx)),
                    Err(e) => RTResult::failure(e.with_context(&ctx)),
                }
            }
            Node::UnaryOp { op, operand, span } => {
                let v = register!(self.visit(operand, ctx.clone()));
                let result = match op {
                    UnaryOp::Neg => v.negate(),
                    UnaryOp::Plus => Ok(v.clone()),
                    UnaryOp::Not => Ok(v.logical_not()),
                };
                match result {
                    Ok(v) => RTResult::success(v.with_pos(span.start.clone(), span.end.clone()).with_context(ctx)),
                    Err(e) => RTResult::failure(e.with_context(&ctx)),
                }
            }
            Node::If { cases, else_case, span } => self.visit_if(cases, else_case, span, ctx),
            Node::For { var_name, start, end, step, body, should_return_null, span } => {
                self.visit_for(var_name, start, end, step.as_deref(), body, *should_return_null, span, ctx)
            }
            Node::While { condition, body, should_return_null, span } => {
                self.visit_while(condition, body, *should_return_null, span, ctx)
            }
            Node::FuncDef { name, arg_names, body, should_auto_return, span } => {
                let func = FunctionData {
                    name: name.clone(),
                    arg_names: arg_names.clone(),
                    body: (**body).clone(),
                    should_auto_return: *should_auto_return,
                    captured_context: ctx.clone(),
                };
                let v = Value::new(ValueKind::Function(Rc::new(func)))
                    .with_pos(span.start.clone(), span.end.clone())
                    .with_context(ctx.clone());
                if let Some(n) = name {
                    ctx.symbol_table.borrow_mut().set(n, v.clone());
                }
                RTResult::success(v)
            }
            Node::Call { callee, args, span } => self.visit_call(callee, args, span, ctx),
            Node::Return { value, .. } => match value {
                Some(v) => {
                    let val = register!(self.visit(v, ctx));
                    RTResult::success_return(val)
                }
                None => RTResult::success_return(Value::null()),
            },
            Node::Continue { .. } => RTResult::success_continue(),
            Node::Break { .. } => RTResult::success_break(),
            Node::Statements { statements, span } => {
                let mut last = Value::null().with_pos(span.start.clone(), span.end.clone());
                for stmt in statements {
                    last = register!(self.visit(stmt, ctx.clone()));
                }
                RTResult::success(last)
            }
        }
    }

    fn visit_del(&self, target: &Node, span: &crate::position::Span, ctx: Rc<Context>) -> RTResult {
        match target {
            Node::VarAccess { name, .. } => {
                if ctx.symbol_table.borrow_mut().remove(name) {
                    RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
                } else {
                    RTResult::failure(
                        CloudyError::new(ErrorKind::UndefinedName, span.start.clone(), span.end.clone(), format!("'{}' is not defined", name))
                            .with_context(&ctx),
                    )
                }
            }
            Node::Index { data, index, .. } => {
                let d = register!(self.visit(data, ctx.clone()));
                let i = register!(self.visit(index, ctx.clone()));
                match (&d.kind, &i.kind) {
                    (ValueKind::List(l), ValueKind::Int(idx)) => {
                        let mut list = l.borrow_mut();
                        let len = list.len() as i64;
                        let resolved = if *idx < 0 { idx + len } else { *idx };
                        if resolved >= 0 && resolved < len {
                            list.remove(resolved as usize);
                            RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
                        } else {
                            RTResult::failure(
                                CloudyError::new(ErrorKind::IndexOutOfRange, span.start.clone(), span.end.clone(), "list index out of range")
                                    .with_context(&ctx),
                            )
                        }
                    }
                    (ValueKind::Dict(dict), ValueKind::String(key)) => {
                        let mut pairs = dict.borrow_mut();
                        let before = pairs.len();
                        pairs.retain(|(k, _)| k != key);
                        if pairs.len() == before {
                            RTResult::failure(
                                CloudyError::new(ErrorKind::Runtime, span.start.clone(), span.end.clone(), format!("key '{}' not found", key))
                                    .with_context(&ctx),
                            )
                        } else {
                            RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
                        }
                    }
                    _ => RTResult::failure(
                        CloudyError::new(ErrorKind::TypeMismatch, span.start.clone(), span.end.clone(), "unsupported 'del' target")
                            .with_context(&ctx),
                    ),
                }
            }
            _ => RTResult::failure(
                CloudyError::new(ErrorKind::InvalidSyntax, span.start.clone(), span.end.clone(), "unsupported 'del' target")
                    .with_context(&ctx),
            ),
        }
    }

    fn visit_if(
        &self,
        cases: &[crate::ast::IfCase],
        else_case: &Option<crate::ast::ElseCase>,
        span: &crate::position::Span,
        ctx: Rc<Context>,
    ) -> RTResult {
        for case in cases {
            let cond = register!(self.visit(&case.condition, ctx.clone()));
            if cond.is_truthy() {
                let v = register!(self.visit(&case.body, ctx.clone()));
                return if case.should_return_null {
                    RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
                } else {
                    RTResult::success(v)
                };
            }
        }
        if let Some(else_case) = else_case {
            let v = register!(self.visit(&else_case.body, ctx));
            return if else_case.should_return_null {
                RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
            } else {
                RTResult::success(v)
            };
        }
        RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_for(
        &self,
        var_name: &str,
        start: &Node,
        end: &Node,
        step: Option<&Node>,
        body: &Node,
        should_return_null: bool,
        span: &crate::position::Span,
        ctx: Rc<Context>,
    ) -> RTResult {
        let start_val = register!(self.visit(start, ctx.clone()));
        let end_val = register!(self.visit(end, ctx.clone()));
        let step_val = match step {
            Some(s) => register!(self.visit(s, ctx.clone())),
            None => Value::int(1),
        };

        let start_i = as_loop_int(&start_val);
        let end_i = as_loop_int(&end_val);
        let step_i = match &step_val.kind {
            ValueKind::Int(n) => *n,
            _ => {
                return RTResult::failure(
                    CloudyError::new(ErrorKind::TypeMismatch, span.start.clone(), span.end.clone(), "'step' must be an Int")
                        .with_context(&ctx),
                )
            }
        };

        let mut values = Vec::new();
        let mut i = start_i;
        loop {
            if step_i >= 0 {
                if i >= end_i {
                    break;
                }
            } else if i <= end_i {
                break;
            }

            ctx.symbol_table.borrow_mut().set(var_name, Value::int(i));
            i += step_i;

            let res = self.visit(body, ctx.clone());
            if res.error.is_some() || res.function_return_value.is_some() {
                return res;
            }
            if res.loop_should_break {
                break;
            }
            if res.loop_should_continue {
                continue;
            }
            if let Some(v) = res.value {
                values.push(v);
            }
        }

        if should_return_null {
            RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
        } else {
            RTResult::success(Value::list(values).with_pos(span.start.clone(), span.end.clone()))
        }
    }

    fn visit_while(&self, condition: &Node, body: &Node, should_return_null: bool, span: &crate::position::Span, ctx: Rc<Context>) -> RTResult {
        let mut values = Vec::new();
        loop {
            let cond = register!(self.visit(condition, ctx.clone()));
            if !cond.is_truthy() {
                break;
            }

            let res = self.visit(body, ctx.clone());
            if res.error.is_some() || res.function_return_value.is_some() {
                return res;
            }
            if res.loop_should_break {
                break;
            }
            if res.loop_should_continue {
                continue;
            }
            if let Some(v) = res.value {
                values.push(v);
            }
        }

        if should_return_null {
            RTResult::success(Value::null().with_pos(span.start.clone(), span.end.clone()))
        } else {
            RTResult::success(Value::list(values).with_pos(span.start.clone(), span.end.clone()))
        }
    }

    fn visit_call(&self, callee: &Node, args: &[Node], span: &crate::position::Span, ctx: Rc<Context>) -> RTResult {
        let callee_val = register!(self.visit(callee, ctx.clone()));
        let mut arg_values = Vec::new();
        for a in args {
            arg_values.push(register!(self.visit(a, ctx.clone())));
        }

        match &callee_val.kind {
            ValueKind::Function(func) => self.call_function(func, arg_values, span, ctx),
            ValueKind::BuiltinFunction(name) => match builtins::call(name, &arg_values, span, &ctx) {
                Ok(v) => RTResult::success(v),
                Err(e) => RTResult::failure(e.with_context(&ctx)),
            },
            _ => RTResult::failure(
                CloudyError::new(ErrorKind::IllegalOperation, span.start.clone(), span.end.clone(), format!("{} is not callable", callee_val.type_name()))
                    .with_context(&ctx),
            ),
        }
    }

    fn call_function(&self, func: &FunctionData, args: Vec<Value>, span: &crate::position::Span, call_ctx: Rc<Context>) -> RTResult {
        if args.len() != func.arg_names.len() {
            return RTResult::failure(
                CloudyError::new(
                    ErrorKind::ArgumentCount,
                    span.start.clone(),
                    span.end.clone(),
                    format!("expected {} argument(s), got {}", func.arg_names.len(), args.len()),
                )
                .with_context(&call_ctx),
            );
        }

        let display_name = func.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
        let symbol_table = Rc::new(RefCell::new(SymbolTable::new(Some(func.captured_context.symbol_table.clone()))));
        for (name, value) in func.arg_names.iter().zip(args.into_iter()) {
            symbol_table.borrow_mut().set(name, value);
        }
        let exec_ctx = Context::new_child(display_name, func.captured_context.clone(), span.start.clone(), symbol_table);

        let res = self.visit(&func.body, exec_ctx);
        if res.error.is_some() {
            return res;
        }

        let value = if let Some(v) = res.function_return_value {
            v
        } else if func.should_auto_return {
            res.value.unwrap_or_else(Value::null)
        } else {
            Value::null()
        };

        RTResult::success(value.with_pos(span.start.clone(), span.end.clone()))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn as_loop_int(v: &Value) -> i64 {
    match &v.kind {
        ValueKind::Int(n) => *n,
        ValueKind::Float(n) => *n as i64,
        ValueKind::Bool(b) => {
            if *b {
                1
            } else {
                0
            }
        }
        _ => 0,
    }
}
