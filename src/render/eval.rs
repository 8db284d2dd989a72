//! Expression evaluation against the render state.
use std::cmp::Ordering;
use std::rc::Rc;

use crate::{
    error::RenderErrorKind,
    parser::ast::{BinaryOp, Expr, UnaryOp},
    render::Render,
    value::{Callable, Compartment, Value, ValueMap},
    RenderResult,
};

impl<'render> Render<'render> {
    /// Evaluate an expression to a value.
    pub(crate) fn eval(&mut self, expr: &Expr) -> RenderResult<Value> {
        match expr {
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Integer(i) => Ok(Value::Integer(*i)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::List(out))
            }
            Expr::Dict(entries) => {
                let mut out = ValueMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key)? {
                        Value::String(s) => s,
                        other => {
                            return Err(self.error(
                                RenderErrorKind::Type(format!(
                                    "dict key must be a string, got {}",
                                    other.type_name()
                                )),
                            ))
                        }
                    };
                    let value = self.eval(value)?;
                    out.insert(key, value);
                }
                Ok(Value::Dict(out))
            }
            Expr::Variable(target) => self
                .scope()
                .lookup(&target.name, target.compartment)
                .ok_or_else(|| {
                    self.error(RenderErrorKind::UnknownVariable(
                        target.name.clone(),
                    ))
                }),
            Expr::Attribute(base, name) => {
                let value = self.eval(base)?;
                self.attribute(&value, name)
            }
            Expr::Item(base, key) => {
                let value = self.eval(base)?;
                let key = self.eval(key)?;
                self.item(&value, &key)
            }
            Expr::Call(base, args) => {
                let callee = self.eval(base)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_value(&callee, values)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand)?;
                self.unary(*op, value)
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let left = self.eval(lhs)?;
                if left.is_truthy() {
                    self.eval(rhs)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let left = self.eval(lhs)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(rhs)
                }
            }
            Expr::Binary(op, lhs, rhs) if op.is_comparison() => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                compare(*op, &left, &right)
                    .map(Value::Bool)
                    .map_err(|kind| self.error(kind))
            }
            Expr::Binary(op, lhs, rhs) => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                arith(*op, &left, &right)
                    .map_err(|kind| self.error(kind))
            }
        }
    }

    fn unary(&self, op: UnaryOp, value: Value) -> RenderResult<Value> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
            UnaryOp::Neg => match value {
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| {
                        self.error(RenderErrorKind::Arithmetic(
                            "integer overflow".to_string(),
                        ))
                    }),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(self.error(RenderErrorKind::Type(
                    format!("cannot negate {}", other.type_name()),
                ))),
            },
        }
    }

    fn attribute(
        &self,
        value: &Value,
        name: &str,
    ) -> RenderResult<Value> {
        match value {
            Value::Dict(entries) => {
                entries.get(name).cloned().ok_or_else(|| {
                    self.error(RenderErrorKind::UnknownVariable(
                        format!("attribute '{}'", name),
                    ))
                })
            }
            Value::Opaque(handle) => {
                handle.get_attr(name).ok_or_else(|| {
                    self.error(RenderErrorKind::UnknownVariable(
                        format!("attribute '{}'", name),
                    ))
                })
            }
            other => Err(self.error(RenderErrorKind::Type(format!(
                "cannot access attribute '{}' on {}",
                name,
                other.type_name()
            )))),
        }
    }

    fn item(&self, value: &Value, key: &Value) -> RenderResult<Value> {
        match value {
            Value::Dict(entries) => match key {
                Value::String(k) => {
                    entries.get(k.as_str()).cloned().ok_or_else(|| {
                        self.error(RenderErrorKind::Index(format!(
                            "unknown key '{}'",
                            k
                        )))
                    })
                }
                other => Err(self.error(RenderErrorKind::Type(
                    format!(
                        "dict keys are strings, got {}",
                        other.type_name()
                    ),
                ))),
            },
            Value::List(items) => match key {
                Value::Integer(i) => {
                    if *i < 0 || *i as usize >= items.len() {
                        Err(self.error(RenderErrorKind::Index(
                            format!(
                                "index {} out of range (len {})",
                                i,
                                items.len()
                            ),
                        )))
                    } else {
                        Ok(items[*i as usize].clone())
                    }
                }
                other => Err(self.error(RenderErrorKind::Type(
                    format!(
                        "list indices are integers, got {}",
                        other.type_name()
                    ),
                ))),
            },
            Value::Opaque(handle) => {
                handle.get_item(key).ok_or_else(|| {
                    self.error(RenderErrorKind::Index(format!(
                        "unknown item '{}'",
                        key.to_display()
                    )))
                })
            }
            other => Err(self.error(RenderErrorKind::Type(format!(
                "cannot index {}",
                other.type_name()
            )))),
        }
    }

    /// Invoke a callable value with already evaluated arguments.
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
    ) -> RenderResult<Value> {
        match callee {
            Value::Callable(Callable::Native(function)) => {
                let function = Rc::clone(function);
                function(&args).map_err(|e| {
                    e.located(self.template_name(), self.line())
                })
            }
            Value::Callable(Callable::Template(function)) => {
                let function = Rc::clone(function);
                if function.render_id != self.render_id() {
                    return Err(self.error(
                        RenderErrorKind::Internal(format!(
                            "function '{}' invoked outside its \
                             defining render",
                            function.name()
                        )),
                    ));
                }
                if args.len() != function.params().len() {
                    return Err(self.error(RenderErrorKind::Type(
                        format!(
                            "function '{}' expects {} arguments, \
                             got {}",
                            function.name(),
                            function.params().len(),
                            args.len()
                        ),
                    )));
                }
                let locals = function.locals.borrow().clone();
                let privates = function.privates.borrow().clone();
                self.scope_mut().push_call(locals, privates);
                for (param, arg) in
                    function.params().iter().zip(args.into_iter())
                {
                    self.scope_mut().set(
                        param,
                        Compartment::Local,
                        arg,
                    );
                }
                let result = self.render_nodes(function.body.as_slice());
                self.scope_mut().pop_call();
                result?;
                Ok(Value::None)
            }
            Value::Opaque(handle) => match handle.call(&args) {
                Some(result) => result.map_err(|e| {
                    e.located(self.template_name(), self.line())
                }),
                None => Err(self.error(RenderErrorKind::Type(
                    format!(
                        "{} is not callable",
                        callee.type_name()
                    ),
                ))),
            },
            other => Err(self.error(RenderErrorKind::Type(format!(
                "{} is not callable",
                other.type_name()
            )))),
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match *value {
        Value::Integer(i) => Some(i as f64),
        Value::Float(f) => Some(f),
        _ => None,
    }
}

/// Evaluate a comparison operator; also used by `switch` arms.
pub(crate) fn compare(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, RenderErrorKind> {
    match op {
        BinaryOp::Eq => equals(lhs, rhs),
        BinaryOp::NotEq => equals(lhs, rhs).map(|v| !v),
        _ => order(op, lhs, rhs),
    }
}

fn equals(lhs: &Value, rhs: &Value) -> Result<bool, RenderErrorKind> {
    // None is equal only to none; it never raises.
    let lhs_none = matches!(lhs, Value::None);
    let rhs_none = matches!(rhs, Value::None);
    if lhs_none || rhs_none {
        return Ok(lhs_none && rhs_none);
    }
    if let (Value::Integer(x), Value::Integer(y)) = (lhs, rhs) {
        return Ok(x == y);
    }
    if let (Some(x), Some(y)) = (numeric(lhs), numeric(rhs)) {
        return Ok(x == y);
    }
    match (lhs, rhs) {
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        (Value::List(_), Value::List(_))
        | (Value::Dict(_), Value::Dict(_))
        | (Value::Callable(_), Value::Callable(_))
        | (Value::Opaque(_), Value::Opaque(_)) => Ok(lhs == rhs),
        _ => Err(RenderErrorKind::Type(format!(
            "cannot compare {} and {}",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn order(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool, RenderErrorKind> {
    if let (Value::Integer(x), Value::Integer(y)) = (lhs, rhs) {
        return Ok(ordered(op, x.cmp(y)));
    }
    if let (Some(x), Some(y)) = (numeric(lhs), numeric(rhs)) {
        return Ok(match op {
            BinaryOp::Lt => x < y,
            BinaryOp::LtEq => x <= y,
            BinaryOp::Gt => x > y,
            BinaryOp::GtEq => x >= y,
            _ => false,
        });
    }
    if let (Value::String(x), Value::String(y)) = (lhs, rhs) {
        return Ok(ordered(op, x.cmp(y)));
    }
    Err(RenderErrorKind::Type(format!(
        "cannot compare {} and {} with '{}'",
        lhs.type_name(),
        rhs.type_name(),
        op.symbol()
    )))
}

fn ordered(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => false,
    }
}

fn arith(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, RenderErrorKind> {
    match (lhs, rhs) {
        (Value::Integer(x), Value::Integer(y)) => {
            integer_arith(op, *x, *y)
        }
        (Value::String(x), Value::String(y))
            if op == BinaryOp::Add =>
        {
            Ok(Value::String(format!("{}{}", x, y)))
        }
        (Value::List(x), Value::List(y)) if op == BinaryOp::Add => {
            let mut out = x.clone();
            out.extend(y.iter().cloned());
            Ok(Value::List(out))
        }
        _ => match (numeric(lhs), numeric(rhs)) {
            (Some(x), Some(y)) => float_arith(op, x, y),
            _ => Err(RenderErrorKind::Type(format!(
                "cannot apply '{}' to {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn integer_arith(
    op: BinaryOp,
    x: i64,
    y: i64,
) -> Result<Value, RenderErrorKind> {
    let overflow = || {
        RenderErrorKind::Arithmetic("integer overflow".to_string())
    };
    match op {
        BinaryOp::Add => {
            x.checked_add(y).map(Value::Integer).ok_or_else(overflow)
        }
        BinaryOp::Sub => {
            x.checked_sub(y).map(Value::Integer).ok_or_else(overflow)
        }
        BinaryOp::Mul => {
            x.checked_mul(y).map(Value::Integer).ok_or_else(overflow)
        }
        BinaryOp::Div => {
            if y == 0 {
                Err(RenderErrorKind::Arithmetic(
                    "division by zero".to_string(),
                ))
            } else {
                x.checked_div(y)
                    .map(Value::Integer)
                    .ok_or_else(overflow)
            }
        }
        BinaryOp::Mod => {
            if y == 0 {
                Err(RenderErrorKind::Arithmetic(
                    "modulus by zero".to_string(),
                ))
            } else {
                x.checked_rem(y)
                    .map(Value::Integer)
                    .ok_or_else(overflow)
            }
        }
        _ => Err(RenderErrorKind::Internal(format!(
            "operator '{}' dispatched as arithmetic",
            op.symbol()
        ))),
    }
}

fn float_arith(
    op: BinaryOp,
    x: f64,
    y: f64,
) -> Result<Value, RenderErrorKind> {
    match op {
        BinaryOp::Add => Ok(Value::Float(x + y)),
        BinaryOp::Sub => Ok(Value::Float(x - y)),
        BinaryOp::Mul => Ok(Value::Float(x * y)),
        BinaryOp::Div => {
            if y == 0.0 {
                Err(RenderErrorKind::Arithmetic(
                    "division by zero".to_string(),
                ))
            } else {
                Ok(Value::Float(x / y))
            }
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                Err(RenderErrorKind::Arithmetic(
                    "modulus by zero".to_string(),
                ))
            } else {
                Ok(Value::Float(x % y))
            }
        }
        _ => Err(RenderErrorKind::Internal(format!(
            "operator '{}' dispatched as arithmetic",
            op.symbol()
        ))),
    }
}
