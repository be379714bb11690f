//! Expression evaluation against a concrete variable environment.
//!
//! One [`Evaluator`] call handles one timestep: `environment` holds each
//! time series's values up to and including the current step, so
//! `customers[t]` reads the value just computed this step while
//! `customers[t-1]` reads history and `customers[t+1]` is rejected as a
//! forward reference (`E0300`) — the runtime only ever moves forward.

use crate::diagnostic::{Diagnostic, ErrorCode};
use crate::ir::{IrExpr, IrLiteral};
use pel_base::Span;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Text(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }
}

/// One variable's running history: every value computed for it so far,
/// indexed by timestep.
pub type History = HashMap<String, Vec<f64>>;

pub struct Evaluator<'a> {
    pub history: &'a History,
    pub locals: HashMap<String, Value>,
    pub current_step: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(history: &'a History, current_step: usize) -> Self {
        Self {
            history,
            locals: HashMap::new(),
            current_step,
        }
    }

    pub fn eval(&mut self, expr: &IrExpr) -> Result<Value, Diagnostic> {
        match expr {
            IrExpr::Literal { value } => Ok(self.eval_literal(value)),
            IrExpr::Variable { name } => self.lookup(name),
            IrExpr::BinaryOp { op, left, right } => self.eval_binary(op, left, right),
            IrExpr::UnaryOp { op, operand } => {
                let v = self.eval(operand)?;
                match op.as_str() {
                    "-" => Ok(Value::Number(-v.as_number().unwrap_or(0.0))),
                    "!" => Ok(Value::Boolean(!v.as_bool().unwrap_or(false))),
                    _ => Ok(v),
                }
            }
            IrExpr::FunctionCall { callee, args } => self.eval_call(callee, args),
            IrExpr::Indexing { target, index } => self.eval_index(target, index),
            IrExpr::ArrayLiteral { items } => {
                let values = items
                    .iter()
                    .map(|i| self.eval(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            IrExpr::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond = self.eval(condition)?.as_bool().unwrap_or(false);
                if cond {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
            IrExpr::Lambda { .. } => Ok(Value::Number(0.0)),
            IrExpr::MemberAccess { .. } => Ok(Value::Number(0.0)),
            IrExpr::Distribution { .. } => Err(Diagnostic::new(
                ErrorCode::Internal,
                "distributions must be resolved before evaluation",
            )),
            IrExpr::Block { statements, tail } => {
                for s in statements {
                    self.eval_stmt(s)?;
                }
                match tail {
                    Some(t) => self.eval(t),
                    None => Ok(Value::Number(0.0)),
                }
            }
        }
    }

    fn eval_literal(&self, lit: &IrLiteral) -> Value {
        match lit {
            IrLiteral::Number { value } => Value::Number(*value),
            IrLiteral::Currency { amount, .. } => Value::Number(*amount),
            IrLiteral::Duration { text } => Value::Number(parse_duration_magnitude(text)),
            IrLiteral::Boolean { value } => Value::Boolean(*value),
            IrLiteral::Text { value } => Value::Text(value.clone()),
        }
    }

    fn eval_stmt(&mut self, stmt: &crate::ir::IrStmt) -> Result<(), Diagnostic> {
        use crate::ir::IrStmt;
        match stmt {
            IrStmt::VarDecl { name, value, .. } => {
                let v = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Number(0.0),
                };
                self.locals.insert(name.clone(), v);
            }
            IrStmt::Assignment { target, value } => {
                if let IrExpr::Variable { name } = target {
                    let v = self.eval(value)?;
                    self.locals.insert(name.clone(), v);
                }
            }
            IrStmt::Expr { expr } => {
                self.eval(expr)?;
            }
            IrStmt::Return { .. } => {}
            IrStmt::EmitEvent { args, .. } => {
                for (_, e) in args {
                    self.eval(e)?;
                }
            }
            IrStmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.as_bool().unwrap_or(false) {
                    for s in then_branch {
                        self.eval_stmt(s)?;
                    }
                } else if let Some(b) = else_branch {
                    for s in b {
                        self.eval_stmt(s)?;
                    }
                }
            }
            IrStmt::For { var, iterable, body } => {
                let iter = self.eval(iterable)?;
                if let Value::Array(items) = iter {
                    for item in items {
                        self.locals.insert(var.clone(), item);
                        for s in body {
                            self.eval_stmt(s)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, Diagnostic> {
        if name == "t" {
            return Ok(Value::Number(self.current_step as f64));
        }
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(series) = self.history.get(name) {
            if let Some(&v) = series.get(self.current_step) {
                return Ok(Value::Number(v));
            }
        }
        Err(Diagnostic::new(
            ErrorCode::UndefinedVariable,
            format!("undefined variable '{name}' during evaluation"),
        ))
    }

    fn eval_index(&mut self, target: &IrExpr, index: &IrExpr) -> Result<Value, Diagnostic> {
        let name = match target {
            IrExpr::Variable { name } => name.clone(),
            _ => {
                let t = self.eval(target)?;
                if let Value::Array(items) = t {
                    let idx = self.eval(index)?.as_number().unwrap_or(0.0) as i64;
                    return items
                        .get(idx.max(0) as usize)
                        .cloned()
                        .ok_or_else(|| Diagnostic::new(ErrorCode::Internal, "index out of bounds"));
                }
                return Ok(t);
            }
        };
        let idx = self.eval(index)?.as_number().unwrap_or(0.0);
        let idx = idx.round() as i64;

        if idx as usize > self.current_step || idx < 0 {
            return Err(Diagnostic::new(
                ErrorCode::FutureReference,
                format!("'{name}[{idx}]' references a timestep that has not been computed yet"),
            ));
        }
        let series = self.history.get(&name).ok_or_else(|| {
            Diagnostic::new(ErrorCode::UndefinedVariable, format!("undefined series '{name}'"))
        })?;
        series
            .get(idx as usize)
            .map(|&v| Value::Number(v))
            .ok_or_else(|| {
                Diagnostic::new(
                    ErrorCode::FutureReference,
                    format!("'{name}[{idx}]' has not been computed yet"),
                )
            })
    }

    fn eval_binary(&mut self, op: &str, left: &IrExpr, right: &IrExpr) -> Result<Value, Diagnostic> {
        let l = self.eval(left)?;
        let r = self.eval(right)?;
        match op {
            "&&" => return Ok(Value::Boolean(l.as_bool().unwrap_or(false) && r.as_bool().unwrap_or(false))),
            "||" => return Ok(Value::Boolean(l.as_bool().unwrap_or(false) || r.as_bool().unwrap_or(false))),
            "==" => return Ok(Value::Boolean(values_equal(&l, &r))),
            "!=" => return Ok(Value::Boolean(!values_equal(&l, &r))),
            _ => {}
        }
        let ln = l.as_number().ok_or_else(|| numeric_error(left.clone()))?;
        let rn = r.as_number().ok_or_else(|| numeric_error(right.clone()))?;
        Ok(match op {
            "+" => Value::Number(ln + rn),
            "-" => Value::Number(ln - rn),
            "*" => Value::Number(ln * rn),
            "/" => Value::Number(if rn == 0.0 { f64::INFINITY } else { ln / rn }),
            "%" => Value::Number(if rn == 0.0 { 0.0 } else { ln % rn }),
            "^" => Value::Number(ln.powf(rn)),
            "<" => Value::Boolean(ln < rn),
            "<=" => Value::Boolean(ln <= rn),
            ">" => Value::Boolean(ln > rn),
            ">=" => Value::Boolean(ln >= rn),
            _ => return Err(Diagnostic::new(ErrorCode::Internal, format!("unknown operator '{op}'"))),
        })
    }

    fn eval_call(&mut self, callee: &str, args: &[IrExpr]) -> Result<Value, Diagnostic> {
        let values = args
            .iter()
            .map(|a| self.eval(a))
            .collect::<Result<Vec<_>, _>>()?;
        let nums: Vec<f64> = values.iter().filter_map(Value::as_number).collect();
        Ok(match callee {
            "min" => Value::Number(nums.iter().cloned().fold(f64::INFINITY, f64::min)),
            "max" => Value::Number(nums.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
            "abs" => Value::Number(nums.first().copied().unwrap_or(0.0).abs()),
            "sqrt" => Value::Number(nums.first().copied().unwrap_or(0.0).max(0.0).sqrt()),
            "floor" => Value::Number(nums.first().copied().unwrap_or(0.0).floor()),
            "ceil" => Value::Number(nums.first().copied().unwrap_or(0.0).ceil()),
            "round" => Value::Number(nums.first().copied().unwrap_or(0.0).round()),
            "sum" => Value::Number(nums.iter().sum()),
            "avg" | "mean" => {
                if nums.is_empty() {
                    Value::Number(0.0)
                } else {
                    Value::Number(nums.iter().sum::<f64>() / nums.len() as f64)
                }
            }
            _ => {
                return Err(Diagnostic::new(
                    ErrorCode::UndefinedVariable,
                    format!("call to unknown function '{callee}'"),
                ))
            }
        })
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => (x - y).abs() < f64::EPSILON,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => x == y,
        _ => false,
    }
}

fn numeric_error(expr: IrExpr) -> Diagnostic {
    let _ = expr;
    Diagnostic::new(ErrorCode::Internal, "expected a numeric operand").with_span(Span::unknown())
}

/// Interprets a lexed duration literal's magnitude in days, using the
/// same unit table the lexer recognizes.
fn parse_duration_magnitude(text: &str) -> f64 {
    for (unit, days) in [("mo", 30.0), ("yr", 365.0), ("day", 1.0), ("d", 1.0), ("q", 91.0), ("w", 7.0)] {
        if let Some(digits) = text.strip_suffix(unit) {
            if let Ok(n) = digits.parse::<f64>() {
                return n * days;
            }
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_current_step_succeeds_but_future_fails() {
        let mut history = History::new();
        history.insert("customers".to_string(), vec![100.0]);
        let mut ev = Evaluator::new(&history, 0);
        let ok = ev.eval_index(
            &IrExpr::Variable { name: "customers".into() },
            &IrExpr::Literal { value: IrLiteral::Number { value: 0.0 } },
        );
        assert_eq!(ok.unwrap(), Value::Number(100.0));

        let future = ev.eval_index(
            &IrExpr::Variable { name: "customers".into() },
            &IrExpr::Literal { value: IrLiteral::Number { value: 1.0 } },
        );
        assert_eq!(future.unwrap_err().code.as_str(), "E0300");
    }

    #[test]
    fn division_by_zero_is_positive_infinity() {
        let history = History::new();
        let mut ev = Evaluator::new(&history, 0);
        let v = ev
            .eval_binary(
                "/",
                &IrExpr::Literal { value: IrLiteral::Number { value: 5.0 } },
                &IrExpr::Literal { value: IrLiteral::Number { value: 0.0 } },
            )
            .unwrap();
        assert_eq!(v, Value::Number(f64::INFINITY));
    }

    #[test]
    fn duration_magnitude_in_days() {
        assert_eq!(parse_duration_magnitude("1mo"), 30.0);
        assert_eq!(parse_duration_magnitude("2yr"), 730.0);
    }
}
