//! Tree-walking evaluation of a parsed snippet.

use std::cmp::Ordering;

use super::ast::{BinaryOp, CatchClause, Expr, LogicalOp, Stmt, UnaryOp, UpdateOp};
use super::scope::Scope;
use crate::value::{ErrorKind, NativeFunction, ObjectKind, ObjectRef, RenderError, Value};

/// Nesting limit for expression and statement evaluation.
pub const MAX_DEPTH: usize = 256;

/// A value in flight from `throw` to the nearest `catch`.
#[derive(Debug, Clone)]
pub struct Throw(pub Value);

pub type EvalResult<T = Value> = Result<T, Throw>;

/// Builds a thrown error of `kind`.
pub fn error(kind: ErrorKind, message: impl Into<String>) -> Throw {
    Throw(Value::Object(ObjectRef::error(kind, Some(message.into()))))
}

impl From<RenderError> for Throw {
    fn from(err: RenderError) -> Self {
        error(ErrorKind::RangeError, err.to_string())
    }
}

/// Where an assignment writes.
enum Reference {
    Binding(String),
    Property(Value, String),
}

/// Evaluation state for one snippet. Bindings live in the borrowed scope and
/// outlast the context.
pub struct EvaluationContext<'s> {
    pub scope: &'s mut Scope,
    pub depth: usize,
    pub max_depth: usize,
}

impl<'s> EvaluationContext<'s> {
    pub fn new(scope: &'s mut Scope) -> Self {
        Self {
            scope,
            depth: 0,
            max_depth: MAX_DEPTH,
        }
    }

    /// Runs a program and returns its completion value: the value of the last
    /// statement that produced one, `undefined` when none did.
    pub fn run(&mut self, program: &[Stmt]) -> EvalResult {
        Ok(self.exec_list(program)?.unwrap_or_default())
    }

    // ========================================================================
    // STATEMENTS
    // ========================================================================

    fn exec_list(&mut self, stmts: &[Stmt]) -> EvalResult<Option<Value>> {
        let mut completion = None;
        for stmt in stmts {
            if let Some(value) = self.exec(stmt)? {
                completion = Some(value);
            }
        }
        Ok(completion)
    }

    fn exec(&mut self, stmt: &Stmt) -> EvalResult<Option<Value>> {
        self.enter()?;
        let result = self.exec_inner(stmt);
        self.depth -= 1;
        result
    }

    fn exec_inner(&mut self, stmt: &Stmt) -> EvalResult<Option<Value>> {
        match stmt {
            Stmt::Empty => Ok(None),
            Stmt::Expr(expr) => self.eval(expr).map(Some),
            Stmt::Var(declarations) => {
                for (name, init) in declarations {
                    self.scope.declare(name);
                    if let Some(init) = init {
                        let value = self.eval(init)?;
                        self.scope.assign(name, value);
                    }
                }
                Ok(None)
            }
            Stmt::Block(body) => self.exec_list(body),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.to_boolean() {
                    self.exec(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(None)
                }
            }
            Stmt::Throw(expr) => Err(Throw(self.eval(expr)?)),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_list(block);
                if let Some(CatchClause { param, body }) = handler {
                    if let Err(Throw(thrown)) = result {
                        self.scope.push_frame(param, thrown);
                        result = self.exec_list(body);
                        self.scope.pop_frame();
                    }
                }
                if let Some(finalizer) = finalizer {
                    // A normal `finally` keeps the earlier outcome; a throw
                    // from it replaces that outcome.
                    self.exec_list(finalizer)?;
                }
                result
            }
        }
    }

    // ========================================================================
    // EXPRESSIONS
    // ========================================================================

    pub fn eval(&mut self, expr: &Expr) -> EvalResult {
        self.enter()?;
        let result = self.eval_inner(expr);
        self.depth -= 1;
        result
    }

    fn enter(&mut self) -> EvalResult<()> {
        if self.depth >= self.max_depth {
            return Err(error(
                ErrorKind::RangeError,
                "Maximum nesting depth exceeded",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn eval_inner(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self.lookup(name),
            Expr::Object(properties) => {
                let object = ObjectRef::plain();
                for (key, value) in properties {
                    let value = self.eval(value)?;
                    object.set(key, value);
                }
                Ok(Value::Object(object))
            }
            Expr::Member { object, property } => {
                let base = self.eval(object)?;
                get_property(&base, property)
            }
            Expr::Index { object, index } => {
                let base = self.eval(object)?;
                let key = self.eval(index)?.render()?;
                get_property(&base, &key)
            }
            Expr::Call { callee, args } => {
                let function = self.eval(callee)?;
                let args = self.eval_args(args)?;
                call(&function, &args, false, callee)
            }
            Expr::New { callee, args } => {
                let function = self.eval(callee)?;
                let args = self.eval_args(args)?;
                call(&function, &args, true, callee)
            }
            Expr::Unary { op, operand } => self.eval_unary(*op, operand),
            Expr::Update { op, prefix, target } => {
                let reference = self.resolve(target)?;
                let old = self.read(&reference)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write(reference, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            Expr::Logical { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.to_boolean()) {
                    (LogicalOp::And, true) | (LogicalOp::Or, false) => self.eval(rhs),
                    _ => Ok(lhs),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.to_boolean() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Assign { op, target, value } => {
                let reference = self.resolve(target)?;
                let value = match op.binary() {
                    None => self.eval(value)?,
                    Some(arithmetic) => {
                        let old = self.read(&reference)?;
                        let rhs = self.eval(value)?;
                        binary(arithmetic, &old, &rhs)?
                    }
                };
                self.write(reference, value.clone())?;
                Ok(value)
            }
            Expr::Sequence(items) => {
                let mut last = Value::Undefined;
                for item in items {
                    last = self.eval(item)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult {
        if op == UnaryOp::TypeOf {
            // `typeof` of an undeclared name is not an error.
            if let Expr::Ident(name) = operand {
                if !self.scope.is_declared(name) {
                    return Ok(Value::from("undefined"));
                }
            }
            return Ok(Value::from(self.eval(operand)?.type_of()));
        }
        let value = self.eval(operand)?;
        Ok(match op {
            UnaryOp::Not => Value::Boolean(!value.to_boolean()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus | UnaryOp::TypeOf => Value::Number(value.to_number()),
        })
    }

    // ========================================================================
    // REFERENCES
    // ========================================================================

    fn lookup(&self, name: &str) -> EvalResult {
        self.scope
            .lookup(name)
            .ok_or_else(|| error(ErrorKind::ReferenceError, format!("{name} is not defined")))
    }

    fn resolve(&mut self, target: &Expr) -> EvalResult<Reference> {
        match target {
            Expr::Ident(name) => Ok(Reference::Binding(name.clone())),
            Expr::Member { object, property } => {
                Ok(Reference::Property(self.eval(object)?, property.clone()))
            }
            Expr::Index { object, index } => {
                let base = self.eval(object)?;
                let key = self.eval(index)?.render()?;
                Ok(Reference::Property(base, key))
            }
            _ => Err(error(
                ErrorKind::ReferenceError,
                "Invalid left-hand side in assignment",
            )),
        }
    }

    fn read(&self, reference: &Reference) -> EvalResult {
        match reference {
            Reference::Binding(name) => self.lookup(name),
            Reference::Property(base, key) => get_property(base, key),
        }
    }

    fn write(&mut self, reference: Reference, value: Value) -> EvalResult<()> {
        match reference {
            Reference::Binding(name) => {
                self.scope.assign(&name, value);
                Ok(())
            }
            Reference::Property(Value::Object(object), key) => {
                object.set(&key, value);
                Ok(())
            }
            Reference::Property(base @ (Value::Undefined | Value::Null), key) => Err(error(
                ErrorKind::TypeError,
                format!("Cannot set property '{key}' of {}", type_name(&base)),
            )),
            // Writes to primitives are silently dropped.
            Reference::Property(_, _) => Ok(()),
        }
    }
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// `null` by name, `typeof` for everything else.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        other => other.type_of(),
    }
}

fn get_property(base: &Value, key: &str) -> EvalResult {
    match base {
        Value::Undefined | Value::Null => Err(error(
            ErrorKind::TypeError,
            format!("Cannot read property '{key}' of {}", type_name(base)),
        )),
        Value::String(s) if key == "length" => {
            Ok(Value::Number(s.encode_utf16().count() as f64))
        }
        Value::Object(object) => Ok(object.get(key).unwrap_or_default()),
        _ => Ok(Value::Undefined),
    }
}

fn call(function: &Value, args: &[Value], construct: bool, callee: &Expr) -> EvalResult {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let kind = function.as_object().map(ObjectRef::kind);
    match kind {
        Some(ObjectKind::ErrorConstructor(kind)) => {
            let message = match arg(0) {
                Value::Undefined => None,
                message => Some(message.render()?),
            };
            Ok(Value::Object(ObjectRef::error(kind, message)))
        }
        Some(ObjectKind::Native(native)) if !construct => Ok(match native {
            NativeFunction::String if args.is_empty() => Value::from(""),
            NativeFunction::String => Value::String(arg(0).render()?),
            NativeFunction::Number if args.is_empty() => Value::Number(0.0),
            NativeFunction::Number => Value::Number(arg(0).to_number()),
            NativeFunction::Boolean => Value::Boolean(arg(0).to_boolean()),
            NativeFunction::IsNaN => Value::Boolean(arg(0).to_number().is_nan()),
        }),
        Some(ObjectKind::Native(_)) => Err(error(
            ErrorKind::TypeError,
            format!("{} is not a constructor", describe(callee)),
        )),
        _ if construct => Err(error(
            ErrorKind::TypeError,
            format!("{} is not a constructor", describe(callee)),
        )),
        _ => Err(error(
            ErrorKind::TypeError,
            format!("{} is not a function", describe(callee)),
        )),
    }
}

/// Source-ish text for an expression named in an error message.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{property}", describe(object)),
        _ => "expression".to_string(),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult {
    let number = |f: fn(f64, f64) -> f64| Value::Number(f(lhs.to_number(), rhs.to_number()));
    Ok(match op {
        BinaryOp::Add => {
            let (lhs, rhs) = (lhs.to_primitive()?, rhs.to_primitive()?);
            match (&lhs, &rhs) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Value::String(format!("{}{}", lhs.render()?, rhs.render()?))
                }
                _ => Value::Number(lhs.to_number() + rhs.to_number()),
            }
        }
        BinaryOp::Sub => number(|a, b| a - b),
        BinaryOp::Mul => number(|a, b| a * b),
        BinaryOp::Div => number(|a, b| a / b),
        BinaryOp::Rem => number(|a, b| a % b),
        BinaryOp::Lt => Value::Boolean(compare(lhs, rhs)? == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Boolean(compare(lhs, rhs)? == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Boolean(matches!(
            compare(lhs, rhs)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Ge => Value::Boolean(matches!(
            compare(lhs, rhs)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::StrictEq => Value::Boolean(lhs.strict_equals(rhs)),
        BinaryOp::StrictNe => Value::Boolean(!lhs.strict_equals(rhs)),
        BinaryOp::LooseEq => Value::Boolean(lhs.loose_equals(rhs)),
        BinaryOp::LooseNe => Value::Boolean(!lhs.loose_equals(rhs)),
    })
}

/// Relational comparison: strings by UTF-16 code units, everything else as
/// numbers. `None` when either side is NaN.
fn compare(lhs: &Value, rhs: &Value) -> EvalResult<Option<Ordering>> {
    let (lhs, rhs) = (lhs.to_primitive()?, rhs.to_primitive()?);
    Ok(match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
        _ => lhs.to_number().partial_cmp(&rhs.to_number()),
    })
}
