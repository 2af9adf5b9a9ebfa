// ABOUTME: Tree-walking evaluator that executes a parsed Program

use crate::ast::{BinOp, Expr, Program, Stmt, UnOp};
use crate::env::Environment;
use crate::error::EvalError;
use crate::stdlib;
use crate::value::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Clone)]
struct FuncDef {
    params: Vec<String>,
    body: Rc<Vec<Stmt>>,
}

/// Internal control-flow signal threaded out of statement execution.
/// Never crosses the evaluator's public API — `run_program` and
/// `call_function` both unwrap it into a plain `Value`.
enum Flow {
    Normal,
    Return(Value),
}

/// Executes a single parsed program against its own global environment and
/// function table. Callers that need REPL-style isolation between chunks
/// construct a fresh `Evaluator` per chunk rather than reusing one.
pub struct Evaluator {
    globals: Rc<Environment>,
    functions: RefCell<HashMap<String, FuncDef>>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            globals: Environment::new(),
            functions: RefCell::new(HashMap::new()),
        }
    }

    /// Phase (a): hoist every top-level `FuncDecl`. Phase (b): execute the
    /// remaining top-level statements in order against the global
    /// environment. If `Main` was declared, call it with zero arguments and
    /// return its result; otherwise the program has no explicit result.
    pub fn run_program(&self, program: &Program) -> Result<Value, EvalError> {
        for stmt in &program.body {
            if let Stmt::FuncDecl {
                name, params, body, ..
            } = stmt
            {
                self.register_function(name, params, body);
            }
        }
        for stmt in &program.body {
            if matches!(stmt, Stmt::FuncDecl { .. }) {
                continue;
            }
            if let Flow::Return(_) = self.exec_stmt(&self.globals, stmt)? {
                // A stray top-level `return` has no call frame to unwind to;
                // it simply ends top-level execution early.
                return Ok(Value::Null);
            }
        }
        if self.functions.borrow().contains_key("Main") {
            return self.call_function("Main", &[]);
        }
        Ok(Value::Null)
    }

    fn register_function(&self, name: &str, params: &[String], body: &[Stmt]) {
        self.functions.borrow_mut().insert(
            name.to_string(),
            FuncDef {
                params: params.to_vec(),
                body: Rc::new(body.to_vec()),
            },
        );
    }

    fn call_function(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let def = self
            .functions
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedSymbol(name.to_string()))?;
        let locals = Environment::snapshot_of(&self.globals);
        for (param, arg) in def.params.iter().zip(args.iter()) {
            locals.define(param.clone(), arg.clone());
        }
        match self.exec_block(&locals, &def.body)? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Null),
        }
    }

    fn exec_block(&self, env: &Environment, body: &[Stmt]) -> Result<Flow, EvalError> {
        for stmt in body {
            if let Flow::Return(v) = self.exec_stmt(env, stmt)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&self, env: &Environment, stmt: &Stmt) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Block { body } => self.exec_block(env, body),
            Stmt::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(e) => self.eval_expr(env, e)?,
                    None => Value::Null,
                };
                env.define(name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, value } => self.exec_assign(env, target, value),
            Stmt::ExprStmt { expr } => {
                self.eval_expr(env, expr)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(env, cond)?.is_truthy() {
                    self.exec_stmt(env, then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(env, else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_expr(env, cond)?.is_truthy() {
                    if let Flow::Return(v) = self.exec_stmt(env, body)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
            } => {
                if let Some(init) = init {
                    self.exec_stmt(env, init)?;
                }
                loop {
                    let keep_going = match cond {
                        Some(c) => self.eval_expr(env, c)?.is_truthy(),
                        None => true,
                    };
                    if !keep_going {
                        break;
                    }
                    if let Flow::Return(v) = self.exec_stmt(env, body)? {
                        return Ok(Flow::Return(v));
                    }
                    if let Some(post) = post {
                        self.eval_expr(env, post)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Foreach {
                var_name,
                seq_name,
                body,
            } => {
                let seq = self
                    .resolve_simple(env, seq_name)
                    .ok_or_else(|| EvalError::UndefinedSymbol(seq_name.clone()))?;
                let items = match seq {
                    Value::Sequence(s) => s.borrow().clone(),
                    other => {
                        return Err(EvalError::type_mismatch(
                            "foreach",
                            "Sequence",
                            other.type_name(),
                        ))
                    }
                };
                // The loop variable persists in `env` after the loop ends,
                // per spec.md 4.3.
                for item in items {
                    env.define(var_name.clone(), item);
                    if let Flow::Return(v) = self.exec_stmt(env, body)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return { value } => {
                let v = match value {
                    Some(e) => self.eval_expr(env, e)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(v))
            }
            Stmt::FuncDecl {
                name, params, body, ..
            } => {
                self.register_function(name, params, body);
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_assign(&self, env: &Environment, target: &Expr, value: &Expr) -> Result<Flow, EvalError> {
        let val = self.eval_expr(env, value)?;
        match target {
            Expr::VarRef { name } => {
                // Local-then-global-then-new, per spec.md 3's assignment
                // invariant and DESIGN.md's "assignment fall-through" note.
                if env.contains(name) {
                    env.update(name, val);
                } else if self.globals.contains(name) {
                    self.globals.update(name, val);
                } else {
                    env.define(name.clone(), val);
                }
                Ok(Flow::Normal)
            }
            Expr::Index { target, index } => {
                let seq = self
                    .resolve_simple(env, target)
                    .ok_or_else(|| EvalError::UndefinedSymbol(target.clone()))?;
                let idx = self.eval_expr(env, index)?;
                let i = as_index(&idx)?;
                match seq {
                    Value::Sequence(s) => {
                        let mut items = s.borrow_mut();
                        let len = items.len();
                        if i < 0 || i as usize >= len {
                            return Err(EvalError::IndexOutOfRange { index: i, len });
                        }
                        items[i as usize] = val;
                        Ok(Flow::Normal)
                    }
                    other => Err(EvalError::type_mismatch(
                        "index assignment",
                        "Sequence",
                        other.type_name(),
                    )),
                }
            }
            _ => unreachable!("the parser only ever produces VarRef/Index assignment targets"),
        }
    }

    fn eval_expr(&self, env: &Environment, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::IntLiteral { value } => Ok(Value::Integer(*value)),
            Expr::FloatLiteral { value } => Ok(Value::Float(*value)),
            Expr::StringLiteral { value } => Ok(Value::Str(value.clone())),
            Expr::BoolLiteral { value } => Ok(Value::Bool(*value)),
            Expr::VarRef { name } => {
                if name.contains('.') {
                    stdlib::resolve_dotted(name).ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))
                } else {
                    self.resolve_simple(env, name)
                        .ok_or_else(|| EvalError::UndefinedSymbol(name.clone()))
                }
            }
            Expr::Call { callee, args } => self.eval_call(env, callee, args),
            Expr::Index { target, index } => {
                let seq = self
                    .resolve_simple(env, target)
                    .ok_or_else(|| EvalError::UndefinedSymbol(target.clone()))?;
                let idx = self.eval_expr(env, index)?;
                let i = as_index(&idx)?;
                match seq {
                    Value::Sequence(s) => {
                        let items = s.borrow();
                        if i < 0 || i as usize >= items.len() {
                            return Err(EvalError::IndexOutOfRange {
                                index: i,
                                len: items.len(),
                            });
                        }
                        Ok(items[i as usize].clone())
                    }
                    other => Err(EvalError::type_mismatch("index", "Sequence", other.type_name())),
                }
            }
            Expr::Unary { op, operand } => {
                let v = self.eval_expr(env, operand)?;
                eval_unary_op(*op, v)
            }
            Expr::Binary { op, left, right } => match op {
                BinOp::And => {
                    let l = self.eval_expr(env, left)?;
                    if !l.is_truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let r = self.eval_expr(env, right)?;
                    Ok(Value::Bool(r.is_truthy()))
                }
                BinOp::Or => {
                    let l = self.eval_expr(env, left)?;
                    if l.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let r = self.eval_expr(env, right)?;
                    Ok(Value::Bool(r.is_truthy()))
                }
                _ => {
                    let l = self.eval_expr(env, left)?;
                    let r = self.eval_expr(env, right)?;
                    eval_binary_op(*op, l, r)
                }
            },
        }
    }

    fn eval_call(&self, env: &Environment, callee: &str, args: &[Expr]) -> Result<Value, EvalError> {
        if let Some(Value::Builtin(_, f)) = stdlib::resolve_dotted(callee) {
            let argv = self.eval_args(env, args)?;
            return f(&argv);
        }
        if callee == "List" {
            if let Some(Value::Builtin(_, f)) = stdlib::resolve_bare("List") {
                let argv = self.eval_args(env, args)?;
                return f(&argv);
            }
        }
        if self.functions.borrow().contains_key(callee) {
            let argv = self.eval_args(env, args)?;
            return self.call_function(callee, &argv);
        }
        if let Some((head, method)) = callee.split_once('.') {
            if let Some(Value::Sequence(seq)) = self.resolve_simple(env, head) {
                let argv = self.eval_args(env, args)?;
                return stdlib::call_sequence_method(&seq, method, &argv);
            }
        }
        if let Some(value) = self.resolve_simple(env, callee) {
            if let Value::Builtin(_, f) = value {
                let argv = self.eval_args(env, args)?;
                return f(&argv);
            }
            return Err(EvalError::NotCallable(callee.to_string()));
        }
        Err(EvalError::UndefinedSymbol(callee.to_string()))
    }

    fn eval_args(&self, env: &Environment, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|a| self.eval_expr(env, a)).collect()
    }

    /// Resolves a non-dotted name: current local environment, then the
    /// global environment, then the fixed standard library (spec.md 3's
    /// lookup-order invariant). At top level `env` and `self.globals` are
    /// the same environment, so the second step is a no-op there.
    fn resolve_simple(&self, env: &Environment, name: &str) -> Option<Value> {
        env.get(name)
            .or_else(|| self.globals.get(name))
            .or_else(|| stdlib::resolve_bare(name))
    }
}

fn as_index(v: &Value) -> Result<i64, EvalError> {
    match v {
        Value::Integer(n) => Ok(*n),
        other => Err(EvalError::type_mismatch("index", "Integer", other.type_name())),
    }
}

fn eval_unary_op(op: UnOp, v: Value) -> Result<Value, EvalError> {
    match op {
        UnOp::Not => Ok(Value::Bool(!v.is_truthy())),
        UnOp::Neg => match v {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            other => Err(EvalError::type_mismatch("-", "Integer or Float", other.type_name())),
        },
        UnOp::Pos => match v {
            Value::Integer(_) | Value::Float(_) => Ok(v),
            other => Err(EvalError::type_mismatch("+", "Integer or Float", other.type_name())),
        },
    }
}

fn eval_binary_op(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => add_values(l, r),
        BinOp::Sub => arith(l, r, "-", |a, b| a - b, |a, b| a - b),
        BinOp::Mul => arith(l, r, "*", |a, b| a * b, |a, b| a * b),
        BinOp::Div => div_mod(l, r, "/", true),
        BinOp::Mod => div_mod(l, r, "%", false),
        BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinOp::NotEq => Ok(Value::Bool(!values_equal(&l, &r))),
        BinOp::Lt => compare(l, r, "<", |o| o == Ordering::Less),
        BinOp::Gt => compare(l, r, ">", |o| o == Ordering::Greater),
        BinOp::LtEq => compare(l, r, "<=", |o| o != Ordering::Greater),
        BinOp::GtEq => compare(l, r, ">=", |o| o != Ordering::Less),
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators are handled in eval_expr"),
    }
}

fn add_values(l: Value, r: Value) -> Result<Value, EvalError> {
    match (&l, &r) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
        _ => {
            let a = l.as_f64("+")?;
            let b = r.as_f64("+")?;
            Ok(Value::Float(a + b))
        }
    }
}

fn arith(l: Value, r: Value, op: &str, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    if let (Value::Integer(a), Value::Integer(b)) = (&l, &r) {
        return Ok(Value::Integer(int_op(*a, *b)));
    }
    let a = l.as_f64(op)?;
    let b = r.as_f64(op)?;
    Ok(Value::Float(float_op(a, b)))
}

/// `/` and `%` always widen to `f64` to compute, then re-narrow to
/// `Integer` iff both operands were `Integer` and the result has no
/// fractional part (SPEC_FULL.md 9's resolution of the numeric-tower open
/// question). Division or modulo by zero is always a `DivisionByZero`
/// error, never an infinity or NaN.
fn div_mod(l: Value, r: Value, op: &str, is_div: bool) -> Result<Value, EvalError> {
    let both_int = l.is_integer() && r.is_integer();
    let a = l.as_f64(op)?;
    let b = r.as_f64(op)?;
    if b == 0.0 {
        return Err(EvalError::DivisionByZero { op: op.to_string() });
    }
    let result = if is_div { a / b } else { a % b };
    if both_int && result.fract() == 0.0 {
        Ok(Value::Integer(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

fn compare(l: Value, r: Value, op: &str, pred: fn(Ordering) -> bool) -> Result<Value, EvalError> {
    let ordering = match (&l, &r) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            let a = l.as_f64(op)?;
            let b = r.as_f64(op)?;
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::type_mismatch(op, "comparable values", "NaN"))?
        }
    };
    Ok(Value::Bool(pred(ordering)))
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => (*a as f64) == *b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Sequence(a), Value::Sequence(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        _ => false,
    }
}

/// Convenience entry point: runs `src` against a brand-new `Evaluator`.
/// Used by the `run` CLI command and by the REPL, which constructs one per
/// buffered chunk so chunks never share state (SPEC_FULL.md 9).
pub fn run_source(src: &str) -> Result<Value, crate::error::TlError> {
    let program = crate::parser::parse(src)?;
    Ok(Evaluator::new().run_program(&program)?)
}
