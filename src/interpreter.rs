// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{ArithOp, BoolOp, LogicOp, UnaryOp};
use crate::context::ExecutionContext;
use crate::lexer::Span;
use crate::program::*;
use crate::value::Value;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use anyhow::{bail, Result};
use log::info;

enum Slot {
    // Declared by `let` but not yet executed.
    Uninitialized,
    Value(Value),
    // Functions keep a weak link to their defining scope. Functions are not
    // values, so that scope is always an ancestor of any caller.
    Function(Rc<Function>, Weak<RefCell<Scope>>),
}

struct Scope {
    slots: BTreeMap<Rc<str>, Slot>,
    parent: Option<Env>,
}

type Env = Rc<RefCell<Scope>>;

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tree-walking interpreter for one compiled program.
pub struct Interpreter<'a> {
    program: &'a Program,
    ctx: &'a mut ExecutionContext,
}

fn new_scope(parent: Option<Env>) -> Env {
    Rc::new(RefCell::new(Scope {
        slots: BTreeMap::new(),
        parent,
    }))
}

fn located(span: &Span, e: anyhow::Error) -> anyhow::Error {
    span.error(&e.to_string())
}

impl<'a> Interpreter<'a> {
    pub fn new(program: &'a Program, ctx: &'a mut ExecutionContext) -> Self {
        Self { program, ctx }
    }

    /// Runs the program to completion.
    pub fn run(&mut self) -> Result<()> {
        info!("executing {}", self.program.source.file());
        let program = self.program;
        let env = new_scope(None);
        match self.exec_block_in(&program.body, &env)? {
            Flow::Normal => (),
            // Rejected by the compiler.
            _ => bail!("unexpected control flow at top level"),
        }
        info!(
            "finished {} after {} steps",
            self.program.source.file(),
            self.ctx.steps()
        );
        Ok(())
    }

    fn bind_block(&self, block: &Block, env: &Env) {
        let mut scope = env.borrow_mut();
        for name in &block.locals {
            scope.slots.insert(name.clone(), Slot::Uninitialized);
        }
        for f in &block.functions {
            scope
                .slots
                .insert(f.name.clone(), Slot::Function(f.clone(), Rc::downgrade(env)));
        }
    }

    fn exec_block(&mut self, block: &Block, parent: &Env) -> Result<Flow> {
        let env = new_scope(Some(parent.clone()));
        self.exec_block_in(block, &env)
    }

    fn exec_block_in(&mut self, block: &Block, env: &Env) -> Result<Flow> {
        self.bind_block(block, env);
        for stmt in &block.stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Statement, env: &Env) -> Result<Flow> {
        self.ctx.step()?;
        Ok(match stmt {
            Statement::Let { name, value } => {
                let value = self.eval(value, env)?;
                env.borrow_mut()
                    .slots
                    .insert(name.clone(), Slot::Value(value));
                Flow::Normal
            }
            Statement::Assign { target, value } => {
                let value = self.eval(value, env)?;
                self.assign(target, value, env)?;
                Flow::Normal
            }
            Statement::Expr(expr) => {
                self.eval(expr, env)?;
                Flow::Normal
            }
            Statement::If {
                cond,
                then_block,
                else_block,
            } => {
                if self.eval(cond, env)?.is_truthy() {
                    self.exec_block(then_block, env)?
                } else if let Some(else_block) = else_block {
                    self.exec_block(else_block, env)?
                } else {
                    Flow::Normal
                }
            }
            Statement::While { cond, body, .. } => {
                loop {
                    if !self.eval(cond, env)?.is_truthy() {
                        break;
                    }
                    match self.exec_block(body, env)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => (),
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    self.ctx.step()?;
                }
                Flow::Normal
            }
            Statement::Return(value) => Flow::Return(match value {
                Some(v) => self.eval(v, env)?,
                None => Value::Null,
            }),
            Statement::Break => Flow::Break,
            Statement::Continue => Flow::Continue,
            Statement::Block(block) => self.exec_block(block, env)?,
        })
    }

    fn lookup(&self, span: &Span, name: &str, env: &Env) -> Result<Value> {
        let mut scope = env.clone();
        loop {
            let parent = {
                let s = scope.borrow();
                match s.slots.get(name) {
                    Some(Slot::Value(v)) => return Ok(v.clone()),
                    Some(Slot::Uninitialized) => {
                        bail!(span.error(format!("`{name}` used before initialization").as_str()))
                    }
                    Some(Slot::Function(..)) => {
                        bail!(span.error(format!("`{name}` is a function").as_str()))
                    }
                    None => s.parent.clone(),
                }
            };
            match parent {
                Some(p) => scope = p,
                None => bail!(span.error(format!("`{name}` is not defined").as_str())),
            }
        }
    }

    fn lookup_function(&self, span: &Span, name: &str, env: &Env) -> Result<(Rc<Function>, Env)> {
        let mut scope = env.clone();
        loop {
            let parent = {
                let s = scope.borrow();
                match s.slots.get(name) {
                    Some(Slot::Function(f, defining)) => {
                        let defining = defining
                            .upgrade()
                            .ok_or_else(|| span.error("function scope is no longer alive"))?;
                        return Ok((f.clone(), defining));
                    }
                    Some(_) => bail!(span.error(format!("`{name}` is not a function").as_str())),
                    None => s.parent.clone(),
                }
            };
            match parent {
                Some(p) => scope = p,
                None => bail!(span.error(format!("function `{name}` is not defined").as_str())),
            }
        }
    }

    fn eval_path(&mut self, path: &[PathSegment], env: &Env) -> Result<Vec<Value>> {
        path.iter()
            .map(|segment| match segment {
                PathSegment::Field(f) => Ok(Value::String(f.clone())),
                PathSegment::Index(e) => self.eval(e, env),
            })
            .collect()
    }

    fn assign(&mut self, target: &Place, value: Value, env: &Env) -> Result<()> {
        match target {
            Place::Exports { span, path } => {
                let keys = self.eval_path(path, env)?;
                if keys.is_empty() {
                    return self.ctx.set_exports(value).map_err(|e| located(span, e));
                }
                let mut slot = self.ctx.exports_mut();
                for key in &keys {
                    slot = slot.get_mut(key).map_err(|e| located(span, e))?;
                }
                *slot = value;
                Ok(())
            }
            Place::Local { span, name, path } => {
                let keys = self.eval_path(path, env)?;
                let mut scope = env.clone();
                loop {
                    let parent = {
                        let mut guard = scope.borrow_mut();
                        let s = &mut *guard;
                        match s.slots.get_mut(name) {
                            Some(Slot::Value(current)) => {
                                let mut slot = current;
                                for key in &keys {
                                    slot = slot.get_mut(key).map_err(|e| located(span, e))?;
                                }
                                *slot = value;
                                return Ok(());
                            }
                            Some(Slot::Uninitialized) => bail!(span.error(
                                format!("`{name}` assigned before initialization").as_str()
                            )),
                            Some(Slot::Function(..)) => bail!(span.error(
                                format!("cannot assign to function `{name}`").as_str()
                            )),
                            None => s.parent.clone(),
                        }
                    };
                    match parent {
                        Some(p) => scope = p,
                        None => bail!(span.error(format!("`{name}` is not defined").as_str())),
                    }
                }
            }
        }
    }

    fn call(&mut self, span: &Span, name: &str, args: &[Expression], env: &Env) -> Result<Value> {
        let (function, defining) = self.lookup_function(span, name, env)?;
        if args.len() != function.params.len() {
            bail!(span.error(
                format!(
                    "`{name}` expects {} arguments. Got {}",
                    function.params.len(),
                    args.len()
                )
                .as_str()
            ));
        }

        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.eval(a, env)?);
        }

        self.ctx.enter_call()?;
        let frame = new_scope(Some(defining));
        {
            let mut scope = frame.borrow_mut();
            for (param, value) in function.params.iter().zip(values) {
                scope.slots.insert(param.clone(), Slot::Value(value));
            }
        }
        let flow = self.exec_block_in(&function.body, &frame);
        self.ctx.leave_call();

        Ok(match flow? {
            Flow::Return(v) => v,
            _ => Value::Null,
        })
    }

    fn eval_arith(&self, span: &Span, op: ArithOp, lhs: Value, rhs: Value) -> Result<Value> {
        match (op, &lhs, &rhs) {
            (_, Value::Number(a), Value::Number(b)) => {
                let n = match op {
                    ArithOp::Add => a.add(b),
                    ArithOp::Sub => a.sub(b),
                    ArithOp::Mul => a.mul(b),
                    ArithOp::Div => a.divide(b).map_err(|e| located(span, e))?,
                    ArithOp::Mod => a.modulo(b).map_err(|e| located(span, e))?,
                };
                Ok(Value::from(n.ensure_finite().map_err(|e| located(span, e))?))
            }
            (ArithOp::Add, Value::String(_), _) | (ArithOp::Add, _, Value::String(_)) => {
                let mut s = lhs.to_display_string();
                s.push_str(&rhs.to_display_string());
                Ok(Value::from(s))
            }
            (ArithOp::Add, Value::Array(a), Value::Array(b)) => {
                let mut items = a.as_ref().clone();
                items.extend(b.iter().cloned());
                Ok(Value::from(items))
            }
            _ => {
                let symbol = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::Div => "/",
                    ArithOp::Mod => "%",
                };
                bail!(span.error(
                    format!(
                        "cannot apply `{symbol}` to {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    )
                    .as_str()
                ))
            }
        }
    }

    fn eval_compare(&self, span: &Span, op: BoolOp, lhs: Value, rhs: Value) -> Result<Value> {
        let ordering = match op {
            BoolOp::Eq => return Ok(Value::Bool(lhs == rhs)),
            BoolOp::Ne => return Ok(Value::Bool(lhs != rhs)),
            _ => match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a.cmp(b),
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => bail!(span.error(
                    format!("cannot compare {} with {}", lhs.type_name(), rhs.type_name()).as_str()
                )),
            },
        };
        Ok(Value::Bool(match op {
            BoolOp::Lt => ordering.is_lt(),
            BoolOp::Le => ordering.is_le(),
            BoolOp::Gt => ordering.is_gt(),
            _ => ordering.is_ge(),
        }))
    }

    fn eval(&mut self, expr: &Expression, env: &Env) -> Result<Value> {
        match expr {
            Expression::Const(v) => Ok(v.clone()),
            Expression::Local { span, name } => self.lookup(span, name, env),
            Expression::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::from(values))
            }
            Expression::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value) in fields {
                    let key = self.eval(key, env)?;
                    let value = self.eval(value, env)?;
                    map.insert(key, value);
                }
                Ok(Value::from(map))
            }
            Expression::Unary { span, op, expr } => {
                let v = self.eval(expr, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                    UnaryOp::Neg => match v {
                        Value::Number(n) => Ok(Value::from(n.neg())),
                        _ => bail!(span.error(
                            format!("cannot negate {}", v.type_name()).as_str()
                        )),
                    },
                }
            }
            Expression::Arith { span, op, lhs, rhs } => {
                let lhs = self.eval(lhs, env)?;
                let rhs = self.eval(rhs, env)?;
                self.eval_arith(span, *op, lhs, rhs)
            }
            Expression::Compare { span, op, lhs, rhs } => {
                let lhs = self.eval(lhs, env)?;
                let rhs = self.eval(rhs, env)?;
                self.eval_compare(span, *op, lhs, rhs)
            }
            Expression::Logic { op, lhs, rhs } => {
                let lhs = self.eval(lhs, env)?.is_truthy();
                let result = match (op, lhs) {
                    (LogicOp::And, false) => false,
                    (LogicOp::Or, true) => true,
                    _ => self.eval(rhs, env)?.is_truthy(),
                };
                Ok(Value::Bool(result))
            }
            Expression::Member { span, refr, field } => {
                let v = self.eval(refr, env)?;
                v.get(&Value::String(field.clone()))
                    .map_err(|e| located(span, e))
            }
            Expression::Index { span, refr, index } => {
                let v = self.eval(refr, env)?;
                let index = self.eval(index, env)?;
                v.get(&index).map_err(|e| located(span, e))
            }
            Expression::Call { span, name, args } => self.call(span, name, args, env),
            Expression::Builtin {
                span, fcn, args, ..
            } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval(a, env)?);
                }
                (fcn.0)(span, &values)
            }
            Expression::Output { span, value } => {
                let v = self.eval(value, env)?;
                self.ctx.output(&v).map_err(|e| located(span, e))?;
                Ok(Value::Null)
            }
            Expression::Input { span, prompt } => {
                let prompt = self.eval(prompt, env)?.to_display_string();
                let line = self.ctx.input(&prompt).map_err(|e| located(span, e))?;
                Ok(Value::from(line))
            }
            Expression::Exports => Ok(self.ctx.exports().clone()),
        }
    }
}
