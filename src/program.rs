// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Executable form of a host script.
//!
//! Every name in a [`Program`] has already been resolved, so the interpreter
//! never has to decide what an identifier means.

use crate::ast::{ArithOp, BoolOp, LogicOp, UnaryOp};
use crate::builtins::BuiltinFcn;
use crate::lexer::{Source, Span};
use crate::value::Value;

use std::rc::Rc;

#[derive(Debug)]
pub enum Expression {
    Const(Value),
    Local {
        span: Span,
        name: Rc<str>,
    },
    Array(Vec<Expression>),
    Object(Vec<(Expression, Expression)>),
    Unary {
        span: Span,
        op: UnaryOp,
        expr: Box<Expression>,
    },
    Arith {
        span: Span,
        op: ArithOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Compare {
        span: Span,
        op: BoolOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Member {
        span: Span,
        refr: Box<Expression>,
        field: Rc<str>,
    },
    Index {
        span: Span,
        refr: Box<Expression>,
        index: Box<Expression>,
    },
    /// Call of a script-defined function.
    Call {
        span: Span,
        name: Rc<str>,
        args: Vec<Expression>,
    },
    Builtin {
        span: Span,
        name: &'static str,
        fcn: &'static BuiltinFcn,
        args: Vec<Expression>,
    },
    /// `<alias>.output(value)`
    Output {
        span: Span,
        value: Box<Expression>,
    },
    /// `<alias>.input(prompt)`
    Input {
        span: Span,
        prompt: Box<Expression>,
    },
    /// `<alias>.exports`
    Exports,
}

#[derive(Debug)]
pub enum PathSegment {
    Field(Rc<str>),
    Index(Expression),
}

/// Assignment target. The path descends into objects and arrays held by the
/// root.
#[derive(Debug)]
pub enum Place {
    Local {
        span: Span,
        name: Rc<str>,
        path: Vec<PathSegment>,
    },
    Exports {
        span: Span,
        path: Vec<PathSegment>,
    },
}

#[derive(Debug)]
pub struct Function {
    pub span: Span,
    pub name: Rc<str>,
    pub params: Vec<Rc<str>>,
    pub body: Block,
}

#[derive(Debug, Default)]
pub struct Block {
    /// Names declared with `let` directly in the block. They are unbound
    /// until their declaration executes.
    pub locals: Vec<Rc<str>>,
    /// Functions declared directly in the block. They are bound when the
    /// block is entered so that they may be called before their declaration.
    pub functions: Vec<Rc<Function>>,
    pub stmts: Vec<Statement>,
}

#[derive(Debug)]
pub enum Statement {
    Let {
        name: Rc<str>,
        value: Expression,
    },
    Assign {
        target: Place,
        value: Expression,
    },
    Expr(Expression),
    If {
        cond: Expression,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        span: Span,
        cond: Expression,
        body: Block,
    },
    Return(Option<Expression>),
    Break,
    Continue,
    Block(Block),
}

#[derive(Debug)]
pub struct Program {
    pub source: Source,
    pub host_alias: Option<Rc<str>>,
    pub body: Block,
}
