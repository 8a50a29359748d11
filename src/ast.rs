// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use crate::value::Value;

use core::{cmp, fmt, ops::Deref};
use std::rc::Rc;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug)]
pub enum Expr {
    // Literals carry their parsed value.
    Null {
        span: Span,
    },
    Bool {
        span: Span,
        value: Value,
    },
    Number {
        span: Span,
        value: Value,
    },
    String {
        span: Span,
        value: Value,
    },
    RawString {
        span: Span,
        value: Value,
    },

    Var {
        span: Span,
    },

    Array {
        span: Span,
        items: Vec<Ref<Expr>>,
    },

    Object {
        span: Span,
        fields: Vec<(Span, Ref<Expr>, Ref<Expr>)>,
    },

    Call {
        span: Span,
        fcn: Ref<Expr>,
        params: Vec<Ref<Expr>>,
    },

    UnaryExpr {
        span: Span,
        op: UnaryOp,
        expr: Ref<Expr>,
    },

    // a.b
    RefDot {
        span: Span,
        refr: Ref<Expr>,
        field: Span,
    },

    // a[b]
    RefBrack {
        span: Span,
        refr: Ref<Expr>,
        index: Ref<Expr>,
    },

    ArithExpr {
        span: Span,
        op: ArithOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    LogicExpr {
        span: Span,
        op: LogicOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Null { span }
            | Bool { span, .. }
            | Number { span, .. }
            | String { span, .. }
            | RawString { span, .. }
            | Var { span }
            | Array { span, .. }
            | Object { span, .. }
            | Call { span, .. }
            | UnaryExpr { span, .. }
            | RefDot { span, .. }
            | RefBrack { span, .. }
            | ArithExpr { span, .. }
            | BoolExpr { span, .. }
            | LogicExpr { span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Ref<Stmt>>,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub span: Span,
    pub name: Span,
    pub params: Vec<Span>,
    pub body: Ref<Block>,
}

#[derive(Debug)]
pub enum Stmt {
    Let {
        span: Span,
        name: Span,
        value: Ref<Expr>,
    },
    Assign {
        span: Span,
        target: Ref<Expr>,
        value: Ref<Expr>,
    },
    Function(Ref<FunctionDecl>),
    If {
        span: Span,
        cond: Ref<Expr>,
        then_block: Ref<Block>,
        // Either a block or a nested `if` for `else if`.
        else_stmt: Option<Ref<Stmt>>,
    },
    While {
        span: Span,
        cond: Ref<Expr>,
        body: Ref<Block>,
    },
    Return {
        span: Span,
        value: Option<Ref<Expr>>,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Block(Ref<Block>),
    Expr {
        span: Span,
        expr: Ref<Expr>,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Let { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Expr { span, .. } => span,
            Stmt::Function(f) => &f.span,
            Stmt::Block(b) => &b.span,
        }
    }
}

/// `use host as <alias>;`
#[derive(Debug)]
pub struct HostImport {
    pub span: Span,
    pub alias: Span,
}

#[derive(Debug)]
pub struct Module {
    pub host: Option<HostImport>,
    pub stmts: Vec<Ref<Stmt>>,
}
