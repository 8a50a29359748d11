// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Lowers a parsed host script into a [`Program`].
//!
//! Compilation rejects any program whose names cannot all be resolved
//! statically. Allowed names are script bindings in scope, script functions,
//! intrinsic builtins and the members of the imported host alias.

use crate::ast::*;
use crate::builtins::{self, VARIADIC};
use crate::lexer::{Source, Span};
use crate::parser::Parser;
use crate::program::{self, Expression, PathSegment, Place, Program, Statement};

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{bail, Result};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Variable,
    Param,
    Function(usize),
}

type Scope = BTreeMap<String, Binding>;

const CAPABILITIES: [&str; 3] = ["exports", "input", "output"];

/// Parses and compiles target source.
pub fn compile(source: &Source) -> Result<Program> {
    let mut parser = Parser::new(source)?;
    let module = parser.parse()?;
    Compiler::new(&module).compile(source)
}

pub struct Compiler<'a> {
    module: &'a Module,
    alias: Option<Rc<str>>,
    scopes: Vec<Scope>,
    loop_depth: usize,
    function_depth: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self {
            module,
            alias: module.host.as_ref().map(|h| Rc::from(h.alias.text())),
            scopes: vec![],
            loop_depth: 0,
            function_depth: 0,
        }
    }

    pub fn compile(mut self, source: &Source) -> Result<Program> {
        let module = self.module;
        let body = self.compile_block(&module.stmts, &[])?;
        debug!(
            "compiled {} top-level statements from {}",
            body.stmts.len(),
            source.file()
        );
        Ok(Program {
            source: source.clone(),
            host_alias: self.alias.clone(),
            body,
        })
    }

    fn is_alias_name(&self, name: &str) -> bool {
        matches!(&self.alias, Some(a) if a.as_ref() == name)
    }

    fn is_alias(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Var { span } if self.is_alias_name(span.text()))
    }

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn declare(&mut self, span: &Span, binding: Binding) -> Result<()> {
        let name = span.text();
        if self.is_alias_name(name) {
            bail!(span.error(format!("`{name}` is reserved for the host import").as_str()));
        }
        let Some(scope) = self.scopes.last_mut() else {
            bail!(span.error("declaration outside of any scope"));
        };
        if scope.insert(name.to_string(), binding).is_some() {
            bail!(span.error(format!("`{name}` is already declared in this scope").as_str()));
        }
        Ok(())
    }

    fn compile_block(&mut self, stmts: &[Ref<Stmt>], params: &[Span]) -> Result<program::Block> {
        self.scopes.push(Scope::new());
        let result = self.compile_scoped_block(stmts, params);
        self.scopes.pop();
        result
    }

    fn compile_scoped_block(
        &mut self,
        stmts: &[Ref<Stmt>],
        params: &[Span],
    ) -> Result<program::Block> {
        for p in params {
            self.declare(p, Binding::Param)?;
        }

        // Hoist declarations so that every reference in the block resolves
        // to the same binding regardless of statement order.
        for stmt in stmts {
            match stmt.as_ref() {
                Stmt::Let { name, .. } => self.declare(name, Binding::Variable)?,
                Stmt::Function(f) => self.declare(&f.name, Binding::Function(f.params.len()))?,
                _ => (),
            }
        }

        let mut block = program::Block::default();
        for stmt in stmts {
            if let Stmt::Let { name, .. } = stmt.as_ref() {
                block.locals.push(Rc::from(name.text()));
            }
        }
        for stmt in stmts {
            match stmt.as_ref() {
                Stmt::Function(f) => block.functions.push(Rc::new(self.compile_function(f)?)),
                _ => block.stmts.push(self.compile_stmt(stmt)?),
            }
        }
        Ok(block)
    }

    fn compile_function(&mut self, decl: &FunctionDecl) -> Result<program::Function> {
        let loop_depth = self.loop_depth;
        self.loop_depth = 0;
        self.function_depth += 1;
        let body = self.compile_block(&decl.body.stmts, &decl.params);
        self.function_depth -= 1;
        self.loop_depth = loop_depth;

        Ok(program::Function {
            span: decl.span.clone(),
            name: Rc::from(decl.name.text()),
            params: decl.params.iter().map(|p| Rc::from(p.text())).collect(),
            body: body?,
        })
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<Statement> {
        Ok(match stmt {
            Stmt::Let { name, value, .. } => Statement::Let {
                name: Rc::from(name.text()),
                value: self.compile_expr(value)?,
            },
            Stmt::Assign { target, value, .. } => Statement::Assign {
                target: self.compile_place(target)?,
                value: self.compile_expr(value)?,
            },
            Stmt::Expr { expr, .. } => Statement::Expr(self.compile_expr(expr)?),
            Stmt::If {
                cond,
                then_block,
                else_stmt,
                ..
            } => {
                let cond = self.compile_expr(cond)?;
                let then_block = self.compile_block(&then_block.stmts, &[])?;
                let else_block = match else_stmt.as_ref().map(|s| s.as_ref()) {
                    Some(Stmt::Block(b)) => Some(self.compile_block(&b.stmts, &[])?),
                    Some(s) => Some(program::Block {
                        stmts: vec![self.compile_stmt(s)?],
                        ..program::Block::default()
                    }),
                    None => None,
                };
                Statement::If {
                    cond,
                    then_block,
                    else_block,
                }
            }
            Stmt::While { span, cond, body } => {
                let cond = self.compile_expr(cond)?;
                self.loop_depth += 1;
                let body = self.compile_block(&body.stmts, &[]);
                self.loop_depth -= 1;
                Statement::While {
                    span: span.clone(),
                    cond,
                    body: body?,
                }
            }
            Stmt::Return { span, value } => {
                if self.function_depth == 0 {
                    bail!(span.error("`return` outside of a function"));
                }
                Statement::Return(match value {
                    Some(v) => Some(self.compile_expr(v)?),
                    None => None,
                })
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 {
                    bail!(span.error("`break` outside of a loop"));
                }
                Statement::Break
            }
            Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    bail!(span.error("`continue` outside of a loop"));
                }
                Statement::Continue
            }
            Stmt::Block(b) => Statement::Block(self.compile_block(&b.stmts, &[])?),
            Stmt::Function(f) => {
                // Functions are collected by the enclosing block.
                bail!(f.span.error("unexpected function declaration"))
            }
        })
    }

    fn compile_place(&mut self, target: &Expr) -> Result<Place> {
        let mut path = vec![];
        let mut node = target;
        loop {
            match node {
                Expr::RefDot { refr, field, .. } if self.is_alias(refr) => {
                    if field.text() != "exports" {
                        bail!(field.error(
                            format!("cannot assign to host capability `{}`", field.text()).as_str()
                        ));
                    }
                    path.reverse();
                    return Ok(Place::Exports {
                        span: target.span().clone(),
                        path,
                    });
                }
                Expr::RefDot { refr, field, .. } => {
                    path.push(PathSegment::Field(Rc::from(field.text())));
                    node = refr.as_ref();
                }
                Expr::RefBrack { refr, index, .. } => {
                    path.push(PathSegment::Index(self.compile_expr(index)?));
                    node = refr.as_ref();
                }
                Expr::Var { span } => {
                    let name = span.text();
                    match self.lookup(name) {
                        Some(Binding::Variable) | Some(Binding::Param) => {
                            path.reverse();
                            return Ok(Place::Local {
                                span: span.clone(),
                                name: Rc::from(name),
                                path,
                            });
                        }
                        Some(Binding::Function(_)) => {
                            bail!(span.error(
                                format!("cannot assign to function `{name}`").as_str()
                            ))
                        }
                        None if self.is_alias_name(name) => {
                            bail!(span.error(
                                format!("cannot assign to host alias `{name}`").as_str()
                            ))
                        }
                        None => bail!(span.error(
                            format!("assignment to undeclared variable `{name}`").as_str()
                        )),
                    }
                }
                _ => bail!(node.span().error("invalid assignment target")),
            }
        }
    }

    fn compile_args(&mut self, params: &[Ref<Expr>]) -> Result<Vec<Expression>> {
        params.iter().map(|p| self.compile_expr(p)).collect()
    }

    fn compile_capability_call(
        &mut self,
        span: &Span,
        field: &Span,
        params: &[Ref<Expr>],
    ) -> Result<Expression> {
        let name = field.text();
        if !matches!(name, "output" | "input") {
            bail!(field.error(format!("`{name}` is not a callable host capability").as_str()));
        }
        if params.len() != 1 {
            bail!(span.error(format!("`{name}` expects 1 argument").as_str()));
        }
        let arg = Box::new(self.compile_expr(&params[0])?);
        Ok(match name {
            "output" => Expression::Output {
                span: span.clone(),
                value: arg,
            },
            _ => Expression::Input {
                span: span.clone(),
                prompt: arg,
            },
        })
    }

    fn compile_call(&mut self, span: &Span, fcn: &Expr, params: &[Ref<Expr>]) -> Result<Expression> {
        match fcn {
            Expr::RefDot { refr, field, .. } if self.is_alias(refr) => {
                self.compile_capability_call(span, field, params)
            }
            Expr::Var { span: name_span } => {
                let name = name_span.text();
                match self.lookup(name) {
                    Some(Binding::Function(arity)) => {
                        if params.len() != arity {
                            bail!(span.error(
                                format!(
                                    "`{name}` expects {arity} arguments. Got {}",
                                    params.len()
                                )
                                .as_str()
                            ));
                        }
                        Ok(Expression::Call {
                            span: span.clone(),
                            name: Rc::from(name),
                            args: self.compile_args(params)?,
                        })
                    }
                    Some(_) => bail!(name_span.error(format!("`{name}` is not a function").as_str())),
                    None => match builtins::lookup(name) {
                        Some((name, fcn)) => {
                            if fcn.1 != VARIADIC && params.len() != fcn.1 as usize {
                                bail!(span.error(
                                    format!(
                                        "`{name}` expects {} arguments. Got {}",
                                        fcn.1,
                                        params.len()
                                    )
                                    .as_str()
                                ));
                            }
                            Ok(Expression::Builtin {
                                span: span.clone(),
                                name,
                                fcn,
                                args: self.compile_args(params)?,
                            })
                        }
                        None => bail!(name_span.error(format!("unknown function `{name}`").as_str())),
                    },
                }
            }
            _ => {
                self.compile_expr(fcn)?;
                bail!(fcn.span().error("only named functions can be called"))
            }
        }
    }

    fn compile_var(&self, span: &Span) -> Result<Expression> {
        let name = span.text();
        match self.lookup(name) {
            Some(Binding::Variable) | Some(Binding::Param) => Ok(Expression::Local {
                span: span.clone(),
                name: Rc::from(name),
            }),
            Some(Binding::Function(_)) => {
                bail!(span.error(format!("function `{name}` cannot be used as a value").as_str()))
            }
            None if self.is_alias_name(name) => {
                bail!(span.error(format!("host alias `{name}` cannot be used as a value").as_str()))
            }
            None if builtins::lookup(name).is_some() => {
                bail!(span.error(format!("builtin `{name}` must be called").as_str()))
            }
            None => bail!(span.error(format!("unresolved name `{name}`").as_str())),
        }
    }

    pub fn compile_expr(&mut self, expr: &Expr) -> Result<Expression> {
        Ok(match expr {
            Expr::Null { .. } => Expression::Const(crate::value::Value::Null),
            Expr::Bool { value, .. }
            | Expr::Number { value, .. }
            | Expr::String { value, .. }
            | Expr::RawString { value, .. } => Expression::Const(value.clone()),
            Expr::Var { span } => self.compile_var(span)?,
            Expr::Array { items, .. } => Expression::Array(self.compile_args(items)?),
            Expr::Object { fields, .. } => {
                let mut compiled = Vec::with_capacity(fields.len());
                for (_, key, value) in fields {
                    compiled.push((self.compile_expr(key)?, self.compile_expr(value)?));
                }
                Expression::Object(compiled)
            }
            Expr::Call { span, fcn, params } => self.compile_call(span, fcn, params)?,
            Expr::UnaryExpr { span, op, expr } => Expression::Unary {
                span: span.clone(),
                op: *op,
                expr: Box::new(self.compile_expr(expr)?),
            },
            Expr::RefDot { refr, field, .. } if self.is_alias(refr) => {
                let name = field.text();
                match name {
                    "exports" => Expression::Exports,
                    _ if CAPABILITIES.contains(&name) => {
                        bail!(field.error(format!("host capability `{name}` must be called").as_str()))
                    }
                    _ => bail!(field.error(format!("unknown host capability `{name}`").as_str())),
                }
            }
            Expr::RefDot { span, refr, field } => Expression::Member {
                span: span.clone(),
                refr: Box::new(self.compile_expr(refr)?),
                field: Rc::from(field.text()),
            },
            Expr::RefBrack { span, refr, index } => Expression::Index {
                span: span.clone(),
                refr: Box::new(self.compile_expr(refr)?),
                index: Box::new(self.compile_expr(index)?),
            },
            Expr::ArithExpr { span, op, lhs, rhs } => Expression::Arith {
                span: span.clone(),
                op: *op,
                lhs: Box::new(self.compile_expr(lhs)?),
                rhs: Box::new(self.compile_expr(rhs)?),
            },
            Expr::BoolExpr { span, op, lhs, rhs } => Expression::Compare {
                span: span.clone(),
                op: *op,
                lhs: Box::new(self.compile_expr(lhs)?),
                rhs: Box::new(self.compile_expr(rhs)?),
            },
            Expr::LogicExpr { op, lhs, rhs, .. } => Expression::Logic {
                op: *op,
                lhs: Box::new(self.compile_expr(lhs)?),
                rhs: Box::new(self.compile_expr(rhs)?),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_text(text: &str) -> Result<Program> {
        let source = Source::from_contents("test.js".to_string(), text.to_string())?;
        compile(&source)
    }

    fn compile_error(text: &str) -> String {
        match compile_text(text) {
            Ok(_) => panic!("expected compile failure for {text}"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn resolves_capabilities_and_builtins() -> Result<()> {
        let program = compile_text(
            "use host as kp;\nlet n = len([1, 2]);\nkp.output(n);\nkp.exports.n = n;\n",
        )?;
        assert_eq!(program.host_alias.as_deref(), Some("kp"));
        assert_eq!(program.body.stmts.len(), 3);
        assert!(matches!(
            &program.body.stmts[2],
            Statement::Assign {
                target: Place::Exports { path, .. },
                ..
            } if path.len() == 1
        ));
        Ok(())
    }

    #[test]
    fn functions_are_hoisted() -> Result<()> {
        let program = compile_text("let x = twice(2);\nfunction twice(n) { return n * 2; }\n")?;
        assert_eq!(program.body.functions.len(), 1);
        assert_eq!(program.body.stmts.len(), 1);
        Ok(())
    }

    #[test]
    fn rejects_unresolved_names() {
        assert!(compile_error("let x = y;").contains("unresolved name `y`"));
        assert!(compile_error("let x = fetch(1);").contains("unknown function `fetch`"));
        assert!(compile_error("use host as kp;\nkp.network(1);")
            .contains("not a callable host capability"));
        assert!(compile_error("use host as kp;\nlet k = kp;").contains("cannot be used as a value"));
        assert!(compile_error("kp.output(1);").contains("unresolved name `kp`"));
    }

    #[test]
    fn rejects_misplaced_control_flow() {
        assert!(compile_error("break;").contains("outside of a loop"));
        assert!(compile_error("return 1;").contains("outside of a function"));
        assert!(compile_error("while (true) { function f() { break; } }")
            .contains("outside of a loop"));
    }

    #[test]
    fn rejects_bad_declarations() {
        assert!(compile_error("let a = 1;\nlet a = 2;").contains("already declared"));
        assert!(compile_error("use host as kp;\nlet kp = 1;").contains("reserved"));
        assert!(compile_error("x = 1;").contains("undeclared variable `x`"));
    }

    #[test]
    fn checks_arity() {
        assert!(compile_error("let a = len(1, 2);").contains("expects 1 arguments"));
        assert!(compile_error("function f(a) { return a; }\nf();").contains("expects 1 arguments"));
        assert!(compile_text("let m = max(1, 2, 3);").is_ok());
    }
}
