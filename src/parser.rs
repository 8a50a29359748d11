// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;
use crate::number::*;
use crate::value::*;

use core::str::FromStr;

use anyhow::{bail, Result};

/// Recursive-descent parser for translated target text.
#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    end: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            end: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String | TokenKind::RawString => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.end = self.tok.1.end;
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text && self.tok.0 != TokenKind::String {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn is_keyword(&self, ident: &str) -> bool {
        matches!(
            ident,
            "break"
                | "continue"
                | "else"
                | "false"
                | "function"
                | "if"
                | "let"
                | "null"
                | "return"
                | "true"
                | "use"
                | "while"
        )
    }

    fn parse_ident(&mut self) -> Result<Span> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident if self.is_keyword(span.text()) => Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                &format!("unexpected keyword `{}`", span.text()),
            )),
            TokenKind::Ident => {
                self.next_token()?;
                Ok(span)
            }
            _ => Err(self
                .source
                .error(self.tok.1.line, self.tok.1.col, "expecting identifier")),
        }
    }

    fn read_number(span: Span) -> Result<Expr> {
        match Number::from_str(span.text()) {
            Ok(v) => Ok(Expr::Number {
                span,
                value: Value::Number(v),
            }),
            Err(_) => bail!(span.error("could not parse number")),
        }
    }

    fn parse_scalar_or_var(&mut self) -> Result<Expr> {
        let span = self.tok.1.clone();
        let node = match &self.tok.0 {
            TokenKind::Number => Self::read_number(span)?,
            TokenKind::String => {
                let v = match serde_json::from_str::<Value>(format!("\"{}\"", span.text()).as_str())
                {
                    Ok(v) => v,
                    Err(e) => bail!(span.error(format!("invalid string literal. {e}").as_str())),
                };
                Expr::String { span, value: v }
            }
            TokenKind::RawString => {
                let v = Value::from(span.text());
                Expr::RawString { span, value: v }
            }
            TokenKind::Ident => match self.token_text() {
                "null" => Expr::Null { span },
                "true" => Expr::Bool {
                    span,
                    value: Value::Bool(true),
                },
                "false" => Expr::Bool {
                    span,
                    value: Value::Bool(false),
                },
                _ => {
                    let ident = self.parse_ident()?;
                    return Ok(Expr::Var { span: ident });
                }
            },
            _ => {
                return Err(self.source.error(
                    self.tok.1.line,
                    self.tok.1.col,
                    &format!("unexpected `{}` while parsing expression", self.tok.1.text()),
                ))
            }
        };
        self.next_token()?;
        Ok(node)
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        self.expect("[", "while parsing array")?;

        let mut items = vec![];
        if self.token_text() != "]" {
            items.push(Ref::new(self.parse_expr()?));
            while self.token_text() == "," {
                self.next_token()?;
                match self.token_text() {
                    "]" => break,
                    "" if self.tok.0 == TokenKind::Eof => break,
                    _ => items.push(Ref::new(self.parse_expr()?)),
                }
            }
        }
        self.expect("]", "while parsing array")?;
        span.end = self.end;
        Ok(Expr::Array { span, items })
    }

    fn parse_object(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        self.expect("{", "while parsing object")?;

        let mut fields = vec![];
        while self.token_text() != "}" {
            if self.tok.0 == TokenKind::Eof {
                break;
            }
            let mut item_span = self.tok.1.clone();
            // Bare identifiers are accepted as keys.
            let key = match self.tok.0 {
                TokenKind::Ident if !self.is_keyword(self.tok.1.text()) => {
                    let key_span = self.parse_ident()?;
                    Expr::String {
                        value: Value::from(key_span.text()),
                        span: key_span,
                    }
                }
                _ => self.parse_expr()?,
            };
            self.expect(":", "while parsing object field")?;
            let value = self.parse_expr()?;
            item_span.end = self.end;
            fields.push((item_span, Ref::new(key), Ref::new(value)));

            if self.token_text() == "," {
                self.next_token()?;
            } else {
                break;
            }
        }

        self.expect("}", "while parsing object")?;
        span.end = self.end;
        Ok(Expr::Object { span, fields })
    }

    fn parse_parens_expr(&mut self) -> Result<Expr> {
        self.next_token()?;
        let expr = self.parse_expr()?;
        self.expect(")", "while parsing parenthesized expression")?;
        Ok(expr)
    }

    fn parse_call_params(&mut self) -> Result<Vec<Ref<Expr>>> {
        self.expect("(", "while parsing call")?;
        let mut params = vec![];
        if self.token_text() != ")" {
            params.push(Ref::new(self.parse_expr()?));
            while self.token_text() == "," {
                self.next_token()?;
                params.push(Ref::new(self.parse_expr()?));
            }
        }
        self.expect(")", "while parsing call")?;
        Ok(params)
    }

    fn is_symbol(&self, text: &str) -> bool {
        self.tok.0 == TokenKind::Symbol && self.tok.1.text() == text
    }

    fn parse_ref(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut term = if self.is_symbol("[") {
            self.parse_array()?
        } else if self.is_symbol("{") {
            self.parse_object()?
        } else if self.is_symbol("(") {
            self.parse_parens_expr()?
        } else {
            self.parse_scalar_or_var()?
        };

        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            match self.token_text() {
                "." if self.tok.0 == TokenKind::Symbol => {
                    self.next_token()?;
                    let field = self.parse_ident()?;
                    span.end = self.end;
                    term = Expr::RefDot {
                        span,
                        refr: Ref::new(term),
                        field,
                    };
                }
                "[" if self.tok.0 == TokenKind::Symbol => {
                    self.next_token()?;
                    let index = self.parse_expr()?;
                    self.expect("]", "while parsing bracketed reference")?;
                    span.end = self.end;
                    term = Expr::RefBrack {
                        span,
                        refr: Ref::new(term),
                        index: Ref::new(index),
                    };
                }
                "(" if self.tok.0 == TokenKind::Symbol => {
                    let params = self.parse_call_params()?;
                    span.end = self.end;
                    term = Expr::Call {
                        span,
                        fcn: Ref::new(term),
                        params,
                    };
                }
                _ => break,
            }
        }

        Ok(term)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let op = match self.token_text() {
            "-" if self.tok.0 == TokenKind::Symbol => UnaryOp::Neg,
            "!" if self.tok.0 == TokenKind::Symbol => UnaryOp::Not,
            _ => return self.parse_ref(),
        };
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let expr = self.parse_unary_expr()?;
        span.end = self.end;
        Ok(Expr::UnaryExpr {
            span,
            op,
            expr: Ref::new(expr),
        })
    }

    fn parse_mul_div_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_unary_expr()?;
        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "*" => ArithOp::Mul,
                "/" => ArithOp::Div,
                "%" => ArithOp::Mod,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_unary_expr()?;
            span.end = self.end;
            expr = Expr::ArithExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_arith_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_mul_div_expr()?;
        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "+" => ArithOp::Add,
                "-" => ArithOp::Sub,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_mul_div_expr()?;
            span.end = self.end;
            expr = Expr::ArithExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_arith_expr()?;
        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "<" => BoolOp::Lt,
                "<=" => BoolOp::Le,
                ">" => BoolOp::Gt,
                ">=" => BoolOp::Ge,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_arith_expr()?;
            span.end = self.end;
            expr = Expr::BoolExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_comparison_expr()?;
        loop {
            let mut span = self.tok.1.clone();
            span.start = start;
            let op = match self.token_text() {
                "==" => BoolOp::Eq,
                "!=" => BoolOp::Ne,
                _ => return Ok(expr),
            };
            self.next_token()?;
            let right = self.parse_comparison_expr()?;
            span.end = self.end;
            expr = Expr::BoolExpr {
                span,
                op,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_equality_expr()?;
        while self.token_text() == "&&" {
            let mut span = self.tok.1.clone();
            span.start = start;
            self.next_token()?;
            let right = self.parse_equality_expr()?;
            span.end = self.end;
            expr = Expr::LogicExpr {
                span,
                op: LogicOp::And,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<Expr> {
        let start = self.tok.1.start;
        let mut expr = self.parse_and_expr()?;
        while self.token_text() == "||" {
            let mut span = self.tok.1.clone();
            span.start = start;
            self.next_token()?;
            let right = self.parse_and_expr()?;
            span.end = self.end;
            expr = Expr::LogicExpr {
                span,
                op: LogicOp::Or,
                lhs: Ref::new(expr),
                rhs: Ref::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_block(&mut self) -> Result<Block> {
        let mut span = self.tok.1.clone();
        self.expect("{", "to open block")?;
        let mut stmts = vec![];
        while !self.is_symbol("}") {
            if self.tok.0 == TokenKind::Eof {
                return Err(self.source.error(
                    span.line,
                    span.col,
                    "unterminated block. missing `}`",
                ));
            }
            stmts.push(Ref::new(self.parse_stmt()?));
        }
        self.next_token()?;
        span.end = self.end;
        Ok(Block { span, stmts })
    }

    fn parse_let(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let name = self.parse_ident()?;
        self.expect("=", "after variable name in let")?;
        let value = self.parse_expr()?;
        self.expect(";", "after let statement")?;
        span.end = self.end;
        Ok(Stmt::Let {
            span,
            name,
            value: Ref::new(value),
        })
    }

    fn parse_function(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let name = self.parse_ident()?;
        self.expect("(", "after function name")?;
        let mut params = vec![];
        if self.token_text() != ")" {
            params.push(self.parse_ident()?);
            while self.token_text() == "," {
                self.next_token()?;
                params.push(self.parse_ident()?);
            }
        }
        self.expect(")", "after function parameters")?;
        let body = self.parse_block()?;
        span.end = self.end;
        Ok(Stmt::Function(Ref::new(FunctionDecl {
            span,
            name,
            params,
            body: Ref::new(body),
        })))
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        self.expect("(", "after if")?;
        let cond = self.parse_expr()?;
        self.expect(")", "after if condition")?;
        let then_block = self.parse_block()?;
        let else_stmt = if self.tok.0 == TokenKind::Ident && self.token_text() == "else" {
            self.next_token()?;
            if self.tok.0 == TokenKind::Ident && self.token_text() == "if" {
                Some(Ref::new(self.parse_if()?))
            } else {
                Some(Ref::new(Stmt::Block(Ref::new(self.parse_block()?))))
            }
        } else {
            None
        };
        span.end = self.end;
        Ok(Stmt::If {
            span,
            cond: Ref::new(cond),
            then_block: Ref::new(then_block),
            else_stmt,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        self.expect("(", "after while")?;
        let cond = self.parse_expr()?;
        self.expect(")", "after while condition")?;
        let body = self.parse_block()?;
        span.end = self.end;
        Ok(Stmt::While {
            span,
            cond: Ref::new(cond),
            body: Ref::new(body),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        self.next_token()?;
        let value = if self.is_symbol(";") {
            None
        } else {
            Some(Ref::new(self.parse_expr()?))
        };
        self.expect(";", "after return")?;
        span.end = self.end;
        Ok(Stmt::Return { span, value })
    }

    fn parse_assign_or_expr(&mut self) -> Result<Stmt> {
        let mut span = self.tok.1.clone();
        let expr = self.parse_expr()?;
        if self.is_symbol("=") {
            if !matches!(
                expr,
                Expr::Var { .. } | Expr::RefDot { .. } | Expr::RefBrack { .. }
            ) {
                bail!(expr.span().error("invalid assignment target"));
            }
            self.next_token()?;
            let value = self.parse_expr()?;
            self.expect(";", "after assignment")?;
            span.end = self.end;
            return Ok(Stmt::Assign {
                span,
                target: Ref::new(expr),
                value: Ref::new(value),
            });
        }
        self.expect(";", "after expression statement")?;
        span.end = self.end;
        Ok(Stmt::Expr {
            span,
            expr: Ref::new(expr),
        })
    }

    pub fn parse_stmt(&mut self) -> Result<Stmt> {
        if self.tok.0 == TokenKind::Ident {
            match self.token_text() {
                "let" => return self.parse_let(),
                "function" => return self.parse_function(),
                "if" => return self.parse_if(),
                "while" => return self.parse_while(),
                "return" => return self.parse_return(),
                "break" | "continue" => {
                    let mut span = self.tok.1.clone();
                    let is_break = self.token_text() == "break";
                    self.next_token()?;
                    self.expect(";", "after loop control statement")?;
                    span.end = self.end;
                    return Ok(match is_break {
                        true => Stmt::Break { span },
                        false => Stmt::Continue { span },
                    });
                }
                "else" => {
                    return Err(self.source.error(
                        self.tok.1.line,
                        self.tok.1.col,
                        "`else` without a preceding `if`",
                    ))
                }
                _ => (),
            }
        }
        if self.is_symbol("{") {
            return Ok(Stmt::Block(Ref::new(self.parse_block()?)));
        }
        if self.is_symbol("}") {
            return Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                "unexpected `}`. unbalanced block delimiters",
            ));
        }
        self.parse_assign_or_expr()
    }

    fn parse_host_import(&mut self) -> Result<Option<HostImport>> {
        if !(self.tok.0 == TokenKind::Ident && self.token_text() == "use") {
            return Ok(None);
        }
        let mut span = self.tok.1.clone();
        self.next_token()?;
        if !(self.tok.0 == TokenKind::Ident && self.token_text() == "host") {
            return Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                "only `host` can be imported",
            ));
        }
        self.next_token()?;
        self.expect("as", "after `use host`")?;
        let alias = self.parse_ident()?;
        self.expect(";", "after host import")?;
        span.end = self.end;
        Ok(Some(HostImport { span, alias }))
    }

    pub fn parse(&mut self) -> Result<Module> {
        let host = self.parse_host_import()?;
        let mut stmts = vec![];
        while self.tok.0 != TokenKind::Eof {
            stmts.push(Ref::new(self.parse_stmt()?));
        }
        Ok(Module { host, stmts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Module> {
        let source = Source::from_contents("test.js".to_string(), text.to_string())?;
        let mut parser = Parser::new(&source)?;
        parser.parse()
    }

    #[test]
    fn host_import_alias() -> Result<()> {
        let module = parse("use host as kp;\nkp.output(1);")?;
        let host = module.host.as_ref().map(|h| h.alias.text().to_string());
        assert_eq!(host.as_deref(), Some("kp"));
        assert_eq!(module.stmts.len(), 1);
        Ok(())
    }

    #[test]
    fn precedence() -> Result<()> {
        let module = parse("let x = 1 + 2 * 3;")?;
        match module.stmts[0].as_ref() {
            Stmt::Let { value, .. } => match value.as_ref() {
                Expr::ArithExpr { op, rhs, .. } => {
                    assert_eq!(*op, ArithOp::Add);
                    assert!(matches!(rhs.as_ref(), Expr::ArithExpr { op: ArithOp::Mul, .. }));
                }
                e => panic!("unexpected {e:?}"),
            },
            s => panic!("unexpected {s:?}"),
        }
        Ok(())
    }

    #[test]
    fn else_if_chain() -> Result<()> {
        let module = parse("if (a) { } else if (b) { } else { }")?;
        match module.stmts[0].as_ref() {
            Stmt::If {
                else_stmt: Some(e), ..
            } => assert!(matches!(e.as_ref(), Stmt::If { else_stmt: Some(_), .. })),
            s => panic!("unexpected {s:?}"),
        }
        Ok(())
    }

    #[test]
    fn unbalanced_braces_fail() {
        assert!(parse("if (a) { kp.output(1);").is_err());
        let err = parse("let a = 1;\n}").err().map(|e| e.to_string());
        assert!(err.unwrap_or_default().contains("unbalanced"));
    }

    #[test]
    fn assignment_target_must_be_reference() {
        assert!(parse("1 = 2;").is_err());
        assert!(parse("a.b[0] = 2;").is_ok());
    }
}
