// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rewrites King Python source into host script.
//!
//! The dialect is tokenized with the shared [`Lexer`], so rewrites never fire
//! inside string literals or comments. Tokens are grouped into statements,
//! each statement is classified by the first rewrite rule that matches it, and
//! a structuring pass infers block extents from line layout:
//!
//! - a header whose body continues on the same line owns the rest of that
//!   line (up to an `else`/`elif`),
//! - a header followed by deeper-indented lines owns those lines,
//! - otherwise the body runs until the next header at the same or shallower
//!   indentation.
//!
//! Every block that is opened is closed, so well-formed input always produces
//! balanced delimiters. Input that does not fit the dialect is copied through
//! and left for the compiler to reject.

use crate::lexer::*;

use std::collections::BTreeSet;

use log::debug;

/// Alias under which translated programs receive their capability set.
pub const HOST_ALIAS: &str = "kp";

/// Statement that opens every translated program.
pub const PRELUDE: &str = "use host as kp;";

const INDENT: &str = "    ";

/// Rewrite rules, listed in the order in which they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// `name = expr;`
    Binding,
    /// `fun name(params):`
    Function,
    /// `if(cond):`
    If,
    /// `elif(cond):`
    Elif,
    /// `else:`
    Else,
    /// `while(cond):`
    While,
    /// `say expr;`
    Say,
    /// `ask expr;`
    Ask,
    /// Any other statement ending its line with `:`.
    Opener,
    /// Copied through.
    Verbatim,
}

impl Rule {
    fn opens_block(self) -> bool {
        matches!(
            self,
            Rule::Function | Rule::If | Rule::Elif | Rule::Else | Rule::While | Rule::Opener
        )
    }

    fn is_header(self) -> bool {
        matches!(
            self,
            Rule::Function | Rule::If | Rule::Elif | Rule::Else | Rule::While
        )
    }

    fn is_alternate(self) -> bool {
        matches!(self, Rule::Elif | Rule::Else)
    }
}

#[derive(Debug)]
struct Statement {
    // Token range, end exclusive.
    start: usize,
    end: usize,
    line: u32,
    end_line: u32,
    indent: u32,
    rule: Rule,
}

#[derive(Debug)]
enum Node {
    Simple(usize),
    Block {
        header: usize,
        body: Vec<Node>,
        alternates: Vec<(usize, Vec<Node>)>,
    },
}

// How far the body of the innermost open header extends.
#[derive(Debug, Clone, Copy)]
enum Frame {
    Inline { line: u32 },
    Indented { floor: u32 },
    Flat { indent: u32 },
}

const HEADER_KEYWORDS: [&str; 5] = ["fun", "if", "elif", "else", "while"];

const DIALECT_KEYWORDS: [&str; 10] = [
    "ask", "break", "continue", "elif", "else", "fun", "if", "return", "say", "while",
];

fn is_open(tok: &Token) -> bool {
    tok.0 == TokenKind::Symbol && matches!(tok.1.text(), "(" | "[" | "{")
}

fn is_close(tok: &Token) -> bool {
    tok.0 == TokenKind::Symbol && matches!(tok.1.text(), ")" | "]" | "}")
}

fn end_line(tok: &Token) -> u32 {
    match tok.0 {
        TokenKind::RawString => tok.1.line + tok.1.text().matches('\n').count() as u32,
        _ => tok.1.line,
    }
}

/// The translation pipeline. Stateless; one instance can serve any number of
/// requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Translator;

impl Translator {
    pub fn new() -> Self {
        Self
    }

    /// Translates dialect text. Never fails: text that cannot be translated
    /// is carried into the output unchanged.
    pub fn translate_str(&self, text: &str) -> String {
        match Source::from_contents("<source>".to_string(), text.to_string()) {
            Ok(source) => self.translate(&source),
            Err(_) => format!("{PRELUDE}\n\n{text}"),
        }
    }

    pub fn translate(&self, source: &Source) -> String {
        let (tokens, tail) = tokenize(source);
        let mut translation = Translation::new(source, tokens);
        translation.split();
        let nodes = translation.structure();

        let mut lines = vec![PRELUDE.to_string(), String::new()];
        translation.emit_nodes(&nodes, 0, &mut lines);
        if let Some(tail) = tail {
            lines.push(tail.to_string());
        }

        debug!(
            "translated {} statements from {}",
            translation.statements.len(),
            source.file()
        );

        let mut target = lines.join("\n");
        target.push('\n');
        target
    }
}

/// Translates dialect text with the default pipeline.
pub fn translate(text: &str) -> String {
    Translator::new().translate_str(text)
}

// Reads tokens until Eof or the first lexical error. On error the untokenized
// remainder is returned so it can be copied through.
fn tokenize(source: &Source) -> (Vec<Token>, Option<&str>) {
    let mut tokens: Vec<Token> = vec![];
    let mut lexer = Lexer::new(source);
    loop {
        match lexer.next_token() {
            Ok(tok) if tok.0 == TokenKind::Eof => return (tokens, None),
            Ok(tok) => tokens.push(tok),
            Err(e) => {
                debug!("dialect lexing stopped: {e}");
                let resume = tokens.last().map(|t| t.extent().1).unwrap_or(0);
                let tail = source.contents()[resume..].trim();
                return (tokens, Some(tail).filter(|t| !t.is_empty()));
            }
        }
    }
}

struct Translation<'a> {
    source: &'a Source,
    tokens: Vec<Token>,
    statements: Vec<Statement>,
    pos: usize,
    frames: Vec<Frame>,
    scopes: Vec<BTreeSet<String>>,
}

impl<'a> Translation<'a> {
    fn new(source: &'a Source, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            statements: vec![],
            pos: 0,
            frames: vec![],
            scopes: vec![BTreeSet::new()],
        }
    }

    fn text(&self, idx: usize) -> &str {
        self.tokens[idx].1.text()
    }

    fn is_symbol(&self, idx: usize, text: &str) -> bool {
        idx < self.tokens.len() && self.tokens[idx].is_symbol(text)
    }

    fn is_ident(&self, idx: usize, text: &str) -> bool {
        idx < self.tokens.len() && self.tokens[idx].is_ident(text)
    }

    // Groups tokens into statements.
    fn split(&mut self) {
        let n = self.tokens.len();
        let mut i = 0;
        while i < n {
            let start = i;
            let header = HEADER_KEYWORDS.iter().any(|kw| self.is_ident(start, kw));
            let mut depth = 0usize;
            loop {
                let tok = &self.tokens[i];
                if is_open(tok) {
                    depth += 1;
                } else if is_close(tok) {
                    depth = depth.saturating_sub(1);
                }
                i += 1;
                if i == n {
                    break;
                }
                if depth == 0 {
                    if tok.is_symbol(";") {
                        break;
                    }
                    let ends_line = self.tokens[i].1.line != end_line(tok);
                    if tok.is_symbol(":") && (header || ends_line) {
                        break;
                    }
                    if ends_line {
                        // Unterminated statement.
                        break;
                    }
                }
            }

            let line = self.tokens[start].1.line;
            let statement = Statement {
                start,
                end: i,
                line,
                end_line: end_line(&self.tokens[i - 1]),
                indent: self.source.line_indent(line),
                rule: self.classify(start, i),
            };
            self.statements.push(statement);
        }
    }

    // Index of the bracket closing the one opened at `open`, within `end`.
    fn matching(&self, open: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        for idx in open..end {
            let tok = &self.tokens[idx];
            if is_open(tok) {
                depth += 1;
            } else if is_close(tok) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
        }
        None
    }

    fn classify(&self, start: usize, end: usize) -> Rule {
        let last = end - 1;
        let first = &self.tokens[start];
        let terminated = self.is_symbol(last, ";");
        let opens = self.is_symbol(last, ":");

        if first.0 == TokenKind::Ident
            && !DIALECT_KEYWORDS.contains(&first.1.text())
            && first.1.text() != "exports"
            && self.is_symbol(start + 1, "=")
            && terminated
            && end - start > 3
        {
            return Rule::Binding;
        }

        if opens {
            if self.is_ident(start, "fun") {
                let well_formed = end - start >= 5
                    && self.tokens[start + 1].0 == TokenKind::Ident
                    && self.is_symbol(start + 2, "(")
                    && self.matching(start + 2, end) == Some(last - 1);
                return match well_formed {
                    true => Rule::Function,
                    false => Rule::Opener,
                };
            }
            for (kw, rule) in [("if", Rule::If), ("elif", Rule::Elif), ("while", Rule::While)] {
                if self.is_ident(start, kw) {
                    return match end - start > 2 {
                        true => rule,
                        false => Rule::Opener,
                    };
                }
            }
            if self.is_ident(start, "else") && end - start == 2 {
                return Rule::Else;
            }
        }

        if terminated && self.is_ident(start, "say") {
            return Rule::Say;
        }
        if terminated && self.is_ident(start, "ask") {
            return Rule::Ask;
        }

        let ends_line = end == self.tokens.len() || self.tokens[end].1.line != end_line(&self.tokens[last]);
        if opens && ends_line {
            return Rule::Opener;
        }

        Rule::Verbatim
    }

    fn structure(&mut self) -> Vec<Node> {
        self.parse_nodes()
    }

    fn frames_accept(&self, idx: usize, alternate: bool) -> bool {
        let stmt = &self.statements[idx];
        self.frames.iter().all(|frame| match *frame {
            Frame::Inline { line } => {
                stmt.line == line && (alternate || !stmt.rule.is_alternate())
            }
            Frame::Indented { floor } => stmt.indent > floor,
            Frame::Flat { indent } => stmt.indent >= indent && !stmt.rule.is_header(),
        })
    }

    fn parse_nodes(&mut self) -> Vec<Node> {
        let mut nodes = vec![];
        while self.pos < self.statements.len() && self.frames_accept(self.pos, false) {
            nodes.push(self.parse_node());
        }
        nodes
    }

    fn parse_body(&mut self, header: usize) -> Vec<Node> {
        let (header_end_line, header_indent) = {
            let h = &self.statements[header];
            (h.end_line, h.indent)
        };
        let frame = match self.statements.get(self.pos) {
            Some(next) if next.line == header_end_line => Frame::Inline {
                line: header_end_line,
            },
            Some(next) if next.indent > header_indent => Frame::Indented {
                floor: header_indent,
            },
            _ => Frame::Flat {
                indent: header_indent,
            },
        };
        self.frames.push(frame);
        let body = self.parse_nodes();
        self.frames.pop();
        body
    }

    fn parse_node(&mut self) -> Node {
        let header = self.pos;
        self.pos += 1;
        let rule = self.statements[header].rule;
        if !rule.opens_block() {
            return Node::Simple(header);
        }

        let body = self.parse_body(header);
        let mut alternates = vec![];
        if rule == Rule::If {
            let mut prev = header;
            while self.pos < self.statements.len() {
                let alt = self.pos;
                let stmt = &self.statements[alt];
                let attached = stmt.rule.is_alternate()
                    && (stmt.line == self.statements[prev].end_line
                        || stmt.indent == self.statements[header].indent)
                    && self.frames_accept(alt, true);
                if !attached {
                    break;
                }
                let is_else = stmt.rule == Rule::Else;
                self.pos += 1;
                let alt_body = self.parse_body(alt);
                alternates.push((alt, alt_body));
                prev = alt;
                if is_else {
                    break;
                }
            }
        }

        Node::Block {
            header,
            body,
            alternates,
        }
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    // End of the prompt following an `ask`: the closing bracket or comma of
    // the enclosing group, or `end`.
    fn operand_end(&self, start: usize, end: usize) -> usize {
        let mut depth = 0usize;
        for idx in start..end {
            let tok = &self.tokens[idx];
            if is_open(tok) {
                depth += 1;
            } else if is_close(tok) {
                if depth == 0 {
                    return idx;
                }
                depth -= 1;
            } else if depth == 0 && tok.is_symbol(",") {
                return idx;
            }
        }
        end
    }

    // Copies tokens `start..end` with their original spacing, rewriting
    // `exports` references and `ask` expressions.
    fn emit_expr(&self, start: usize, end: usize) -> String {
        let mut out = String::new();
        let contents = self.source.contents();
        let mut idx = start;
        while idx < end {
            let tok = &self.tokens[idx];
            if idx > start {
                let prev_end = self.tokens[idx - 1].extent().1;
                out.push_str(&contents[prev_end..tok.extent().0]);
            }
            let after_dot = idx > start && self.is_symbol(idx - 1, ".");
            if tok.0 == TokenKind::Ident && !after_dot {
                match tok.1.text() {
                    "exports" => {
                        out.push_str(HOST_ALIAS);
                        out.push_str(".exports");
                        idx += 1;
                        continue;
                    }
                    "ask" => {
                        let operand_end = self.operand_end(idx + 1, end);
                        out.push_str(&format!(
                            "{HOST_ALIAS}.input({})",
                            self.emit_expr(idx + 1, operand_end)
                        ));
                        idx = operand_end;
                        continue;
                    }
                    _ => (),
                }
            }
            let (s, e) = tok.extent();
            out.push_str(&contents[s..e]);
            idx += 1;
        }
        out
    }

    // Condition of an `if`/`elif`/`while` header, without its outer parentheses.
    fn emit_condition(&self, stmt: &Statement) -> String {
        let (start, end) = (stmt.start + 1, stmt.end - 1);
        if self.is_symbol(start, "(") && self.matching(start, end) == Some(end - 1) {
            self.emit_expr(start + 1, end - 1)
        } else {
            self.emit_expr(start, end)
        }
    }

    fn emit_statement(&mut self, idx: usize) -> String {
        let (start, end, rule) = {
            let stmt = &self.statements[idx];
            (stmt.start, stmt.end, stmt.rule)
        };
        match rule {
            Rule::Binding => {
                let name = self.text(start).to_string();
                let value = self.emit_expr(start + 2, end - 1);
                if self.is_declared(&name) {
                    format!("{name} = {value};")
                } else {
                    self.declare(&name);
                    format!("let {name} = {value};")
                }
            }
            Rule::Say => format!("{HOST_ALIAS}.output({});", self.emit_expr(start + 1, end - 1)),
            Rule::Ask => format!("{HOST_ALIAS}.input({});", self.emit_expr(start + 1, end - 1)),
            _ if self.is_symbol(end - 1, ";") => format!("{};", self.emit_expr(start, end - 1)),
            _ => self.emit_expr(start, end),
        }
    }

    fn emit_header(&mut self, idx: usize, alternate: bool) -> String {
        let stmt = &self.statements[idx];
        let close = if alternate { "} " } else { "" };
        match stmt.rule {
            Rule::Function => {
                let name = self.text(stmt.start + 1).to_string();
                let params = self.emit_expr(stmt.start + 3, stmt.end - 2);
                let header = format!("function {name}({params}) {{");
                self.declare(&name);
                header
            }
            Rule::If => format!("if ({}) {{", self.emit_condition(stmt)),
            Rule::Elif => format!("{close}else if ({}) {{", self.emit_condition(stmt)),
            Rule::Else => format!("{close}else {{"),
            Rule::While => format!("while ({}) {{", self.emit_condition(stmt)),
            _ => format!("{} {{", self.emit_expr(stmt.start, stmt.end - 1)),
        }
    }

    fn enter_scope(&mut self, header: usize) {
        let mut scope = BTreeSet::new();
        let stmt = &self.statements[header];
        if stmt.rule == Rule::Function {
            for idx in stmt.start + 3..stmt.end - 2 {
                if self.tokens[idx].0 == TokenKind::Ident {
                    scope.insert(self.text(idx).to_string());
                }
            }
        }
        self.scopes.push(scope);
    }

    fn emit_body(&mut self, header: usize, body: &[Node], depth: usize, lines: &mut Vec<String>) {
        self.enter_scope(header);
        self.emit_nodes(body, depth + 1, lines);
        self.scopes.pop();
    }

    fn emit_nodes(&mut self, nodes: &[Node], depth: usize, lines: &mut Vec<String>) {
        let indent = INDENT.repeat(depth);
        for node in nodes {
            match node {
                Node::Simple(idx) => {
                    let text = self.emit_statement(*idx);
                    lines.push(format!("{indent}{text}"));
                }
                Node::Block {
                    header,
                    body,
                    alternates,
                } => {
                    let text = self.emit_header(*header, false);
                    lines.push(format!("{indent}{text}"));
                    self.emit_body(*header, body, depth, lines);
                    for (alt, alt_body) in alternates {
                        let text = self.emit_header(*alt, true);
                        lines.push(format!("{indent}{text}"));
                        self.emit_body(*alt, alt_body, depth, lines);
                    }
                    lines.push(format!("{indent}}}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(target: &str) -> String {
        let prefix = format!("{PRELUDE}\n\n");
        assert!(target.starts_with(&prefix), "missing prelude in {target}");
        target[prefix.len()..].to_string()
    }

    fn balanced(target: &str) -> bool {
        target.matches('{').count() == target.matches('}').count()
    }

    #[test]
    fn binding() {
        assert_eq!(body(&translate("x = 5;")), "let x = 5;\n");
    }

    #[test]
    fn rebinding_assigns() {
        assert_eq!(
            body(&translate("x = 1;\nx = x + 1;")),
            "let x = 1;\nx = x + 1;\n"
        );
    }

    #[test]
    fn say_and_ask() {
        assert_eq!(body(&translate("say \"hi\";")), "kp.output(\"hi\");\n");
        assert_eq!(body(&translate("ask \"name? \";")), "kp.input(\"name? \");\n");
        assert_eq!(
            body(&translate("name = ask \"name? \";")),
            "let name = kp.input(\"name? \");\n"
        );
    }

    #[test]
    fn nested_ask_stops_at_its_group() {
        assert_eq!(
            body(&translate("n = int(ask \"n? \") * 2;")),
            "let n = int(kp.input(\"n? \")) * 2;\n"
        );
    }

    #[test]
    fn keywords_inside_strings_are_left_alone() {
        assert_eq!(
            body(&translate("say \"if(x): say y; else:\";")),
            "kp.output(\"if(x): say y; else:\");\n"
        );
    }

    #[test]
    fn inline_if_else() {
        let target = translate("if(x > 0): say \"pos\"; else: say \"neg\";");
        assert_eq!(
            body(&target),
            "if (x > 0) {\n    kp.output(\"pos\");\n} else {\n    kp.output(\"neg\");\n}\n"
        );
        assert!(balanced(&target));
    }

    #[test]
    fn indented_blocks_nest() {
        let src = "fun count(n):\n    i = 0;\n    while(i < n):\n        say i;\n        i = i + 1;\n    return i;\ncount(3);\n";
        assert_eq!(
            body(&translate(src)),
            "function count(n) {\n    let i = 0;\n    while (i < n) {\n        kp.output(i);\n        i = i + 1;\n    }\n    return i;\n}\ncount(3);\n"
        );
    }

    #[test]
    fn flat_blocks_close_at_next_header() {
        let src = "fun a():\nsay 1;\nfun b():\nsay 2;\n";
        assert_eq!(
            body(&translate(src)),
            "function a() {\n    kp.output(1);\n}\nfunction b() {\n    kp.output(2);\n}\n"
        );
    }

    #[test]
    fn elif_chain() {
        let src = "if(x == 1):\n    say 1;\nelif(x == 2):\n    say 2;\nelse:\n    say 3;\n";
        assert_eq!(
            body(&translate(src)),
            "if (x == 1) {\n    kp.output(1);\n} else if (x == 2) {\n    kp.output(2);\n} else {\n    kp.output(3);\n}\n"
        );
    }

    #[test]
    fn exports_are_routed_through_the_alias() {
        assert_eq!(
            body(&translate("exports.total = 3;")),
            "kp.exports.total = 3;\n"
        );
    }

    #[test]
    fn residual_colon_opens_block() {
        let target = translate("for x in y:\n    say x;\n");
        assert_eq!(body(&target), "for x in y {\n    kp.output(x);\n}\n");
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(body(&translate("# greet\nsay 1; # done\n")), "kp.output(1);\n");
    }

    #[test]
    fn untokenizable_tail_is_copied() {
        let target = translate("say 1;\nsay \"open;\n");
        assert!(target.ends_with("kp.output(1);\nsay\n\"open;\n"), "{target}");
    }

    #[test]
    fn orphan_else_is_unbalanced_for_the_compiler() {
        let target = translate("say 1;\nelse:\n    say 2;\n");
        assert!(target.contains("else {"));
        assert!(!target.contains("} else"));
    }
}
