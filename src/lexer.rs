// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::str::FromStr;
use std::rc::Rc;

use crate::number::Number;

use anyhow::{anyhow, bail, Result};

struct SourceText {
    file: String,
    contents: String,
    // Byte range of every line, excluding its terminator.
    lines: Vec<(u32, u32)>,
}

/// A named piece of text, either dialect source or translated target text.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceText>,
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::ptr_eq(&self.src, &other.src)
    }
}

impl cmp::Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

fn line_table(contents: &str) -> Vec<(u32, u32)> {
    let mut lines = vec![];
    let mut start = 0usize;
    for piece in contents.split_inclusive('\n') {
        let body = piece.strip_suffix('\n').unwrap_or(piece);
        let body = body.strip_suffix('\r').unwrap_or(body);
        lines.push((start as u32, (start + body.len()) as u32));
        start += piece.len();
    }
    // A trailing newline (or empty text) still leaves one addressable line.
    if contents.is_empty() || contents.ends_with('\n') {
        lines.push((start as u32, start as u32));
    }
    lines
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        // Offsets are stored as u32; leave room for 1-based columns and EOF.
        let max_size = u32::MAX as usize - 2;
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed source file size {max_size}");
        }
        let lines = line_table(&contents);
        Ok(Self {
            src: Rc::new(SourceText {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Source> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_contents(path.to_string_lossy().to_string(), contents),
            Err(e) => bail!("Failed to read {}. {e}", path.display()),
        }
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    /// Text of the 0-based line `idx`, without its line terminator.
    pub fn line(&self, idx: u32) -> &str {
        match self.src.lines.get(idx as usize) {
            Some(&(start, end)) => &self.src.contents[start as usize..end as usize],
            None => "",
        }
    }

    /// Column of the first non-blank character of the 1-based `line`.
    /// Tabs count as 4 columns, consistent with the lexer.
    pub fn line_indent(&self, line: u32) -> u32 {
        self.line(line.saturating_sub(1))
            .chars()
            .map_while(|ch| match ch {
                ' ' => Some(1),
                '\t' => Some(4),
                _ => None,
            })
            .sum::<u32>()
            + 1
    }

    /// Renders a diagnostic pointing at `line`:`col` with a caret under the
    /// offending column.
    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let number = line.to_string();
        let gutter = " ".repeat(number.len() + 1);
        let caret = " ".repeat((col as usize).saturating_sub(1));
        let text = self.line(line.saturating_sub(1));
        format!(
            "\n--> {}:{line}:{col}\n{gutter}|\n{number} | {text}\n{gutter}| {caret}^\n{kind}: {msg}",
            self.src.file
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let text = self.text().escape_debug().to_string();
        let shown: String = text.chars().take(32).collect();
        let trailer = if shown.len() < text.len() { "..." } else { "" };
        write!(
            f,
            "{}:{}:{}:{}, \"{shown}{trailer}\"",
            self.line, self.col, self.start, self.end
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    RawString,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

impl Token {
    /// Byte range of the token in its source, including string delimiters.
    pub fn extent(&self) -> (usize, usize) {
        let (start, end) = (self.1.start as usize, self.1.end as usize);
        match self.0 {
            TokenKind::String | TokenKind::RawString => (start - 1, end + 1),
            _ => (start, end),
        }
    }

    pub fn is_symbol(&self, text: &str) -> bool {
        self.0 == TokenKind::Symbol && self.1.text() == text
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.0 == TokenKind::Ident && self.1.text() == text
    }
}

// Two-character operators are matched before single characters.
const PAIRED_SYMBOLS: [&str; 6] = ["<=", ">=", "==", "!=", "&&", "||"];
const SINGLE_SYMBOLS: &str = "{}[]()+-*/%,;.:<>=!";

/// Tokenizer shared by the dialect translator and the host script parser.
///
/// Columns are 1-based and count a tab as 4 columns. String spans cover the
/// text between the quotes.
#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    text: &'source str,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            text: source.contents(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while matches!(self.peek(), Some(ch) if pred(ch)) {
            self.bump();
        }
    }

    fn span(&self, line: u32, col: u32, start: usize, end: usize) -> Span {
        Span {
            source: self.source.clone(),
            line,
            col,
            start: start as u32,
            end: end as u32,
        }
    }

    fn symbol(&mut self, len: usize) -> Token {
        let (start, col) = (self.pos, self.col);
        for _ in 0..len {
            self.bump();
        }
        self.col += len as u32;
        Token(
            TokenKind::Symbol,
            self.span(self.line, col, start, self.pos),
        )
    }

    fn read_ident(&mut self) -> Token {
        let (start, col) = (self.pos, self.col);
        self.eat_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        self.col += (self.pos - start) as u32;
        Token(TokenKind::Ident, self.span(self.line, col, start, self.pos))
    }

    // Unsigned decimal literals: digits, an optional fraction and an optional
    // exponent. A leading 0 may not be followed by more digits.
    fn read_number(&mut self) -> Result<Token> {
        let (start, col) = (self.pos, self.col);
        if self.bump() != Some('0') {
            self.eat_while(|ch| ch.is_ascii_digit());
        }
        if self.peek() == Some('.') && matches!(self.peek_nth(1), Some(d) if d.is_ascii_digit()) {
            self.bump();
            self.eat_while(|ch| ch.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            self.eat_while(|ch| ch.is_ascii_digit());
        }
        self.col += (self.pos - start) as u32;

        if matches!(self.peek(), Some(ch) if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric()) {
            return Err(self.source.error(self.line, self.col, "invalid number"));
        }
        let literal = &self.text[start..self.pos];
        if Number::from_str(literal).is_err() {
            return Err(self.source.error(self.line, col, "invalid number"));
        }
        Ok(Token(
            TokenKind::Number,
            self.span(self.line, col, start, self.pos),
        ))
    }

    fn read_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let start = self.pos;
        loop {
            let at = col + 1 + (self.pos - start) as u32;
            match self.peek() {
                Some('"') => break,
                None => return Err(self.source.error(line, col, "unmatched \"")),
                Some('\\') => {
                    self.bump();
                    self.bump();
                }
                Some(ch) if ch < '\u{0020}' => {
                    return Err(self.source.error(line, at, "invalid character in string"))
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let end = self.pos;
        self.bump();
        self.col += (self.pos - start) as u32 + 1;

        // Escapes follow json.
        if let Err(e) = serde_json::from_str::<String>(&self.text[start - 1..self.pos]) {
            bail!(
                "{} {e}",
                self.source.error(line, col, "invalid escape sequence:")
            );
        }
        Ok(Token(
            TokenKind::String,
            self.span(line, col + 1, start, end),
        ))
    }

    fn read_raw_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.bump();
        self.col += 1;
        let start = self.pos;
        loop {
            match self.bump() {
                Some('`') => break,
                Some('\n') => {
                    self.line += 1;
                    self.col = 1;
                }
                Some('\t') => self.col += 4,
                Some(_) => self.col += 1,
                None => return Err(self.source.error(line, col, "unmatched `")),
            }
        }
        self.col += 1;
        Ok(Token(
            TokenKind::RawString,
            self.span(line, col + 1, start, self.pos - 1),
        ))
    }

    // Skips blanks, line breaks and `#` comments.
    fn skip_ws(&mut self) -> Result<()> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => self.col += 1,
                '\t' => self.col += 4,
                '\r' if self.peek_nth(1) == Some('\n') => (),
                '\r' => {
                    return Err(self.source.error(
                        self.line,
                        self.col,
                        "\\r must be followed by \\n",
                    ))
                }
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                }
                '#' => {
                    self.eat_while(|ch| ch != '\n');
                    continue;
                }
                _ => break,
            }
            self.bump();
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, col) = (self.pos, self.col);
        let Some(ch) = self.peek() else {
            return Ok(Token(TokenKind::Eof, self.span(self.line, col, start, start)));
        };
        let text = self.text;
        let rest = &text[start..];
        match ch {
            '"' => self.read_string(),
            '`' => self.read_raw_string(),
            _ if ch.is_ascii_digit() => self.read_number(),
            _ if ch.is_ascii_alphabetic() || ch == '_' => Ok(self.read_ident()),
            _ if PAIRED_SYMBOLS.iter().any(|op| rest.starts_with(op)) => Ok(self.symbol(2)),
            _ if SINGLE_SYMBOLS.contains(ch) => Ok(self.symbol(1)),
            _ => Err(self.source.error(self.line, col, "invalid character")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_exclude_terminators() -> Result<()> {
        let source = Source::from_contents("t.kp".to_string(), "a\r\nbc\n".to_string())?;
        assert_eq!(source.line(0), "a");
        assert_eq!(source.line(1), "bc");
        assert_eq!(source.line(2), "");
        assert_eq!(source.line(9), "");
        Ok(())
    }

    #[test]
    fn message_points_at_column() -> Result<()> {
        let source = Source::from_contents("t.kp".to_string(), "x = $;".to_string())?;
        let msg = source.message(1, 5, "error", "invalid character");
        assert_eq!(
            msg,
            "\n--> t.kp:1:5\n  |\n1 | x = $;\n  |     ^\nerror: invalid character"
        );
        Ok(())
    }

    #[test]
    fn out_of_range_literal_is_rejected() -> Result<()> {
        let source = Source::from_contents("t.kp".to_string(), "1e999".to_string())?;
        let err = Lexer::new(&source).next_token().map(|_| ()).unwrap_err();
        assert!(err.to_string().contains("invalid number"));
        Ok(())
    }
}
