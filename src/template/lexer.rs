//! Splits template source into a flat token stream.
//!
//! Text between actions becomes a single `Text` token; every `{{ ... }}`
//! action becomes `Open`, its inner tokens, and `Close`. Trim markers and
//! comments are resolved here so the parser never sees them.

use super::TemplateError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Text(String),
    Open,
    Close,
    /// `.a.b`, stored as its segments
    Field(Vec<String>),
    Ident(String),
    Str(String),
    Number(f64),
    Bool(bool),
    Pipe,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the source
    pub position: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, TemplateError> {
    Lexer { src, tokens: Vec::new(), trim_next_text: false }.run()
}

struct Lexer<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    trim_next_text: bool,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, TemplateError> {
        let mut pos = 0;
        while pos < self.src.len() {
            let Some(offset) = self.src[pos..].find("{{") else {
                self.push_text(pos, self.src.len(), false);
                break;
            };
            let open = pos + offset;
            let mut inner = open + 2;
            let trim_left = self.is_trim_marker_after(inner);
            if trim_left {
                inner += 1;
            }
            self.push_text(pos, open, trim_left);
            pos = self.lex_action(open, inner)?;
        }
        Ok(self.tokens)
    }

    fn push_text(&mut self, start: usize, end: usize, trim_end: bool) {
        let mut text = &self.src[start..end];
        if std::mem::take(&mut self.trim_next_text) {
            text = text.trim_start();
        }
        if trim_end {
            text = text.trim_end();
        }
        if !text.is_empty() {
            self.tokens.push(Token { kind: TokenKind::Text(text.to_string()), position: start });
        }
    }

    /// `{{-` only trims when the dash is followed by whitespace, so `{{-3}}`
    /// still lexes as a negative number.
    fn is_trim_marker_after(&self, at: usize) -> bool {
        let rest = &self.src[at..];
        rest.starts_with('-') && rest[1..].starts_with(char::is_whitespace)
    }

    fn lex_action(&mut self, open: usize, inner: usize) -> Result<usize, TemplateError> {
        let body = &self.src[inner..];
        let leading = body.len() - body.trim_start().len();
        if body[leading..].starts_with("/*") {
            return self.lex_comment(open, inner + leading + 2);
        }

        self.tokens.push(Token { kind: TokenKind::Open, position: open });
        let bytes = self.src.as_bytes();
        let mut i = inner;
        while i < self.src.len() {
            let c = bytes[i];
            match c {
                b'}' if self.src[i..].starts_with("}}") => {
                    self.tokens.push(Token { kind: TokenKind::Close, position: i });
                    return Ok(i + 2);
                }
                b'-' if self.src[i + 1..].starts_with("}}")
                    && i > inner
                    && bytes[i - 1].is_ascii_whitespace() =>
                {
                    self.tokens.push(Token { kind: TokenKind::Close, position: i });
                    self.trim_next_text = true;
                    return Ok(i + 3);
                }
                c if c.is_ascii_whitespace() => i += 1,
                b'|' => {
                    self.tokens.push(Token { kind: TokenKind::Pipe, position: i });
                    i += 1;
                }
                b'(' => {
                    self.tokens.push(Token { kind: TokenKind::LParen, position: i });
                    i += 1;
                }
                b')' => {
                    self.tokens.push(Token { kind: TokenKind::RParen, position: i });
                    i += 1;
                }
                b'.' => i = self.lex_field(i)?,
                b'"' => i = self.lex_string(i)?,
                b'`' => i = self.lex_raw_string(i)?,
                b'-' | b'0'..=b'9' => i = self.lex_number(i)?,
                c if c.is_ascii_alphabetic() || c == b'_' => i = self.lex_ident(i),
                _ => {
                    let ch = self.src[i..].chars().next().unwrap_or_default();
                    return Err(self.error(i, format!("unexpected {ch:?} in action")));
                }
            }
        }
        Err(self.error(open, "unclosed action".to_string()))
    }

    fn lex_comment(&mut self, open: usize, body_start: usize) -> Result<usize, TemplateError> {
        let Some(end) = self.src[body_start..].find("*/") else {
            return Err(self.error(open, "unclosed comment".to_string()));
        };
        let after = body_start + end + 2;
        let rest = &self.src[after..];
        let trimmed = rest.trim_start();
        let skipped = rest.len() - trimmed.len();
        if trimmed.starts_with("}}") {
            Ok(after + skipped + 2)
        } else if skipped > 0 && trimmed.starts_with("-}}") {
            self.trim_next_text = true;
            Ok(after + skipped + 3)
        } else {
            Err(self.error(open, "comment ends before closing delimiter".to_string()))
        }
    }

    fn lex_field(&mut self, start: usize) -> Result<usize, TemplateError> {
        let mut segments = Vec::new();
        let mut i = start;
        while self.src[i..].starts_with('.') {
            let name_start = i + 1;
            let name_end = self.scan_word(name_start);
            if name_end == name_start {
                return Err(self.error(i, "expected a field name after '.'".to_string()));
            }
            segments.push(self.src[name_start..name_end].to_string());
            i = name_end;
        }
        self.tokens.push(Token { kind: TokenKind::Field(segments), position: start });
        Ok(i)
    }

    fn lex_ident(&mut self, start: usize) -> usize {
        let end = self.scan_word(start);
        let word = &self.src[start..end];
        let kind = match word {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(word.to_string()),
        };
        self.tokens.push(Token { kind, position: start });
        end
    }

    fn scan_word(&self, start: usize) -> usize {
        self.src[start..]
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .map_or(self.src.len(), |n| start + n)
    }

    fn lex_number(&mut self, start: usize) -> Result<usize, TemplateError> {
        let bytes = self.src.as_bytes();
        let mut i = start;
        if bytes[i] == b'-' {
            i += 1;
        }
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
            i += 1;
        }
        let literal = &self.src[start..i];
        let number = literal
            .parse::<f64>()
            .map_err(|_| self.error(start, format!("bad number syntax: {literal:?}")))?;
        self.tokens.push(Token { kind: TokenKind::Number(number), position: start });
        Ok(i)
    }

    fn lex_string(&mut self, start: usize) -> Result<usize, TemplateError> {
        let mut out = String::new();
        let mut chars = self.src[start + 1..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.tokens.push(Token { kind: TokenKind::Str(out), position: start });
                    return Ok(start + 1 + offset + 1);
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, c @ ('"' | '\\'))) => out.push(c),
                    Some((_, c)) => {
                        return Err(self.error(start, format!("unknown escape sequence \\{c}")));
                    }
                    None => break,
                },
                '\n' => break,
                c => out.push(c),
            }
        }
        Err(self.error(start, "unterminated quoted string".to_string()))
    }

    fn lex_raw_string(&mut self, start: usize) -> Result<usize, TemplateError> {
        let Some(len) = self.src[start + 1..].find('`') else {
            return Err(self.error(start, "unterminated raw string".to_string()));
        };
        let content = self.src[start + 1..start + 1 + len].to_string();
        self.tokens.push(Token { kind: TokenKind::Str(content), position: start });
        Ok(start + len + 2)
    }

    fn error(&self, position: usize, message: String) -> TemplateError {
        TemplateError::parse(self.src, position, message)
    }
}
