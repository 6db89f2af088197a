//! Parser for list literals stored as text in CSV cells.
//!
//! Catalog exports commonly serialize list columns as `['red', 'blue']`
//! or `["red","blue"]`. [`parse_list`] accepts both quote styles, nested
//! lists and tuples, numbers, and the `True`/`False`/`None` and
//! `true`/`false`/`null` keywords. It never evaluates anything else:
//! bare words, dicts, sets, and expressions are rejected with a
//! [`LiteralError`].

use crate::error::LiteralError;
use crate::models::RawValue;

/// Parses `input` as a single list (or tuple) literal.
///
/// The whole input, apart from surrounding whitespace, must be consumed.
pub fn parse_list(input: &str) -> Result<Vec<RawValue>, LiteralError> {
    let mut parser = Parser {
        src: input.as_bytes(),
        text: input,
        pos: 0,
    };
    parser.skip_ws();
    let items = match parser.peek() {
        Some(b'[') => parser.sequence(b'[', b']')?,
        Some(b'(') => parser.sequence(b'(', b')')?,
        _ => return Err(parser.error("expected '[' or '('")),
    };
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(items)
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn sequence(&mut self, open: u8, close: u8) -> Result<Vec<RawValue>, LiteralError> {
        debug_assert_eq!(self.peek(), Some(open));
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                None => return Err(self.error("unterminated list")),
                _ => {}
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {}
                None => return Err(self.error("unterminated list")),
                _ => return Err(self.error("expected ',' between list items")),
            }
        }
    }

    fn value(&mut self) -> Result<RawValue, LiteralError> {
        match self.peek() {
            Some(b'[') => Ok(RawValue::List(self.sequence(b'[', b']')?)),
            Some(b'(') => Ok(RawValue::List(self.sequence(b'(', b')')?)),
            Some(q @ (b'\'' | b'"')) => self.string(q).map(RawValue::Text),
            Some(b) if b == b'-' || b == b'+' || b == b'.' || b.is_ascii_digit() => self.number(),
            Some(b) if b.is_ascii_alphabetic() => self.keyword(),
            Some(b'{') => Err(self.error("dict and set literals are not supported")),
            _ => Err(self.error("expected a value")),
        }
    }

    fn string(&mut self, quote: u8) -> Result<String, LiteralError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        let mut run_start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                out.push_str(&self.text[run_start..self.pos]);
                self.pos += 1;
                return Ok(out);
            }
            if b == b'\\' {
                out.push_str(&self.text[run_start..self.pos]);
                let escaped = self.src.get(self.pos + 1).copied();
                let ch = match escaped {
                    Some(b'\\') => '\\',
                    Some(b'\'') => '\'',
                    Some(b'"') => '"',
                    Some(b'n') => '\n',
                    Some(b't') => '\t',
                    Some(b'r') => '\r',
                    _ => {
                        self.pos += 1;
                        return Err(self.error("unsupported escape sequence"));
                    }
                };
                out.push(ch);
                self.pos += 2;
                run_start = self.pos;
                continue;
            }
            self.pos += 1;
        }
        self.pos = start;
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> Result<RawValue, LiteralError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b) if b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E' | b'_')
        ) {
            self.pos += 1;
        }
        let token: String = self.text[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if let Ok(i) = token.parse::<i64>() {
            return Ok(RawValue::Int(i));
        }
        match token.parse::<f64>() {
            Ok(f) => Ok(RawValue::Float(f)),
            Err(_) => {
                self.pos = start;
                Err(self.error("malformed number"))
            }
        }
    }

    fn keyword(&mut self) -> Result<RawValue, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "True" | "true" => Ok(RawValue::Bool(true)),
            "False" | "false" => Ok(RawValue::Bool(false)),
            "None" | "null" => Ok(RawValue::Null),
            _ => {
                self.pos = start;
                Err(self.error("bare identifiers are not literals"))
            }
        }
    }
}
