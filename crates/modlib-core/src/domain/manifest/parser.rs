//! Restricted parser for manifest data files.
//!
//! Accepts exactly one top-level `@{ ... }` table containing `Key = Value`
//! entries separated by semicolons or newlines. Values are quoted strings,
//! bare tokens, `@( ... )` string arrays, or nested `@{ ... }` tables.
//! Comments run from `#` to end of line. Nothing is ever evaluated.

use super::{ManifestError, ManifestTable, ManifestValue};

/// Parse manifest text into a raw key/value table.
///
/// # Errors
///
/// Returns [`ManifestError::Syntax`] when the text is not well-formed
/// restricted data.
pub fn parse_manifest(text: &str) -> Result<ManifestTable, ManifestError> {
    let mut parser = Parser::new(text);
    parser.skip_trivia(true);
    let table = parser.parse_table()?;
    parser.skip_trivia(true);
    if let Some(ch) = parser.peek() {
        return Err(parser.syntax(format!("unexpected trailing content '{ch}'")));
    }
    Ok(table)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn syntax(&self, message: impl Into<String>) -> ManifestError {
        ManifestError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    /// Skip whitespace and comments. Newlines are only consumed when
    /// `newlines` is true; inside an entry they act as separators.
    fn skip_trivia(&mut self, newlines: bool) {
        while let Some(ch) = self.peek() {
            match ch {
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\n' if !newlines => break,
                c if c.is_whitespace() => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ManifestError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(self.syntax(format!("expected '{expected}', found '{ch}'"))),
            None => Err(self.syntax(format!("expected '{expected}', found end of input"))),
        }
    }

    /// Parse `@{ key = value ... }` with the leading `@{` still pending.
    fn parse_table(&mut self) -> Result<ManifestTable, ManifestError> {
        self.expect('@')?;
        self.expect('{')?;
        let mut table = ManifestTable::new();

        loop {
            self.skip_trivia(true);
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(table);
                }
                Some(';') => {
                    self.bump();
                }
                Some(_) => {
                    let key = self.parse_key()?;
                    self.skip_trivia(true);
                    self.expect('=')?;
                    self.skip_trivia(true);
                    let value = self.parse_value()?;
                    table.insert(key, value);
                    // The entry ends at a separator or the closing brace.
                    self.skip_trivia(false);
                    match self.peek() {
                        Some(';' | '\n') => {
                            self.bump();
                        }
                        Some('}') | None => {}
                        Some(ch) => {
                            return Err(
                                self.syntax(format!("expected separator after value, found '{ch}'"))
                            );
                        }
                    }
                }
                None => return Err(self.syntax("unterminated table, expected '}'")),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, ManifestError> {
        match self.peek() {
            Some('\'' | '"') => self.parse_string(),
            Some(ch) if ch.is_alphanumeric() || ch == '_' => {
                let mut key = String::new();
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        key.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(key)
            }
            Some(ch) => Err(self.syntax(format!("expected key, found '{ch}'"))),
            None => Err(self.syntax("expected key, found end of input")),
        }
    }

    fn parse_value(&mut self) -> Result<ManifestValue, ManifestError> {
        match self.peek() {
            Some('\'' | '"') => Ok(ManifestValue::Text(self.parse_string()?)),
            Some('@') => match self.peek_at(1) {
                Some('{') => Ok(ManifestValue::Table(self.parse_table()?)),
                Some('(') => Ok(ManifestValue::List(self.parse_array()?)),
                other => Err(self.syntax(format!(
                    "expected '@{{' or '@(', found '@{}'",
                    other.map_or_else(String::new, String::from)
                ))),
            },
            Some(ch) if !ch.is_whitespace() => Ok(ManifestValue::Opaque(self.parse_bare_token()?)),
            Some(ch) => Err(self.syntax(format!("expected value, found '{ch}'"))),
            None => Err(self.syntax("expected value, found end of input")),
        }
    }

    /// Parse `@( item, item ... )`. Items are strings or bare tokens;
    /// anything nested deeper is outside the restricted data shape.
    fn parse_array(&mut self) -> Result<Vec<String>, ManifestError> {
        self.expect('@')?;
        self.expect('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia(true);
            match self.peek() {
                Some(')') => {
                    self.bump();
                    return Ok(items);
                }
                Some(',') => {
                    self.bump();
                }
                Some('\'' | '"') => items.push(self.parse_string()?),
                Some('@') => {
                    return Err(self.syntax("arrays may only contain strings"));
                }
                Some(_) => items.push(self.parse_bare_token()?),
                None => return Err(self.syntax("unterminated array, expected ')'")),
            }
        }
    }

    /// Parse a quoted string. Single quotes are literal with `''` as the
    /// escape for a quote; double quotes end at the next unescaped quote
    /// with backtick as the escape character.
    fn parse_string(&mut self) -> Result<String, ManifestError> {
        let quote = self
            .bump()
            .ok_or_else(|| self.syntax("expected string, found end of input"))?;
        let mut out = String::new();

        loop {
            match self.bump() {
                Some(ch) if ch == quote => {
                    if quote == '\'' && self.peek() == Some('\'') {
                        self.bump();
                        out.push('\'');
                        continue;
                    }
                    return Ok(out);
                }
                Some('`') if quote == '"' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(ch) => out.push(ch),
                    None => return Err(self.syntax("unterminated string")),
                },
                Some(ch) => out.push(ch),
                None => return Err(self.syntax("unterminated string")),
            }
        }
    }

    fn parse_bare_token(&mut self) -> Result<String, ManifestError> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || matches!(ch, ';' | ',' | ')' | '}' | '#' | '=') {
                break;
            }
            out.push(ch);
            self.bump();
        }
        if out.is_empty() {
            return Err(self.syntax("expected value"));
        }
        Ok(out)
    }
}
