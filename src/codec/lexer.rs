//! Tokenizer for the topology text format.
//!
//! Tokens are maximal runs of non-whitespace characters; whitespace,
//! newlines included, only separates them.

use crate::error::{Position, Result, TopologyError};

/// A token with the position of its first character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub position: Position,
}

/// Splits input into whitespace-separated tokens
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        self.skip_whitespace();
        let position = self.position();
        let start = self.offset;
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                break;
            }
            self.advance();
        }
        if start == self.offset {
            return None;
        }
        Some(Token {
            text: &self.input[start..self.offset],
            position,
        })
    }
}

/// Cursor over a token stream with `expect` helpers.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    current: Option<Token<'a>>,
    end: Position,
}

impl<'a> TokenStream<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        // only read once `current` runs out
        let end = lexer.position();
        Self { lexer, current, end }
    }

    /// Token under the cursor, without consuming it.
    pub fn peek(&self) -> Option<&Token<'a>> {
        self.current.as_ref()
    }

    pub fn peek_text(&self) -> Option<&'a str> {
        self.current.as_ref().map(|t| t.text)
    }

    pub fn is_at_end(&self) -> bool {
        self.current.is_none()
    }

    /// Position of the token under the cursor, or of the end of input.
    pub fn position(&self) -> Position {
        match &self.current {
            Some(token) => token.position,
            None => self.end,
        }
    }

    /// Consume and return the token under the cursor.
    pub fn next(&mut self) -> Result<Token<'a>> {
        match self.current.take() {
            Some(token) => {
                self.current = self.lexer.next_token();
                if self.current.is_none() {
                    self.end = self.lexer.position();
                }
                Ok(token)
            }
            None => Err(TopologyError::malformed(self.end, "<eof>", "unexpected end of input")),
        }
    }

    /// Consume a token that must equal `expected`.
    pub fn expect(&mut self, expected: &str) -> Result<Position> {
        let position = self.position();
        let token = self.next()?;
        if token.text != expected {
            return Err(TopologyError::malformed(
                token.position,
                token.text,
                format!("expected '{}'", expected),
            ));
        }
        Ok(position)
    }

    /// Consume a token and parse it as a non-negative integer.
    pub fn expect_number(&mut self, what: &str) -> Result<(usize, Token<'a>)> {
        let token = self.next()?;
        let value = token
            .text
            .parse::<usize>()
            .map_err(|_| TopologyError::malformed(token.position, token.text, format!("invalid {}", what)))?;
        Ok((value, token))
    }
}
