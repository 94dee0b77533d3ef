//! SQL Tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes SQL input.
///
/// The lexer is cheap to clone, which the parser relies on for lookahead.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the source text being tokenized.
    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.input
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace and comments (`-- ...`, `# ...` and `/* ... */`).
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            let line_comment = (self.peek() == Some('-') && self.peek_next() == Some('-'))
                || (self.peek() == Some('#') && self.peek_next() != Some('!'));
            if line_comment {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn error(&self, message: impl Into<String>) -> Token {
        self.make_token(TokenKind::Error(message.into()))
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    /// Scans a quoted identifier (`"name"` or `` `name` ``).
    ///
    /// Quoted identifiers are never keywords.
    fn scan_quoted_identifier(&mut self, quote: char) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some('\\') => match self.advance() {
                    Some(escaped) => value.push(escaped),
                    None => return self.error("Unterminated quoted identifier"),
                },
                Some(c) => value.push(c),
                None => return self.error("Unterminated quoted identifier"),
            }
        }

        self.make_token(TokenKind::Identifier(value))
    }

    /// Scans a number: decimal, hexadecimal (`0x1F`), float or exponent form.
    fn scan_number(&mut self) -> Token {
        if self.peek() == Some('0') && matches!(self.peek_next(), Some('x' | 'X')) {
            self.advance();
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.input[self.start + 2..self.pos];
            return match i64::from_str_radix(digits, 16) {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(e) => self.error(format!("Invalid hex literal: {e}")),
            };
        }

        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            let mut lookahead = self.input[self.pos..].chars().skip(1);
            let exponent_follows = match lookahead.next() {
                Some('+' | '-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance();
                if self.peek().is_some_and(|c| c == '+' || c == '-') {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.input[self.start..self.pos];
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return self.make_token(TokenKind::Integer(i));
            }
        }
        // UInt64 and wider literals do not fit an i64 but are still numbers.
        match text.parse::<f64>() {
            Ok(f) => self.make_token(TokenKind::Float(f)),
            Err(e) => self.error(format!("Invalid number: {e}")),
        }
    }

    /// Scans a single-quoted string literal.
    ///
    /// Both SQL-style doubled quotes and backslash escapes are accepted.
    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        value.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(c) => value.push(c),
                    None => return self.error("Unterminated string literal"),
                },
                Some(c) => value.push(c),
                None => return self.error("Unterminated string literal"),
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '~' => self.make_token(TokenKind::BitNot),
            '&' => self.make_token(TokenKind::BitAnd),
            '.' => self.make_token(TokenKind::Dot),
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::Arrow)
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            ':' => {
                if self.peek() == Some(':') {
                    self.advance();
                    self.make_token(TokenKind::DoubleColon)
                } else {
                    self.make_token(TokenKind::Colon)
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                }
                self.make_token(TokenKind::Eq)
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                }
                Some('<') => {
                    self.advance();
                    self.make_token(TokenKind::LeftShift)
                }
                _ => self.make_token(TokenKind::Lt),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::RightShift)
                }
                _ => self.make_token(TokenKind::Gt),
            },
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.error("Unexpected character: !")
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::Concat)
                } else {
                    self.make_token(TokenKind::BitOr)
                }
            }
            '\'' => {
                self.pos = self.start;
                self.scan_string()
            }
            '"' | '`' => {
                self.pos = self.start;
                self.scan_quoted_identifier(c)
            }
            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }
            c if c.is_alphabetic() || c == '_' => {
                self.pos = self.start;
                self.scan_identifier()
            }
            _ => self.error(format!("Unexpected character: {c}")),
        }
    }

    /// Tokenizes the entire input, including the trailing EOF token.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
