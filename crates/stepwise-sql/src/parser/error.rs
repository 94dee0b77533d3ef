//! Parser error types.

use crate::lexer::{Span, TokenKind};

/// A parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// What the parser expected, if applicable.
    pub expected: Option<String>,
    /// The token found instead.
    pub found: Option<TokenKind>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected token" error.
    ///
    /// Lexer errors are reported with the lexer's own message.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        let expected: String = expected.into();
        let message = match &found {
            TokenKind::Eof => format!("Unexpected end of input: expected {expected}"),
            TokenKind::Error(lexer_message) => lexer_message.clone(),
            other => format!("Unexpected token: expected {expected}, found {other:?}"),
        };
        Self {
            message,
            span,
            expected: Some(expected),
            found: Some(found),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at position {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_eof_message() {
        let err = ParseError::unexpected("identifier", TokenKind::Eof, Span::new(14, 14));
        assert_eq!(
            err.to_string(),
            "Unexpected end of input: expected identifier at position 14..14"
        );
    }

    #[test]
    fn test_lexer_error_message_is_kept() {
        let err = ParseError::unexpected(
            "expression",
            TokenKind::Error("Unterminated string literal".into()),
            Span::new(7, 12),
        );
        assert_eq!(err.message, "Unterminated string literal");
        assert_eq!(err.expected.as_deref(), Some("expression"));
    }
}
