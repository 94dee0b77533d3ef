//! SQL Lexer
//!
//! A hand-written lexer producing a stream of tokens for ClickHouse-style
//! SELECT queries.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
