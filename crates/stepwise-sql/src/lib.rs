//! # stepwise-sql
//!
//! A best-effort parser for ClickHouse-style SELECT queries, used to find the
//! tables a materialized view or dictionary reads from.
//!
//! This crate provides:
//! - A hand-written lexer and a recursive descent parser with Pratt
//!   expression parsing
//! - A query AST covering CTEs, set operations, ClickHouse joins, `FINAL`,
//!   `SAMPLE`, `PREWHERE`, `ARRAY JOIN`, lambdas and parametric aggregates
//! - Table reference extraction with CTE scoping
//!
//! ## Extracting table references
//!
//! ```rust
//! use stepwise_sql::extract_table_references;
//!
//! let tables = extract_table_references(
//!     "SELECT a FROM t1 JOIN analytics.t2 ON t1.id = t2.id",
//! );
//! let names: Vec<&str> = tables.iter().map(|t| t.as_str()).collect();
//! assert_eq!(names, ["t1", "t2"]);
//!
//! // Input that does not parse yields no references.
//! assert!(extract_table_references("SELEC oops").is_empty());
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod refs;

pub use ast::{Expr, Query};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use refs::{
    extract_table_references, try_extract_table_references, ReferenceCollector, TableName,
    TableSet,
};
