#![allow(dead_code)]

use stepwise_sql::ast::{Query, SelectStatement, SetExpr};
use stepwise_sql::{extract_table_references, ParseError, Parser};

pub fn parse(sql: &str) -> Query {
    Parser::new(sql)
        .parse_query()
        .unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e:?}"))
}

pub fn parse_err(sql: &str) -> ParseError {
    Parser::new(sql)
        .parse_query()
        .expect_err(&format!("Expected parse error for: {sql}"))
}

pub fn parse_select(sql: &str) -> SelectStatement {
    match parse(sql).body {
        SetExpr::Select(s) => *s,
        other => panic!("Expected SELECT, got {other:?}"),
    }
}

/// Extracted table names, lower-cased and sorted.
pub fn tables(sql: &str) -> Vec<String> {
    extract_table_references(sql)
        .iter()
        .map(|t| t.key().to_string())
        .collect()
}
