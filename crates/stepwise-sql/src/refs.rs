//! Table reference extraction.
//!
//! Walks a parsed query and collects the names of the tables it reads from:
//! FROM items and join targets, derived tables, CTE bodies, both sides of set
//! operations, and subqueries anywhere inside expressions.
//!
//! Names are reduced to their final segment (`analytics.events` becomes
//! `events`) and compared case-insensitively. Names bound by a `WITH` clause
//! are never reported when used unqualified in its scope, so a CTE can never
//! be mistaken for a physical table.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::ast::{Expr, FunctionCall, Query, SelectStatement, SetExpr, TableRef, WithItem};
use crate::parser::{ParseError, Parser};

/// A table name as written in a query, compared case-insensitively.
///
/// The first spelling encountered is kept for display.
#[derive(Debug, Clone)]
pub struct TableName {
    name: String,
    key: String,
}

impl TableName {
    /// Creates a table name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = name.to_lowercase();
        Self { name, key }
    }

    /// Creates a table name from a possibly schema-qualified name.
    ///
    /// Only the final segment is kept, so `analytics.Events` names the same
    /// table as `events`, matching how references are read from queries.
    #[must_use]
    pub fn from_qualified(name: &str) -> Self {
        let last = name.rsplit('.').next().unwrap_or(name);
        Self::new(last.trim())
    }

    /// Returns the name as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Returns the lower-cased comparison key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true if `other` names the same table, ignoring case.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.key == other.to_lowercase()
    }
}

impl PartialEq for TableName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TableName {}

impl PartialOrd for TableName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TableName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for TableName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TableName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A deduplicated, case-insensitive set of table names.
pub type TableSet = BTreeSet<TableName>;

/// Returns the tables a query reads from.
///
/// Extraction is best-effort: empty input, or input that does not parse as a
/// SELECT query, yields an empty set.
#[must_use]
pub fn extract_table_references(sql: &str) -> TableSet {
    if sql.trim().is_empty() {
        return TableSet::new();
    }
    try_extract_table_references(sql).unwrap_or_default()
}

/// Returns the tables a query reads from, or the parse error.
///
/// # Errors
///
/// Returns a `ParseError` if `sql` is not a valid SELECT query.
pub fn try_extract_table_references(sql: &str) -> Result<TableSet, ParseError> {
    let query = Parser::new(sql).parse_query()?;
    let mut collector = ReferenceCollector::new();
    collector.visit_query(&query);
    Ok(collector.finish())
}

/// Collects table references from a query AST.
#[derive(Debug, Default)]
pub struct ReferenceCollector {
    /// Names bound by enclosing WITH clauses, lower-cased, innermost last.
    scopes: Vec<Vec<String>>,
    tables: TableSet,
}

impl ReferenceCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected tables.
    #[must_use]
    pub fn finish(self) -> TableSet {
        self.tables
    }

    /// Visits a query, including its WITH clause.
    ///
    /// A non-recursive CTE body sees only the items declared before it; a
    /// `WITH RECURSIVE` body also sees its own name.
    pub fn visit_query(&mut self, query: &Query) {
        let Some(with) = &query.with else {
            self.visit_set_expr(&query.body);
            return;
        };

        self.scopes.push(Vec::new());
        for item in &with.items {
            match item {
                WithItem::Cte(cte) => {
                    if with.recursive {
                        self.bind(&cte.name);
                        self.visit_query(&cte.query);
                    } else {
                        self.visit_query(&cte.query);
                        self.bind(&cte.name);
                    }
                }
                WithItem::Alias { expr, alias } => {
                    self.visit_expr(expr);
                    self.bind(alias);
                }
            }
        }
        self.visit_set_expr(&query.body);
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_lowercase());
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        self.scopes.iter().flatten().any(|bound| *bound == key)
    }

    fn visit_set_expr(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => self.visit_select(select),
            SetExpr::Query(query) => self.visit_query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.visit_set_expr(left);
                self.visit_set_expr(right);
            }
        }
    }

    fn visit_select(&mut self, select: &SelectStatement) {
        for column in &select.columns {
            self.visit_expr(&column.expr);
        }
        if let Some(from) = &select.from {
            self.visit_table_ref(from);
        }

        let clauses = [
            &select.prewhere,
            &select.where_clause,
            &select.having,
            &select.qualify,
            &select.limit,
            &select.offset,
        ];
        for expr in clauses.into_iter().flatten() {
            self.visit_expr(expr);
        }

        for expr in &select.group_by {
            self.visit_expr(expr);
        }
        for (_, window) in &select.windows {
            self.visit_exprs(&window.partition_by);
            for item in &window.order_by {
                self.visit_expr(&item.expr);
            }
        }
        for item in &select.order_by {
            self.visit_expr(&item.expr);
        }
        if let Some(limit_by) = &select.limit_by {
            self.visit_expr(&limit_by.limit);
            if let Some(offset) = &limit_by.offset {
                self.visit_expr(offset);
            }
            self.visit_exprs(&limit_by.by);
        }
        for setting in &select.settings {
            self.visit_expr(&setting.value);
        }
    }

    fn visit_table_ref(&mut self, table: &TableRef) {
        match table {
            TableRef::Table {
                schema,
                name,
                sample,
                ..
            } => {
                // A qualified name always refers to a physical table.
                if schema.is_some() || !self.is_bound(name) {
                    self.tables.insert(TableName::new(name.as_str()));
                }
                if let Some(sample) = sample {
                    self.visit_expr(sample);
                }
            }
            // Table functions read from whatever their arguments say; only
            // nested subqueries are followed.
            TableRef::Function { args, .. } => self.visit_exprs(args),
            TableRef::Subquery { query, .. } => self.visit_query(query),
            TableRef::Join { left, join } => {
                self.visit_table_ref(left);
                self.visit_table_ref(&join.table);
                if let Some(on) = &join.on {
                    self.visit_expr(on);
                }
            }
            TableRef::ArrayJoin { left, items, .. } => {
                self.visit_table_ref(left);
                for item in items {
                    self.visit_expr(&item.expr);
                }
            }
        }
    }

    fn visit_exprs(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            self.visit_expr(expr);
        }
    }

    fn visit_function(&mut self, call: &FunctionCall) {
        self.visit_exprs(&call.parameters);
        self.visit_exprs(&call.args);
        if let Some(over) = &call.over {
            self.visit_exprs(&over.partition_by);
            for item in &over.order_by {
                self.visit_expr(&item.expr);
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::Column { .. } | Expr::Wildcard { .. } => {}
            Expr::Subquery(query) | Expr::Exists { query, .. } => self.visit_query(query),
            Expr::InSubquery { expr, query, .. } => {
                self.visit_expr(expr);
                self.visit_query(query);
            }
            // `x IN name` names a set or table; it is not read like a FROM item.
            Expr::InSet { expr, set, .. } => {
                self.visit_expr(expr);
                self.visit_expr(set);
            }
            Expr::InList { expr, list, .. } => {
                self.visit_expr(expr);
                self.visit_exprs(list);
            }
            Expr::Binary { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            Expr::Unary { operand, .. } => self.visit_expr(operand),
            Expr::Function(call) => self.visit_function(call),
            Expr::IsNull { expr, .. }
            | Expr::Paren(expr)
            | Expr::Cast { expr, .. }
            | Expr::Interval { value: expr, .. }
            | Expr::TupleElement { expr, .. } => self.visit_expr(expr),
            Expr::Between {
                expr, low, high, ..
            } => {
                self.visit_expr(expr);
                self.visit_expr(low);
                self.visit_expr(high);
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(operand) = operand {
                    self.visit_expr(operand);
                }
                for (when, then) in when_clauses {
                    self.visit_expr(when);
                    self.visit_expr(then);
                }
                if let Some(else_clause) = else_clause {
                    self.visit_expr(else_clause);
                }
            }
            Expr::Tuple(items) | Expr::Array(items) => self.visit_exprs(items),
            Expr::Subscript { expr, index } => {
                self.visit_expr(expr);
                self.visit_expr(index);
            }
            Expr::Lambda { params, body } => {
                self.visit_expr(params);
                self.visit_expr(body);
            }
        }
    }
}
