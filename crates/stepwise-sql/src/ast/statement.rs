//! Query AST types.

use super::expression::{Expr, WindowSpec};

/// Order direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Null ordering for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// NULLs come first.
    First,
    /// NULLs come last.
    Last,
}

/// An ORDER BY clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Expr,
    /// The direction (ASC or DESC).
    pub direction: OrderDirection,
    /// Null ordering (optional).
    pub nulls: Option<NullOrdering>,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN (or bare JOIN).
    Inner,
    /// LEFT [OUTER] JOIN.
    Left,
    /// RIGHT [OUTER] JOIN.
    Right,
    /// FULL [OUTER] JOIN.
    Full,
    /// CROSS JOIN, also used for comma-separated FROM items.
    Cross,
    /// PASTE JOIN.
    Paste,
}

/// ClickHouse join strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrictness {
    /// ANY
    Any,
    /// ALL
    All,
    /// ASOF
    Asof,
    /// SEMI
    Semi,
    /// ANTI
    Anti,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// The type of join.
    pub join_type: JoinType,
    /// Strictness modifier, if any.
    pub strictness: Option<JoinStrictness>,
    /// Whether the join is GLOBAL (distributed).
    pub global: bool,
    /// The joined table.
    pub table: TableRef,
    /// ON condition.
    pub on: Option<Expr>,
    /// USING columns.
    pub using: Vec<String>,
}

/// A table reference in a FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A named table.
    Table {
        /// Leading qualifier segments (`db`, or `cluster.db`), if any.
        schema: Option<String>,
        /// Table name (the final segment).
        name: String,
        /// Alias.
        alias: Option<String>,
        /// Whether FINAL was specified.
        is_final: bool,
        /// SAMPLE ratio or row count.
        sample: Option<Expr>,
    },
    /// A table function such as `numbers(10)` or `remote(...)`.
    Function {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Alias.
        alias: Option<String>,
    },
    /// A derived table.
    Subquery {
        /// The subquery.
        query: Box<Query>,
        /// Alias.
        alias: Option<String>,
    },
    /// A joined table.
    Join {
        /// Left side of the join.
        left: Box<TableRef>,
        /// The join clause.
        join: Box<JoinClause>,
    },
    /// `[LEFT] ARRAY JOIN expr [AS alias], ...` applied to the left side.
    ArrayJoin {
        /// Left side.
        left: Box<TableRef>,
        /// Whether this is LEFT ARRAY JOIN.
        is_left: bool,
        /// Unfolded array expressions.
        items: Vec<SelectColumn>,
    },
}

impl TableRef {
    /// Creates a simple table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
            is_final: false,
            sample: None,
        }
    }
}

/// GROUP BY modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupByModifier {
    /// WITH TOTALS
    Totals,
    /// WITH ROLLUP
    Rollup,
    /// WITH CUBE
    Cube,
}

/// `LIMIT n [OFFSET m] BY exprs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitBy {
    /// Rows per group.
    pub limit: Expr,
    /// Rows skipped per group.
    pub offset: Option<Expr>,
    /// Grouping expressions.
    pub by: Vec<Expr>,
}

/// A `SETTINGS name = value` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    /// Setting name.
    pub name: String,
    /// Setting value.
    pub value: Expr,
}

/// A single SELECT block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Whether to select DISTINCT values.
    pub distinct: bool,
    /// The columns to select.
    pub columns: Vec<SelectColumn>,
    /// The FROM clause.
    pub from: Option<TableRef>,
    /// PREWHERE clause.
    pub prewhere: Option<Expr>,
    /// WHERE clause.
    pub where_clause: Option<Expr>,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// GROUP BY modifier.
    pub group_by_modifier: Option<GroupByModifier>,
    /// HAVING clause.
    pub having: Option<Expr>,
    /// Named windows from the WINDOW clause.
    pub windows: Vec<(String, WindowSpec)>,
    /// QUALIFY clause.
    pub qualify: Option<Expr>,
    /// ORDER BY clauses.
    pub order_by: Vec<OrderBy>,
    /// LIMIT BY clause.
    pub limit_by: Option<LimitBy>,
    /// LIMIT clause.
    pub limit: Option<Expr>,
    /// OFFSET clause.
    pub offset: Option<Expr>,
    /// SETTINGS clause.
    pub settings: Vec<Setting>,
}

/// A column in SELECT clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    /// The expression.
    pub expr: Expr,
    /// Column alias.
    pub alias: Option<String>,
}

/// A common table expression: `name [(columns)] AS (query)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpr {
    /// CTE name.
    pub name: String,
    /// Optional column list.
    pub columns: Vec<String>,
    /// The defining query.
    pub query: Box<Query>,
}

/// An entry of a WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub enum WithItem {
    /// A named subquery.
    Cte(CommonTableExpr),
    /// ClickHouse `WITH <expr> AS name`: a named scalar expression.
    Alias {
        /// The expression.
        expr: Expr,
        /// The name it is bound to.
        alias: String,
    },
}

impl WithItem {
    /// Returns the name this item binds.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Cte(cte) => &cte.name,
            Self::Alias { alias, .. } => alias,
        }
    }
}

/// A WITH clause.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    /// Whether RECURSIVE was specified.
    pub recursive: bool,
    /// Bound items, in declaration order.
    pub items: Vec<WithItem>,
}

/// Set operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// UNION
    Union,
    /// INTERSECT
    Intersect,
    /// EXCEPT
    Except,
}

/// Set operator quantifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetQuantifier {
    /// No quantifier.
    #[default]
    None,
    /// ALL
    All,
    /// DISTINCT
    Distinct,
}

/// The body of a query: a SELECT block, a nested query, or a set operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    /// A SELECT block.
    Select(Box<SelectStatement>),
    /// A parenthesized query.
    Query(Box<Query>),
    /// `left UNION|INTERSECT|EXCEPT [ALL|DISTINCT] right`.
    SetOperation {
        /// The operator.
        op: SetOperator,
        /// The quantifier.
        quantifier: SetQuantifier,
        /// Left operand.
        left: Box<SetExpr>,
        /// Right operand.
        right: Box<SetExpr>,
    },
}

/// A complete query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Leading WITH clause.
    pub with: Option<With>,
    /// Query body.
    pub body: SetExpr,
    /// Output format (`FORMAT JSONEachRow`).
    pub format: Option<String>,
}
