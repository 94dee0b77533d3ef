//! Expression AST types.

use super::statement::{OrderBy, Query};
use crate::lexer::Span;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal.
    Integer(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Boolean literal.
    Boolean(bool),
    /// NULL literal.
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // String
    Concat,
    Like,
    ILike,

    // Bitwise
    BitAnd,
    BitOr,
    LeftShift,
    RightShift,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Logical NOT
    Not,
    /// Bitwise NOT (~)
    BitNot,
}

/// A window specification attached to a function call with `OVER`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    /// Named window (`OVER w` or `OVER (w ...)`).
    pub name: Option<String>,
    /// PARTITION BY expressions.
    pub partition_by: Vec<Expr>,
    /// ORDER BY items.
    pub order_by: Vec<OrderBy>,
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// The function name, as written.
    pub name: String,
    /// The arguments.
    pub args: Vec<Expr>,
    /// Parameters of a parametric aggregate: the `0.9` in `quantile(0.9)(x)`.
    pub parameters: Vec<Expr>,
    /// Whether DISTINCT was specified.
    pub distinct: bool,
    /// Window specification, if the call is a window function.
    pub over: Option<WindowSpec>,
}

impl FunctionCall {
    /// Creates a plain call with the given arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            parameters: Vec::new(),
            distinct: false,
            over: None,
        }
    }
}

/// An SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Literal),

    /// A column reference, optionally qualified (`t.c`, `db.t.c`).
    Column {
        /// Qualifier (table alias or `db.table`), if any.
        table: Option<String>,
        /// Column name.
        name: String,
        /// Source span.
        span: Span,
    },

    /// `*` or `t.*`.
    Wildcard {
        /// Qualifier, if any.
        table: Option<String>,
    },

    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },

    /// A function call.
    Function(FunctionCall),

    /// A scalar subquery.
    Subquery(Box<Query>),

    /// `[NOT] EXISTS (subquery)`.
    Exists {
        /// The subquery.
        query: Box<Query>,
        /// Whether this is NOT EXISTS.
        negated: bool,
    },

    /// IS [NOT] NULL.
    IsNull {
        /// The expression to check.
        expr: Box<Expr>,
        /// Whether this is IS NOT NULL.
        negated: bool,
    },

    /// `[GLOBAL] [NOT] IN (a, b, ...)`.
    InList {
        /// The expression to check.
        expr: Box<Expr>,
        /// The values.
        list: Vec<Expr>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// `[GLOBAL] [NOT] IN (subquery)`.
    InSubquery {
        /// The expression to check.
        expr: Box<Expr>,
        /// The subquery.
        query: Box<Query>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// `[NOT] IN name` or `IN tuple(...)`: membership in a named set or
    /// any other expression.
    InSet {
        /// The expression to check.
        expr: Box<Expr>,
        /// The set expression.
        set: Box<Expr>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// `[NOT] BETWEEN low AND high`.
    Between {
        /// The expression to check.
        expr: Box<Expr>,
        /// Low bound.
        low: Box<Expr>,
        /// High bound.
        high: Box<Expr>,
        /// Whether this is NOT BETWEEN.
        negated: bool,
    },

    /// CASE expression.
    Case {
        /// Operand of a simple CASE.
        operand: Option<Box<Expr>>,
        /// WHEN/THEN pairs.
        when_clauses: Vec<(Expr, Expr)>,
        /// ELSE branch.
        else_clause: Option<Box<Expr>>,
    },

    /// `CAST(x AS T)`, `CAST(x, 'T')`, `x::T` or a typed literal such as
    /// `DATE '2024-01-01'`.
    Cast {
        /// The expression being converted.
        expr: Box<Expr>,
        /// Target type, as written.
        data_type: String,
    },

    /// `INTERVAL n unit`.
    Interval {
        /// Amount.
        value: Box<Expr>,
        /// Unit name, if given separately.
        unit: Option<String>,
    },

    /// Parenthesized expression.
    Paren(Box<Expr>),

    /// Tuple literal `(a, b)`.
    Tuple(Vec<Expr>),

    /// Array literal `[a, b]`.
    Array(Vec<Expr>),

    /// Subscript `a[i]`.
    Subscript {
        /// The indexed expression.
        expr: Box<Expr>,
        /// The index.
        index: Box<Expr>,
    },

    /// Tuple element access `t.1`.
    TupleElement {
        /// The tuple expression.
        expr: Box<Expr>,
        /// 1-based element index.
        index: i64,
    },

    /// Lambda `x -> body` or `(x, y) -> body`.
    Lambda {
        /// Parameters (a column or a tuple of columns).
        params: Box<Expr>,
        /// Lambda body.
        body: Box<Expr>,
    },
}

impl Expr {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
            span: Span::default(),
        }
    }
}
