//! Abstract Syntax Tree (AST) types for SELECT queries.

mod expression;
mod statement;

pub use expression::{BinaryOp, Expr, FunctionCall, Literal, UnaryOp, WindowSpec};
pub use statement::{
    CommonTableExpr, GroupByModifier, JoinClause, JoinStrictness, JoinType, LimitBy,
    NullOrdering, OrderBy, OrderDirection, Query, SelectColumn, SelectStatement, SetExpr,
    SetOperator, SetQuantifier, Setting, TableRef, With, WithItem,
};
