//! SQL Parser implementation.

use super::error::ParseError;
use super::pratt::{
    infix_binding_power, prefix_binding_power, token_to_binary_op, token_to_unary_op,
    POSTFIX_BINDING_POWER,
};
use crate::ast::{
    BinaryOp, CommonTableExpr, Expr, FunctionCall, GroupByModifier, JoinClause, JoinStrictness,
    JoinType, LimitBy, Literal, NullOrdering, OrderBy, OrderDirection, Query, SelectColumn,
    SelectStatement, SetExpr, SetOperator, SetQuantifier, Setting, TableRef, UnaryOp, WindowSpec,
    With, WithItem,
};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Maximum nesting of queries and expressions before parsing is abandoned.
const MAX_DEPTH: usize = 128;

/// Maximum number of stacked links in left-deep chains (joins, set
/// operations, binary operators) along any path of the syntax tree. These
/// chains are built in loops, so `MAX_DEPTH` alone does not bound them.
const MAX_CHAIN_HEIGHT: usize = 1000;

/// Words the lexer reports as identifiers that still end a table or column
/// expression, so they are never taken as a bare alias.
const CLAUSE_WORDS: &[&str] = &[
    "FINAL", "SAMPLE", "PREWHERE", "ARRAY", "GLOBAL", "ANY", "ASOF", "SEMI", "ANTI", "PASTE",
    "SETTINGS", "FORMAT", "QUALIFY",
];

/// Join modifiers that are plain identifiers to the lexer.
const JOIN_WORDS: &[&str] = &["GLOBAL", "ANY", "ASOF", "SEMI", "ANTI", "PASTE"];

/// Type names that form a typed literal when followed by a string.
const TYPED_LITERALS: &[&str] = &["DATE", "DATETIME", "DATETIME64", "TIMESTAMP", "TIME"];

const INTERVAL_UNITS: &[&str] = &[
    "NANOSECOND",
    "MICROSECOND",
    "MILLISECOND",
    "SECOND",
    "MINUTE",
    "HOUR",
    "DAY",
    "WEEK",
    "MONTH",
    "QUARTER",
    "YEAR",
];

fn is_clause_word(word: &str) -> bool {
    CLAUSE_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w))
}

fn is_interval_unit(word: &str) -> bool {
    let singular = word.strip_suffix(&['s', 'S'][..]).unwrap_or(word);
    INTERVAL_UNITS.iter().any(|u| singular.eq_ignore_ascii_case(u))
}

/// Builds a column reference from a dotted path: the last segment is the
/// column, the rest is the qualifier.
fn column_from_path(mut path: Vec<String>, span: Span) -> Expr {
    let name = path.pop().unwrap_or_default();
    let table = if path.is_empty() {
        None
    } else {
        Some(path.join("."))
    };
    Expr::Column { table, name, span }
}

/// SQL Parser for ClickHouse SELECT queries.
///
/// The parser is cheap to clone. A clone serves as a checkpoint that is
/// restored when a speculative parse fails, e.g. deciding whether `((` opens
/// a subquery or a nested expression.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    depth: usize,
    /// Chain height of the most recently parsed subtree.
    chain_height: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            source: input,
            lexer,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            depth: 0,
            chain_height: 0,
        }
    }

    /// Parses a complete query. Trailing semicolons are accepted; anything
    /// else after the query is an error.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the input is not a valid SELECT query.
    pub fn parse_query(&mut self) -> Result<Query, ParseError> {
        let query = self.parse_query_expr()?;
        while self.eat(&TokenKind::Semicolon) {}
        if !self.current.is_eof() {
            return Err(ParseError::unexpected(
                "end of input",
                self.current.kind.clone(),
                self.current.span,
            ));
        }
        Ok(query)
    }

    /// Parses a (possibly nested) query: `[WITH ...] body [FORMAT name]`.
    fn parse_query_expr(&mut self) -> Result<Query, ParseError> {
        self.enter()?;
        let query = self.parse_query_body();
        self.depth -= 1;
        query
    }

    fn parse_query_body(&mut self) -> Result<Query, ParseError> {
        let with = if self.check_keyword(Keyword::With) {
            Some(self.parse_with()?)
        } else {
            None
        };

        let body = self.parse_set_expr()?;

        let format = if self.eat_word("FORMAT") {
            Some(self.expect_name()?)
        } else {
            None
        };

        Ok(Query { with, body, format })
    }

    /// Parses left-associative UNION / INTERSECT / EXCEPT chains.
    fn parse_set_expr(&mut self) -> Result<SetExpr, ParseError> {
        let outer = self.begin_chain();
        let mut left = self.parse_set_operand()?;
        let mut height = self.chain_height;

        loop {
            let op = match self.current.as_keyword() {
                Some(Keyword::Union) => SetOperator::Union,
                Some(Keyword::Intersect) => SetOperator::Intersect,
                Some(Keyword::Except) => SetOperator::Except,
                _ => break,
            };
            self.advance();

            let quantifier = if self.eat_keyword(Keyword::All) {
                SetQuantifier::All
            } else if self.eat_keyword(Keyword::Distinct) {
                SetQuantifier::Distinct
            } else {
                SetQuantifier::None
            };

            self.chain_height = 0;
            let right = self.parse_set_operand()?;
            height = self.extend_chain(height)?;
            left = SetExpr::SetOperation {
                op,
                quantifier,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.end_chain(outer, height);
        Ok(left)
    }

    fn parse_set_operand(&mut self) -> Result<SetExpr, ParseError> {
        match self.current.as_keyword() {
            Some(Keyword::Select) => Ok(SetExpr::Select(Box::new(self.parse_select()?))),
            Some(Keyword::With) => Ok(SetExpr::Query(Box::new(self.parse_query_expr()?))),
            _ if self.check(&TokenKind::LeftParen) => {
                let query = self.parse_parenthesized_query()?;
                Ok(SetExpr::Query(Box::new(query)))
            }
            _ => Err(ParseError::unexpected(
                "SELECT",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    fn parse_parenthesized_query(&mut self) -> Result<Query, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let query = self.parse_query_expr()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(query)
    }

    /// Parses a WITH clause holding CTEs and/or scalar aliases.
    fn parse_with(&mut self) -> Result<With, ParseError> {
        self.expect_keyword(Keyword::With)?;
        let recursive = if self.check_keyword(Keyword::Recursive)
            && !self.peek_is_keyword(Keyword::As)
        {
            self.advance();
            true
        } else {
            false
        };

        let mut items = vec![];
        loop {
            let item = if self.looks_like_cte() {
                WithItem::Cte(self.parse_cte()?)
            } else {
                let expr = self.parse_expression(0)?;
                self.expect_keyword(Keyword::As)?;
                let alias = self.expect_any_name()?;
                WithItem::Alias { expr, alias }
            };
            items.push(item);

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(With { recursive, items })
    }

    /// Returns true if the current WITH item is `name [(cols)] AS (query)`.
    fn looks_like_cte(&self) -> bool {
        let mut probe = self.clone();
        if probe.expect_name().is_err() {
            return false;
        }
        if probe.eat(&TokenKind::LeftParen)
            && (probe.parse_name_list().is_err() || !probe.eat(&TokenKind::RightParen))
        {
            return false;
        }
        probe.eat_keyword(Keyword::As) && probe.check(&TokenKind::LeftParen) && probe.looks_like_query()
    }

    fn parse_cte(&mut self) -> Result<CommonTableExpr, ParseError> {
        let name = self.expect_name()?;
        let columns = if self.eat(&TokenKind::LeftParen) {
            let columns = self.parse_name_list()?;
            self.expect(&TokenKind::RightParen)?;
            columns
        } else {
            vec![]
        };
        self.expect_keyword(Keyword::As)?;
        let query = self.parse_parenthesized_query()?;

        Ok(CommonTableExpr {
            name,
            columns,
            query: Box::new(query),
        })
    }

    /// Parses a single SELECT block.
    fn parse_select(&mut self) -> Result<SelectStatement, ParseError> {
        self.expect_keyword(Keyword::Select)?;
        let mut select = SelectStatement::default();

        // DISTINCT or ALL
        if self.eat_keyword(Keyword::Distinct) {
            select.distinct = true;
        } else {
            self.eat_keyword(Keyword::All);
        }

        select.columns = self.parse_select_columns()?;

        if self.eat_keyword(Keyword::From) {
            select.from = Some(self.parse_from()?);
        }

        if self.eat_word("PREWHERE") {
            select.prewhere = Some(self.parse_expression(0)?);
        }

        if self.eat_keyword(Keyword::Where) {
            select.where_clause = Some(self.parse_expression(0)?);
        }

        if self.eat_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            if self.current.is_word("GROUPING") && self.peek().is_word("SETS") {
                self.advance();
                self.advance();
                select.group_by = vec![self.parse_parenthesized_expr()?];
            } else if !self.eat_keyword(Keyword::All) {
                select.group_by = self.parse_expression_list()?;
            }
            select.group_by_modifier = self.parse_group_by_modifier();
        }

        if self.eat_keyword(Keyword::Having) {
            select.having = Some(self.parse_expression(0)?);
        }

        if self.eat_keyword(Keyword::Window) {
            select.windows = self.parse_named_windows()?;
        }

        if self.eat_word("QUALIFY") {
            select.qualify = Some(self.parse_expression(0)?);
        }

        if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            select.order_by = self.parse_order_by_list()?;
        }

        self.parse_limit_clauses(&mut select)?;

        if self.eat_word("SETTINGS") {
            select.settings = self.parse_settings()?;
        }

        Ok(select)
    }

    /// Parses SELECT columns.
    fn parse_select_columns(&mut self) -> Result<Vec<SelectColumn>, ParseError> {
        let mut columns = vec![];

        loop {
            let expr = self.parse_expression(0)?;
            let alias = if matches!(expr, Expr::Wildcard { .. }) {
                self.skip_wildcard_modifiers()?;
                None
            } else {
                self.parse_optional_alias()?
            };
            columns.push(SelectColumn { expr, alias });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(columns)
    }

    /// Skips `* EXCEPT (...)`, `* REPLACE (...)` and `* APPLY(...)` modifiers.
    fn skip_wildcard_modifiers(&mut self) -> Result<(), ParseError> {
        loop {
            if self.check_keyword(Keyword::Except) && !self.peek_is_keyword(Keyword::Select) {
                self.advance();
                if self.eat(&TokenKind::LeftParen) {
                    self.skip_to_close_paren()?;
                    self.expect(&TokenKind::RightParen)?;
                } else {
                    self.expect_name()?;
                }
            } else if self.eat_word("REPLACE") {
                let parenthesized = self.eat(&TokenKind::LeftParen);
                loop {
                    self.parse_expression(0)?;
                    self.expect_keyword(Keyword::As)?;
                    self.expect_any_name()?;
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                if parenthesized {
                    self.expect(&TokenKind::RightParen)?;
                }
            } else if self.eat_word("APPLY") {
                if self.eat(&TokenKind::LeftParen) {
                    self.parse_expression(0)?;
                    self.expect(&TokenKind::RightParen)?;
                } else {
                    self.expect_name()?;
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Parses an optional alias (`AS name` or a bare identifier).
    fn parse_optional_alias(&mut self) -> Result<Option<String>, ParseError> {
        if self.eat_keyword(Keyword::As) {
            return self.expect_any_name().map(Some);
        }
        match &self.current.kind {
            TokenKind::Identifier(name) if !is_clause_word(name) => {
                let name = name.clone();
                self.advance();
                Ok(Some(name))
            }
            _ => Ok(None),
        }
    }

    /// Parses a FROM clause. Comma-separated items become cross joins.
    fn parse_from(&mut self) -> Result<TableRef, ParseError> {
        let outer = self.begin_chain();
        let mut table = self.parse_joined_table()?;
        let mut height = self.chain_height;

        while self.eat(&TokenKind::Comma) {
            self.chain_height = 0;
            let right = self.parse_joined_table()?;
            height = self.extend_chain(height)?;
            table = TableRef::Join {
                left: Box::new(table),
                join: Box::new(JoinClause {
                    join_type: JoinType::Cross,
                    strictness: None,
                    global: false,
                    table: right,
                    on: None,
                    using: vec![],
                }),
            };
        }

        self.end_chain(outer, height);
        Ok(table)
    }

    /// Parses a table factor followed by any number of joins.
    fn parse_joined_table(&mut self) -> Result<TableRef, ParseError> {
        let outer = self.begin_chain();
        let mut table = self.parse_table_factor()?;
        let mut height = self.chain_height;

        loop {
            self.chain_height = 0;
            if let Some(is_left) = self.eat_array_join()? {
                let items = self.parse_array_join_items()?;
                height = self.extend_chain(height)?;
                table = TableRef::ArrayJoin {
                    left: Box::new(table),
                    is_left,
                    items,
                };
            } else if self.at_join_start() {
                let (join_type, strictness, global) = self.parse_join_operator()?;
                let right = self.parse_table_factor()?;
                let (on, using) = self.parse_join_constraint()?;
                height = self.extend_chain(height)?;
                table = TableRef::Join {
                    left: Box::new(table),
                    join: Box::new(JoinClause {
                        join_type,
                        strictness,
                        global,
                        table: right,
                        on,
                        using,
                    }),
                };
            } else {
                break;
            }
        }

        self.end_chain(outer, height);
        Ok(table)
    }

    /// Parses a single table reference: a table, a table function, a
    /// subquery or a parenthesized join.
    fn parse_table_factor(&mut self) -> Result<TableRef, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            if self.looks_like_query() {
                if let Some(query) = self.try_parse(Self::parse_parenthesized_query) {
                    let alias = self.parse_optional_alias()?;
                    return Ok(TableRef::Subquery {
                        query: Box::new(query),
                        alias,
                    });
                }
            }
            self.expect(&TokenKind::LeftParen)?;
            let inner = self.parse_from()?;
            self.expect(&TokenKind::RightParen)?;
            return Ok(inner);
        }

        let mut path = vec![self.expect_name()?];
        while self.eat(&TokenKind::Dot) {
            path.push(self.expect_any_name()?);
        }

        if self.check(&TokenKind::LeftParen) {
            let (args, _) = self.parse_call_args()?;
            let alias = self.parse_optional_alias()?;
            return Ok(TableRef::Function {
                name: path.join("."),
                args,
                alias,
            });
        }

        let name = path.pop().unwrap_or_default();
        let schema = if path.is_empty() {
            None
        } else {
            Some(path.join("."))
        };

        let mut is_final = self.eat_word("FINAL");
        let alias = self.parse_optional_alias()?;
        is_final |= self.eat_word("FINAL");

        let sample = if self.eat_word("SAMPLE") {
            let ratio = self.parse_expression(0)?;
            if self.eat_keyword(Keyword::Offset) {
                self.parse_expression(0)?;
            }
            Some(ratio)
        } else {
            None
        };

        Ok(TableRef::Table {
            schema,
            name,
            alias,
            is_final,
            sample,
        })
    }

    /// Consumes `ARRAY JOIN` or `LEFT ARRAY JOIN`, returning whether it was
    /// the LEFT form.
    fn eat_array_join(&mut self) -> Result<Option<bool>, ParseError> {
        if self.current.is_word("ARRAY") && self.peek_is_keyword(Keyword::Join) {
            self.advance();
            self.advance();
            return Ok(Some(false));
        }
        if self.check_keyword(Keyword::Left) && self.peek().is_word("ARRAY") {
            self.advance();
            self.advance();
            self.expect_keyword(Keyword::Join)?;
            return Ok(Some(true));
        }
        Ok(None)
    }

    fn parse_array_join_items(&mut self) -> Result<Vec<SelectColumn>, ParseError> {
        let mut items = vec![];
        loop {
            let expr = self.parse_expression(0)?;
            let alias = self.parse_optional_alias()?;
            items.push(SelectColumn { expr, alias });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    /// Checks if current token starts a join operator.
    fn at_join_start(&self) -> bool {
        match &self.current.kind {
            TokenKind::Keyword(
                Keyword::Join
                | Keyword::Inner
                | Keyword::Left
                | Keyword::Right
                | Keyword::Full
                | Keyword::Cross
                | Keyword::All,
            ) => true,
            TokenKind::Identifier(_) => JOIN_WORDS.iter().any(|w| self.current.is_word(w)),
            _ => false,
        }
    }

    /// Parses `[GLOBAL] [strictness] [type] [OUTER] JOIN`. ClickHouse accepts
    /// the modifiers in any order.
    fn parse_join_operator(
        &mut self,
    ) -> Result<(JoinType, Option<JoinStrictness>, bool), ParseError> {
        let mut join_type = None;
        let mut strictness = None;
        let mut global = false;

        loop {
            let token = self.current.clone();
            match token.kind {
                TokenKind::Keyword(Keyword::Join) => {
                    self.advance();
                    break;
                }
                TokenKind::Keyword(Keyword::Inner) => join_type = Some(JoinType::Inner),
                TokenKind::Keyword(Keyword::Left) => join_type = Some(JoinType::Left),
                TokenKind::Keyword(Keyword::Right) => join_type = Some(JoinType::Right),
                TokenKind::Keyword(Keyword::Full) => join_type = Some(JoinType::Full),
                TokenKind::Keyword(Keyword::Cross) => join_type = Some(JoinType::Cross),
                TokenKind::Keyword(Keyword::Outer) => {}
                TokenKind::Keyword(Keyword::All) => strictness = Some(JoinStrictness::All),
                TokenKind::Identifier(_) if token.is_word("GLOBAL") => global = true,
                TokenKind::Identifier(_) if token.is_word("ANY") => {
                    strictness = Some(JoinStrictness::Any);
                }
                TokenKind::Identifier(_) if token.is_word("ASOF") => {
                    strictness = Some(JoinStrictness::Asof);
                }
                TokenKind::Identifier(_) if token.is_word("SEMI") => {
                    strictness = Some(JoinStrictness::Semi);
                }
                TokenKind::Identifier(_) if token.is_word("ANTI") => {
                    strictness = Some(JoinStrictness::Anti);
                }
                TokenKind::Identifier(_) if token.is_word("PASTE") => {
                    join_type = Some(JoinType::Paste);
                }
                _ => {
                    return Err(ParseError::unexpected("JOIN", token.kind, token.span));
                }
            }
            self.advance();
        }

        Ok((join_type.unwrap_or(JoinType::Inner), strictness, global))
    }

    /// Parses an optional `ON expr` or `USING [(]cols[)]`.
    fn parse_join_constraint(&mut self) -> Result<(Option<Expr>, Vec<String>), ParseError> {
        if self.eat_keyword(Keyword::On) {
            return Ok((Some(self.parse_expression(0)?), vec![]));
        }
        if self.eat_keyword(Keyword::Using) {
            let parenthesized = self.eat(&TokenKind::LeftParen);
            let columns = self.parse_name_list()?;
            if parenthesized {
                self.expect(&TokenKind::RightParen)?;
            }
            return Ok((None, columns));
        }
        Ok((None, vec![]))
    }

    fn parse_group_by_modifier(&mut self) -> Option<GroupByModifier> {
        if !self.check_keyword(Keyword::With) {
            return None;
        }
        let next = self.peek();
        let modifier = if next.is_word("TOTALS") {
            GroupByModifier::Totals
        } else if next.is_word("ROLLUP") {
            GroupByModifier::Rollup
        } else if next.is_word("CUBE") {
            GroupByModifier::Cube
        } else {
            return None;
        };
        self.advance();
        self.advance();
        Some(modifier)
    }

    /// Parses `name AS (spec), ...` after WINDOW.
    fn parse_named_windows(&mut self) -> Result<Vec<(String, WindowSpec)>, ParseError> {
        let mut windows = vec![];
        loop {
            let name = self.expect_name()?;
            self.expect_keyword(Keyword::As)?;
            windows.push((name, self.parse_window_spec()?));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(windows)
    }

    /// Parses `LIMIT` and `LIMIT ... BY` clauses plus a standalone `OFFSET`.
    fn parse_limit_clauses(&mut self, select: &mut SelectStatement) -> Result<(), ParseError> {
        while self.eat_keyword(Keyword::Limit) {
            let first = self.parse_expression(0)?;
            // `LIMIT offset, count`
            let (limit, mut offset) = if self.eat(&TokenKind::Comma) {
                (self.parse_expression(0)?, Some(first))
            } else {
                (first, None)
            };
            if self.eat_keyword(Keyword::Offset) {
                offset = Some(self.parse_expression(0)?);
            }

            if self.eat_keyword(Keyword::By) {
                let by = self.parse_expression_list()?;
                select.limit_by = Some(LimitBy { limit, offset, by });
                continue;
            }

            select.limit = Some(limit);
            select.offset = offset;
            if self.check_keyword(Keyword::With) && self.peek().is_word("TIES") {
                self.advance();
                self.advance();
            }
        }

        if self.eat_keyword(Keyword::Offset) {
            select.offset = Some(self.parse_expression(0)?);
            if !self.eat_keyword(Keyword::Rows) {
                self.eat_word("ROW");
            }
        }

        Ok(())
    }

    fn parse_settings(&mut self) -> Result<Vec<Setting>, ParseError> {
        let mut settings = vec![];
        loop {
            let name = self.expect_name()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression(0)?;
            settings.push(Setting { name, value });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(settings)
    }

    /// Parses an ORDER BY list.
    fn parse_order_by_list(&mut self) -> Result<Vec<OrderBy>, ParseError> {
        let mut items = vec![];
        loop {
            let expr = self.parse_expression(0)?;

            let direction = if self.eat_keyword(Keyword::Desc) || self.eat_word("DESCENDING") {
                OrderDirection::Desc
            } else {
                if !self.eat_keyword(Keyword::Asc) {
                    self.eat_word("ASCENDING");
                }
                OrderDirection::Asc
            };

            let nulls = if self.eat_keyword(Keyword::Nulls) {
                if self.eat_keyword(Keyword::First) {
                    Some(NullOrdering::First)
                } else {
                    self.expect_keyword(Keyword::Last)?;
                    Some(NullOrdering::Last)
                }
            } else {
                None
            };

            if self.eat_word("COLLATE") {
                self.expect(&TokenKind::String(String::new()))?;
            }

            if self.check_keyword(Keyword::With) && self.peek().is_word("FILL") {
                self.advance();
                self.advance();
                self.skip_fill_bounds()?;
            }

            items.push(OrderBy {
                expr,
                direction,
                nulls,
            });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        if self.eat_word("INTERPOLATE") && self.eat(&TokenKind::LeftParen) {
            self.skip_to_close_paren()?;
            self.expect(&TokenKind::RightParen)?;
        }

        Ok(items)
    }

    /// Skips `[FROM x] [TO y] [STEP z] [STALENESS w]` after `WITH FILL`.
    fn skip_fill_bounds(&mut self) -> Result<(), ParseError> {
        if self.eat_keyword(Keyword::From) {
            self.parse_expression(0)?;
        }
        for word in ["TO", "STEP", "STALENESS"] {
            if self.eat_word(word) {
                self.parse_expression(0)?;
            }
        }
        Ok(())
    }

    /// Parses an expression using Pratt parsing.
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.parse_expression_bp(min_bp);
        self.depth -= 1;
        expr
    }

    fn parse_expression_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let outer = self.begin_chain();
        let mut lhs = self.parse_prefix()?;
        let mut height = self.chain_height;

        loop {
            let Some((l_bp, r_bp)) = self.infix_power() else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            self.chain_height = 0;
            lhs = self.parse_infix(lhs, r_bp)?;
            height = self.extend_chain(height)?;
        }

        self.end_chain(outer, height);
        Ok(lhs)
    }

    /// Binding power of the current token in infix position, accounting for
    /// `NOT IN`, `NOT LIKE`, `NOT BETWEEN` and `GLOBAL [NOT] IN`.
    fn infix_power(&self) -> Option<(u8, u8)> {
        match &self.current.kind {
            TokenKind::Keyword(Keyword::Not) => {
                let negatable = matches!(
                    self.peek().kind,
                    TokenKind::Keyword(
                        Keyword::In | Keyword::Like | Keyword::Ilike | Keyword::Between
                    )
                );
                if negatable {
                    infix_binding_power(&self.current.kind)
                } else {
                    None
                }
            }
            TokenKind::Identifier(_) if self.current.is_word("GLOBAL") => {
                let global_in = match self.peek().kind {
                    TokenKind::Keyword(Keyword::In) => true,
                    TokenKind::Keyword(Keyword::Not) => {
                        matches!(self.peek_nth(2).kind, TokenKind::Keyword(Keyword::In))
                    }
                    _ => false,
                };
                if global_in {
                    infix_binding_power(&TokenKind::Keyword(Keyword::In))
                } else {
                    None
                }
            }
            // `(1, 2).1`
            TokenKind::Dot if matches!(self.peek().kind, TokenKind::Integer(_)) => {
                Some((POSTFIX_BINDING_POWER, POSTFIX_BINDING_POWER + 1))
            }
            kind => infix_binding_power(kind),
        }
    }

    fn parse_infix(&mut self, lhs: Expr, r_bp: u8) -> Result<Expr, ParseError> {
        let token = self.current.clone();

        match token.kind {
            TokenKind::Keyword(Keyword::Is) => {
                self.advance();
                let negated = self.eat_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                Ok(Expr::IsNull {
                    expr: Box::new(lhs),
                    negated,
                })
            }
            // GLOBAL [NOT] IN
            TokenKind::Identifier(_) => {
                self.advance();
                let negated = self.eat_keyword(Keyword::Not);
                self.expect_keyword(Keyword::In)?;
                self.parse_in(lhs, negated, r_bp)
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.advance();
                self.parse_predicate(lhs, true, r_bp)
            }
            TokenKind::Keyword(
                Keyword::In | Keyword::Between | Keyword::Like | Keyword::Ilike,
            ) => self.parse_predicate(lhs, false, r_bp),
            TokenKind::DoubleColon => {
                self.advance();
                let data_type = self.parse_type_name()?;
                Ok(Expr::Cast {
                    expr: Box::new(lhs),
                    data_type,
                })
            }
            TokenKind::LeftBracket => {
                self.advance();
                let index = self.parse_expression(0)?;
                self.expect(&TokenKind::RightBracket)?;
                Ok(Expr::Subscript {
                    expr: Box::new(lhs),
                    index: Box::new(index),
                })
            }
            TokenKind::Dot => {
                self.advance();
                let TokenKind::Integer(index) = self.current.kind else {
                    return Err(ParseError::unexpected(
                        "tuple index",
                        self.current.kind.clone(),
                        self.current.span,
                    ));
                };
                self.advance();
                Ok(Expr::TupleElement {
                    expr: Box::new(lhs),
                    index,
                })
            }
            TokenKind::Arrow => {
                self.advance();
                let body = self.parse_expression(r_bp)?;
                Ok(Expr::Lambda {
                    params: Box::new(lhs),
                    body: Box::new(body),
                })
            }
            kind => {
                let Some(op) = token_to_binary_op(&kind) else {
                    return Err(ParseError::unexpected("operator", kind, token.span));
                };
                self.advance();
                let rhs = self.parse_expression(r_bp)?;
                Ok(Expr::Binary {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(rhs),
                })
            }
        }
    }

    /// Parses the tail of `[NOT] IN`, `[NOT] BETWEEN` and `[NOT] [I]LIKE`.
    fn parse_predicate(&mut self, lhs: Expr, negated: bool, r_bp: u8) -> Result<Expr, ParseError> {
        let token = self.current.clone();
        self.advance();

        match token.kind {
            TokenKind::Keyword(Keyword::In) => self.parse_in(lhs, negated, r_bp),
            TokenKind::Keyword(Keyword::Between) => {
                let low = self.parse_expression(r_bp)?;
                self.expect_keyword(Keyword::And)?;
                let high = self.parse_expression(r_bp)?;
                Ok(Expr::Between {
                    expr: Box::new(lhs),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                })
            }
            TokenKind::Keyword(Keyword::Like | Keyword::Ilike) => {
                let op = if token.as_keyword() == Some(Keyword::Ilike) {
                    BinaryOp::ILike
                } else {
                    BinaryOp::Like
                };
                let rhs = self.parse_expression(r_bp)?;
                let like = Expr::Binary {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(rhs),
                };
                if negated {
                    Ok(Expr::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(like),
                    })
                } else {
                    Ok(like)
                }
            }
            kind => Err(ParseError::unexpected(
                "IN, BETWEEN or LIKE",
                kind,
                token.span,
            )),
        }
    }

    /// Parses the right side of IN: a subquery, a list, or any other
    /// expression such as a table or set name.
    fn parse_in(&mut self, lhs: Expr, negated: bool, r_bp: u8) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LeftParen) {
            if self.looks_like_query() {
                if let Some(query) = self.try_parse(Self::parse_parenthesized_query) {
                    return Ok(Expr::InSubquery {
                        expr: Box::new(lhs),
                        query: Box::new(query),
                        negated,
                    });
                }
            }
            self.advance();
            let list = if self.check(&TokenKind::RightParen) {
                vec![]
            } else {
                self.parse_expression_list()?
            };
            self.expect(&TokenKind::RightParen)?;
            return Ok(Expr::InList {
                expr: Box::new(lhs),
                list,
                negated,
            });
        }

        let set = self.parse_expression(r_bp)?;
        Ok(Expr::InSet {
            expr: Box::new(lhs),
            set: Box::new(set),
            negated,
        })
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        if self.check_keyword(Keyword::Not) && self.peek_is_keyword(Keyword::Exists) {
            self.advance();
            return self.parse_exists(true);
        }

        // Check for unary operators; unary plus is dropped
        if let Some(bp) = prefix_binding_power(&self.current.kind) {
            let op = token_to_unary_op(&self.current.kind);
            self.advance();
            let operand = self.parse_expression(bp)?;
            return Ok(match op {
                Some(op) => Expr::Unary {
                    op,
                    operand: Box::new(operand),
                },
                None => operand,
            });
        }

        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current.clone();

        match token.kind {
            // Literals
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(f)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }

            TokenKind::Star => {
                self.advance();
                Ok(Expr::Wildcard { table: None })
            }

            TokenKind::LeftBracket => {
                self.advance();
                let items = if self.check(&TokenKind::RightBracket) {
                    vec![]
                } else {
                    self.parse_expression_list()?
                };
                self.expect(&TokenKind::RightBracket)?;
                Ok(Expr::Array(items))
            }

            TokenKind::LeftParen => self.parse_parenthesized_expr(),

            TokenKind::Keyword(Keyword::Case) => self.parse_case_expression(),

            TokenKind::Keyword(Keyword::Cast) if self.peek_is(&TokenKind::LeftParen) => {
                self.parse_cast_expression()
            }

            TokenKind::Keyword(Keyword::Exists) => self.parse_exists(false),

            TokenKind::Identifier(name) => self.parse_identifier_expr(name, token.span),

            // `left(s, 3)`, `range(10)`, or a column named like a
            // non-reserved keyword
            TokenKind::Keyword(kw) if kw != Keyword::Select => {
                let name = token.span.text(self.source).to_string();
                if self.peek_is(&TokenKind::LeftParen) {
                    self.advance();
                    self.parse_function_call(name)
                } else if kw.is_reserved() {
                    Err(ParseError::unexpected("expression", token.kind, token.span))
                } else {
                    self.parse_identifier_expr(name, token.span)
                }
            }

            kind => Err(ParseError::unexpected("expression", kind, token.span)),
        }
    }

    /// Parses an expression starting with a name: a typed literal, an
    /// interval, a function call, a column path, `t.*` or `t.1`.
    fn parse_identifier_expr(&mut self, name: String, span: Span) -> Result<Expr, ParseError> {
        let next = self.peek();

        if let TokenKind::String(value) = &next.kind {
            if TYPED_LITERALS.iter().any(|t| name.eq_ignore_ascii_case(t)) {
                let value = value.clone();
                self.advance();
                self.advance();
                return Ok(Expr::Cast {
                    expr: Box::new(Expr::Literal(Literal::String(value))),
                    data_type: name,
                });
            }
        }

        if name.eq_ignore_ascii_case("INTERVAL")
            && matches!(
                next.kind,
                TokenKind::Integer(_) | TokenKind::Float(_) | TokenKind::String(_) | TokenKind::Minus
            )
        {
            self.advance();
            let value = self.parse_expression(POSTFIX_BINDING_POWER)?;
            let unit = match &self.current.kind {
                TokenKind::Identifier(unit) if is_interval_unit(unit) => {
                    let unit = unit.clone();
                    self.advance();
                    Some(unit)
                }
                _ => None,
            };
            return Ok(Expr::Interval {
                value: Box::new(value),
                unit,
            });
        }

        self.advance();

        if self.check(&TokenKind::LeftParen) {
            return self.parse_function_call(name);
        }

        let mut path = vec![name];
        let mut end = span;
        while self.check(&TokenKind::Dot) {
            match self.peek().kind {
                TokenKind::Star => {
                    self.advance();
                    self.advance();
                    return Ok(Expr::Wildcard {
                        table: Some(path.join(".")),
                    });
                }
                TokenKind::Integer(index) => {
                    self.advance();
                    self.advance();
                    return Ok(Expr::TupleElement {
                        expr: Box::new(column_from_path(path, span.to(end))),
                        index,
                    });
                }
                _ => {
                    self.advance();
                    path.push(self.expect_any_name()?);
                    end = self.previous.span;
                }
            }
        }

        if self.check(&TokenKind::LeftParen) {
            return self.parse_function_call(path.join("."));
        }

        Ok(column_from_path(path, span.to(end)))
    }

    /// Parses `(subquery)`, `(expr)`, `(a, b)` or `()`.
    fn parse_parenthesized_expr(&mut self) -> Result<Expr, ParseError> {
        if self.looks_like_query() {
            if let Some(query) = self.try_parse(Self::parse_parenthesized_query) {
                return Ok(Expr::Subquery(Box::new(query)));
            }
        }

        self.expect(&TokenKind::LeftParen)?;
        if self.eat(&TokenKind::RightParen) {
            return Ok(Expr::Tuple(vec![]));
        }

        let first = self.parse_aliased_expression()?;
        if self.eat(&TokenKind::RightParen) {
            return Ok(Expr::Paren(Box::new(first)));
        }

        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RightParen) {
                break;
            }
            items.push(self.parse_aliased_expression()?);
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::Tuple(items))
    }

    /// Parses an expression that may carry an inline `AS alias`, which
    /// ClickHouse allows inside parentheses and argument lists.
    fn parse_aliased_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression(0)?;
        if self.eat_keyword(Keyword::As) {
            self.expect_any_name()?;
        }
        Ok(expr)
    }

    fn parse_exists(&mut self, negated: bool) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Exists)?;
        let query = self.parse_parenthesized_query()?;
        Ok(Expr::Exists {
            query: Box::new(query),
            negated,
        })
    }

    /// Parses a function call. The current token is the opening parenthesis.
    fn parse_function_call(&mut self, name: String) -> Result<Expr, ParseError> {
        let (mut args, mut distinct) = self.parse_call_args()?;

        // Parametric aggregate: quantile(0.9)(x)
        let mut parameters = vec![];
        if self.check(&TokenKind::LeftParen) {
            let (inner, inner_distinct) = self.parse_call_args()?;
            parameters = std::mem::replace(&mut args, inner);
            distinct |= inner_distinct;
        }

        if (self.current.is_word("IGNORE") || self.current.is_word("RESPECT"))
            && self.peek_is_keyword(Keyword::Nulls)
        {
            self.advance();
            self.advance();
        }

        let over = if self.eat_keyword(Keyword::Over) {
            if self.check(&TokenKind::LeftParen) {
                Some(self.parse_window_spec()?)
            } else {
                Some(WindowSpec {
                    name: Some(self.expect_name()?),
                    ..WindowSpec::default()
                })
            }
        } else {
            None
        };

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            parameters,
            distinct,
            over,
        }))
    }

    /// Parses a parenthesized argument list. `FROM` and `FOR` are accepted
    /// as separators (`extract(DAY FROM d)`, `substring(s FROM 1 FOR 2)`),
    /// and a bare query is accepted as an argument (`view(SELECT ...)`).
    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, bool), ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let distinct = self.eat_keyword(Keyword::Distinct);

        let mut args = vec![];
        if !self.check(&TokenKind::RightParen) {
            loop {
                // trim(BOTH ' ' FROM s)
                let trim_side = ["BOTH", "LEADING", "TRAILING"]
                    .iter()
                    .any(|w| self.current.is_word(w));
                if trim_side && matches!(self.peek().kind, TokenKind::String(_)) {
                    self.advance();
                }

                let arg = if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With)
                {
                    Expr::Subquery(Box::new(self.parse_query_expr()?))
                } else {
                    self.parse_aliased_expression()?
                };
                args.push(arg);

                let separated = self.eat(&TokenKind::Comma)
                    || self.eat_keyword(Keyword::From)
                    || self.eat_word("FOR");
                if !separated {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RightParen)?;
        Ok((args, distinct))
    }

    /// Parses `([name] [PARTITION BY ...] [ORDER BY ...] [frame])`. The frame
    /// clause is skipped.
    fn parse_window_spec(&mut self) -> Result<WindowSpec, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut spec = WindowSpec::default();

        if let TokenKind::Identifier(name) = &self.current.kind {
            spec.name = Some(name.clone());
            self.advance();
        }

        if self.eat_keyword(Keyword::Partition) {
            self.expect_keyword(Keyword::By)?;
            spec.partition_by = self.parse_expression_list()?;
        }

        if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            spec.order_by = self.parse_order_by_list()?;
        }

        if self.check_keyword(Keyword::Rows)
            || self.check_keyword(Keyword::Range)
            || self.current.is_word("GROUPS")
        {
            self.skip_to_close_paren()?;
        }

        self.expect(&TokenKind::RightParen)?;
        Ok(spec)
    }

    /// Parses a CAST expression: `CAST(x AS T)` or `CAST(x, 'T')`.
    fn parse_cast_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Cast)?;
        self.expect(&TokenKind::LeftParen)?;
        let expr = self.parse_expression(0)?;

        let data_type = if self.eat_keyword(Keyword::As) {
            self.parse_type_name()?
        } else {
            self.expect(&TokenKind::Comma)?;
            let start = self.current.span;
            match self.parse_expression(0)? {
                Expr::Literal(Literal::String(name)) => name,
                _ => start.to(self.previous.span).text(self.source).to_string(),
            }
        };

        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            data_type,
        })
    }

    /// Parses a CASE expression.
    fn parse_case_expression(&mut self) -> Result<Expr, ParseError> {
        self.expect_keyword(Keyword::Case)?;

        // Check for simple CASE (CASE expr WHEN ...)
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expression(0)?))
        };

        // Parse WHEN/THEN clauses
        let mut when_clauses = vec![];
        while self.eat_keyword(Keyword::When) {
            let when_expr = self.parse_expression(0)?;
            self.expect_keyword(Keyword::Then)?;
            let then_expr = self.parse_expression(0)?;
            when_clauses.push((when_expr, then_expr));
        }

        // Parse ELSE clause
        let else_clause = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expression(0)?))
        } else {
            None
        };

        self.expect_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            when_clauses,
            else_clause,
        })
    }

    /// Parses a type name such as `UInt64` or `Array(Nullable(String))`,
    /// returned as written.
    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        let start = self.current.span;
        self.expect_any_name()?;
        if self.eat(&TokenKind::LeftParen) {
            self.skip_to_close_paren()?;
            self.expect(&TokenKind::RightParen)?;
        }
        Ok(start.to(self.previous.span).text(self.source).to_string())
    }

    /// Parses a comma-separated list of expressions.
    fn parse_expression_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![];
        loop {
            exprs.push(self.parse_expression(0)?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    /// Parses a comma-separated list of names.
    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![];
        loop {
            names.push(self.expect_name()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(names)
    }

    /// Skips tokens up to, but not including, the `)` that closes the
    /// current group.
    fn skip_to_close_paren(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.current.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth == 0 => return Ok(()),
                TokenKind::RightParen => depth -= 1,
                TokenKind::Eof | TokenKind::Error(_) => {
                    return Err(ParseError::unexpected(
                        ")",
                        self.current.kind.clone(),
                        self.current.span,
                    ));
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Returns true if the tokens at the current position start a query,
    /// possibly wrapped in parentheses.
    fn looks_like_query(&self) -> bool {
        let mut lexer = self.lexer.clone();
        let mut token = self.current.clone();
        while matches!(token.kind, TokenKind::LeftParen) {
            token = lexer.next_token();
        }
        matches!(
            token.kind,
            TokenKind::Keyword(Keyword::Select | Keyword::With)
        )
    }

    /// Runs `parse` speculatively, restoring the parser state on failure.
    fn try_parse<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Option<T> {
        let checkpoint = self.clone();
        match parse(self) {
            Ok(value) => Some(value),
            Err(_) => {
                *self = checkpoint;
                None
            }
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new("Query is nested too deeply", self.current.span));
        }
        self.depth += 1;
        Ok(())
    }

    /// Starts a left-deep chain. Returns the height seen so far among
    /// earlier siblings, to be handed back to `end_chain`.
    fn begin_chain(&mut self) -> usize {
        std::mem::take(&mut self.chain_height)
    }

    /// Adds one link on top of a chain of `height`. The right side of the
    /// link was just parsed and left its own height in `chain_height`.
    fn extend_chain(&mut self, height: usize) -> Result<usize, ParseError> {
        let height = height.max(self.chain_height) + 1;
        if height > MAX_CHAIN_HEIGHT {
            return Err(ParseError::new("Query is nested too deeply", self.current.span));
        }
        Ok(height)
    }

    fn end_chain(&mut self, outer: usize, height: usize) {
        self.chain_height = outer.max(height);
    }

    // --- Helper methods ---

    /// Advances to the next token.
    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    /// Returns the token after the current one.
    fn peek(&self) -> Token {
        self.lexer.clone().next_token()
    }

    /// Returns the `n`th token after the current one (`peek_nth(1) == peek()`).
    fn peek_nth(&self, n: usize) -> Token {
        let mut lexer = self.lexer.clone();
        let mut token = lexer.next_token();
        for _ in 1..n {
            token = lexer.next_token();
        }
        token
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn peek_is_keyword(&self, keyword: Keyword) -> bool {
        self.peek().as_keyword() == Some(keyword)
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current.kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Consumes the current token if it matches the given kind.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        let matched = self.check(kind);
        if matched {
            self.advance();
        }
        matched
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let matched = self.check_keyword(keyword);
        if matched {
            self.advance();
        }
        matched
    }

    /// Consumes the current token if it is the identifier `word`.
    fn eat_word(&mut self, word: &str) -> bool {
        let matched = self.current.is_word(word);
        if matched {
            self.advance();
        }
        matched
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(ParseError::unexpected(
                format!("{kind:?}"),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(ParseError::unexpected(
                keyword.as_str(),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Expects a name: an identifier or a non-reserved keyword.
    fn expect_name(&mut self) -> Result<String, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            TokenKind::Keyword(kw) if !kw.is_reserved() => {
                let name = self.current.span.text(self.source).to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::unexpected(
                "identifier",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    /// Expects a name where any keyword is accepted, e.g. after `AS` or `.`.
    fn expect_any_name(&mut self) -> Result<String, ParseError> {
        if matches!(self.current.kind, TokenKind::Keyword(_)) {
            let name = self.current.span.text(self.source).to_string();
            self.advance();
            return Ok(name);
        }
        self.expect_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Result<Query, ParseError> {
        Parser::new(sql).parse_query()
    }

    fn select(query: &Query) -> &SelectStatement {
        match &query.body {
            SetExpr::Select(select) => select,
            other => panic!("Expected SELECT block, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_select() {
        let query = parse("SELECT id, name FROM users").unwrap();
        let select = select(&query);
        assert_eq!(select.columns.len(), 2);
        assert!(matches!(
            &select.from,
            Some(TableRef::Table { name, schema: None, .. }) if name == "users"
        ));
    }

    #[test]
    fn test_expression_precedence() {
        // 1 + 2 * 3 should be parsed as 1 + (2 * 3)
        let query = parse("SELECT 1 + 2 * 3").unwrap();
        if let Expr::Binary { op, right, .. } = &select(&query).columns[0].expr {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                right.as_ref(),
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        } else {
            panic!("Expected binary expression");
        }
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let query = parse("SELECT 1 WHERE NOT a = 1 AND b").unwrap();
        let Some(Expr::Binary { op, left, .. }) = &select(&query).where_clause else {
            panic!("Expected AND");
        };
        assert_eq!(*op, BinaryOp::And);
        assert!(matches!(
            left.as_ref(),
            Expr::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_qualified_table_and_final() {
        let query = parse("SELECT * FROM analytics.events AS e FINAL SAMPLE 0.1").unwrap();
        let Some(TableRef::Table {
            schema,
            name,
            alias,
            is_final,
            sample,
        }) = &select(&query).from
        else {
            panic!("Expected table");
        };
        assert_eq!(schema.as_deref(), Some("analytics"));
        assert_eq!(name, "events");
        assert_eq!(alias.as_deref(), Some("e"));
        assert!(*is_final);
        assert!(sample.is_some());
    }

    #[test]
    fn test_clickhouse_join_modifiers() {
        let query =
            parse("SELECT a.x FROM a GLOBAL ANY LEFT JOIN b USING (id) ASOF JOIN c ON a.t >= c.t")
                .unwrap();
        let Some(TableRef::Join { left, join }) = &select(&query).from else {
            panic!("Expected join");
        };
        assert_eq!(join.strictness, Some(JoinStrictness::Asof));
        let TableRef::Join { join: first, .. } = left.as_ref() else {
            panic!("Expected nested join");
        };
        assert_eq!(first.join_type, JoinType::Left);
        assert_eq!(first.strictness, Some(JoinStrictness::Any));
        assert!(first.global);
        assert_eq!(first.using, vec!["id".to_string()]);
    }

    #[test]
    fn test_array_join() {
        let query = parse("SELECT tag FROM posts LEFT ARRAY JOIN tags AS tag").unwrap();
        assert!(matches!(
            &select(&query).from,
            Some(TableRef::ArrayJoin { is_left: true, items, .. }) if items.len() == 1
        ));
    }

    #[test]
    fn test_cte_and_scalar_alias() {
        let query = parse(
            "WITH 10 AS threshold, recent AS (SELECT * FROM events) SELECT * FROM recent",
        )
        .unwrap();
        let with = query.with.as_ref().unwrap();
        assert!(matches!(&with.items[0], WithItem::Alias { alias, .. } if alias == "threshold"));
        assert!(matches!(&with.items[1], WithItem::Cte(cte) if cte.name == "recent"));
    }

    #[test]
    fn test_union_all_is_left_associative() {
        let query = parse("SELECT 1 UNION ALL SELECT 2 UNION DISTINCT (SELECT 3)").unwrap();
        let SetExpr::SetOperation {
            quantifier, left, ..
        } = &query.body
        else {
            panic!("Expected set operation");
        };
        assert_eq!(*quantifier, SetQuantifier::Distinct);
        assert!(matches!(
            left.as_ref(),
            SetExpr::SetOperation {
                quantifier: SetQuantifier::All,
                ..
            }
        ));
    }

    #[test]
    fn test_parenthesized_subquery_in_expression() {
        let query = parse("SELECT ((SELECT 1) + 1)").unwrap();
        let Expr::Paren(inner) = &select(&query).columns[0].expr else {
            panic!("Expected parenthesized expression");
        };
        assert!(matches!(
            inner.as_ref(),
            Expr::Binary { left, .. } if matches!(left.as_ref(), Expr::Subquery(_))
        ));
    }

    #[test]
    fn test_global_not_in_subquery() {
        let query = parse("SELECT 1 FROM t WHERE id GLOBAL NOT IN (SELECT id FROM banned)").unwrap();
        assert!(matches!(
            &select(&query).where_clause,
            Some(Expr::InSubquery { negated: true, .. })
        ));
    }

    #[test]
    fn test_clickhouse_expressions() {
        let sql = "SELECT arrayMap(x -> x * 2, arr), quantile(0.9)(latency), \
                   toDate(ts)::String, INTERVAL 1 DAY, DATE '2024-01-01', \
                   CAST(x AS Nullable(UInt64)), t.1, if(a, b, c), \
                   count() OVER (PARTITION BY k ORDER BY ts ROWS BETWEEN 1 PRECEDING AND CURRENT ROW) \
                   FROM t";
        let query = parse(sql).unwrap();
        let columns = &select(&query).columns;
        assert_eq!(columns.len(), 9);
        assert!(matches!(
            &columns[1].expr,
            Expr::Function(call) if call.parameters.len() == 1 && call.args.len() == 1
        ));
        assert!(matches!(
            &columns[5].expr,
            Expr::Cast { data_type, .. } if data_type == "Nullable(UInt64)"
        ));
        assert!(matches!(&columns[6].expr, Expr::TupleElement { index: 1, .. }));
        assert!(matches!(
            &columns[8].expr,
            Expr::Function(FunctionCall { over: Some(spec), .. }) if spec.partition_by.len() == 1
        ));
    }

    #[test]
    fn test_clauses_after_where() {
        let sql = "SELECT k, count() FROM t PREWHERE d > 0 WHERE x = 1 \
                   GROUP BY k WITH TOTALS HAVING count() > 1 ORDER BY k DESC NULLS LAST \
                   LIMIT 1 BY k LIMIT 10 OFFSET 5 SETTINGS max_threads = 4 FORMAT JSONEachRow;";
        let query = parse(sql).unwrap();
        let select = select(&query);
        assert!(select.prewhere.is_some());
        assert_eq!(select.group_by_modifier, Some(GroupByModifier::Totals));
        assert_eq!(select.order_by[0].nulls, Some(NullOrdering::Last));
        assert!(select.limit_by.is_some());
        assert!(select.limit.is_some());
        assert!(select.offset.is_some());
        assert_eq!(select.settings.len(), 1);
        assert_eq!(query.format.as_deref(), Some("JSONEachRow"));
    }

    #[test]
    fn test_wildcard_modifiers() {
        let query = parse("SELECT * EXCEPT (secret) REPLACE (x + 1 AS x) FROM t").unwrap();
        assert!(matches!(
            &select(&query).columns[0].expr,
            Expr::Wildcard { table: None }
        ));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(parse("SELECT 1 FROM t )").is_err());
        assert!(parse("SELECT FROM").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let sql = format!("SELECT {}1{}", "(".repeat(1000), ")".repeat(1000));
        let err = parse(&sql).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }

    #[test]
    fn test_long_chains_are_an_error() {
        let joins = format!("SELECT * FROM t{}", " JOIN t ON 1".repeat(20_000));
        let unions = format!("SELECT 1{}", " UNION ALL SELECT 1".repeat(50_000));
        let commas = format!("SELECT * FROM t{}", ", t".repeat(20_000));
        let sums = format!("SELECT 1{}", " + 1".repeat(50_000));
        for sql in [joins, unions, commas, sums] {
            let err = parse(&sql).unwrap_err();
            assert!(err.message.contains("nested too deeply"));
        }
    }

    #[test]
    fn test_chains_inside_parentheses_add_up() {
        let mut sql = String::from("1");
        for _ in 0..50 {
            sql = format!("({sql}{})", " + 1".repeat(900));
        }
        assert!(parse(&format!("SELECT {sql}")).is_err());
    }

    #[test]
    fn test_moderate_chains_parse() {
        assert!(parse(&format!("SELECT * FROM t{}", " JOIN t ON 1".repeat(500))).is_ok());
        assert!(parse(&format!("SELECT 1{}", " UNION ALL SELECT 1".repeat(500))).is_ok());
        assert!(parse(&format!("SELECT 1{}", " OR 1".repeat(500))).is_ok());
    }
}
