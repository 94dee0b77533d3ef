//! Token types for the SQL lexer.

use super::Span;

/// SQL keywords recognized by the lexer.
///
/// ClickHouse-specific words such as `FINAL`, `PREWHERE` or `GLOBAL` are not
/// keywords: they are valid identifiers in most positions and the parser
/// matches them contextually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // Query structure
    Select,
    From,
    Where,
    Order,
    By,
    Group,
    Having,
    Limit,
    Offset,
    Distinct,
    All,
    As,
    With,
    Recursive,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    On,
    Using,

    // Set operations
    Union,
    Intersect,
    Except,

    // Predicates and logic
    And,
    Or,
    Not,
    In,
    Between,
    Like,
    Ilike,
    Is,
    Null,
    True,
    False,
    Exists,

    // Expressions
    Case,
    When,
    Then,
    Else,
    End,
    Cast,

    // Ordering
    Asc,
    Desc,
    Nulls,
    First,
    Last,

    // Windows
    Over,
    Window,
    Partition,
    Rows,
    Range,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        let keyword = match s.to_ascii_uppercase().as_str() {
            "SELECT" => Self::Select,
            "FROM" => Self::From,
            "WHERE" => Self::Where,
            "ORDER" => Self::Order,
            "BY" => Self::By,
            "GROUP" => Self::Group,
            "HAVING" => Self::Having,
            "LIMIT" => Self::Limit,
            "OFFSET" => Self::Offset,
            "DISTINCT" => Self::Distinct,
            "ALL" => Self::All,
            "AS" => Self::As,
            "WITH" => Self::With,
            "RECURSIVE" => Self::Recursive,
            "JOIN" => Self::Join,
            "INNER" => Self::Inner,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            "FULL" => Self::Full,
            "OUTER" => Self::Outer,
            "CROSS" => Self::Cross,
            "ON" => Self::On,
            "USING" => Self::Using,
            "UNION" => Self::Union,
            "INTERSECT" => Self::Intersect,
            "EXCEPT" => Self::Except,
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "IN" => Self::In,
            "BETWEEN" => Self::Between,
            "LIKE" => Self::Like,
            "ILIKE" => Self::Ilike,
            "IS" => Self::Is,
            "NULL" => Self::Null,
            "TRUE" => Self::True,
            "FALSE" => Self::False,
            "EXISTS" => Self::Exists,
            "CASE" => Self::Case,
            "WHEN" => Self::When,
            "THEN" => Self::Then,
            "ELSE" => Self::Else,
            "END" => Self::End,
            "CAST" => Self::Cast,
            "ASC" => Self::Asc,
            "DESC" => Self::Desc,
            "NULLS" => Self::Nulls,
            "FIRST" => Self::First,
            "LAST" => Self::Last,
            "OVER" => Self::Over,
            "WINDOW" => Self::Window,
            "PARTITION" => Self::Partition,
            "ROWS" => Self::Rows,
            "RANGE" => Self::Range,
            _ => return None,
        };
        Some(keyword)
    }

    /// Returns the keyword as an upper-case string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Order => "ORDER",
            Self::By => "BY",
            Self::Group => "GROUP",
            Self::Having => "HAVING",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
            Self::Distinct => "DISTINCT",
            Self::All => "ALL",
            Self::As => "AS",
            Self::With => "WITH",
            Self::Recursive => "RECURSIVE",
            Self::Join => "JOIN",
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
            Self::Outer => "OUTER",
            Self::Cross => "CROSS",
            Self::On => "ON",
            Self::Using => "USING",
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::In => "IN",
            Self::Between => "BETWEEN",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::Is => "IS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Exists => "EXISTS",
            Self::Case => "CASE",
            Self::When => "WHEN",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::End => "END",
            Self::Cast => "CAST",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Nulls => "NULLS",
            Self::First => "FIRST",
            Self::Last => "LAST",
            Self::Over => "OVER",
            Self::Window => "WINDOW",
            Self::Partition => "PARTITION",
            Self::Rows => "ROWS",
            Self::Range => "RANGE",
        }
    }

    /// Returns true if the keyword can never be used as a bare name.
    ///
    /// Non-reserved keywords (`first`, `range`, `partition`...) are common
    /// column names in analytical schemas and are accepted wherever a name is.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        !matches!(
            self,
            Self::Asc
                | Self::Desc
                | Self::Nulls
                | Self::First
                | Self::Last
                | Self::Recursive
                | Self::Partition
                | Self::Rows
                | Self::Range
        )
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Float literal (e.g., 3.14), also used for integers beyond `i64`
    Float(f64),
    /// String literal (e.g., 'hello')
    String(String),

    // Identifiers and keywords
    /// Identifier, with quotes removed for quoted identifiers
    Identifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// = or ==
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ~
    BitNot,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// -> (lambda)
    Arrow,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :
    Colon,
    /// ::
    DoubleColon,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Returns true if this token is an unquoted-or-quoted identifier equal
    /// to `word`, ignoring ASCII case.
    #[must_use]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(name) if name.eq_ignore_ascii_case(word))
    }
}
