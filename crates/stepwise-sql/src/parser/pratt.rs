//! Binding powers for the Pratt expression parser.

use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Binding power of postfix operators (`::Type`, `[index]`).
pub const POSTFIX_BINDING_POWER: u8 = 19;

/// Returns the prefix binding power for a unary operator token.
#[must_use]
pub const fn prefix_binding_power(kind: &TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Minus | TokenKind::Plus | TokenKind::BitNot => Some(17),
        TokenKind::Keyword(Keyword::Not) => Some(5),
        _ => None,
    }
}

/// Returns the infix binding power for a token.
///
/// Returns `(left_bp, right_bp)`: left-associative operators have
/// `left_bp < right_bp`. The lambda arrow is right-associative and its body
/// extends as far as possible.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Arrow => Some((1, 0)),

        TokenKind::Keyword(Keyword::Or) => Some((1, 2)),

        TokenKind::Keyword(Keyword::And) => Some((3, 4)),

        // Comparisons and predicates. `NOT` here is the infix `NOT IN`,
        // `NOT LIKE` and `NOT BETWEEN` form.
        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::Keyword(
            Keyword::Is
            | Keyword::In
            | Keyword::Between
            | Keyword::Like
            | Keyword::Ilike
            | Keyword::Not,
        ) => Some((7, 8)),

        TokenKind::BitOr => Some((9, 10)),

        TokenKind::BitAnd => Some((11, 12)),

        TokenKind::LeftShift | TokenKind::RightShift => Some((13, 14)),

        TokenKind::Plus | TokenKind::Minus | TokenKind::Concat => Some((15, 16)),

        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((17, 18)),

        TokenKind::DoubleColon | TokenKind::LeftBracket => {
            Some((POSTFIX_BINDING_POWER, POSTFIX_BINDING_POWER + 1))
        }

        _ => None,
    }
}

/// Converts a token to a binary operator.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        TokenKind::Concat => Some(BinaryOp::Concat),
        TokenKind::Keyword(Keyword::Like) => Some(BinaryOp::Like),
        TokenKind::Keyword(Keyword::Ilike) => Some(BinaryOp::ILike),
        TokenKind::BitAnd => Some(BinaryOp::BitAnd),
        TokenKind::BitOr => Some(BinaryOp::BitOr),
        TokenKind::LeftShift => Some(BinaryOp::LeftShift),
        TokenKind::RightShift => Some(BinaryOp::RightShift),
        _ => None,
    }
}

/// Converts a token to a unary operator. Unary plus maps to `None` and is
/// dropped by the parser.
#[must_use]
pub const fn token_to_unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Keyword(Keyword::Not) => Some(UnaryOp::Not),
        TokenKind::BitNot => Some(UnaryOp::BitNot),
        _ => None,
    }
}
