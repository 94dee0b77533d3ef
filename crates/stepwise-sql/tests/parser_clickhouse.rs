//! Tests for ClickHouse SELECT syntax.

mod common;
use common::*;

use stepwise_sql::ast::{
    Expr, JoinStrictness, JoinType, Literal, SetExpr, TableRef, WithItem,
};

#[test]
fn select_without_from() {
    let select = parse_select("SELECT 1 + 1, 'x', NULL, true");
    assert_eq!(select.columns.len(), 4);
    assert!(select.from.is_none());
}

#[test]
fn trailing_semicolons_are_accepted() {
    let _ = parse("SELECT 1;;");
}

#[test]
fn comments_are_ignored() {
    let select = parse_select("SELECT a -- trailing\n, /* block */ b # hash\nFROM t");
    assert_eq!(select.columns.len(), 2);
}

#[test]
fn bare_and_as_aliases() {
    let select = parse_select("SELECT a x, b AS y, c AS `from` FROM t tt");
    let aliases: Vec<_> = select.columns.iter().map(|c| c.alias.as_deref()).collect();
    assert_eq!(aliases, [Some("x"), Some("y"), Some("from")]);
    assert!(matches!(
        select.from,
        Some(TableRef::Table { alias: Some(ref a), .. }) if a == "tt"
    ));
}

#[test]
fn keyword_named_functions_and_columns() {
    let select = parse_select("SELECT left(s, 2), right(s, 1), first, last FROM t");
    assert!(matches!(&select.columns[0].expr, Expr::Function(f) if f.name == "left"));
    assert!(matches!(&select.columns[2].expr, Expr::Column { name, .. } if name == "first"));
}

#[test]
fn paste_and_semi_joins() {
    let select = parse_select("SELECT * FROM a PASTE JOIN b LEFT SEMI JOIN c ON a.x = c.x");
    let Some(TableRef::Join { left, join }) = select.from else {
        panic!("Expected join");
    };
    assert_eq!(join.join_type, JoinType::Left);
    assert_eq!(join.strictness, Some(JoinStrictness::Semi));
    assert!(matches!(*left, TableRef::Join { ref join, .. } if join.join_type == JoinType::Paste));
}

#[test]
fn comma_joins_are_cross_joins() {
    let select = parse_select("SELECT * FROM a, b");
    assert!(matches!(
        select.from,
        Some(TableRef::Join { ref join, .. }) if join.join_type == JoinType::Cross
    ));
}

#[test]
fn limit_forms() {
    let select = parse_select("SELECT * FROM t LIMIT 5, 10");
    assert_eq!(select.limit, Some(Expr::Literal(Literal::Integer(10))));
    assert_eq!(select.offset, Some(Expr::Literal(Literal::Integer(5))));

    let select = parse_select("SELECT * FROM t ORDER BY ts WITH FILL FROM 0 TO 10 STEP 1 LIMIT 3 WITH TIES");
    assert_eq!(select.order_by.len(), 1);
    assert!(select.limit.is_some());
}

#[test]
fn window_clause_and_named_windows() {
    let select = parse_select(
        "SELECT sum(x) OVER w, rank() OVER (w ORDER BY y) FROM t WINDOW w AS (PARTITION BY k)",
    );
    assert_eq!(select.windows.len(), 1);
    assert_eq!(select.windows[0].0, "w");
}

#[test]
fn lambdas_and_tuples() {
    let select = parse_select("SELECT arrayFilter((k, v) -> v > 0, keys, vals), (1, 2).1 FROM t");
    let Expr::Function(call) = &select.columns[0].expr else {
        panic!("Expected function");
    };
    assert!(matches!(&call.args[0], Expr::Lambda { params, .. } if matches!(params.as_ref(), Expr::Tuple(items) if items.len() == 2)));
}

#[test]
fn special_function_forms() {
    let _ = parse("SELECT extract(DAY FROM ts), substring(s FROM 1 FOR 2), trim(BOTH ' ' FROM s) FROM t");
    let _ = parse("SELECT CAST(x, 'UInt8'), x::Decimal(10, 2), arr[1], map['k'] FROM t");
    let _ = parse("SELECT CASE WHEN a THEN 1 WHEN b THEN 2 ELSE 3 END, CASE x WHEN 1 THEN 'a' END FROM t");
    let _ = parse("SELECT uniqExact(DISTINCT user_id), count(*), any(x) RESPECT NULLS FROM t");
}

#[test]
fn predicates() {
    let _ = parse("SELECT * FROM t WHERE a NOT BETWEEN 1 AND 2 AND b NOT LIKE '%x' AND c ILIKE 'y' AND d IS NOT NULL AND e NOT IN (1, 2)");
}

#[test]
fn cte_with_column_list() {
    let query = parse("WITH totals (k, n) AS (SELECT k, count() FROM t GROUP BY k) SELECT * FROM totals");
    let with = query.with.expect("WITH clause");
    assert!(matches!(&with.items[0], WithItem::Cte(cte) if cte.columns == ["k", "n"]));
}

#[test]
fn nested_parenthesized_union() {
    let query = parse("((SELECT 1) UNION ALL (SELECT 2))");
    assert!(matches!(query.body, SetExpr::Query(_)));
}

#[test]
fn errors() {
    let _ = parse_err("");
    let _ = parse_err("SELECT");
    let _ = parse_err("SELECT * FROM");
    let _ = parse_err("INSERT INTO t VALUES (1)");
    let _ = parse_err("SELECT (1 + 2");
    let _ = parse_err("SELECT 1 FROM t WHERE");
    let _ = parse_err("SELECT CAST(x AS) FROM t");
}
