//! Tests for table reference extraction.

mod common;
use common::*;

use stepwise_sql::try_extract_table_references;

#[test]
fn join_on_two_tables() {
    assert_eq!(
        tables("SELECT a FROM t1 JOIN t2 ON t1.id = t2.id"),
        ["t1", "t2"]
    );
}

#[test]
fn empty_and_blank_input() {
    assert!(tables("").is_empty());
    assert!(tables("   \n\t ").is_empty());
}

#[test]
fn broken_sql_yields_nothing() {
    assert!(tables("SELECT FROM WHERE").is_empty());
    assert!(tables("SELECT a FROM (SELECT b FROM inner_t").is_empty());
    assert!(tables("CREATE TABLE t (id UInt64)").is_empty());
    assert!(tables("SELECT 'unterminated FROM t").is_empty());
}

#[test]
fn long_join_and_union_chains_yield_nothing() {
    let joins = format!("SELECT * FROM t{}", " JOIN u ON 1".repeat(20_000));
    let unions = format!("SELECT * FROM t{}", " UNION ALL SELECT * FROM u".repeat(50_000));
    for sql in [joins, unions] {
        assert!(try_extract_table_references(&sql).is_err());
        assert!(tables(&sql).is_empty());
    }
}

#[test]
fn try_extract_reports_parse_errors() {
    let err = try_extract_table_references("SELECT a FROM").unwrap_err();
    assert!(err.to_string().contains("at position"));
}

#[test]
fn schema_qualified_names_keep_last_segment() {
    assert_eq!(
        tables("SELECT * FROM analytics.raw_events AS r JOIN `default`.`Users` u ON r.uid = u.id"),
        ["raw_events", "users"]
    );
}

#[test]
fn names_are_case_insensitive_and_deduplicated() {
    assert_eq!(
        tables("SELECT * FROM Events e1 JOIN EVENTS e2 ON e1.id = e2.parent JOIN events e3 USING (id)"),
        ["events"]
    );
}

#[test]
fn derived_tables_and_nested_joins() {
    let sql = "SELECT * FROM (SELECT id FROM orders WHERE total > 0) o \
               LEFT JOIN (customers c INNER JOIN regions r ON c.region = r.id) ON o.id = c.id";
    assert_eq!(tables(sql), ["customers", "orders", "regions"]);
}

#[test]
fn set_operations_cover_both_sides() {
    let sql = "SELECT id FROM a UNION ALL SELECT id FROM b \
               EXCEPT (SELECT id FROM c INTERSECT SELECT id FROM d)";
    assert_eq!(tables(sql), ["a", "b", "c", "d"]);
}

#[test]
fn subqueries_in_expressions() {
    let sql = "SELECT (SELECT max(ts) FROM heartbeats) AS last_seen, \
               if(x > 0, (SELECT 1 FROM flags LIMIT 1), 0) \
               FROM events \
               WHERE user_id IN (SELECT id FROM users) \
               AND NOT EXISTS (SELECT 1 FROM bans WHERE bans.uid = events.user_id) \
               AND -(SELECT min(v) FROM thresholds) < x";
    assert_eq!(
        tables(sql),
        ["bans", "events", "flags", "heartbeats", "thresholds", "users"]
    );
}

#[test]
fn cte_names_are_not_reported() {
    let sql = "WITH active AS (SELECT * FROM users WHERE active), \
               recent AS (SELECT * FROM active WHERE ts > now() - INTERVAL 1 DAY) \
               SELECT * FROM recent JOIN sessions USING (user_id)";
    assert_eq!(tables(sql), ["sessions", "users"]);
}

#[test]
fn cte_names_are_matched_case_insensitively() {
    let sql = "WITH Recent AS (SELECT * FROM logs) SELECT * FROM RECENT";
    assert_eq!(tables(sql), ["logs"]);
}

#[test]
fn scalar_with_subquery_is_followed() {
    let sql = "WITH (SELECT max(version) FROM releases) AS latest \
               SELECT * FROM installs WHERE version = latest";
    assert_eq!(tables(sql), ["installs", "releases"]);
}

#[test]
fn in_named_set_is_not_a_table() {
    assert_eq!(
        tables("SELECT * FROM hits WHERE region IN allowed_regions"),
        ["hits"]
    );
}

#[test]
fn table_function_arguments() {
    assert!(tables("SELECT number FROM numbers(100)").is_empty());
    assert_eq!(
        tables("SELECT * FROM view(SELECT id FROM accounts)"),
        ["accounts"]
    );
}

#[test]
fn materialized_view_style_queries() {
    let sql = "SELECT toStartOfHour(ts) AS hour, countIf(status >= 500) AS errors, \
               quantileState(0.99)(latency_ms) AS p99 \
               FROM logs.http_requests FINAL \
               PREWHERE ts > now() - INTERVAL 7 DAY \
               GROUP BY hour WITH TOTALS \
               SETTINGS optimize_aggregation_in_order = 1";
    assert_eq!(tables(sql), ["http_requests"]);
}

#[test]
fn array_join_and_global_joins() {
    let sql = "SELECT e.id, tag FROM events AS e ARRAY JOIN e.tags AS tag \
               GLOBAL ANY LEFT JOIN dim_tags d ON d.name = tag \
               WHERE e.id GLOBAL IN (SELECT id FROM flagged)";
    assert_eq!(tables(sql), ["dim_tags", "events", "flagged"]);
}

#[test]
fn dictionary_source_query() {
    let sql = "SELECT id, name, parent_id FROM warehouse.categories WHERE NOT deleted";
    assert_eq!(tables(sql), ["categories"]);
}

#[test]
fn extraction_keeps_first_spelling() {
    let refs = stepwise_sql::extract_table_references("SELECT * FROM RawEvents JOIN rawevents USING (id)");
    let names: Vec<&str> = refs.iter().map(|t| t.as_str()).collect();
    assert_eq!(names, ["RawEvents"]);
}
