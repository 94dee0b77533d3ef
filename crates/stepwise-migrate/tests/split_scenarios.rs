//! End-to-end ordering tests for the step splitter.

mod common;

use common::*;
use stepwise_migrate::prelude::*;

#[test]
fn test_mixed_batch() {
    let input = vec![
        Operation::drop_index("a", "ix1"),
        Operation::create_table("a"),
        mv("b", "a"),
        Operation::add_column("a", "x"),
    ];
    let steps = split(input.clone());

    assert_eq!(
        descriptions(&steps),
        vec!["DropIndex_ix1", "CreateTable_a", "AddColumn_a_x", "CreateTable_b"]
    );
    assert_bijection(&input, &steps);
}

#[test]
fn test_drop_order_does_not_depend_on_input_order() {
    let forward = split(vec![drop_mv("b", "a"), Operation::drop_table("a")]);
    let reversed = split(vec![Operation::drop_table("a"), drop_mv("b", "a")]);

    let expected = vec!["DropTable_b", "DropTable_a"];
    assert_eq!(descriptions(&forward), expected);
    assert_eq!(descriptions(&reversed), expected);
}

#[test]
fn test_dropped_views_go_before_their_sources() {
    // mv_c reads mv_b, which reads mv_a; all three are dropped together.
    let input = vec![
        drop_mv("mv_a", "events"),
        drop_mv("mv_b", "mv_a"),
        drop_mv("mv_c", "mv_b"),
    ];
    let steps = split(input.clone());
    assert_eq!(
        descriptions(&steps),
        vec!["DropTable_mv_c", "DropTable_mv_b", "DropTable_mv_a"]
    );
    assert_bijection(&input, &steps);
}

#[test]
fn test_created_views_go_after_their_sources() {
    let input = vec![
        mv("mv_c", "mv_b"),
        Operation::create_dictionary("dict", "mv_c"),
        mv("mv_b", "mv_a"),
        mv("mv_a", "events"),
    ];
    let steps = split(input.clone());
    assert_eq!(
        descriptions(&steps),
        vec![
            "CreateTable_mv_a",
            "CreateTable_mv_b",
            "CreateTable_mv_c",
            "CreateTable_dict",
        ]
    );
    assert_bijection(&input, &steps);
}

#[test]
fn test_dependency_found_only_in_query() {
    let parsed = split(vec![
        mv_query("totals", "SELECT x FROM raw_events"),
        mv("raw_events", "ingest"),
    ]);
    let declared = split(vec![mv("totals", "raw_events"), mv("raw_events", "ingest")]);

    assert_eq!(
        descriptions(&parsed),
        vec!["CreateTable_raw_events", "CreateTable_totals"]
    );
    assert_eq!(descriptions(&parsed), descriptions(&declared));
}

#[test]
fn test_query_dependencies_through_joins_and_ctes() {
    let steps = split(vec![
        mv_query(
            "report",
            "WITH recent AS (SELECT * FROM mv_daily WHERE day > today() - 7) \
             SELECT r.*, d.name FROM recent AS r LEFT JOIN dict_regions AS d ON r.region = d.id",
        ),
        mv_query("mv_daily", "SELECT toDate(ts) AS day, count() FROM events GROUP BY day"),
        Operation::create_dictionary("dict_regions", "regions"),
    ]);
    let report = position(&steps, "CreateTable_report");
    assert!(position(&steps, "CreateTable_mv_daily") < report);
    assert!(position(&steps, "CreateTable_dict_regions") < report);
}

#[test]
fn test_dependency_names_ignore_case_and_schema() {
    let steps = split(vec![
        mv_query("summary", "SELECT * FROM analytics.MV_Base"),
        mv("mv_base", "events"),
    ]);
    assert_eq!(
        descriptions(&steps),
        vec!["CreateTable_mv_base", "CreateTable_summary"]
    );
}

#[test]
fn test_qualified_names_on_both_sides_link() {
    let declared = split(vec![mv("summary", "analytics.Base"), mv("base", "events")]);
    assert_eq!(
        descriptions(&declared),
        vec!["CreateTable_base", "CreateTable_summary"]
    );

    let named = split(vec![
        mv_query("analytics.summary", "SELECT * FROM analytics.base"),
        mv("analytics.base", "events"),
    ]);
    assert_eq!(
        descriptions(&named),
        vec!["CreateTable_analytics.base", "CreateTable_analytics.summary"]
    );
}

#[test]
fn test_dropped_cycle_goes_before_its_shared_source() {
    let input = vec![
        drop_mv_query("raw_mv", "SELECT * FROM events"),
        drop_mv_query("a", "SELECT * FROM raw_mv JOIN b USING (id)"),
        drop_mv_query("b", "SELECT * FROM raw_mv JOIN a USING (id)"),
    ];
    let plan = StepSplitter::default().split(input.clone()).unwrap();
    assert_eq!(
        descriptions(&plan.steps),
        vec!["DropTable_a", "DropTable_b", "DropTable_raw_mv"]
    );
    assert_bijection(&input, &plan.steps);
    let tables: Vec<&str> = plan.unresolved.iter().map(|u| u.table.as_str()).collect();
    assert_eq!(tables, vec!["a", "b"]);
}

#[test]
fn test_cycle_keeps_input_order_and_completes() {
    let input = vec![
        mv_query("a", "SELECT * FROM b"),
        mv_query("b", "SELECT * FROM a"),
    ];
    let plan = StepSplitter::default().split(input.clone()).unwrap();

    assert_eq!(descriptions(&plan.steps), vec!["CreateTable_a", "CreateTable_b"]);
    assert_bijection(&input, &plan.steps);
    let tables: Vec<&str> = plan.unresolved.iter().map(|u| u.table.as_str()).collect();
    assert_eq!(tables, vec!["a", "b"]);
}

#[test]
fn test_cycle_members_follow_sorted_tables() {
    let steps = split(vec![
        mv_query("a", "SELECT * FROM b"),
        mv_query("b", "SELECT * FROM a"),
        mv("c", "events"),
    ]);
    assert_eq!(
        descriptions(&steps),
        vec!["CreateTable_c", "CreateTable_a", "CreateTable_b"]
    );
}

#[test]
fn test_strict_policy_rejects_cycle() {
    let result = StepSplitter::new(SplitOptions::new().strict()).split(vec![
        drop_mv("a", "b"),
        drop_mv("b", "a"),
        Operation::create_table("unrelated"),
    ]);
    match result {
        Err(MigrateError::DependencyCycle { phase, tables }) => {
            assert_eq!(phase, Phase::DropDerivedTables);
            assert_eq!(tables, vec!["a", "b"]);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

#[test]
fn test_strict_policy_accepts_acyclic_input() {
    let plan = StepSplitter::new(SplitOptions::new().strict())
        .split(vec![mv("b", "a"), mv("a", "events")])
        .unwrap();
    assert!(plan.unresolved.is_empty());
    assert_eq!(descriptions(&plan.steps), vec!["CreateTable_a", "CreateTable_b"]);
}

#[test]
fn test_every_phase_in_one_batch() {
    let input = vec![
        Operation::materialize_projection("events", "p_day"),
        Operation::add_projection("events", "p_day"),
        Operation::create_index("events", "ix_user"),
        Operation::other(Some("events")),
        Operation::rename_column("events", "uid", "user_id"),
        Operation::drop_column("events", "legacy"),
        mv("daily", "events"),
        Operation::add_column("events", "amount"),
        Operation::create_table("events"),
        Operation::drop_table("events_old"),
        drop_mv("daily_old", "events_old"),
        Operation::drop_projection("events_old", "p_old"),
    ];
    let steps = split(input.clone());
    assert_bijection(&input, &steps);

    let phases: Vec<Phase> = steps.iter().map(|s| s.phase).collect();
    let mut sorted = phases.clone();
    sorted.sort();
    assert_eq!(phases, sorted);

    assert_eq!(
        descriptions(&steps),
        vec![
            "DropProjection_p_old",
            "DropTable_daily_old",
            "DropTable_events_old",
            "CreateTable_events",
            "AddColumn_events_amount",
            "CreateTable_daily",
            "Other_events",
            "RenameColumn_events_uid_to_user_id",
            "DropColumn_events_legacy",
            "CreateIndex_ix_user",
            "MaterializeProjection_p_day",
            "AddProjection_p_day",
        ]
    );
}

#[test]
fn test_repeated_runs_are_identical() {
    let input = vec![
        mv_query("a", "SELECT * FROM b JOIN c USING (id)"),
        mv("c", "events"),
        mv("b", "c"),
        Operation::create_table("events"),
    ];
    assert_eq!(split(input.clone()), split(input));
}

#[test]
fn test_classification_is_stable_across_runs() {
    let op = mv("daily", "events");
    let first = classify(&op);
    let steps = split(vec![op.clone()]);
    assert_eq!(steps[0].phase, first);
    assert_eq!(classify(&steps[0].operation), first);
}

#[test]
fn test_unparsable_query_is_tolerated() {
    let input = vec![
        mv_query("broken", "SELECT FROM WHERE ((("),
        mv("other", "events"),
    ];
    let plan = StepSplitter::default().split(input.clone()).unwrap();
    assert_bijection(&input, &plan.steps);
    assert!(plan
        .warnings
        .iter()
        .any(|w| matches!(w, AnnotationWarning::UnparsableQuery { table, .. } if table == "broken")));
}

#[test]
fn test_operations_from_json() {
    let json = r#"[
        { "kind": "create_table", "name": "daily", "is_materialized_view": true,
          "materialized_view_query": "SELECT count() FROM events" },
        { "kind": "create_table", "name": "events" },
        { "kind": "add_column", "table": "events", "column": "ts", "column_type": "DateTime" }
    ]"#;
    let operations: Vec<Operation> = serde_json::from_str(json).unwrap();
    let steps = split(operations);
    assert_eq!(
        descriptions(&steps),
        vec!["CreateTable_events", "AddColumn_events_ts", "CreateTable_daily"]
    );
}
