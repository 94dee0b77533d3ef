//! Snapshot repositories, annotation enrichment and identified runs.

mod common;

use chrono::NaiveDateTime;
use common::*;
use stepwise_migrate::naming::parse_timestamp;
use stepwise_migrate::prelude::*;

fn run_time() -> NaiveDateTime {
    parse_timestamp("20250101093000").unwrap()
}

fn previous_schema() -> SchemaSnapshot {
    SchemaSnapshot::new()
        .with_table(TableSnapshot::regular("events"))
        .with_table(TableSnapshot::materialized_view(
            "daily",
            Some("events"),
            Some("SELECT toDate(ts) AS day, count() FROM events GROUP BY day"),
        ))
        .with_table(TableSnapshot::materialized_view(
            "weekly",
            None,
            Some("SELECT * FROM daily"),
        ))
}

#[test]
fn test_json_repository_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonSnapshotRepository::new(dir.path().join("state").join("schema.json"));

    assert_eq!(repo.load_previous().unwrap(), None);
    repo.save(&previous_schema()).unwrap();
    assert!(repo.path().exists());
    assert_eq!(repo.load_previous().unwrap(), Some(previous_schema()));
}

#[test]
fn test_json_repository_reports_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = JsonSnapshotRepository::new(&path).load_previous();
    assert!(matches!(result, Err(MigrateError::Serialization(_))));
}

#[test]
fn test_unannotated_drops_are_ordered_after_enrichment() {
    // The diff engine only knows the names; the previous snapshot knows
    // that `weekly` reads `daily`.
    let operations = vec![
        Operation::drop_table("daily"),
        Operation::drop_table("weekly"),
        Operation::drop_table("events"),
    ];
    let repo = InMemorySnapshotRepository::with_snapshot(previous_schema());
    let previous = repo.load_previous().unwrap();

    let enriched = enrich_annotations(operations, previous.as_ref(), None);
    let steps = split(enriched);
    assert_eq!(
        descriptions(&steps),
        vec!["DropTable_weekly", "DropTable_daily", "DropTable_events"]
    );
    assert_eq!(steps[0].phase, Phase::DropDerivedTables);
    assert_eq!(steps[2].phase, Phase::DropTables);
}

#[test]
fn test_save_after_run_feeds_next_run() {
    let repo = InMemorySnapshotRepository::new();
    let first = vec![
        Operation::create_table("events"),
        mv_query("daily", "SELECT count() FROM events"),
    ];
    let current = repo
        .load_previous()
        .unwrap()
        .unwrap_or_default()
        .apply(&first);
    repo.save(&current).unwrap();

    let second = vec![Operation::drop_table("events"), Operation::drop_table("daily")];
    let previous = repo.load_previous().unwrap();
    let steps = split(enrich_annotations(second, previous.as_ref(), None));
    assert_eq!(
        descriptions(&steps),
        vec!["DropTable_daily", "DropTable_events"]
    );
}

#[test]
fn test_generation_run_identifies_every_step() {
    let steps = split(vec![
        mv("daily", "events"),
        Operation::create_table("events"),
        Operation::add_column("events", "amount"),
    ]);
    let run = GenerationRun::new("add_daily", run_time(), steps)
        .unwrap()
        .with_snapshot(previous_schema());

    let ids: Vec<&str> = run.steps().iter().map(IdentifiedStep::id).collect();
    assert_eq!(
        ids,
        vec![
            "20250101093000_add_daily_001",
            "20250101093000_add_daily_002",
            "20250101093000_add_daily_003",
        ]
    );
    assert_eq!(run.steps()[2].step().description, "CreateTable_daily");
    assert_eq!(run.snapshot(), Some(&previous_schema()));

    for step in run.steps() {
        match step.rollback() {
            Err(MigrateError::BackwardUnsupported { step_id }) => assert_eq!(step_id, step.id()),
            other => panic!("expected rollback to be refused, got {other:?}"),
        }
    }
}

#[test]
fn test_generation_run_serializes() {
    let run = GenerationRun::new("init", run_time(), split(vec![Operation::create_table("t")]))
        .unwrap();
    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["changeset"], "init");
    assert_eq!(json["steps"][0]["id"], "20250101093000_init_001");
    assert_eq!(json["steps"][0]["step"]["description"], "CreateTable_t");
    assert_eq!(json["steps"][0]["step"]["operation"]["kind"], "create_table");
}
