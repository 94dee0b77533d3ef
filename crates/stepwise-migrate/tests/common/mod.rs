#![allow(dead_code)]

use stepwise_migrate::prelude::*;

/// A materialized view with a declared source and no query.
pub fn mv(name: &str, source: &str) -> Operation {
    Operation::create_materialized_view(name, source)
}

/// A materialized view known only by its query.
pub fn mv_query(name: &str, query: &str) -> Operation {
    Operation::create_annotated(name, TableAnnotations::materialized_view(None, Some(query)))
}

/// Dropping a materialized view with a declared source.
pub fn drop_mv(name: &str, source: &str) -> Operation {
    Operation::drop_materialized_view(name, source)
}

/// Dropping a materialized view known only by its query.
pub fn drop_mv_query(name: &str, query: &str) -> Operation {
    Operation::drop_annotated(name, TableAnnotations::materialized_view(None, Some(query)))
}

/// Splits with default options.
pub fn split(operations: Vec<Operation>) -> Vec<StepMigration> {
    split_operations(operations)
}

/// Returns the step descriptions in order.
pub fn descriptions(steps: &[StepMigration]) -> Vec<String> {
    steps.iter().map(|s| s.description.clone()).collect()
}

/// Returns the position of the step with the given description.
pub fn position(steps: &[StepMigration], description: &str) -> usize {
    steps
        .iter()
        .position(|s| s.description == description)
        .unwrap_or_else(|| panic!("no step named {description}"))
}

/// Asserts that the steps hold exactly the input operations, numbered
/// 1..=n.
pub fn assert_bijection(input: &[Operation], steps: &[StepMigration]) {
    assert_eq!(input.len(), steps.len());
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step.step_number, i + 1);
        assert_eq!(&input[step.original_index], &step.operation);
    }
    let mut seen: Vec<usize> = steps.iter().map(|s| s.original_index).collect();
    seen.sort_unstable();
    let expected: Vec<usize> = (0..input.len()).collect();
    assert_eq!(seen, expected);
}
