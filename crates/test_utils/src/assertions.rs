//! Custom test assertions
//!
//! Assertion helpers for update records, with failure messages that show the
//! record involved.

use domain_replay::{RecordOutcome, ReplaySummary};
use domain_update::{Update, UpdateState};

/// Asserts that the record is executed and carries no diagnostic
pub fn assert_executed(update: &Update) {
    assert_eq!(
        update.state,
        UpdateState::Executed,
        "update {} (sequence {}) is {}, result: {:?}",
        update.id,
        update.sequence,
        update.state,
        update.result
    );
}

/// Asserts that the record failed with a diagnostic containing `fragment`
pub fn assert_failed_with(update: &Update, fragment: &str) {
    assert_eq!(
        update.state,
        UpdateState::Failed,
        "update {} (sequence {}) is {}, expected failed",
        update.id,
        update.sequence,
        update.state
    );
    assert!(
        update.result.contains(fragment),
        "result of update {} is {:?}, expected it to contain {:?}",
        update.id,
        update.result,
        fragment
    );
}

/// Asserts that the record was never attempted
pub fn assert_pending(update: &Update) {
    assert_eq!(update.state, UpdateState::ToExecute, "update {} is {}", update.id, update.state);
    assert!(update.result.is_empty(), "update {} has result {:?}", update.id, update.result);
}

/// Asserts that records are in non-decreasing numeric sequence order
pub fn assert_replay_order(updates: &[Update]) {
    for pair in updates.windows(2) {
        assert!(
            pair[0].sequence <= pair[1].sequence,
            "sequence {} listed before {}",
            pair[0].sequence,
            pair[1].sequence
        );
    }
}

/// Asserts how many records the pass executed, failed and skipped
pub fn assert_summary_counts(
    summary: &ReplaySummary,
    executed: usize,
    failed: usize,
    skipped: usize,
) {
    let outcomes: Vec<&RecordOutcome> = summary.records.iter().map(|r| &r.outcome).collect();
    assert_eq!(
        (summary.executed().len(), summary.failed().len(), summary.skipped().len()),
        (executed, failed, skipped),
        "outcomes were {:?}",
        outcomes
    );
}
