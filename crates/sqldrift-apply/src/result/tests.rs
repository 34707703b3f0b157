//! Tests for result merging

use super::*;

fn sample_results() -> Vec<ApplyResult> {
    vec![
        ApplyResult::default(),
        ApplyResult {
            differences: true,
            skip_count: 2,
            unsupported_count: 0,
            worst_outcome: Outcome::SuccessWithWarnings,
        },
        ApplyResult {
            differences: false,
            skip_count: 1,
            unsupported_count: 3,
            worst_outcome: Outcome::UnsafeBlocked,
        },
        ApplyResult {
            differences: true,
            skip_count: usize::MAX,
            unsupported_count: 1,
            worst_outcome: Outcome::StatementError,
        },
    ]
}

#[test]
fn test_merge_is_associative_and_commutative() {
    let samples = sample_results();
    for a in &samples {
        for b in &samples {
            assert_eq!(a.merge(*b), b.merge(*a));
            for c in &samples {
                assert_eq!(a.merge(*b).merge(*c), a.merge(b.merge(*c)));
                assert_eq!(a.merge(*b).merge(*c), a.merge(*c).merge(*b));
            }
        }
    }
}

#[test]
fn test_merge_field_semantics() {
    let a = ApplyResult {
        differences: true,
        skip_count: 2,
        unsupported_count: 1,
        worst_outcome: Outcome::SuccessWithWarnings,
    };
    let b = ApplyResult {
        differences: false,
        skip_count: 3,
        unsupported_count: 0,
        worst_outcome: Outcome::WorkspaceFatal,
    };
    let merged = a.merge(b);
    assert!(merged.differences);
    assert_eq!(merged.skip_count, 5);
    assert_eq!(merged.unsupported_count, 1);
    assert_eq!(merged.worst_outcome, Outcome::WorkspaceFatal);
}

#[test]
fn test_merge_saturates_counts() {
    let a = ApplyResult {
        skip_count: usize::MAX,
        ..ApplyResult::default()
    };
    let b = ApplyResult {
        skip_count: 5,
        ..ApplyResult::default()
    };
    assert_eq!(a.merge(b).skip_count, usize::MAX);
}

#[test]
fn test_exit_codes_by_outcome() {
    assert_eq!(Outcome::ConfigError.exit_code(false, false), 78);
    assert_eq!(Outcome::WorkspaceFatal.exit_code(false, false), 4);
    assert_eq!(Outcome::UnsafeBlocked.exit_code(false, true), 3);
    assert_eq!(Outcome::StatementError.exit_code(true, true), 2);
    assert_eq!(Outcome::Success.exit_code(true, true), 1);
    assert_eq!(Outcome::Success.exit_code(false, true), 0);
    assert_eq!(Outcome::SuccessWithWarnings.exit_code(false, false), 0);
}

#[test]
fn test_outcome_precedence() {
    assert!(Outcome::ConfigError > Outcome::WorkspaceFatal);
    assert!(Outcome::WorkspaceFatal > Outcome::UnsafeBlocked);
    assert!(Outcome::UnsafeBlocked > Outcome::StatementError);
    assert!(Outcome::StatementError > Outcome::SuccessWithWarnings);
    assert!(Outcome::SuccessWithWarnings > Outcome::Success);
}
