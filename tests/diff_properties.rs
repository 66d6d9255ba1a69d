//! diff 엔진의 속성 기반 테스트.
//!
//! 임의 입력에 대해 재구성, 동일 입력, 결정성, 통계 범위를 확인합니다.

use lexdiff::models::{ComparisonOptions, ComparisonType, Granularity, Operation};
use lexdiff::services::comparison::compute;
use lexdiff::services::diff::{diff, reconstruct_modified, reconstruct_original, DiffLimits};
use proptest::prelude::*;

/// 토큰 경계가 자주 생기도록 작은 알파벳과 구두점, 공백을 섞습니다.
fn text() -> impl Strategy<Value = String> {
    "[abcABC é,.!?;' \t\n]{0,48}"
}

fn options() -> impl Strategy<Value = ComparisonOptions> {
    (any::<bool>(), any::<bool>()).prop_map(|(ignore_whitespace, ignore_case)| ComparisonOptions {
        ignore_whitespace,
        ignore_case,
        comparison_type: ComparisonType::Text,
    })
}

fn granularity() -> impl Strategy<Value = Granularity> {
    prop::sample::select(Granularity::ALL.to_vec())
}

proptest! {
    #[test]
    fn segments_reconstruct_both_inputs(
        a in text(),
        b in text(),
        granularity in granularity(),
        opts in options(),
    ) {
        let segments = diff(&a, &b, granularity, &opts);
        prop_assert_eq!(reconstruct_original(&segments), a);
        prop_assert_eq!(reconstruct_modified(&segments), b);
    }

    #[test]
    fn identical_inputs_are_all_equal(
        a in text(),
        granularity in granularity(),
        opts in options(),
    ) {
        let segments = diff(&a, &a, granularity, &opts);
        prop_assert!(segments.iter().all(|s| s.operation == Operation::Equal));
        prop_assert!(segments.iter().all(|s| s.modified_content.is_none()));
    }

    #[test]
    fn diff_is_deterministic(
        a in text(),
        b in text(),
        granularity in granularity(),
        opts in options(),
    ) {
        prop_assert_eq!(
            diff(&a, &b, granularity, &opts),
            diff(&a, &b, granularity, &opts)
        );
    }

    #[test]
    fn segments_are_never_empty_and_lengths_match(
        a in text(),
        b in text(),
        granularity in granularity(),
    ) {
        for segment in diff(&a, &b, granularity, &ComparisonOptions::default()) {
            prop_assert!(!segment.content.is_empty());
            prop_assert_eq!(segment.length, segment.content.chars().count());
        }
    }

    #[test]
    fn similarity_stays_in_range(a in text(), b in text(), opts in options()) {
        let (_, stats) = compute(&a, &b, &opts, &DiffLimits::unbounded()).unwrap();
        prop_assert!((0.0..=100.0).contains(&stats.similarity));
        prop_assert_eq!(
            stats.total_changes,
            stats.additions_count + stats.deletions_count
        );
    }
}
