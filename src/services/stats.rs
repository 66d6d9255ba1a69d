//! # 통계 집계
//!
//! 네 개의 diff 뷰를 변경 수와 유사도(similarity)로 요약합니다.
//! 헤드라인 수치(추가/삭제/유사도)는 word 뷰 기준이고,
//! 네 granularity 모두에 대한 분해(breakdown)를 함께 제공합니다.

use crate::models::{
    ChangeCounts, DiffView, DiffViews, GranularityBreakdown, Operation, Statistics,
};

/// 소수점 둘째 자리 반올림
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: usize, whole: usize) -> f64 {
    round2(part as f64 / whole as f64 * 100.0)
}

pub fn count_view(view: &DiffView) -> ChangeCounts {
    let mut counts = ChangeCounts {
        segments: view.segments.len(),
        ..Default::default()
    };
    for segment in &view.segments {
        match segment.operation {
            Operation::Add => counts.additions += segment.token_count,
            Operation::Remove => counts.deletions += segment.token_count,
            Operation::Equal => counts.unchanged += segment.token_count,
        }
    }

    let changed = counts.additions + counts.deletions;
    let touched = changed + counts.unchanged;
    counts.change_percentage = if touched == 0 {
        0.0
    } else {
        percentage(changed, touched)
    };
    counts
}

/// 유사도 = 변경 없는 단어 토큰 / 전체 단어 토큰.
/// 전체는 두 입력 중 더 긴 쪽의 단어 토큰 수이고, 둘 다 비어 있으면 100입니다.
pub fn similarity(word: &ChangeCounts) -> f64 {
    let total = (word.unchanged + word.deletions).max(word.unchanged + word.additions);
    if total == 0 {
        100.0
    } else {
        percentage(word.unchanged, total)
    }
}

/// 순수 함수. 같은 뷰는 항상 같은 통계를 만듭니다.
pub fn aggregate(views: &DiffViews) -> Statistics {
    let breakdown = GranularityBreakdown {
        character: count_view(&views.character),
        word: count_view(&views.word),
        line: count_view(&views.line),
        sentence: count_view(&views.sentence),
    };
    let word = &breakdown.word;

    Statistics {
        total_changes: word.additions + word.deletions,
        additions_count: word.additions,
        deletions_count: word.deletions,
        similarity: similarity(word),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComparisonOptions;
    use crate::services::diff::{diff_all, DiffLimits};

    fn stats_for(a: &str, b: &str) -> Statistics {
        let views = diff_all(a, b, &ComparisonOptions::default(), &DiffLimits::unbounded()).unwrap();
        aggregate(&views)
    }

    #[test]
    fn single_word_replacement() {
        let stats = stats_for("The quick brown fox", "The fast brown fox");
        assert_eq!(stats.additions_count, 1);
        assert_eq!(stats.deletions_count, 1);
        assert_eq!(stats.total_changes, 2);
        assert_eq!(stats.similarity, 75.0);
        assert_eq!(stats.breakdown.word.unchanged, 3);
        assert_eq!(stats.breakdown.word.segments, 4);
    }

    #[test]
    fn empty_original() {
        let stats = stats_for("", "Hello world");
        assert_eq!(stats.additions_count, 2);
        assert_eq!(stats.deletions_count, 0);
        assert_eq!(stats.similarity, 0.0);
    }

    #[test]
    fn both_empty_is_fully_similar() {
        let stats = stats_for("", "");
        assert_eq!(stats.similarity, 100.0);
        assert_eq!(stats.total_changes, 0);
        assert_eq!(stats.breakdown.character.change_percentage, 0.0);
    }

    #[test]
    fn identity_reports_no_changes() {
        let text = "Section 4. Indemnity.\nThe Supplier shall indemnify the Buyer.";
        let stats = stats_for(text, text);
        assert_eq!(stats.similarity, 100.0);
        assert_eq!(stats.total_changes, 0);
        for counts in [
            &stats.breakdown.character,
            &stats.breakdown.word,
            &stats.breakdown.line,
            &stats.breakdown.sentence,
        ] {
            assert_eq!(counts.additions + counts.deletions, 0);
            assert_eq!(counts.segments, 1);
        }
    }

    #[test]
    fn similarity_rounds_to_two_decimals() {
        let counts = ChangeCounts {
            unchanged: 2,
            deletions: 1,
            additions: 0,
            ..Default::default()
        };
        assert_eq!(similarity(&counts), 66.67);
    }
}
