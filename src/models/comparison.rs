//! # 비교 결과(ComparisonResult) 모델 정의
//!
//! diff 엔진의 출력(세그먼트, 뷰)과 통계, 그리고 저장되는 비교 결과 레코드를 정의합니다.
//!
//! ## 구조
//! ```text
//! ComparisonResult
//!  ├─ original / modified : SnapshotDescriptor (입력 설명)
//!  ├─ views               : DiffViews (character / word / line / sentence)
//!  ├─ statistics          : Statistics (단어 기준 헤드라인 + granularity별 분해)
//!  └─ options             : ComparisonOptions
//! ```
//!
//! 비교 결과는 생성 후 변경되지 않습니다 (soft delete만 가능).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DocumentFormat;
use crate::error::AppError;

/// 비교 방식. `Text`일 때만 마크업을 제거합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonType {
    #[default]
    Text,
    Html,
    Markdown,
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComparisonType::Text => "text",
            ComparisonType::Html => "html",
            ComparisonType::Markdown => "markdown",
        };
        f.write_str(s)
    }
}

/// diff 옵션. 정확히 세 필드만 허용합니다 (알 수 없는 필드는 역직렬화 에러).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparisonOptions {
    pub ignore_whitespace: bool,
    pub ignore_case: bool,
    pub comparison_type: ComparisonType,
}

/// 토큰화 단위
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Character,
    Word,
    Line,
    Sentence,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Character,
        Granularity::Word,
        Granularity::Line,
        Granularity::Sentence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Character => "character",
            Granularity::Word => "word",
            Granularity::Line => "line",
            Granularity::Sentence => "sentence",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "character" | "char" => Ok(Granularity::Character),
            "word" => Ok(Granularity::Word),
            "line" => Ok(Granularity::Line),
            "sentence" => Ok(Granularity::Sentence),
            other => Err(AppError::Validation(format!("Unknown diff granularity: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Remove,
    Equal,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Equal => "equal",
        }
    }
}

/// diff 결과의 한 조각.
///
/// - `content`: remove/equal이면 원본(A)의 텍스트, add면 수정본(B)의 텍스트
/// - `length`: `content`의 문자(유니코드 스칼라) 수
/// - `token_count`: 이 조각에 포함된 토큰 수 (word 단위에서는 공백 토큰 제외)
/// - `modified_content`: equal 조각인데 B 쪽 텍스트가 다를 때만 존재
///   (ignore_case / ignore_whitespace 옵션에서만 발생)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub operation: Operation,
    pub content: String,
    pub length: usize,
    pub token_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_content: Option<String>,
}

impl Segment {
    /// B(수정본) 쪽에서 이 조각이 차지하는 텍스트
    pub fn modified_text(&self) -> &str {
        self.modified_content.as_deref().unwrap_or(&self.content)
    }
}

/// 하나의 granularity에 대한 diff 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffView {
    pub granularity: Granularity,
    pub segments: Vec<Segment>,
}

/// 네 가지 독립적인 diff 뷰
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffViews {
    pub character: DiffView,
    pub word: DiffView,
    pub line: DiffView,
    pub sentence: DiffView,
}

impl DiffViews {
    pub fn get(&self, granularity: Granularity) -> &DiffView {
        match granularity {
            Granularity::Character => &self.character,
            Granularity::Word => &self.word,
            Granularity::Line => &self.line,
            Granularity::Sentence => &self.sentence,
        }
    }
}

/// granularity별 변경 집계
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub additions: usize,
    pub deletions: usize,
    pub unchanged: usize,
    pub segments: usize,
    pub change_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GranularityBreakdown {
    pub character: ChangeCounts,
    pub word: ChangeCounts,
    pub line: ChangeCounts,
    pub sentence: ChangeCounts,
}

/// 집계 통계. 헤드라인 수치는 word 뷰 기준입니다.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_changes: usize,
    pub additions_count: usize,
    pub deletions_count: usize,
    /// 변경되지 않은 단어 토큰 비율 (%, 소수점 둘째 자리 반올림)
    pub similarity: f64,
    pub breakdown: GranularityBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Text,
    Document,
    Version,
}

/// 비교 입력 하나에 대한 설명
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    pub kind: SnapshotKind,
    pub title: String,
    /// 원본 내용의 문자 수
    pub length: usize,
    pub format: Option<DocumentFormat>,
    pub timestamp: Option<String>,
    pub source_id: Option<String>,
    pub version_number: Option<i64>,
}

/// 두 스냅샷 사이의 diff 계산 한 번에 대한 불변 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub id: String,
    pub user_id: String,
    pub original: SnapshotDescriptor,
    pub modified: SnapshotDescriptor,
    pub views: DiffViews,
    pub statistics: Statistics,
    pub options: ComparisonOptions,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// 이력 조회용 요약. diff 뷰 전체는 제외합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub id: String,
    pub user_id: String,
    pub original: SnapshotDescriptor,
    pub modified: SnapshotDescriptor,
    pub statistics: Statistics,
    pub options: ComparisonOptions,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<&ComparisonResult> for ComparisonSummary {
    fn from(result: &ComparisonResult) -> Self {
        Self {
            id: result.id.clone(),
            user_id: result.user_id.clone(),
            original: result.original.clone(),
            modified: result.modified.clone(),
            statistics: result.statistics.clone(),
            options: result.options,
            is_public: result.is_public,
            tags: result.tags.clone(),
            notes: result.notes.clone(),
            created_at: result.created_at.clone(),
        }
    }
}

/// 비교 입력: 임의 텍스트, 문서 전체(최신 내용), 또는 특정 버전
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonInput {
    Text {
        content: String,
        title: Option<String>,
        format: Option<DocumentFormat>,
    },
    Document {
        document_id: String,
    },
    Version {
        document_id: String,
        version_number: i64,
    },
}

/// 생성 시점에만 지정할 수 있는 비교 결과 메타데이터
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComparisonMeta {
    #[serde(default)]
    pub options: ComparisonOptions,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub original: ComparisonInput,
    pub modified: ComparisonInput,
    #[serde(flatten)]
    pub meta: ComparisonMeta,
}

#[derive(Debug, Deserialize)]
pub struct CompareVersionsRequest {
    pub document_id: String,
    pub version_a: i64,
    pub version_b: i64,
    #[serde(flatten)]
    pub meta: ComparisonMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    CreatedAt,
    Similarity,
    TotalChanges,
}

impl FromStr for SortBy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(SortBy::CreatedAt),
            "similarity" => Ok(SortBy::Similarity),
            "totalChanges" | "total_changes" => Ok(SortBy::TotalChanges),
            other => Err(AppError::Validation(format!("Unknown sort field: {}", other))),
        }
    }
}

/// `GET /compare/history` 쿼리 문자열
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// 검증이 끝난 이력 조회 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    pub limit: u32,
    pub skip: u32,
    pub sort_by: SortBy,
    pub descending: bool,
}

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
            skip: 0,
            sort_by: SortBy::CreatedAt,
            descending: true,
        }
    }
}

impl TryFrom<HistoryQuery> for HistoryOptions {
    type Error = AppError;

    fn try_from(query: HistoryQuery) -> Result<Self, Self::Error> {
        let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit == 0 {
            return Err(AppError::Validation("limit must be at least 1".to_string()));
        }
        let sort_by = match query.sort_by.as_deref() {
            Some(s) => s.parse()?,
            None => SortBy::CreatedAt,
        };
        let descending = match query.sort_order.as_deref() {
            None | Some("desc") => true,
            Some("asc") => false,
            Some(other) => {
                return Err(AppError::Validation(format!("Unknown sort order: {}", other)))
            }
        };

        Ok(Self {
            limit: limit.min(MAX_HISTORY_LIMIT),
            skip: query.skip.unwrap_or(0),
            sort_by,
            descending,
        })
    }
}

/// `GET /compare/{id}/export/{format}` 쿼리 문자열
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub granularity: Option<String>,
}

impl ExportQuery {
    /// 지정하지 않으면 word 뷰입니다.
    pub fn granularity(&self) -> Result<Granularity, AppError> {
        match self.granularity.as_deref() {
            Some(value) => value.parse(),
            None => Ok(Granularity::Word),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub items: Vec<ComparisonSummary>,
    pub total: u64,
    pub limit: u32,
    pub skip: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDetails {
    pub additions: usize,
    pub deletions: usize,
    pub similarity: f64,
    pub breakdown: GranularityBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub summary: String,
    pub details: ReportDetails,
    pub recommendations: Vec<String>,
}

impl ComparisonResult {
    /// 사람이 읽을 요약과 검토 권고를 만듭니다.
    pub fn report(&self) -> ComparisonReport {
        let stats = &self.statistics;
        let mut recommendations = Vec::new();

        if stats.similarity < 50.0 {
            recommendations
                .push("Documents have significant differences. Consider a detailed review.".to_string());
        } else if stats.similarity < 80.0 {
            recommendations
                .push("Documents have moderate differences. Review key sections.".to_string());
        } else {
            recommendations
                .push("Documents are very similar. Only minor changes detected.".to_string());
        }

        if stats.additions_count > stats.deletions_count * 2 {
            recommendations.push(
                "Significant content has been added. Review new sections carefully.".to_string(),
            );
        }
        if stats.deletions_count > stats.additions_count * 2 {
            recommendations.push(
                "Significant content has been removed. Ensure important information is not lost."
                    .to_string(),
            );
        }

        ComparisonReport {
            summary: format!(
                "Documents are {}% similar with {} total changes",
                stats.similarity, stats.total_changes
            ),
            details: ReportDetails {
                additions: stats.additions_count,
                deletions: stats.deletions_count,
                similarity: stats.similarity,
                breakdown: stats.breakdown.clone(),
            },
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_reject_unknown_fields() {
        let parsed: Result<ComparisonOptions, _> =
            serde_json::from_str(r#"{"ignore_case": true, "newline_is_token": true}"#);
        assert!(parsed.is_err());

        let parsed: ComparisonOptions = serde_json::from_str(r#"{"ignore_case": true}"#).unwrap();
        assert!(parsed.ignore_case);
        assert!(!parsed.ignore_whitespace);
        assert_eq!(parsed.comparison_type, ComparisonType::Text);
    }

    #[test]
    fn unknown_granularity_is_validation_error() {
        assert!(matches!(
            "paragraph".parse::<Granularity>(),
            Err(AppError::Validation(_))
        ));
        assert_eq!("word".parse::<Granularity>().unwrap(), Granularity::Word);
    }

    #[test]
    fn export_query_defaults_to_word() {
        assert_eq!(ExportQuery::default().granularity().unwrap(), Granularity::Word);
        let query = ExportQuery {
            granularity: Some("sentence".into()),
        };
        assert_eq!(query.granularity().unwrap(), Granularity::Sentence);
        let query = ExportQuery {
            granularity: Some("clause".into()),
        };
        assert!(matches!(query.granularity(), Err(AppError::Validation(_))));
    }

    #[test]
    fn history_query_defaults_and_caps() {
        let opts = HistoryOptions::try_from(HistoryQuery::default()).unwrap();
        assert_eq!(opts, HistoryOptions::default());

        let opts = HistoryOptions::try_from(HistoryQuery {
            limit: Some(500),
            skip: Some(3),
            sort_by: Some("similarity".into()),
            sort_order: Some("asc".into()),
        })
        .unwrap();
        assert_eq!(opts.limit, MAX_HISTORY_LIMIT);
        assert_eq!(opts.skip, 3);
        assert_eq!(opts.sort_by, SortBy::Similarity);
        assert!(!opts.descending);

        let bad = HistoryOptions::try_from(HistoryQuery {
            sort_by: Some("title".into()),
            ..Default::default()
        });
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[test]
    fn compare_request_parses_tagged_inputs() {
        let req: CompareRequest = serde_json::from_str(
            r#"{
                "original": {"kind": "text", "content": "a"},
                "modified": {"kind": "version", "document_id": "d1", "version_number": 2},
                "options": {"ignore_case": true},
                "tags": ["nda"]
            }"#,
        )
        .unwrap();
        assert!(matches!(req.original, ComparisonInput::Text { .. }));
        assert!(matches!(
            req.modified,
            ComparisonInput::Version { version_number: 2, .. }
        ));
        assert!(req.meta.options.ignore_case);
        assert_eq!(req.meta.tags, vec!["nda".to_string()]);
    }
}
