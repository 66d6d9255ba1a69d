//! # 비교 관리자 (Comparison Manager)
//!
//! 입력 해석 → 권한 확인 → 정규화 → 네 granularity diff → 통계 집계 → 저장을 조율합니다.
//!
//! diff 계산은 CPU 작업이므로 `spawn_blocking`에서 실행하고,
//! 동시에 실행되는 계산 수는 `Semaphore`로 제한합니다.
//! 조회 실패와 권한 거부는 여기서 `AppError`로 바뀝니다.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::db::{new_id, now_timestamp, Store};
use crate::error::AppError;
use crate::models::*;
use crate::services::authz::Authorizer;
use crate::services::diff::{self, DiffError, DiffLimits};
use crate::services::export::{self, ExportFormat, ExportedFile};
use crate::services::normalize::normalize;
use crate::services::stats;
use crate::services::versioning::VersionStore;

/// 텍스트로 해석된 비교 입력
#[derive(Debug, Clone)]
struct ResolvedInput {
    text: String,
    descriptor: SnapshotDescriptor,
}

/// 정규화 + diff + 집계. 같은 입력과 옵션이면 항상 같은 결과를 냅니다.
pub fn compute(
    raw_a: &str,
    raw_b: &str,
    options: &ComparisonOptions,
    limits: &DiffLimits,
) -> Result<(DiffViews, Statistics), DiffError> {
    limits.check_size(raw_a)?;
    limits.check_size(raw_b)?;

    let text_a = normalize(raw_a, options.comparison_type);
    let text_b = normalize(raw_b, options.comparison_type);
    let views = diff::diff_all(&text_a, &text_b, options, limits)?;
    let statistics = stats::aggregate(&views);
    Ok((views, statistics))
}

/// 태그는 앞뒤 공백을 지우고, 빈 값과 중복을 제거합니다 (처음 나온 순서 유지).
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

pub struct ComparisonService {
    store: Arc<dyn Store>,
    versions: Arc<VersionStore>,
    authorizer: Arc<dyn Authorizer>,
    workers: Arc<Semaphore>,
    limits: DiffLimits,
}

impl ComparisonService {
    pub fn new(
        store: Arc<dyn Store>,
        versions: Arc<VersionStore>,
        authorizer: Arc<dyn Authorizer>,
        limits: DiffLimits,
        workers: usize,
    ) -> Self {
        Self {
            store,
            versions,
            authorizer,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            limits,
        }
    }

    /// 문서를 찾고 조회 권한을 확인합니다.
    async fn viewable_document(&self, document_id: &str, user_id: &str) -> Result<Document, AppError> {
        let document = self
            .store
            .get_document(document_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !self.authorizer.can_view_document(user_id, &document) {
            tracing::warn!(document_id, user_id, "Comparison input access denied");
            return Err(AppError::Forbidden(
                "You do not have access to this document".to_string(),
            ));
        }
        Ok(document)
    }

    fn version_input(document: &Document, version: DocumentVersion) -> ResolvedInput {
        ResolvedInput {
            descriptor: SnapshotDescriptor {
                kind: SnapshotKind::Version,
                title: format!("{} (v{})", document.title, version.version_number),
                length: version.content.chars().count(),
                format: Some(version.format),
                timestamp: Some(version.created_at),
                source_id: Some(document.id.clone()),
                version_number: Some(version.version_number),
            },
            text: version.content,
        }
    }

    async fn resolve(
        &self,
        input: ComparisonInput,
        user_id: &str,
        default_title: &str,
    ) -> Result<ResolvedInput, AppError> {
        match input {
            ComparisonInput::Text {
                content,
                title,
                format,
            } => Ok(ResolvedInput {
                descriptor: SnapshotDescriptor {
                    kind: SnapshotKind::Text,
                    title: title.unwrap_or_else(|| default_title.to_string()),
                    length: content.chars().count(),
                    format,
                    timestamp: None,
                    source_id: None,
                    version_number: None,
                },
                text: content,
            }),
            ComparisonInput::Document { document_id } => {
                let document = self.viewable_document(&document_id, user_id).await?;
                Ok(ResolvedInput {
                    descriptor: SnapshotDescriptor {
                        kind: SnapshotKind::Document,
                        title: document.title,
                        length: document.content.chars().count(),
                        format: Some(document.format),
                        timestamp: Some(document.updated_at),
                        source_id: Some(document.id),
                        version_number: Some(document.current_version),
                    },
                    text: document.content,
                })
            }
            ComparisonInput::Version {
                document_id,
                version_number,
            } => {
                let document = self.viewable_document(&document_id, user_id).await?;
                let version = self.versions.get_version(&document_id, version_number).await?;
                Ok(Self::version_input(&document, version))
            }
        }
    }

    /// 두 입력을 비교하고 결과를 저장합니다.
    pub async fn compare(
        &self,
        original: ComparisonInput,
        modified: ComparisonInput,
        meta: ComparisonMeta,
        user_id: &str,
    ) -> Result<ComparisonResult, AppError> {
        let original = self.resolve(original, user_id, "Original").await?;
        let modified = self.resolve(modified, user_id, "Modified").await?;
        self.run(original, modified, meta, user_id).await
    }

    /// 같은 문서의 두 버전을 비교합니다. 어느 한쪽이라도 없으면 `NotFound`.
    pub async fn compare_versions(
        &self,
        document_id: &str,
        version_a: i64,
        version_b: i64,
        meta: ComparisonMeta,
        user_id: &str,
    ) -> Result<ComparisonResult, AppError> {
        let document = self.viewable_document(document_id, user_id).await?;
        let a = self.versions.get_version(document_id, version_a).await?;
        let b = self.versions.get_version(document_id, version_b).await?;
        self.run(
            Self::version_input(&document, a),
            Self::version_input(&document, b),
            meta,
            user_id,
        )
        .await
    }

    /// 최신 버전과 그 직전 버전을 비교합니다 (이전 → 최신).
    pub async fn compare_with_previous(
        &self,
        document_id: &str,
        meta: ComparisonMeta,
        user_id: &str,
    ) -> Result<ComparisonResult, AppError> {
        let document = self.viewable_document(document_id, user_id).await?;
        let latest = self.versions.get_latest_version(document_id).await?;
        if latest.version_number < 2 {
            return Err(AppError::Validation(
                "Not enough versions to compare".to_string(),
            ));
        }
        let previous = self
            .versions
            .get_version(document_id, latest.version_number - 1)
            .await?;
        self.run(
            Self::version_input(&document, previous),
            Self::version_input(&document, latest),
            meta,
            user_id,
        )
        .await
    }

    async fn run(
        &self,
        original: ResolvedInput,
        modified: ResolvedInput,
        meta: ComparisonMeta,
        user_id: &str,
    ) -> Result<ComparisonResult, AppError> {
        // 풀 슬롯을 기다리기 전에 크기 가드부터 확인합니다.
        self.limits.check_size(&original.text)?;
        self.limits.check_size(&modified.text)?;

        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Comparison worker pool is closed".to_string()))?;

        let options = meta.options;
        let limits = self.limits;
        let (text_a, text_b) = (original.text, modified.text);
        let started = Instant::now();

        let (views, statistics) = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            compute(&text_a, &text_b, &options, &limits)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Diff task failed: {}", e)))??;

        let result = ComparisonResult {
            id: new_id(),
            user_id: user_id.to_string(),
            original: original.descriptor,
            modified: modified.descriptor,
            views,
            statistics,
            options,
            is_public: meta.is_public,
            tags: clean_tags(meta.tags),
            notes: meta
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at: now_timestamp(),
        };
        self.store.insert_comparison(&result).await?;

        tracing::info!(
            comparison_id = %result.id,
            user_id,
            similarity = result.statistics.similarity,
            total_changes = result.statistics.total_changes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Comparison stored"
        );
        Ok(result)
    }

    /// 저장된 결과를 조회합니다. 없으면 `NotFound`, 비공개이고 권한이 없으면 `Forbidden`.
    pub async fn get_result(&self, id: &str, user_id: &str) -> Result<ComparisonResult, AppError> {
        let result = self
            .store
            .get_comparison(id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !self.authorizer.can_view_comparison(user_id, &result) {
            tracing::warn!(comparison_id = id, user_id, "Comparison access denied");
            return Err(AppError::Forbidden(
                "You do not have access to this comparison".to_string(),
            ));
        }
        Ok(result)
    }

    pub async fn list_history(
        &self,
        user_id: &str,
        options: HistoryOptions,
    ) -> Result<HistoryPage, AppError> {
        let (items, total) = self.store.list_comparisons(user_id, &options).await?;
        Ok(HistoryPage {
            items,
            total,
            limit: options.limit,
            skip: options.skip,
        })
    }

    /// 생성자만 삭제할 수 있습니다 (soft delete).
    pub async fn delete_result(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        let result = self.get_result(id, user_id).await?;
        if result.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the creator can delete a comparison".to_string(),
            ));
        }
        if !self.store.soft_delete_comparison(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(comparison_id = id, user_id, "Comparison deleted");
        Ok(())
    }

    pub async fn report(&self, id: &str, user_id: &str) -> Result<ComparisonReport, AppError> {
        Ok(self.get_result(id, user_id).await?.report())
    }

    pub async fn export(
        &self,
        id: &str,
        format: ExportFormat,
        granularity: Granularity,
        user_id: &str,
    ) -> Result<ExportedFile, AppError> {
        let result = self.get_result(id, user_id).await?;
        export::export_file(&result, format, granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_strips_markup_for_text_comparisons() {
        let options = ComparisonOptions::default();
        let (views, stats) = compute(
            "<p>Payment within <b>30</b> days</p>",
            "<p>Payment within <b>45</b> days</p>",
            &options,
            &DiffLimits::unbounded(),
        )
        .unwrap();
        assert_eq!(diff::reconstruct_original(&views.word.segments), "Payment within 30 days");
        assert_eq!(stats.additions_count, 1);
        assert_eq!(stats.deletions_count, 1);
    }

    #[test]
    fn compute_keeps_markup_for_html_comparisons() {
        let options = ComparisonOptions {
            comparison_type: ComparisonType::Html,
            ..Default::default()
        };
        let (views, _) = compute("<p>a</p>", "<p>a</p>", &options, &DiffLimits::unbounded()).unwrap();
        assert_eq!(views.character.segments[0].content, "<p>a</p>");
    }

    #[test]
    fn compute_rejects_oversized_input() {
        let limits = DiffLimits {
            max_input_bytes: Some(4),
            timeout: None,
        };
        let err = compute("12345", "1", &ComparisonOptions::default(), &limits).unwrap_err();
        assert!(matches!(err, DiffError::TooLarge { .. }));
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = clean_tags(vec![" nda ".into(), "".into(), "nda".into(), "lease".into()]);
        assert_eq!(tags, vec!["nda".to_string(), "lease".to_string()]);
    }
}
