//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 서비스 계층은 `Store` 트레이트만 알고 있습니다.
//! 구현체는 두 가지입니다:
//! - `sqlite`: sqlx + SQLite. 운영용, 마이그레이션은 `./migrations`
//! - `memory`: 프로세스 메모리. 테스트와 `DATABASE_URL=memory` 실행용
//!
//! 두 구현체 모두 다음을 보장합니다:
//! - 버전 추가는 원자적입니다. 실패하면 문서도 버전도 바뀌지 않습니다.
//! - 한 문서의 버전 번호는 1부터 빈틈 없이 증가하고 중복되지 않습니다.
//! - soft delete된 문서/비교 결과는 조회되지 않습니다.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use crate::error::AppError;
use crate::models::*;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 저장 시각 형식: `2024-01-01T00:00:00.000Z` (밀리초, UTC)
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

#[async_trait]
pub trait Store: Send + Sync {
    // ── 문서 ──

    /// 문서와 버전 1을 한 번에 만듭니다.
    async fn insert_document(&self, new: NewDocument) -> Result<(Document, DocumentVersion), AppError>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>, AppError>;

    /// 제목/상태/공개 여부만 바꿉니다. 내용 변경은 `append_version`을 거칩니다.
    async fn update_document(
        &self,
        id: &str,
        changes: &UpdateDocumentRequest,
    ) -> Result<Option<Document>, AppError>;

    async fn soft_delete_document(&self, id: &str) -> Result<bool, AppError>;

    /// 이미 있는 협업자면 역할만 갱신합니다.
    async fn upsert_collaborator(
        &self,
        document_id: &str,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<Collaborator, AppError>;

    // ── 버전 ──

    /// 다음 번호로 새 버전을 추가하고 문서의 content/format/current_version을 갱신합니다.
    /// 문서가 없거나 삭제되었으면 `NotFound`.
    async fn append_version(
        &self,
        document_id: &str,
        version: NewVersion,
    ) -> Result<DocumentVersion, AppError>;

    async fn get_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> Result<Option<DocumentVersion>, AppError>;

    async fn get_latest_version(&self, document_id: &str) -> Result<Option<DocumentVersion>, AppError>;

    /// 버전 번호 내림차순 (최신 버전이 먼저)
    async fn list_versions(&self, document_id: &str) -> Result<Vec<DocumentVersionSummary>, AppError>;

    // ── 비교 결과 ──

    async fn insert_comparison(&self, result: &ComparisonResult) -> Result<(), AppError>;

    async fn get_comparison(&self, id: &str) -> Result<Option<ComparisonResult>, AppError>;

    /// 사용자의 비교 이력 한 페이지와 전체 개수
    async fn list_comparisons(
        &self,
        user_id: &str,
        options: &HistoryOptions,
    ) -> Result<(Vec<ComparisonSummary>, u64), AppError>;

    async fn soft_delete_comparison(&self, id: &str) -> Result<bool, AppError>;
}
