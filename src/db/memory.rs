//! # 메모리 저장소
//!
//! `Store`의 프로세스 내 구현입니다. 테스트와 `DATABASE_URL=memory` 실행에 사용합니다.
//! 모든 변경은 하나의 쓰기 잠금 안에서 끝나므로 버전 추가가 원자적입니다.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{new_id, now_timestamp, Store};
use crate::error::AppError;
use crate::models::*;

#[derive(Default)]
struct Inner {
    documents: HashMap<String, StoredDocument>,
    comparisons: HashMap<String, StoredComparison>,
}

struct StoredDocument {
    document: Document,
    versions: Vec<DocumentVersion>,
    deleted: bool,
}

struct StoredComparison {
    result: ComparisonResult,
    deleted: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn build_version(
    document_id: &str,
    version_number: i64,
    version: NewVersion,
    created_at: &str,
) -> DocumentVersion {
    DocumentVersion {
        id: new_id(),
        document_id: document_id.to_string(),
        version_number,
        content: version.content,
        format: version.format,
        change_log: version.change_log,
        word_count: version.word_count,
        char_count: version.char_count,
        created_at: created_at.to_string(),
    }
}

/// SQLite 구현의 `ORDER BY {column} {direction}, id {direction}`과 같은 순서
/// soft delete되지 않은 문서만 돌려줍니다. 삭제된 문서의 버전도 함께 숨겨집니다.
fn live_document<'a>(inner: &'a Inner, id: &str) -> Option<&'a StoredDocument> {
    inner.documents.get(id).filter(|stored| !stored.deleted)
}

fn compare_summaries(a: &ComparisonResult, b: &ComparisonResult, sort_by: SortBy) -> Ordering {
    let primary = match sort_by {
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::Similarity => a.statistics.similarity.total_cmp(&b.statistics.similarity),
        SortBy::TotalChanges => a.statistics.total_changes.cmp(&b.statistics.total_changes),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_document(&self, new: NewDocument) -> Result<(Document, DocumentVersion), AppError> {
        let id = new_id();
        let now = now_timestamp();
        let first = build_version(
            &id,
            1,
            NewVersion::new(new.content.clone(), new.format, new.change_log),
            &now,
        );
        let document = Document {
            id: id.clone(),
            owner_id: new.owner_id,
            title: new.title,
            content: new.content,
            format: new.format,
            status: new.status,
            current_version: 1,
            is_public: new.is_public,
            collaborators: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        let mut inner = self.inner.write().await;
        inner.documents.insert(
            id,
            StoredDocument {
                document: document.clone(),
                versions: vec![first.clone()],
                deleted: false,
            },
        );
        Ok((document, first))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, AppError> {
        let inner = self.inner.read().await;
        Ok(live_document(&inner, id).map(|stored| stored.document.clone()))
    }

    async fn update_document(
        &self,
        id: &str,
        changes: &UpdateDocumentRequest,
    ) -> Result<Option<Document>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(stored) = inner.documents.get_mut(id).filter(|s| !s.deleted) else {
            return Ok(None);
        };

        let document = &mut stored.document;
        if let Some(title) = &changes.title {
            document.title = title.clone();
        }
        if let Some(status) = changes.status {
            document.status = status;
        }
        if let Some(is_public) = changes.is_public {
            document.is_public = is_public;
        }
        document.updated_at = now_timestamp();
        Ok(Some(document.clone()))
    }

    async fn soft_delete_document(&self, id: &str) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.documents.get_mut(id) {
            Some(stored) if !stored.deleted => {
                stored.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_collaborator(
        &self,
        document_id: &str,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<Collaborator, AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .documents
            .get_mut(document_id)
            .filter(|s| !s.deleted)
            .ok_or(AppError::NotFound)?;

        let collaborators = &mut stored.document.collaborators;
        if let Some(existing) = collaborators.iter_mut().find(|c| c.user_id == user_id) {
            existing.role = role;
            return Ok(existing.clone());
        }
        let collaborator = Collaborator {
            user_id: user_id.to_string(),
            role,
            added_at: now_timestamp(),
        };
        collaborators.push(collaborator.clone());
        Ok(collaborator)
    }

    async fn append_version(
        &self,
        document_id: &str,
        version: NewVersion,
    ) -> Result<DocumentVersion, AppError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .documents
            .get_mut(document_id)
            .filter(|s| !s.deleted)
            .ok_or(AppError::NotFound)?;

        let now = now_timestamp();
        let version_number = stored.document.current_version + 1;
        let created = build_version(document_id, version_number, version, &now);

        stored.document.current_version = version_number;
        stored.document.content = created.content.clone();
        stored.document.format = created.format;
        stored.document.updated_at = now;
        stored.versions.push(created.clone());
        Ok(created)
    }

    async fn get_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> Result<Option<DocumentVersion>, AppError> {
        let inner = self.inner.read().await;
        Ok(live_document(&inner, document_id).and_then(|stored| {
            stored
                .versions
                .iter()
                .find(|v| v.version_number == version_number)
                .cloned()
        }))
    }

    async fn get_latest_version(&self, document_id: &str) -> Result<Option<DocumentVersion>, AppError> {
        let inner = self.inner.read().await;
        Ok(live_document(&inner, document_id).and_then(|stored| stored.versions.last().cloned()))
    }

    async fn list_versions(&self, document_id: &str) -> Result<Vec<DocumentVersionSummary>, AppError> {
        let inner = self.inner.read().await;
        Ok(live_document(&inner, document_id)
            .map(|stored| {
                stored
                    .versions
                    .iter()
                    .rev()
                    .cloned()
                    .map(DocumentVersionSummary::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_comparison(&self, result: &ComparisonResult) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.comparisons.insert(
            result.id.clone(),
            StoredComparison {
                result: result.clone(),
                deleted: false,
            },
        );
        Ok(())
    }

    async fn get_comparison(&self, id: &str) -> Result<Option<ComparisonResult>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .comparisons
            .get(id)
            .filter(|stored| !stored.deleted)
            .map(|stored| stored.result.clone()))
    }

    async fn list_comparisons(
        &self,
        user_id: &str,
        options: &HistoryOptions,
    ) -> Result<(Vec<ComparisonSummary>, u64), AppError> {
        let inner = self.inner.read().await;
        let mut owned: Vec<&ComparisonResult> = inner
            .comparisons
            .values()
            .filter(|stored| !stored.deleted && stored.result.user_id == user_id)
            .map(|stored| &stored.result)
            .collect();

        owned.sort_by(|a, b| {
            let ordering = compare_summaries(a, b, options.sort_by);
            if options.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = owned.len() as u64;
        let items = owned
            .into_iter()
            .skip(options.skip as usize)
            .take(options.limit as usize)
            .map(ComparisonSummary::from)
            .collect();
        Ok((items, total))
    }

    async fn soft_delete_comparison(&self, id: &str) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        match inner.comparisons.get_mut(id) {
            Some(stored) if !stored.deleted => {
                stored.deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
