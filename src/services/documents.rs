//! # 문서 서비스
//!
//! 문서 생성/조회/수정/삭제와 협업자 관리, 그리고 권한이 확인된 버전 조작을 담당합니다.
//! 내용이 바뀌는 모든 경로는 `VersionStore::create_version`을 거칩니다.

use std::sync::Arc;

use crate::db::Store;
use crate::error::AppError;
use crate::models::*;
use crate::services::authz::Authorizer;
use crate::services::versioning::VersionStore;

const DEFAULT_TITLE: &str = "Untitled Document";
const INITIAL_CHANGE_LOG: &str = "Initial version";
const UPDATE_CHANGE_LOG: &str = "Updated document";

pub struct DocumentService {
    store: Arc<dyn Store>,
    versions: Arc<VersionStore>,
    authorizer: Arc<dyn Authorizer>,
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

impl DocumentService {
    pub fn new(
        store: Arc<dyn Store>,
        versions: Arc<VersionStore>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            store,
            versions,
            authorizer,
        }
    }

    async fn load(&self, id: &str) -> Result<Document, AppError> {
        self.store.get_document(id).await?.ok_or(AppError::NotFound)
    }

    async fn load_viewable(&self, id: &str, user_id: &str) -> Result<Document, AppError> {
        let document = self.load(id).await?;
        if !self.authorizer.can_view_document(user_id, &document) {
            tracing::warn!(document_id = id, user_id, "Document view denied");
            return Err(AppError::Forbidden(
                "You do not have access to this document".to_string(),
            ));
        }
        Ok(document)
    }

    async fn load_editable(&self, id: &str, user_id: &str) -> Result<Document, AppError> {
        let document = self.load(id).await?;
        if !self.authorizer.can_edit_document(user_id, &document) {
            tracing::warn!(document_id = id, user_id, "Document edit denied");
            return Err(AppError::Forbidden(
                "You do not have permission to edit this document".to_string(),
            ));
        }
        Ok(document)
    }

    async fn load_owned(&self, id: &str, user_id: &str) -> Result<Document, AppError> {
        let document = self.load(id).await?;
        if document.owner_id != user_id {
            tracing::warn!(document_id = id, user_id, "Owner-only action denied");
            return Err(AppError::Forbidden(
                "Only the owner can perform this action".to_string(),
            ));
        }
        Ok(document)
    }

    /// 문서와 버전 1("Initial version")을 함께 만듭니다.
    pub async fn create(
        &self,
        owner_id: &str,
        req: CreateDocumentRequest,
    ) -> Result<(Document, DocumentVersion), AppError> {
        let title = match req.title.as_deref() {
            Some(title) => validate_title(title)?,
            None => DEFAULT_TITLE.to_string(),
        };

        let (document, version) = self
            .store
            .insert_document(NewDocument {
                owner_id: owner_id.to_string(),
                title,
                content: req.content,
                format: req.format.unwrap_or_default(),
                status: req.status.unwrap_or_default(),
                is_public: req.is_public.unwrap_or(false),
                change_log: Some(INITIAL_CHANGE_LOG.to_string()),
            })
            .await?;

        tracing::info!(document_id = %document.id, owner_id, "Document created");
        Ok((document, version))
    }

    pub async fn get(&self, id: &str, user_id: &str) -> Result<Document, AppError> {
        self.load_viewable(id, user_id).await
    }

    /// 제목/상태/공개 여부 변경. 공개 여부는 소유자만 바꿀 수 있습니다.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        mut changes: UpdateDocumentRequest,
    ) -> Result<Document, AppError> {
        let document = self.load_editable(id, user_id).await?;
        if changes.is_public.is_some() && document.owner_id != user_id {
            return Err(AppError::Forbidden(
                "Only the owner can change visibility".to_string(),
            ));
        }
        if let Some(title) = changes.title.take() {
            changes.title = Some(validate_title(&title)?);
        }

        self.store
            .update_document(id, &changes)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// 내용 편집. 내용이나 형식이 실제로 바뀐 경우에만 새 버전을 만듭니다.
    pub async fn update_content(
        &self,
        id: &str,
        user_id: &str,
        req: UpdateContentRequest,
    ) -> Result<(Document, Option<DocumentVersion>), AppError> {
        let document = self.load_editable(id, user_id).await?;
        let format = req.format.unwrap_or(document.format);

        if req.content == document.content && format == document.format {
            tracing::debug!(document_id = id, "Content unchanged; no version created");
            return Ok((document, None));
        }

        let version = self
            .versions
            .create_version(
                id,
                req.content,
                format,
                Some(req.change_log.unwrap_or_else(|| UPDATE_CHANGE_LOG.to_string())),
            )
            .await?;
        let document = self.load(id).await?;
        Ok((document, Some(version)))
    }

    /// 소유자만 삭제할 수 있습니다 (soft delete). 버전 기록은 남습니다.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), AppError> {
        self.load_owned(id, user_id).await?;
        if !self.store.soft_delete_document(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(document_id = id, user_id, "Document deleted");
        Ok(())
    }

    pub async fn add_collaborator(
        &self,
        id: &str,
        user_id: &str,
        req: AddCollaboratorRequest,
    ) -> Result<Collaborator, AppError> {
        let document = self.load_owned(id, user_id).await?;
        let collaborator_id = req.user_id.trim();
        if collaborator_id.is_empty() {
            return Err(AppError::Validation("user_id must not be empty".to_string()));
        }
        if collaborator_id == document.owner_id {
            return Err(AppError::Validation(
                "The owner cannot be added as a collaborator".to_string(),
            ));
        }

        let collaborator = self
            .store
            .upsert_collaborator(id, collaborator_id, req.role)
            .await?;
        tracing::info!(document_id = id, collaborator = collaborator_id, role = ?req.role, "Collaborator added");
        Ok(collaborator)
    }

    // ── 버전 ──

    /// 명시적 버전 생성. 내용이 같아도 새 스냅샷을 남깁니다.
    pub async fn create_version(
        &self,
        id: &str,
        user_id: &str,
        req: CreateVersionRequest,
    ) -> Result<DocumentVersion, AppError> {
        let document = self.load_editable(id, user_id).await?;
        self.versions
            .create_version(
                id,
                req.content,
                req.format.unwrap_or(document.format),
                req.change_log,
            )
            .await
    }

    pub async fn list_versions(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Vec<DocumentVersionSummary>, AppError> {
        self.load_viewable(id, user_id).await?;
        self.versions.list_versions(id).await
    }

    pub async fn get_version(
        &self,
        id: &str,
        version_number: i64,
        user_id: &str,
    ) -> Result<DocumentVersion, AppError> {
        self.load_viewable(id, user_id).await?;
        self.versions.get_version(id, version_number).await
    }

    pub async fn get_latest_version(&self, id: &str, user_id: &str) -> Result<DocumentVersion, AppError> {
        self.load_viewable(id, user_id).await?;
        self.versions.get_latest_version(id).await
    }
}
