//! # 문서(Document) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST   /api/v1/documents`                    → 새 문서 생성 (버전 1 포함)
//! - `GET    /api/v1/documents/{id}`               → 단일 문서 조회
//! - `PATCH  /api/v1/documents/{id}`               → 제목/상태/공개 여부 수정
//! - `DELETE /api/v1/documents/{id}`               → 문서 삭제 (soft delete, 소유자만)
//! - `PUT    /api/v1/documents/{id}/content`       → 내용 편집 (바뀌었을 때만 새 버전)
//! - `POST   /api/v1/documents/{id}/collaborators` → 협업자 추가/역할 변경 (소유자만)
//!
//! 권한 확인은 모두 `DocumentService` 안에서 이루어집니다.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::{AppJson, AppState};
use crate::{error::AppError, middleware::auth::AuthUser, models::*};

/// `POST /documents`: 201과 함께 `{ "document", "version" }`을 반환합니다.
pub async fn create_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppJson(req): AppJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (document, version) = state.documents.create(&auth_user.user_id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "document": document, "version": version })),
    ))
}

pub async fn get_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Document>, AppError> {
    let document = state.documents.get(&id, &auth_user.user_id).await?;
    Ok(Json(document))
}

/// `PATCH /documents/{id}`: 요청에 포함된 필드만 바꿉니다.
pub async fn update_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateDocumentRequest>,
) -> Result<Json<Document>, AppError> {
    let document = state
        .documents
        .update(&id, &auth_user.user_id, req)
        .await?;
    Ok(Json(document))
}

pub async fn delete_document(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.documents.delete(&id, &auth_user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /documents/{id}/content`: 내용이 같으면 `version`은 null입니다.
pub async fn update_document_content(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateContentRequest>,
) -> Result<Json<Value>, AppError> {
    let (document, version) = state
        .documents
        .update_content(&id, &auth_user.user_id, req)
        .await?;
    Ok(Json(json!({ "document": document, "version": version })))
}

pub async fn add_collaborator(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<AddCollaboratorRequest>,
) -> Result<(StatusCode, Json<Collaborator>), AppError> {
    let collaborator = state
        .documents
        .add_collaborator(&id, &auth_user.user_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(collaborator)))
}
