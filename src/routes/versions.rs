//! # 버전 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET  /api/v1/documents/{id}/versions`         → 버전 목록 (최신순, content 생략)
//! - `POST /api/v1/documents/{id}/versions`         → 명시적 버전 생성
//! - `GET  /api/v1/documents/{id}/versions/latest`  → 최신 버전
//! - `GET  /api/v1/documents/{id}/versions/{n}`     → 특정 버전

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use super::{AppJson, AppState};
use crate::{error::AppError, middleware::auth::AuthUser, models::*};

pub async fn list_document_versions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let versions = state
        .documents
        .list_versions(&id, &auth_user.user_id)
        .await?;
    Ok(Json(json!({ "versions": versions })))
}

pub async fn create_document_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<CreateVersionRequest>,
) -> Result<(StatusCode, Json<DocumentVersion>), AppError> {
    let version = state
        .documents
        .create_version(&id, &auth_user.user_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn get_latest_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DocumentVersion>, AppError> {
    let version = state
        .documents
        .get_latest_version(&id, &auth_user.user_id)
        .await?;
    Ok(Json(version))
}

/// 버전 번호가 정수가 아니면 400입니다.
pub async fn get_document_version(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, number)): Path<(String, String)>,
) -> Result<Json<DocumentVersion>, AppError> {
    let version_number: i64 = number
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid version number: {}", number)))?;

    let version = state
        .documents
        .get_version(&id, version_number, &auth_user.user_id)
        .await?;
    Ok(Json(version))
}
