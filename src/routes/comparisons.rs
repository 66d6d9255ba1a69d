//! # 비교(Comparison) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `POST   /api/v1/compare`                          → 두 입력 비교
//! - `POST   /api/v1/compare/versions`                 → 같은 문서의 두 버전 비교
//! - `POST   /api/v1/documents/{id}/compare-previous`  → 최신 버전과 직전 버전 비교
//! - `GET    /api/v1/compare/history`                  → 내 비교 이력 (페이지)
//! - `GET    /api/v1/compare/{id}`                     → 비교 결과 조회
//! - `DELETE /api/v1/compare/{id}`                     → 비교 결과 삭제 (soft delete)
//! - `GET    /api/v1/compare/{id}/report`              → 요약 리포트
//! - `GET    /api/v1/compare/{id}/export/{format}`     → json / html / csv 내보내기 (`?granularity=`)

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{AppJson, AppQuery, AppState};
use crate::{
    error::AppError, middleware::auth::AuthUser, models::*, services::export::ExportFormat,
};

pub async fn compare(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppJson(req): AppJson<CompareRequest>,
) -> Result<(StatusCode, Json<ComparisonResult>), AppError> {
    let result = state
        .comparisons
        .compare(req.original, req.modified, req.meta, &auth_user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn compare_versions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppJson(req): AppJson<CompareVersionsRequest>,
) -> Result<(StatusCode, Json<ComparisonResult>), AppError> {
    let result = state
        .comparisons
        .compare_versions(
            &req.document_id,
            req.version_a,
            req.version_b,
            req.meta,
            &auth_user.user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// 본문은 선택입니다. 비어 있으면 기본 옵션으로 비교합니다.
pub async fn compare_with_previous(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ComparisonResult>), AppError> {
    let meta: ComparisonMeta = if body.iter().all(u8::is_ascii_whitespace) {
        ComparisonMeta::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };

    let result = state
        .comparisons
        .compare_with_previous(&id, meta, &auth_user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn comparison_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<Json<HistoryPage>, AppError> {
    let options = HistoryOptions::try_from(query)?;
    let page = state
        .comparisons
        .list_history(&auth_user.user_id, options)
        .await?;
    Ok(Json(page))
}

pub async fn get_comparison(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ComparisonResult>, AppError> {
    let result = state
        .comparisons
        .get_result(&id, &auth_user.user_id)
        .await?;
    Ok(Json(result))
}

pub async fn delete_comparison(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state
        .comparisons
        .delete_result(&id, &auth_user.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn comparison_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ComparisonReport>, AppError> {
    let report = state.comparisons.report(&id, &auth_user.user_id).await?;
    Ok(Json(report))
}

/// 첨부 파일로 내려줍니다. 본문이 멱등이므로 ETag가 같으면 304를 돌려줍니다.
/// `?granularity=`로 HTML/CSV에 쓸 뷰를 고를 수 있습니다 (기본 word).
pub async fn export_comparison(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((id, format)): Path<(String, String)>,
    AppQuery(query): AppQuery<ExportQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let format: ExportFormat = format.parse()?;
    let granularity = query.granularity()?;
    let file = state
        .comparisons
        .export(&id, format, granularity, &auth_user.user_id)
        .await?;

    let etag = format!("\"{}\"", file.etag);
    let etag_value = HeaderValue::from_str(&etag)
        .map_err(|e| AppError::Internal(format!("Invalid ETag header: {}", e)))?;

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag));
    if not_modified {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response());
    }

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.filename))
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition header: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static(file.format.content_type()),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (header::ETAG, etag_value),
        ],
        file.body,
    )
        .into_response())
}
