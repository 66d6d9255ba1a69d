//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환 (1:1 상태 코드 매핑)
//! - `DiffError` → `AppError::PayloadTooLarge` 변환: diff 엔진의 크기/시간 가드

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::diff::DiffError;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 비교 관리자(Comparison Manager)가 조회 실패와 권한 거부를 이 타입으로 변환하는 경계입니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면 Axum이 `IntoResponse`로 HTTP 응답을 만듭니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 문서, 버전, 비교 결과를 찾을 수 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 권한 협력자(Authorizer)가 조회/편집을 거부함 (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 잘못된 옵션, 알 수 없는 granularity 등 (HTTP 400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// 지원하지 않는 내보내기 형식 (HTTP 400)
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// 입력이 설정된 크기/시간 가드를 초과함 (HTTP 413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx 함수에서 `?`를 쓰면 자동으로 AppError::Database로 변환됩니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<DiffError> for AppError {
    fn from(err: DiffError) -> Self {
        AppError::PayloadTooLarge(err.to_string())
    }
}

/// 요청 본문 파싱 실패 (알 수 없는 옵션 필드 포함)는 400 Validation으로 통일합니다.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON encoding failed: {}", err))
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, Internal)는 실제 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::UnsupportedFormat(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_format", self.to_string())
            }
            AppError::PayloadTooLarge(ref msg) => {
                tracing::warn!("Payload guard tripped: {}", msg);
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg.clone())
            }
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
        };

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
