//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! 핸들러는 요청을 서비스 호출로 바꾸고, 서비스의 `AppError`를 그대로 응답으로 돌려줍니다.
//!
//! 각 하위 모듈:
//! - `comparisons`: 비교, 이력, 리포트, 내보내기
//! - `documents`: 문서 CRUD와 협업자
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `versions`: 버전 목록/조회/생성

pub mod comparisons;
pub mod documents;
pub mod health;
pub mod versions;

pub use comparisons::*;
pub use documents::*;
pub use health::*;
pub use versions::*;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};

use crate::db::Store;
use crate::error::AppError;
use crate::services::authz::Authorizer;
use crate::services::comparison::ComparisonService;
use crate::services::diff::DiffLimits;
use crate::services::documents::DocumentService;
use crate::services::versioning::VersionStore;

const BODY_SLACK_BYTES: usize = 64 * 1024;
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 서비스는 `Arc`로 감싸져 있어 clone해도 실제 객체가 복제되지 않습니다.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<DocumentService>,
    pub comparisons: Arc<ComparisonService>,
    /// Bearer 토큰 검증용 비밀키
    pub jwt_secret: String,
    /// 요청 본문 최대 크기. 비교 요청은 입력 두 개를 담으므로 입력 한도의 두 배에 여유를 더합니다.
    pub max_body_bytes: usize,
}

impl AppState {
    /// 저장소와 권한 정책으로 서비스 그래프를 조립합니다.
    pub fn new(
        store: Arc<dyn Store>,
        authorizer: Arc<dyn Authorizer>,
        limits: DiffLimits,
        compare_workers: usize,
        jwt_secret: String,
    ) -> Self {
        let versions = Arc::new(VersionStore::new(store.clone()));
        let max_body_bytes = limits
            .max_input_bytes
            .map_or(DEFAULT_MAX_BODY_BYTES, |bytes| {
                bytes.saturating_mul(2).saturating_add(BODY_SLACK_BYTES)
            });
        Self {
            documents: Arc::new(DocumentService::new(
                store.clone(),
                versions.clone(),
                authorizer.clone(),
            )),
            comparisons: Arc::new(ComparisonService::new(
                store,
                versions,
                authorizer,
                limits,
                compare_workers,
            )),
            jwt_secret,
            max_body_bytes,
        }
    }
}

/// `Json` 추출기와 같지만 실패를 `AppError::Validation`(400)으로 돌려줍니다.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` 추출기와 같지만 실패를 `AppError::Validation`(400)으로 돌려줍니다.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
