//! # lexdiff
//!
//! 법률 문서의 버전 계보를 관리하고, 두 스냅샷 사이의 diff를
//! character / word / line / sentence 단위로 계산해 통계와 내보내기를 제공하는 백엔드입니다.
//!
//! 바이너리(`main.rs`)는 설정과 저장소를 고른 뒤 `build_router`로 만든 라우터를 서빙합니다.
//! 통합 테스트도 같은 `build_router`를 서버 없이 호출합니다.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

pub use routes::AppState;
use routes::*;

/// 모든 API 라우트를 `/api/v1` 아래에 묶고 CORS, 본문 크기 제한, 요청 로깅을 붙입니다.
pub fn build_router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    let document_routes = Router::new()
        .route("/documents", post(create_document))
        .route(
            "/documents/{id}",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route(
            "/documents/{id}/content",
            put(update_document_content),
        )
        .route("/documents/{id}/collaborators", post(add_collaborator))
        .route(
            "/documents/{id}/versions",
            get(list_document_versions).post(create_document_version),
        )
        .route("/documents/{id}/versions/latest", get(get_latest_version))
        .route("/documents/{id}/versions/{number}", get(get_document_version))
        .route("/documents/{id}/compare-previous", post(compare_with_previous));

    let comparison_routes = Router::new()
        .route("/compare", post(compare))
        .route("/compare/versions", post(compare_versions))
        .route("/compare/history", get(comparison_history))
        .route(
            "/compare/{id}",
            get(get_comparison).delete(delete_comparison),
        )
        .route("/compare/{id}/report", get(comparison_report))
        .route("/compare/{id}/export/{format}", get(export_comparison));

    let api_routes = Router::new()
        .merge(document_routes)
        .merge(comparison_routes)
        .route("/health", get(health_check))
        .with_state(state);

    // 개발 환경 기준으로 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
