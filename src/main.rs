//! # lexdiff 서버 진입점
//!
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 설정 로딩
//! 4. 저장소 선택 (SQLite 또는 메모리)
//! 5. 애플리케이션 상태 생성
//! 6. 라우터 생성과 HTTP 서버 시작

use std::sync::Arc;

use anyhow::Result;
use lexdiff::{
    build_router,
    config::Config,
    db::{MemoryStore, SqliteStore, Store},
    services::authz::CollaboratorPolicy,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SQLite 연결 풀 크기
const MAX_DB_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 계속 진행합니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅 초기화 ──
    // RUST_LOG가 없으면 lexdiff, tower_http, axum을 debug 레벨로 출력합니다.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexdiff=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting lexdiff server on {}:{}", config.host, config.port);

    // ── 4단계: 저장소 선택 ──
    // DATABASE_URL=memory 이면 프로세스 메모리에만 보관합니다.
    let store: Arc<dyn Store> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Connecting to {} and running migrations...", config.database_url);
        Arc::new(SqliteStore::connect(&config.database_url, MAX_DB_CONNECTIONS).await?)
    };

    // ── 5단계: 애플리케이션 상태 생성 ──
    let limits = config.diff_limits();
    tracing::info!(
        max_input_bytes = ?limits.max_input_bytes,
        timeout = ?limits.timeout,
        workers = config.compare_workers,
        "Diff limits configured"
    );
    let state = AppState::new(
        store,
        Arc::new(CollaboratorPolicy),
        limits,
        config.compare_workers,
        config.jwt_secret.clone(),
    );

    // ── 6단계: 라우터 생성과 서버 시작 ──
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
