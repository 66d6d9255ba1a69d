//! 비교 관리자 흐름을 SQLite와 메모리 저장소 양쪽에서 확인합니다.

use std::sync::Arc;

use lexdiff::db::{MemoryStore, SqliteStore, Store};
use lexdiff::error::AppError;
use lexdiff::models::*;
use lexdiff::services::authz::CollaboratorPolicy;
use lexdiff::services::comparison::ComparisonService;
use lexdiff::services::diff::DiffLimits;
use lexdiff::services::versioning::VersionStore;
use sqlx::sqlite::SqlitePoolOptions;

async fn sqlite_store() -> Arc<dyn Store> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteStore::new(pool);
    store.migrate().await.unwrap();
    Arc::new(store)
}

fn service(store: Arc<dyn Store>) -> (ComparisonService, Arc<VersionStore>) {
    let versions = Arc::new(VersionStore::new(store.clone()));
    let service = ComparisonService::new(
        store,
        versions.clone(),
        Arc::new(CollaboratorPolicy),
        DiffLimits::unbounded(),
        2,
    );
    (service, versions)
}

fn text(content: &str) -> ComparisonInput {
    ComparisonInput::Text {
        content: content.to_string(),
        title: None,
        format: None,
    }
}

async fn history_sorts_and_pages(store: Arc<dyn Store>) {
    let (service, _) = service(store);
    for (a, b) in [("a b c d", "a x c d"), ("a b c d", "a b c d"), ("a b c d", "w x y z")] {
        service
            .compare(text(a), text(b), ComparisonMeta::default(), "alice")
            .await
            .unwrap();
    }
    service
        .compare(text("x"), text("y"), ComparisonMeta::default(), "bob")
        .await
        .unwrap();

    let page = service
        .list_history(
            "alice",
            HistoryOptions {
                sort_by: SortBy::Similarity,
                descending: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let similarities: Vec<f64> = page.items.iter().map(|i| i.statistics.similarity).collect();
    assert_eq!(similarities, vec![100.0, 75.0, 0.0]);

    let page = service
        .list_history(
            "alice",
            HistoryOptions {
                limit: 1,
                skip: 1,
                sort_by: SortBy::TotalChanges,
                descending: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].statistics.total_changes, 2);
}

async fn stored_result_round_trips(store: Arc<dyn Store>) {
    let (service, _) = service(store);
    let meta = ComparisonMeta {
        options: ComparisonOptions {
            ignore_whitespace: true,
            ..Default::default()
        },
        is_public: false,
        tags: vec!["lease".into()],
        notes: Some("  annual renewal  ".into()),
    };
    let created = service
        .compare(text("Rent  is due."), text("Rent is due!"), meta, "alice")
        .await
        .unwrap();
    assert_eq!(created.notes.as_deref(), Some("annual renewal"));

    let loaded = service.get_result(&created.id, "alice").await.unwrap();
    assert_eq!(loaded, created);

    assert!(matches!(
        service.get_result(&created.id, "bob").await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        service.delete_result(&created.id, "bob").await,
        Err(AppError::Forbidden(_))
    ));

    service.delete_result(&created.id, "alice").await.unwrap();
    assert!(matches!(
        service.get_result(&created.id, "alice").await,
        Err(AppError::NotFound)
    ));
    assert_eq!(
        service
            .list_history("alice", HistoryOptions::default())
            .await
            .unwrap()
            .total,
        0
    );
}

async fn previous_version_flow(store: Arc<dyn Store>) {
    let (document, _) = store
        .insert_document(NewDocument {
            owner_id: "alice".into(),
            title: "Share Purchase Agreement".into(),
            content: "The price is ten dollars.".into(),
            format: DocumentFormat::Plain,
            status: DocumentStatus::Draft,
            is_public: false,
            change_log: Some("Initial version".into()),
        })
        .await
        .unwrap();
    let (service, versions) = service(store);

    let err = service
        .compare_with_previous(&document.id, ComparisonMeta::default(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m == "Not enough versions to compare"));

    versions
        .create_version(
            &document.id,
            "The price is twelve dollars.".into(),
            DocumentFormat::Plain,
            None,
        )
        .await
        .unwrap();

    let result = service
        .compare_with_previous(&document.id, ComparisonMeta::default(), "alice")
        .await
        .unwrap();
    assert_eq!(result.original.version_number, Some(1));
    assert_eq!(result.modified.version_number, Some(2));
    assert_eq!(result.statistics.additions_count, 1);
    assert_eq!(result.statistics.deletions_count, 1);

    assert!(matches!(
        service
            .compare_with_previous(&document.id, ComparisonMeta::default(), "mallory")
            .await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        service
            .compare_versions(&document.id, 1, 3, ComparisonMeta::default(), "alice")
            .await,
        Err(AppError::NotFound)
    ));
}

async fn appended_sentence_flow(store: Arc<dyn Store>) {
    let (document, _) = store
        .insert_document(NewDocument {
            owner_id: "alice".into(),
            title: "Supply Agreement".into(),
            content: "The price is ten dollars.".into(),
            format: DocumentFormat::Plain,
            status: DocumentStatus::Draft,
            is_public: false,
            change_log: None,
        })
        .await
        .unwrap();
    let (service, versions) = service(store);
    versions
        .create_version(
            &document.id,
            "The price is ten dollars. Payment is due on signing.".into(),
            DocumentFormat::Plain,
            Some("Add payment terms".into()),
        )
        .await
        .unwrap();

    let result = service
        .compare_versions(&document.id, 1, 2, ComparisonMeta::default(), "alice")
        .await
        .unwrap();
    let sentence = &result.views.sentence;
    assert_eq!(sentence.granularity, Granularity::Sentence);

    let added: Vec<&str> = sentence
        .segments
        .iter()
        .filter(|s| s.operation == Operation::Add)
        .map(|s| s.content.as_str())
        .collect();
    assert_eq!(added, vec![" Payment is due on signing."]);
    assert!(sentence.segments.iter().all(|s| s.operation != Operation::Remove));
    assert_eq!(sentence.segments[0].operation, Operation::Equal);
    assert_eq!(sentence.segments[0].content, "The price is ten dollars.");
}

#[tokio::test]
async fn sqlite_history() {
    history_sorts_and_pages(sqlite_store().await).await;
}

#[tokio::test]
async fn memory_history() {
    history_sorts_and_pages(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn sqlite_round_trip() {
    stored_result_round_trips(sqlite_store().await).await;
}

#[tokio::test]
async fn memory_round_trip() {
    stored_result_round_trips(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn sqlite_previous_version() {
    previous_version_flow(sqlite_store().await).await;
}

#[tokio::test]
async fn memory_previous_version() {
    previous_version_flow(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn guard_trips_become_payload_too_large() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let versions = Arc::new(VersionStore::new(store.clone()));
    let service = ComparisonService::new(
        store,
        versions,
        Arc::new(CollaboratorPolicy),
        DiffLimits {
            max_input_bytes: Some(8),
            timeout: None,
        },
        1,
    );
    let err = service
        .compare(
            text("short"),
            text("definitely longer than eight bytes"),
            ComparisonMeta::default(),
            "alice",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge(_)));
}

#[tokio::test]
async fn sqlite_appended_sentence() {
    appended_sentence_flow(sqlite_store().await).await;
}

#[tokio::test]
async fn memory_appended_sentence() {
    appended_sentence_flow(Arc::new(MemoryStore::new())).await;
}
