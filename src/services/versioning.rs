//! # 버전 저장소 (Version Store)
//!
//! 문서별 불변 스냅샷 계보를 관리합니다.
//!
//! 같은 문서에 대한 `create_version` 호출은 문서별 비동기 뮤텍스로 직렬화되고,
//! 그 안에서 저장소의 원자적 증가(`Store::append_version`)가 번호를 배정합니다.
//! 다른 문서끼리는 서로 기다리지 않습니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as AsyncMutex;

use crate::db::Store;
use crate::error::AppError;
use crate::models::{DocumentFormat, DocumentVersion, DocumentVersionSummary, NewVersion};

/// 문서별 잠금에 대한 참여 표시. 대기 중에 future가 취소되어도
/// drop 시점에 더 이상 아무도 쓰지 않는 잠금을 맵에서 제거합니다.
struct LockSlot<'a> {
    locks: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    document_id: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for LockSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // 맵과 이 슬롯만 참조하고 있으면 마지막 참여자입니다.
        let last = locks
            .get(self.document_id)
            .is_some_and(|l| Arc::ptr_eq(l, &self.lock) && Arc::strong_count(l) == 2);
        if last {
            locks.remove(self.document_id);
        }
    }
}

pub struct VersionStore {
    store: Arc<dyn Store>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl VersionStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn slot<'a>(&'a self, document_id: &'a str) -> LockSlot<'a> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        LockSlot {
            locks: &self.locks,
            document_id,
            lock,
        }
    }

    /// 다음 버전 번호로 새 스냅샷을 만들고 문서의 최신 내용을 갱신합니다.
    /// 문서가 없으면 `NotFound`이며, 실패 시 아무것도 기록되지 않습니다.
    pub async fn create_version(
        &self,
        document_id: &str,
        content: String,
        format: DocumentFormat,
        change_log: Option<String>,
    ) -> Result<DocumentVersion, AppError> {
        let slot = self.slot(document_id);
        let result = {
            let _guard = slot.lock.lock().await;
            self.store
                .append_version(document_id, NewVersion::new(content, format, change_log))
                .await
        };
        drop(slot);

        match &result {
            Ok(version) => tracing::info!(
                document_id,
                version = version.version_number,
                words = version.word_count,
                "Created document version"
            ),
            Err(err) => tracing::warn!(document_id, error = %err, "Version creation failed"),
        }
        result
    }

    pub async fn get_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> Result<DocumentVersion, AppError> {
        self.store
            .get_version(document_id, version_number)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_latest_version(&self, document_id: &str) -> Result<DocumentVersion, AppError> {
        self.store
            .get_latest_version(document_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// 최신 버전이 먼저 오는 목록. 모든 문서에는 버전 1이 있으므로 빈 목록은 `NotFound`입니다.
    pub async fn list_versions(&self, document_id: &str) -> Result<Vec<DocumentVersionSummary>, AppError> {
        let versions = self.store.list_versions(document_id).await?;
        if versions.is_empty() {
            return Err(AppError::NotFound);
        }
        Ok(versions)
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{DocumentStatus, NewDocument};

    async fn seeded() -> (VersionStore, String) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (doc, _) = store
            .insert_document(NewDocument {
                owner_id: "owner".into(),
                title: "Lease".into(),
                content: "v1".into(),
                format: DocumentFormat::Plain,
                status: DocumentStatus::Draft,
                is_public: false,
                change_log: Some("Initial version".into()),
            })
            .await
            .unwrap();
        (VersionStore::new(store), doc.id)
    }

    #[tokio::test]
    async fn versions_increment_from_one() {
        let (versions, id) = seeded().await;
        let v2 = versions
            .create_version(&id, "v2".into(), DocumentFormat::Plain, None)
            .await
            .unwrap();
        assert_eq!(v2.version_number, 2);

        let latest = versions.get_latest_version(&id).await.unwrap();
        assert_eq!(latest.content, "v2");

        let listed: Vec<i64> = versions
            .list_versions(&id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(listed, vec![2, 1]);
    }

    #[tokio::test]
    async fn missing_document_or_version_is_not_found() {
        let (versions, id) = seeded().await;
        assert!(matches!(
            versions.get_version(&id, 7).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            versions
                .create_version("nope", "x".into(), DocumentFormat::Plain, None)
                .await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            versions.list_versions("nope").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn cancelled_waiter_releases_its_lock_entry() {
        let (versions, id) = seeded().await;
        let holder = versions.slot(&id);
        let guard = holder.lock.lock().await;

        let waiting = versions.create_version(&id, "v2".into(), DocumentFormat::Plain, None);
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), waiting).await;
        assert!(timed_out.is_err());
        assert_eq!(versions.tracked_locks(), 1);

        drop(guard);
        drop(holder);
        assert_eq!(versions.tracked_locks(), 0);

        let latest = versions.get_latest_version(&id).await.unwrap();
        assert_eq!(latest.version_number, 1);
    }

    #[tokio::test]
    async fn lock_entries_are_released() {
        let (versions, id) = seeded().await;
        versions
            .create_version(&id, "v2".into(), DocumentFormat::Plain, None)
            .await
            .unwrap();
        assert_eq!(versions.tracked_locks(), 0);
    }
}
