//! # SQLite 저장소
//!
//! `documents`, `document_collaborators`, `document_versions`, `comparisons` 테이블에 대한 쿼리입니다.
//!
//! 버전 추가는 하나의 트랜잭션에서 처리합니다:
//! 1. `UPDATE documents ... current_version = current_version + 1 ... RETURNING current_version`
//! 2. 반환된 번호로 `INSERT INTO document_versions`
//!
//! 둘 중 하나라도 실패하면 트랜잭션이 롤백되므로 번호가 비거나 중복되지 않습니다.
//! `UNIQUE(document_id, version_number)` 제약이 마지막 방어선입니다.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use super::{new_id, now_timestamp, Store};
use crate::error::AppError;
use crate::models::*;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// `documents` 테이블 한 행. 협업자 목록은 별도 쿼리로 채웁니다.
#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    owner_id: String,
    title: String,
    content: String,
    format: DocumentFormat,
    status: DocumentStatus,
    current_version: i64,
    is_public: bool,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn into_document(self, collaborators: Vec<Collaborator>) -> Document {
        Document {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            content: self.content,
            format: self.format,
            status: self.status,
            current_version: self.current_version,
            is_public: self.is_public,
            collaborators,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// `comparisons` 테이블 한 행. 구조화된 필드는 JSON 텍스트로 저장됩니다.
#[derive(sqlx::FromRow)]
struct ComparisonRow {
    id: String,
    user_id: String,
    original: String,
    modified: String,
    views: String,
    statistics: String,
    options: String,
    is_public: bool,
    tags: String,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<ComparisonRow> for ComparisonResult {
    type Error = AppError;

    fn try_from(row: ComparisonRow) -> Result<Self, Self::Error> {
        Ok(ComparisonResult {
            id: row.id,
            user_id: row.user_id,
            original: serde_json::from_str(&row.original)?,
            modified: serde_json::from_str(&row.modified)?,
            views: serde_json::from_str(&row.views)?,
            statistics: serde_json::from_str(&row.statistics)?,
            options: serde_json::from_str(&row.options)?,
            is_public: row.is_public,
            tags: serde_json::from_str(&row.tags)?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

/// 이력 목록용 행 (views 제외)
#[derive(sqlx::FromRow)]
struct ComparisonSummaryRow {
    id: String,
    user_id: String,
    original: String,
    modified: String,
    statistics: String,
    options: String,
    is_public: bool,
    tags: String,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<ComparisonSummaryRow> for ComparisonSummary {
    type Error = AppError;

    fn try_from(row: ComparisonSummaryRow) -> Result<Self, Self::Error> {
        Ok(ComparisonSummary {
            id: row.id,
            user_id: row.user_id,
            original: serde_json::from_str(&row.original)?,
            modified: serde_json::from_str(&row.modified)?,
            statistics: serde_json::from_str(&row.statistics)?,
            options: serde_json::from_str(&row.options)?,
            is_public: row.is_public,
            tags: serde_json::from_str(&row.tags)?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

const DOCUMENT_COLUMNS: &str = "id, owner_id, title, content, format, status, current_version, \
     is_public, created_at, updated_at";

const VERSION_COLUMNS: &str = "v.id AS id, v.document_id AS document_id, \
     v.version_number AS version_number, v.content AS content, v.format AS format, \
     v.change_log AS change_log, v.word_count AS word_count, v.char_count AS char_count, \
     v.created_at AS created_at";

/// soft delete된 문서의 버전은 조회 대상에서 빠집니다.
const LIVE_VERSIONS: &str = "document_versions v \
     JOIN documents d ON d.id = v.document_id AND d.deleted_at IS NULL";

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 연결 풀을 만들고 마이그레이션까지 실행합니다. 파일이 없으면 새로 만듭니다.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.into()))
    }

    async fn collaborators(&self, document_id: &str) -> Result<Vec<Collaborator>, AppError> {
        let rows = sqlx::query_as::<_, Collaborator>(
            r#"
            SELECT user_id, role, added_at
            FROM document_collaborators
            WHERE document_id = ?
            ORDER BY added_at, user_id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, new: NewDocument) -> Result<(Document, DocumentVersion), AppError> {
        let id = new_id();
        let now = now_timestamp();
        let first = NewVersion::new(new.content.clone(), new.format, new.change_log.clone());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, title, content, format, status, current_version,
                                   is_public, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.owner_id)
        .bind(&new.title)
        .bind(&new.content)
        .bind(new.format)
        .bind(new.status)
        .bind(new.is_public)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let version = insert_version_row(&mut tx, &id, 1, first, &now).await?;
        tx.commit().await?;

        let document = Document {
            id,
            owner_id: new.owner_id,
            title: new.title,
            content: new.content,
            format: new.format,
            status: new.status,
            current_version: 1,
            is_public: new.is_public,
            collaborators: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };
        Ok((document, version))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let collaborators = self.collaborators(id).await?;
                Ok(Some(row.into_document(collaborators)))
            }
            None => Ok(None),
        }
    }

    async fn update_document(
        &self,
        id: &str,
        changes: &UpdateDocumentRequest,
    ) -> Result<Option<Document>, AppError> {
        // None인 필드는 COALESCE로 기존 값을 유지합니다.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET title = COALESCE(?, title),
                status = COALESCE(?, status),
                is_public = COALESCE(?, is_public),
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(changes.title.as_deref())
        .bind(changes.status)
        .bind(changes.is_public)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_document(id).await
    }

    async fn soft_delete_document(&self, id: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE documents SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now_timestamp())
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_collaborator(
        &self,
        document_id: &str,
        user_id: &str,
        role: CollaboratorRole,
    ) -> Result<Collaborator, AppError> {
        let collaborator = sqlx::query_as::<_, Collaborator>(
            r#"
            INSERT INTO document_collaborators (document_id, user_id, role, added_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (document_id, user_id) DO UPDATE SET role = excluded.role
            RETURNING user_id, role, added_at
            "#,
        )
        .bind(document_id)
        .bind(user_id)
        .bind(role)
        .bind(now_timestamp())
        .fetch_one(&self.pool)
        .await?;

        Ok(collaborator)
    }

    async fn append_version(
        &self,
        document_id: &str,
        version: NewVersion,
    ) -> Result<DocumentVersion, AppError> {
        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        let next: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE documents
            SET current_version = current_version + 1,
                content = ?,
                format = ?,
                updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            RETURNING current_version
            "#,
        )
        .bind(&version.content)
        .bind(version.format)
        .bind(&now)
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?;

        // 문서가 없으면 tx가 drop되면서 롤백됩니다.
        let Some(version_number) = next else {
            return Err(AppError::NotFound);
        };

        let created = insert_version_row(&mut tx, document_id, version_number, version, &now).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn get_version(
        &self,
        document_id: &str,
        version_number: i64,
    ) -> Result<Option<DocumentVersion>, AppError> {
        let version = sqlx::query_as::<_, DocumentVersion>(&format!(
            "SELECT {VERSION_COLUMNS} FROM {LIVE_VERSIONS} WHERE v.document_id = ? AND v.version_number = ?"
        ))
        .bind(document_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(version)
    }

    async fn get_latest_version(&self, document_id: &str) -> Result<Option<DocumentVersion>, AppError> {
        let version = sqlx::query_as::<_, DocumentVersion>(&format!(
            "SELECT {VERSION_COLUMNS} FROM {LIVE_VERSIONS} WHERE v.document_id = ? \
             ORDER BY v.version_number DESC LIMIT 1"
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(version)
    }

    async fn list_versions(&self, document_id: &str) -> Result<Vec<DocumentVersionSummary>, AppError> {
        let versions = sqlx::query_as::<_, DocumentVersionSummary>(&format!(
            r#"
            SELECT v.id AS id, v.document_id AS document_id, v.version_number AS version_number,
                   v.format AS format, v.change_log AS change_log, v.word_count AS word_count,
                   v.char_count AS char_count, v.created_at AS created_at
            FROM {LIVE_VERSIONS}
            WHERE v.document_id = ?
            ORDER BY v.version_number DESC
            "#
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(versions)
    }

    async fn insert_comparison(&self, result: &ComparisonResult) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comparisons (id, user_id, original, modified, views, statistics, options,
                                     similarity, total_changes, is_public, tags, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.id)
        .bind(&result.user_id)
        .bind(serde_json::to_string(&result.original)?)
        .bind(serde_json::to_string(&result.modified)?)
        .bind(serde_json::to_string(&result.views)?)
        .bind(serde_json::to_string(&result.statistics)?)
        .bind(serde_json::to_string(&result.options)?)
        .bind(result.statistics.similarity)
        .bind(result.statistics.total_changes as i64)
        .bind(result.is_public)
        .bind(serde_json::to_string(&result.tags)?)
        .bind(result.notes.as_deref())
        .bind(&result.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_comparison(&self, id: &str) -> Result<Option<ComparisonResult>, AppError> {
        let row = sqlx::query_as::<_, ComparisonRow>(
            r#"
            SELECT id, user_id, original, modified, views, statistics, options,
                   is_public, tags, notes, created_at
            FROM comparisons
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ComparisonResult::try_from).transpose()
    }

    async fn list_comparisons(
        &self,
        user_id: &str,
        options: &HistoryOptions,
    ) -> Result<(Vec<ComparisonSummary>, u64), AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comparisons WHERE user_id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        // 정렬 컬럼과 방향은 열거형에서만 오므로 문자열 조립이 안전합니다.
        let column = match options.sort_by {
            SortBy::CreatedAt => "created_at",
            SortBy::Similarity => "similarity",
            SortBy::TotalChanges => "total_changes",
        };
        let direction = if options.descending { "DESC" } else { "ASC" };

        let rows = sqlx::query_as::<_, ComparisonSummaryRow>(&format!(
            r#"
            SELECT id, user_id, original, modified, statistics, options,
                   is_public, tags, notes, created_at
            FROM comparisons
            WHERE user_id = ? AND deleted_at IS NULL
            ORDER BY {column} {direction}, id {direction}
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(user_id)
        .bind(options.limit)
        .bind(options.skip)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(ComparisonSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total as u64))
    }

    async fn soft_delete_comparison(&self, id: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE comparisons SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now_timestamp())
                .bind(id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

async fn insert_version_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    document_id: &str,
    version_number: i64,
    version: NewVersion,
    created_at: &str,
) -> Result<DocumentVersion, AppError> {
    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO document_versions (id, document_id, version_number, content, format,
                                       change_log, word_count, char_count, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(document_id)
    .bind(version_number)
    .bind(&version.content)
    .bind(version.format)
    .bind(version.change_log.as_deref())
    .bind(version.word_count)
    .bind(version.char_count)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;

    Ok(DocumentVersion {
        id,
        document_id: document_id.to_string(),
        version_number,
        content: version.content,
        format: version.format,
        change_log: version.change_log,
        word_count: version.word_count,
        char_count: version.char_count,
        created_at: created_at.to_string(),
    })
}
