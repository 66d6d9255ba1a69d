//! # 문서(Document) 모델 정의
//!
//! 사용자가 시간에 따라 편집하는 논리적 문서와 협업자(collaborator) 구조체입니다.
//! 문서의 `content`는 항상 최신 버전의 내용과 같고, 편집할 때마다
//! 새 `DocumentVersion`이 추가됩니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// 문서 내용의 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Html,
    Markdown,
    Plain,
}

/// 문서 상태. 참고용이며 상태 전이 규칙은 강제하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Review,
    Final,
    Archived,
}

/// 협업자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CollaboratorRole {
    #[default]
    Viewer,
    Editor,
    Owner,
}

impl CollaboratorRole {
    /// editor와 owner 역할은 문서를 편집할 수 있습니다.
    pub fn can_edit(self) -> bool {
        matches!(self, CollaboratorRole::Editor | CollaboratorRole::Owner)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentFormat::Html => "html",
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Plain => "plain",
        };
        f.write_str(s)
    }
}

impl FromStr for DocumentFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(DocumentFormat::Html),
            "markdown" => Ok(DocumentFormat::Markdown),
            "plain" => Ok(DocumentFormat::Plain),
            other => Err(AppError::Validation(format!("Unknown document format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Collaborator {
    pub user_id: String,
    pub role: CollaboratorRole,
    pub added_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub format: DocumentFormat,
    pub status: DocumentStatus,
    /// 최신 버전 번호 (1 이상)
    pub current_version: i64,
    pub is_public: bool,
    pub collaborators: Vec<Collaborator>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn collaborator_role(&self, user_id: &str) -> Option<CollaboratorRole> {
        self.collaborators
            .iter()
            .find(|c| c.user_id == user_id)
            .map(|c| c.role)
    }
}

/// 저장소에 넘기는 새 문서 데이터. ID와 타임스탬프는 저장소가 채웁니다.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub format: DocumentFormat,
    pub status: DocumentStatus,
    pub is_public: bool,
    pub change_log: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    pub format: Option<DocumentFormat>,
    pub status: Option<DocumentStatus>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub status: Option<DocumentStatus>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub content: String,
    pub format: Option<DocumentFormat>,
    pub change_log: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    pub user_id: String,
    #[serde(default)]
    pub role: CollaboratorRole,
}
