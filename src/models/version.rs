use serde::{Deserialize, Serialize};

use super::DocumentFormat;

/// 불변 스냅샷. 생성된 뒤에는 내용과 버전 번호가 바뀌지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentVersion {
    pub id: String,
    pub document_id: String,
    pub version_number: i64,
    pub content: String,
    pub format: DocumentFormat,
    pub change_log: Option<String>,
    pub word_count: i64,
    pub char_count: i64,
    pub created_at: String,
}

/// 목록 조회용 요약. 크기를 줄이기 위해 content를 생략합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentVersionSummary {
    pub id: String,
    pub document_id: String,
    pub version_number: i64,
    pub format: DocumentFormat,
    pub change_log: Option<String>,
    pub word_count: i64,
    pub char_count: i64,
    pub created_at: String,
}

impl From<DocumentVersion> for DocumentVersionSummary {
    fn from(version: DocumentVersion) -> Self {
        Self {
            id: version.id,
            document_id: version.document_id,
            version_number: version.version_number,
            format: version.format,
            change_log: version.change_log,
            word_count: version.word_count,
            char_count: version.char_count,
            created_at: version.created_at,
        }
    }
}

/// 저장소에 넘기는 새 버전 데이터. 번호, ID, 타임스탬프는 저장소가 채웁니다.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub content: String,
    pub format: DocumentFormat,
    pub change_log: Option<String>,
    pub word_count: i64,
    pub char_count: i64,
}

impl NewVersion {
    pub fn new(content: String, format: DocumentFormat, change_log: Option<String>) -> Self {
        Self {
            word_count: count_words(&content) as i64,
            char_count: count_chars(&content) as i64,
            content,
            format,
            change_log,
        }
    }
}

/// 공백으로 나눈 단어 수
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 유니코드 문자 수 (`.len()`은 바이트 수이므로 한글 등에 부적합)
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}

#[derive(Debug, Deserialize)]
pub struct CreateVersionRequest {
    pub content: String,
    pub format: Option<DocumentFormat>,
    pub change_log: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_version_counts_words_and_chars() {
        let version = NewVersion::new("계약 조건  v2\n".to_string(), DocumentFormat::Plain, None);
        assert_eq!(version.word_count, 3);
        assert_eq!(version.char_count, 10);
    }
}
