//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `document`: 문서(Document)와 협업자 관련 구조체
//! - `version`: 불변 스냅샷(DocumentVersion) 구조체
//! - `comparison`: diff 세그먼트, 통계, 비교 결과(ComparisonResult) 구조체
//!
//! `pub use X::*;`로 재공개하여 `crate::models::Document`처럼 짧게 접근합니다.

pub mod comparison;
pub mod document;
pub mod version;

pub use comparison::*;
pub use document::*;
pub use version::*;
