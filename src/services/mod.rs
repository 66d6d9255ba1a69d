//! # 서비스 계층
//!
//! 라우트 핸들러와 저장소 사이의 비즈니스 로직입니다.
//!
//! - `normalize`: 비교 전 마크업 제거 (text 비교 방식)
//! - `diff`: granularity별 토큰화와 Myers diff
//! - `stats`: diff 뷰 → 변경 수와 유사도
//! - `export`: JSON / HTML / CSV 렌더링
//! - `versioning`: 문서별 버전 계보 (원자적 번호 배정)
//! - `comparison`: 비교 조율, 저장, 이력, 리포트
//! - `documents`: 문서 수명 주기와 협업자
//! - `authz`: 조회/편집 권한 정책

pub mod authz;
pub mod comparison;
pub mod diff;
pub mod documents;
pub mod export;
pub mod normalize;
pub mod stats;
pub mod versioning;
