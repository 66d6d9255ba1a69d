//! # 미들웨어
//!
//! - `auth`: Bearer JWT를 검증해 요청자(`AuthUser`)를 추출하는 Extractor

pub mod auth;
