//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 URL, 또는 `memory` (메모리 저장소)
//! - `JWT_SECRET`: Bearer 토큰 검증에 사용할 비밀키
//! - `HOST` / `PORT`: 서버 바인딩 주소
//! - `MAX_COMPARE_INPUT_BYTES`: 비교 입력 하나의 최대 크기 (바이트)
//! - `DIFF_TIMEOUT_MS`: 비교 한 건의 diff 시간 예산 (밀리초)
//! - `COMPARE_WORKERS`: 동시에 실행되는 diff 계산 수

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::diff::DiffLimits;

pub const DEFAULT_MAX_COMPARE_INPUT_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_DIFF_TIMEOUT_MS: u64 = 5_000;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// 예: "sqlite:data/lexdiff.db?mode=rwc" 또는 "memory"
    pub database_url: String,
    pub jwt_secret: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    pub max_compare_input_bytes: usize,
    pub diff_timeout_ms: u64,
    /// 기본값: 사용 가능한 CPU 병렬도
    pub compare_workers: usize,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있고, 숫자로 파싱할 수 없는 값도 기본값으로 대체합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Self::from_lookup(|key| env::var(key))
    }

    /// 환경변수 조회 함수를 주입받는 버전 (테스트용으로 분리)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, env::VarError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        Ok(Self {
            database_url: lookup("DATABASE_URL")?,
            jwt_secret: lookup("JWT_SECRET")?,
            host: lookup("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT").unwrap_or(3000),
            max_compare_input_bytes: parse_var(&lookup, "MAX_COMPARE_INPUT_BYTES")
                .unwrap_or(DEFAULT_MAX_COMPARE_INPUT_BYTES),
            diff_timeout_ms: parse_var(&lookup, "DIFF_TIMEOUT_MS").unwrap_or(DEFAULT_DIFF_TIMEOUT_MS),
            compare_workers: parse_var(&lookup, "COMPARE_WORKERS")
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(default_workers),
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.eq_ignore_ascii_case("memory")
    }

    pub fn diff_limits(&self) -> DiffLimits {
        DiffLimits {
            max_input_bytes: Some(self.max_compare_input_bytes),
            timeout: Some(Duration::from_millis(self.diff_timeout_ms)),
        }
    }
}

/// 값이 없거나 파싱할 수 없으면 None
fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    lookup(key).ok().and_then(|v| v.trim().parse().ok())
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Result<String, env::VarError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_when_optional_values_missing_or_invalid() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "memory"),
            ("JWT_SECRET", "secret"),
            ("PORT", "not-a-port"),
            ("COMPARE_WORKERS", "0"),
        ]))
        .unwrap();

        assert!(config.uses_memory_store());
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_compare_input_bytes, DEFAULT_MAX_COMPARE_INPUT_BYTES);
        assert_eq!(config.diff_timeout_ms, DEFAULT_DIFF_TIMEOUT_MS);
        assert!(config.compare_workers >= 1);
    }

    #[test]
    fn guard_values_flow_into_diff_limits() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "secret"),
            ("MAX_COMPARE_INPUT_BYTES", "1024"),
            ("DIFF_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        let limits = config.diff_limits();
        assert_eq!(limits.max_input_bytes, Some(1024));
        assert_eq!(limits.timeout, Some(Duration::from_millis(250)));
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("DATABASE_URL", "memory")]));
        assert!(result.is_err());
    }
}
