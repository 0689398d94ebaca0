//! 서버 환경 설정 모듈
//!
//! .env 파일과 시스템 환경변수에서 설정을 로드하고 관리합니다.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// 게임 서버 설정 구조체
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP 서버 호스트 주소
    pub host: String,
    /// TCP 서버 포트 번호
    pub port: u16,
    /// 잡 워커 스레드 수 (0이면 코어 수 기반 자동 산출)
    pub worker_threads: usize,
}

impl ServerConfig {
    /// 환경변수에서 설정을 로드합니다.
    ///
    /// 로드 순서:
    /// 1. 현재 디렉토리의 .env 파일
    /// 2. 시스템 환경변수
    /// 3. 기본값
    pub fn from_env() -> Result<Self> {
        Self::load_env_file();

        let config = Self {
            host: std::env::var("server_host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("server_port")
                .unwrap_or_else(|_| "7777".to_string())
                .parse()
                .unwrap_or(7777),
            worker_threads: std::env::var("worker_threads")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
        };

        info!("서버 설정 로드 완료: {:?}", config);
        Ok(config)
    }

    /// TCP 서버 바인딩 주소를 반환합니다.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 실제 사용할 워커 스레드 수를 반환합니다.
    ///
    /// 설정값이 0이면 `max(2, cores - 2)`로 산출합니다.
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::cmp::max(2, num_cpus::get().saturating_sub(2))
    }

    fn load_env_file() {
        if Path::new(".env").exists() {
            match dotenv::dotenv() {
                Ok(_) => info!(".env 파일 로드 성공"),
                Err(e) => warn!(".env 파일 로드 실패: {}", e),
            }
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            worker_threads: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_worker_threads() {
        let mut config = ServerConfig::default();
        assert!(config.resolved_worker_threads() >= 2);

        config.worker_threads = 6;
        assert_eq!(config.resolved_worker_threads(), 6);
    }

    #[test]
    fn test_bind_address() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:7777");
    }
}
