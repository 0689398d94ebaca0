//! 로깅 시스템 초기화 모듈
//!
//! tracing 기반 구조화 로깅을 서비스 시작 시 한 번 초기화합니다.
//! RUST_LOG 환경변수로 레벨을 제어합니다 (기본: info).

use tracing_subscriber::{fmt, EnvFilter};

/// 로깅 시스템을 초기화합니다.
///
/// 중복 초기화는 무시됩니다 (테스트에서 여러 번 호출 가능).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .try_init();
}
