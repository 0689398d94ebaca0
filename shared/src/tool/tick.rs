//! 밀리초 틱 시계

use once_cell::sync::Lazy;
use std::time::Instant;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// 프로세스 시작 기준 경과 밀리초를 반환합니다.
///
/// 타이머 잡의 실행 시각 계산 등 단조 증가 시계가 필요한 곳에 사용합니다.
pub fn tick_ms() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}
