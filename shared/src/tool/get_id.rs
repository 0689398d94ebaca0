//! 런타임 ID 생성 유틸리티

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// 프로세스 내에서 유일한 런타임 ID를 발급합니다.
///
/// 세션, 존 등 액터 식별에 사용합니다. 0은 "할당되지 않음"으로 예약됩니다.
pub fn next_runtime_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_nonzero() {
        let a = next_runtime_id();
        let b = next_runtime_id();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }
}
