//! 메일박스 소유 공유 참조
//!
//! 값의 부착/탈착은 지정된 종류의 메일박스 문맥에서만 허용하고,
//! 복제 스냅샷(`try_capture`)은 어디서든 허용하는 단일 슬롯입니다.
//! 세션이 "지금 속한 존" 참조를 들고 다니는 용도입니다.

use parking_lot::Mutex;
use tracing::error;

use super::serializer::{SerialContext, SerialKind};

/// 메일박스 소유 단일 슬롯
pub struct SerializedRef<T: Clone + Send> {
    slot: Mutex<Option<T>>,
    owner_kind: SerialKind,
}

impl<T: Clone + Send> SerializedRef<T> {
    /// `owner_kind` 종류의 메일박스만 부착/탈착할 수 있는 빈 슬롯을 만듭니다.
    pub fn new(owner_kind: SerialKind) -> Self {
        Self {
            slot: Mutex::new(None),
            owner_kind,
        }
    }

    /// 올바른 메일박스 문맥에서 빈 슬롯에만 부착을 허용합니다.
    ///
    /// 종류 불일치나 이중 부착은 수명주기 버그이므로 디버그 빌드에서는
    /// 즉시 패닉하고, 릴리스에서는 로그 후 `false`를 돌려줍니다.
    pub fn try_attach(&self, cx: &SerialContext, value: T) -> bool {
        if cx.owner().kind != self.owner_kind {
            error!(
                expected = self.owner_kind.0,
                actual = cx.owner().kind.0,
                "SerializedRef 부착: 메일박스 종류 불일치"
            );
            #[cfg(debug_assertions)]
            panic!("SerializedRef 부착: 메일박스 종류 불일치");
            #[cfg(not(debug_assertions))]
            return false;
        }
        let mut slot = self.slot.lock();
        if slot.is_some() {
            error!(kind = self.owner_kind.0, "SerializedRef 이중 부착");
            #[cfg(debug_assertions)]
            panic!("SerializedRef 이중 부착");
            #[cfg(not(debug_assertions))]
            return false;
        }
        *slot = Some(value);
        true
    }

    /// 올바른 메일박스 문맥에서 값을 비우고 돌려줍니다.
    ///
    /// 빈 슬롯 탈착은 이중 해제 버그이므로 부착과 같은 규칙으로
    /// 디버그 빌드에서는 즉시 패닉하고, 릴리스에서는 로그 후 `None`.
    pub fn try_detach(&self, cx: &SerialContext) -> Option<T> {
        if cx.owner().kind != self.owner_kind {
            error!(
                expected = self.owner_kind.0,
                actual = cx.owner().kind.0,
                "SerializedRef 탈착: 메일박스 종류 불일치"
            );
            #[cfg(debug_assertions)]
            panic!("SerializedRef 탈착: 메일박스 종류 불일치");
            #[cfg(not(debug_assertions))]
            return None;
        }
        let value = self.slot.lock().take();
        if value.is_none() {
            error!(kind = self.owner_kind.0, "SerializedRef 빈 슬롯 탈착");
            #[cfg(debug_assertions)]
            panic!("SerializedRef 빈 슬롯 탈착");
        }
        value
    }

    /// 현재 값의 복제 스냅샷. 어느 스레드에서든 호출할 수 있습니다.
    pub fn try_capture(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().is_some()
    }
}
