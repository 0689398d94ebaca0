//! 잡 단위 정의
//!
//! 메일박스 큐에 적재되는 실행 단위입니다. 클로저와 취소 플래그,
//! 우선순위(기록 전용)를 담습니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::serializer::SerialContext;

/// 잡 우선순위
///
/// 현재 큐는 엄격한 FIFO로 동작하며 이 값은 기록만 됩니다.
/// 호출부 의도를 보존하기 위해 필드는 유지합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPriority {
    Low,
    Normal,
    Critical,
}

type JobFn = Box<dyn FnOnce(&mut SerialContext) + Send + 'static>;

/// 메일박스 실행 단위
///
/// 실행 전 취소만 지원합니다. 실행 중 협조적 취소는 없습니다.
pub struct Job {
    action: Option<JobFn>,
    cancel: Arc<AtomicBool>,
    priority: JobPriority,
}

impl Job {
    pub fn new<F>(priority: JobPriority, action: F) -> Self
    where
        F: FnOnce(&mut SerialContext) + Send + 'static,
    {
        Self {
            action: Some(Box::new(action)),
            cancel: Arc::new(AtomicBool::new(false)),
            priority,
        }
    }

    /// 실행 전 취소에 사용할 핸들을 반환합니다.
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            cancel: self.cancel.clone(),
        }
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    /// 잡을 실행합니다. 취소된 잡은 건너뜁니다.
    pub(crate) fn run(mut self, cx: &mut SerialContext) {
        if self.cancel.load(Ordering::Acquire) {
            return;
        }
        if let Some(action) = self.action.take() {
            action(cx);
        }
    }
}

/// 잡 취소 핸들
///
/// 대상 잡이 아직 실행되지 않았다면 실행을 건너뛰게 합니다.
#[derive(Clone)]
pub struct JobHandle {
    cancel: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}
