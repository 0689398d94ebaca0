//! 메일박스 (잡 직렬화기)
//!
//! 액터(연결, 존, DB 샤드)마다 하나씩 두는 FIFO 잡 큐 + 스케줄 플래그입니다.
//!
//! # 보장
//! - 한 메일박스의 잡은 enqueue 성공 순서대로, 서로 겹치지 않게 실행됩니다.
//!   `on_post_flush` 역시 잡과 겹치지 않습니다.
//! - 메일박스 간 실행 순서는 보장하지 않습니다.
//!
//! # 스케줄 규약
//! `push`는 enqueue 후 `scheduled` 플래그를 CAS(0→1)하고, 이긴 쪽만
//! 메일박스를 스케줄러 인입 채널에 넘깁니다. `execute`는 큐를 비우고
//! 플래그를 내린 뒤, 비우는 동안 새 잡이 들어왔으면 재등록합니다.
//! 이 재등록이 lost-wakeup 레이스를 닫습니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::job::{Job, JobHandle, JobPriority};
use super::queue::JobQueue;
use super::scheduler::JobScheduler;

/// 메일박스 소유자 종류 태그
///
/// `SerializedRef`의 소유자 검사는 이 태그로 이루어집니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialKind(pub &'static str);

/// 메일박스 소유자 식별자 (종류 + 런타임 ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOwner {
    pub kind: SerialKind,
    pub id: u64,
}

/// 메일박스 실행 문맥 (능력 토큰)
///
/// 실행기만 생성할 수 있으며, 잡과 `on_post_flush`에 전달됩니다.
/// "지금 이 메일박스 안에서 실행 중"임을 증명해야 하는 호출은
/// 스레드 로컬 추론 대신 이 토큰을 명시적으로 받습니다.
pub struct SerialContext {
    owner: SerialOwner,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl SerialContext {
    pub(crate) fn new(owner: SerialOwner) -> Self {
        Self {
            owner,
            _not_send: std::marker::PhantomData,
        }
    }

    pub fn owner(&self) -> SerialOwner {
        self.owner
    }
}

/// 메일박스 공유 상태
///
/// 액터 구조체가 하나씩 소유합니다. 스케줄러는 생성 시 주입합니다.
pub struct SerialState {
    queue: JobQueue,
    scheduled: AtomicBool,
    owner: SerialOwner,
    scheduler: Arc<JobScheduler>,
}

impl SerialState {
    pub fn new(kind: SerialKind, id: u64, scheduler: Arc<JobScheduler>) -> Self {
        Self {
            queue: JobQueue::new(),
            scheduled: AtomicBool::new(false),
            owner: SerialOwner { kind, id },
            scheduler,
        }
    }

    pub fn owner(&self) -> SerialOwner {
        self.owner
    }

    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }
}

/// 메일박스 액터 인터페이스
///
/// 액터 구조체는 `SerialState`를 내장하고 이 트레이트를 구현합니다.
/// `on_post_flush`는 배치 플러시(예: 브로드캐스트 일괄 전송) 용도의
/// 오버라이드 훅이며, 같은 메일박스의 잡과 절대 겹치지 않습니다.
pub trait JobSerializer: Send + Sync + 'static {
    fn serial_state(&self) -> &SerialState;

    fn on_post_flush(&self, _cx: &mut SerialContext) {}
}

/// enqueue + 스케줄 등록. `Arc<dyn JobSerializer>` 대상의 단일 구현입니다.
pub fn push_job(target: &Arc<dyn JobSerializer>, job: Job) {
    let state = target.serial_state();
    state.queue.push(job);
    register_if_idle(target);
}

fn register_if_idle(target: &Arc<dyn JobSerializer>) {
    let state = target.serial_state();
    if state
        .scheduled
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        state.scheduler.register(target.clone());
    }
}

/// 메일박스 실행 (워커 전용)
///
/// `scheduled == 1`인 동안에만 인입 채널에 존재하므로 두 워커가 같은
/// 메일박스를 동시에 실행하는 일은 없습니다.
pub(crate) fn execute(target: &Arc<dyn JobSerializer>) {
    let state = target.serial_state();
    let mut cx = SerialContext::new(state.owner);

    state.queue.flush(&mut cx);
    target.on_post_flush(&mut cx);

    state.scheduled.store(false, Ordering::Release);

    // 비우는 동안 도착한 잡 처리: 재등록으로 lost-wakeup 차단
    if !state.queue.is_empty() {
        register_if_idle(target);
    }
}

/// 구체 액터 타입용 push 편의 메서드
pub trait JobSerializerExt: JobSerializer + Sized {
    fn push(self: &Arc<Self>, job: Job) {
        let target: Arc<dyn JobSerializer> = self.clone();
        push_job(&target, job);
    }

    /// 클로저를 Normal 우선순위 잡으로 적재하고 취소 핸들을 돌려줍니다.
    fn push_fn<F>(self: &Arc<Self>, action: F) -> JobHandle
    where
        F: FnOnce(&mut SerialContext) + Send + 'static,
    {
        self.push_with_priority(JobPriority::Normal, action)
    }

    fn push_with_priority<F>(self: &Arc<Self>, priority: JobPriority, action: F) -> JobHandle
    where
        F: FnOnce(&mut SerialContext) + Send + 'static,
    {
        let job = Job::new(priority, action);
        let handle = job.handle();
        self.push(job);
        handle
    }
}

impl<T: JobSerializer> JobSerializerExt for T {}
