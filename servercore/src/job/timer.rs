//! 지연 잡 타이머
//!
//! 만기 시각 기준 최소 힙 + 1ms 주기 폴링 스레드. 만기된 잡은 대상
//! 메일박스에 push되어 그 메일박스의 직렬 실행 보장을 그대로 따릅니다.

use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::info;

use super::job::{Job, JobHandle};
use super::serializer::{push_job, JobSerializer};

struct TimerEntry {
    fire_at: Instant,
    seq: u64,
    target: Arc<dyn JobSerializer>,
    job: Job,
}

// 같은 만기 시각은 등록 순서(seq)로 안정화
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

/// 지연 잡 타이머
pub struct JobTimer {
    heap: Mutex<BinaryHeap<TimerEntry>>,
    seq: AtomicU64,
    running: AtomicBool,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl JobTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            running: AtomicBool::new(false),
            poller: Mutex::new(None),
        })
    }

    /// 폴링 스레드를 기동합니다. 중복 호출은 무시됩니다.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let timer = self.clone();
        let handle = std::thread::Builder::new()
            .name("job-timer".into())
            .spawn(move || timer.poll_loop())
            .expect("타이머 스레드 생성 실패");
        *self.poller.lock() = Some(handle);
        info!("JobTimer 시작");
    }

    /// 폴링 스레드를 중지합니다. 미만기 잡은 버려집니다.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self.poller.lock().take() {
            let _ = handle.join();
        }
        self.heap.lock().clear();
        info!("JobTimer 종료");
    }

    /// `delay` 뒤에 `target` 메일박스로 잡을 넘깁니다.
    ///
    /// 만기 시점에 취소된 잡은 메일박스에 push되되 실행은 건너뜁니다.
    pub fn push_after(&self, delay: Duration, target: Arc<dyn JobSerializer>, job: Job) -> JobHandle {
        let handle = job.handle();
        let entry = TimerEntry {
            fire_at: Instant::now() + delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            target,
            job,
        };
        self.heap.lock().push(entry);
        handle
    }

    pub fn pending(&self) -> usize {
        self.heap.lock().len()
    }

    fn poll_loop(&self) {
        while self.running.load(Ordering::Acquire) {
            loop {
                let due = {
                    let mut heap = self.heap.lock();
                    match heap.peek() {
                        Some(entry) if entry.fire_at <= Instant::now() => heap.pop(),
                        _ => None,
                    }
                };
                match due {
                    Some(entry) => push_job(&entry.target, entry.job),
                    None => break,
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::scheduler::JobScheduler;
    use crate::job::serializer::{SerialKind, SerialState};

    struct Alarm {
        state: SerialState,
        fired: Arc<AtomicBool>,
    }

    impl JobSerializer for Alarm {
        fn serial_state(&self) -> &SerialState {
            &self.state
        }
    }

    #[test]
    fn delayed_job_fires_after_deadline() {
        let scheduler = JobScheduler::new();
        scheduler.start(2);
        let timer = JobTimer::new();
        timer.start();

        let fired = Arc::new(AtomicBool::new(false));
        let alarm = Arc::new(Alarm {
            state: SerialState::new(SerialKind("alarm"), 1, scheduler.clone()),
            fired: fired.clone(),
        });

        let flag = alarm.fired.clone();
        let job = Job::new(crate::job::JobPriority::Normal, move |_cx| {
            flag.store(true, Ordering::Release);
        });
        let target: Arc<dyn JobSerializer> = alarm.clone();
        timer.push_after(Duration::from_millis(100), target, job);

        assert!(!fired.load(Ordering::Acquire));
        std::thread::sleep(Duration::from_millis(400));
        assert!(fired.load(Ordering::Acquire));

        timer.stop();
        scheduler.shutdown();
    }

    #[test]
    fn cancelled_job_is_skipped() {
        let scheduler = JobScheduler::new();
        scheduler.start(2);
        let timer = JobTimer::new();
        timer.start();

        let fired = Arc::new(AtomicBool::new(false));
        let alarm = Arc::new(Alarm {
            state: SerialState::new(SerialKind("alarm"), 2, scheduler.clone()),
            fired: fired.clone(),
        });

        let flag = alarm.fired.clone();
        let job = Job::new(crate::job::JobPriority::Normal, move |_cx| {
            flag.store(true, Ordering::Release);
        });
        let target: Arc<dyn JobSerializer> = alarm.clone();
        let handle = timer.push_after(Duration::from_millis(20), target, job);
        handle.cancel();

        std::thread::sleep(Duration::from_millis(120));
        assert!(!fired.load(Ordering::Acquire));

        timer.stop();
        scheduler.shutdown();
    }
}
