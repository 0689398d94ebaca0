//! 잡 스케줄러 (워커 풀)
//!
//! 준비된 메일박스를 공유 인입 채널에서 꺼내 실행하는 고정 스레드 집합입니다.
//! 전역 싱글턴이 아니라 명시적으로 생성하여 각 메일박스 생성자에 주입합니다.

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

use super::serializer::{execute, JobSerializer};

enum WorkerMessage {
    Run(Arc<dyn JobSerializer>),
    Shutdown,
}

/// 워커 풀
///
/// 메일박스는 `scheduled == 1`인 동안에만 채널에 들어 있으므로
/// 한 메일박스가 두 워커에서 동시에 실행되는 일은 없습니다.
pub struct JobScheduler {
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    worker_count: AtomicUsize,
}

impl JobScheduler {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = unbounded();
        Arc::new(Self {
            tx,
            rx,
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            worker_count: AtomicUsize::new(0),
        })
    }

    /// 기본 워커 수: `max(2, cores - 2)`
    pub fn default_thread_count() -> usize {
        std::cmp::max(2, num_cpus::get().saturating_sub(2))
    }

    /// 워커 스레드를 기동합니다. 중복 호출은 무시됩니다.
    pub fn start(self: &Arc<Self>, threads: usize) {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("JobScheduler.start 중복 호출 무시");
            return;
        }

        let mut workers = self.workers.lock();
        for i in 0..threads {
            let rx = self.rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("job-worker-{i}"))
                .spawn(move || worker_main(rx))
                .expect("워커 스레드 생성 실패");
            workers.push(handle);
        }
        self.worker_count.store(threads, Ordering::Release);
        info!("JobScheduler 시작: 워커 {}개", threads);
    }

    /// 준비된 메일박스를 인입 채널에 넘깁니다.
    ///
    /// 메일박스의 scheduled CAS를 이긴 쪽에서만 호출됩니다 (crate 내부 전용).
    pub(crate) fn register(&self, target: Arc<dyn JobSerializer>) {
        let _ = self.tx.send(WorkerMessage::Run(target));
    }

    /// 워커를 모두 중지하고 합류합니다.
    pub fn shutdown(&self) {
        let count = self.worker_count.swap(0, Ordering::AcqRel);
        for _ in 0..count {
            let _ = self.tx.send(WorkerMessage::Shutdown);
        }
        let workers = {
            let mut guard = self.workers.lock();
            std::mem::take(&mut *guard)
        };
        for handle in workers {
            let _ = handle.join();
        }
        info!("JobScheduler 종료 완료");
    }
}

fn worker_main(rx: Receiver<WorkerMessage>) {
    while let Ok(message) = rx.recv() {
        match message {
            WorkerMessage::Run(target) => execute(&target),
            WorkerMessage::Shutdown => break,
        }
    }
}
