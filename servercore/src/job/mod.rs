//! 잡 실행 계층: 메일박스, 워커 풀, 지연 타이머, 메일박스 소유 참조

mod job;
mod queue;
mod scheduler;
mod serialized_ref;
mod serializer;
mod timer;

pub use job::{Job, JobHandle, JobPriority};
pub use queue::JobQueue;
pub use scheduler::JobScheduler;
pub use serialized_ref::SerializedRef;
pub use serializer::{
    push_job, JobSerializer, JobSerializerExt, SerialContext, SerialKind, SerialOwner, SerialState,
};
pub use timer::JobTimer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        state: SerialState,
        value: AtomicUsize,
        max_inside: AtomicUsize,
        inside: AtomicUsize,
        post_flushes: AtomicUsize,
    }

    impl Counter {
        fn new(scheduler: Arc<JobScheduler>, id: u64) -> Arc<Self> {
            Arc::new(Self {
                state: SerialState::new(SerialKind("counter"), id, scheduler),
                value: AtomicUsize::new(0),
                max_inside: AtomicUsize::new(0),
                inside: AtomicUsize::new(0),
                post_flushes: AtomicUsize::new(0),
            })
        }
    }

    impl JobSerializer for Counter {
        fn serial_state(&self) -> &SerialState {
            &self.state
        }

        fn on_post_flush(&self, _cx: &mut SerialContext) {
            self.post_flushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn jobs_run_in_push_order() {
        let scheduler = JobScheduler::new();
        scheduler.start(1);
        let counter = Counter::new(scheduler.clone(), 1);

        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..100usize {
            let order = order.clone();
            counter.push_fn(move |_cx| order.lock().push(i));
        }

        for _ in 0..200 {
            if order.lock().len() == 100 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let seen = order.lock().clone();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
        scheduler.shutdown();
    }

    #[test]
    fn concurrent_pushers_never_overlap_execution() {
        let scheduler = JobScheduler::new();
        scheduler.start(4);
        let counter = Counter::new(scheduler.clone(), 2);

        let mut pushers = Vec::new();
        for _ in 0..3 {
            let counter = counter.clone();
            pushers.push(std::thread::spawn(move || {
                for _ in 0..1000usize {
                    let me = counter.clone();
                    counter.push_fn(move |_cx| {
                        let now = me.inside.fetch_add(1, Ordering::SeqCst) + 1;
                        me.max_inside.fetch_max(now, Ordering::SeqCst);
                        me.value.fetch_add(1, Ordering::SeqCst);
                        me.inside.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            }));
        }
        for p in pushers {
            p.join().unwrap();
        }

        // 큐 소진 대기
        for _ in 0..200 {
            if counter.value.load(Ordering::SeqCst) == 3000 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert_eq!(counter.value.load(Ordering::SeqCst), 3000);
        assert_eq!(counter.max_inside.load(Ordering::SeqCst), 1);
        assert!(counter.post_flushes.load(Ordering::SeqCst) >= 1);
        scheduler.shutdown();
    }

    #[test]
    fn cancelled_job_does_not_run() {
        let scheduler = JobScheduler::new();
        scheduler.start(1);
        let counter = Counter::new(scheduler.clone(), 3);

        // 워커가 대기 중 블록하도록 먼저 긴 잡을 넣고 그 뒤의 잡을 취소
        let gate = Arc::new(AtomicUsize::new(0));
        let g = gate.clone();
        counter.push_fn(move |_cx| {
            while g.load(Ordering::Acquire) == 0 {
                std::thread::yield_now();
            }
        });
        let me = counter.clone();
        let handle = counter.push_fn(move |_cx| {
            me.value.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();
        gate.store(1, Ordering::Release);

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(counter.value.load(Ordering::SeqCst), 0);
        scheduler.shutdown();
    }

    #[test]
    fn serialized_ref_attach_detach_capture() {
        let scheduler = JobScheduler::new();
        scheduler.start(1);
        let counter = Counter::new(scheduler.clone(), 4);
        let slot: Arc<SerializedRef<u32>> = Arc::new(SerializedRef::new(SerialKind("counter")));

        let s = slot.clone();
        counter.push_fn(move |cx| {
            assert!(s.try_attach(cx, 7));
        });
        for _ in 0..200 {
            if slot.is_attached() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(slot.try_capture(), Some(7));

        let s = slot.clone();
        counter.push_fn(move |cx| {
            assert_eq!(s.try_detach(cx), Some(7));
        });
        for _ in 0..200 {
            if !slot.is_attached() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(slot.try_capture(), None);
        scheduler.shutdown();
    }
}
