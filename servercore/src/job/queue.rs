//! 잡 큐
//!
//! 락 없는 FIFO 큐입니다. flush 중 개별 잡의 패닉은 격리하여 로깅하므로
//! 잡 하나가 실패해도 같은 배치의 나머지 잡과 워커 스레드는 살아남습니다.

use crossbeam_queue::SegQueue;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

use super::job::Job;
use super::serializer::SerialContext;

pub struct JobQueue {
    queue: SegQueue<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    pub fn push(&self, job: Job) {
        self.queue.push(job);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// 큐를 비울 때까지 잡을 순서대로 실행합니다.
    pub(crate) fn flush(&self, cx: &mut SerialContext) {
        while let Some(job) = self.queue.pop() {
            let result = catch_unwind(AssertUnwindSafe(|| job.run(cx)));
            if let Err(panic) = result {
                let msg = panic_message(&panic);
                error!(owner = ?cx.owner(), "잡 실행 중 패닉 발생: {}", msg);
            }
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
