//! 세션 매니저: 런타임 ID → 세션 레지스트리

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::session::session::{Session, SessionHandler};

pub struct SessionManager<H: SessionHandler> {
    sessions: DashMap<u64, Arc<Session<H>>>,
}

impl<H: SessionHandler> SessionManager<H> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
        })
    }

    pub fn insert(&self, session: Arc<Session<H>>) {
        self.sessions.insert(session.runtime_id(), session);
    }

    pub fn remove(&self, runtime_id: u64) -> Option<Arc<Session<H>>> {
        self.sessions.remove(&runtime_id).map(|(_, s)| s)
    }

    pub fn find(&self, runtime_id: u64) -> Option<Arc<Session<H>>> {
        self.sessions.get(&runtime_id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 전체 세션을 끊습니다 (서버 종료 경로).
    pub fn kick_all(&self, reason: &str) {
        let all: Vec<Arc<Session<H>>> = self
            .sessions
            .iter()
            .map(|e| e.value().clone())
            .collect();
        info!(count = all.len(), "전체 세션 종료");
        for session in all {
            session.flush_and_disconnect(reason);
        }
        self.sessions.clear();
    }
}
