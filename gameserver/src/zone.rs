//! 존: 세션들이 모이는 브로드캐스트 액터
//!
//! 상태 변경은 전부 존 메일박스 잡으로만 일어나고, 같은 배치에서 쌓인
//! 브로드캐스트 프레임은 `on_post_flush`에서 세션별 한 번의 플러시로
//! 내보냅니다.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use servercore::job::{
    JobScheduler, JobSerializer, SerialContext, SerialKind, SerialState,
};
use servercore::packet;
use servercore::session::Session;

use crate::client::ClientHandler;
use crate::protocol::{SChat, SNotice};

pub const ZONE_KIND: SerialKind = SerialKind("zone");

struct ZoneInner {
    sessions: HashMap<u64, Arc<Session<ClientHandler>>>,
    pending: Vec<Bytes>,
}

pub struct Zone {
    state: SerialState,
    inner: Mutex<ZoneInner>,
}

impl Zone {
    pub fn new(id: u64, scheduler: Arc<JobScheduler>) -> Arc<Self> {
        Arc::new(Self {
            state: SerialState::new(ZONE_KIND, id, scheduler),
            inner: Mutex::new(ZoneInner {
                sessions: HashMap::new(),
                pending: Vec::new(),
            }),
        })
    }

    /// 세션을 존에 넣고 세션 쪽 존 참조를 부착합니다. 존 잡에서만 호출.
    ///
    /// 입장 잡이 돌기 전에 끊긴 세션은 넣지 않습니다. 입장 이후의 끊김은
    /// 같은 메일박스에 뒤이어 쌓이는 퇴장 잡이 정리합니다.
    pub fn enter(self: &Arc<Self>, cx: &SerialContext, session: Arc<Session<ClientHandler>>) {
        let id = session.runtime_id();
        if session.is_disconnected() {
            info!(zone = self.state.owner().id, id, "끊긴 세션의 존 입장 생략");
            return;
        }
        if !session.handler().zone_ref().try_attach(cx, self.clone()) {
            warn!(id, "존 입장 실패: 이미 다른 존에 속함");
            return;
        }
        self.inner.lock().sessions.insert(id, session);
        info!(zone = self.state.owner().id, id, "존 입장");
    }

    /// 세션을 존에서 빼고 존 참조를 떼어냅니다. 존 잡에서만 호출.
    pub fn leave(&self, cx: &SerialContext, session: &Arc<Session<ClientHandler>>) {
        let id = session.runtime_id();
        if self.inner.lock().sessions.remove(&id).is_some() {
            session.handler().zone_ref().try_detach(cx);
            info!(zone = self.state.owner().id, id, "존 퇴장");
        }
    }

    /// 채팅을 존 전체 브로드캐스트로 쌓습니다. 존 잡에서만 호출.
    pub fn queue_chat(&self, _cx: &SerialContext, sender_id: u64, message: String) {
        match packet::encode(&SChat { sender_id, message }) {
            Ok(frame) => self.inner.lock().pending.push(frame),
            Err(e) => warn!(sender_id, error = %e, "채팅 부호화 실패"),
        }
    }

    /// 공지를 존 전체 브로드캐스트로 쌓습니다. 존 잡에서만 호출.
    pub fn queue_notice(&self, _cx: &SerialContext, message: String) {
        match packet::encode(&SNotice { message }) {
            Ok(frame) => self.inner.lock().pending.push(frame),
            Err(e) => warn!(error = %e, "공지 부호화 실패"),
        }
    }

    pub fn population(&self) -> usize {
        self.inner.lock().sessions.len()
    }
}

impl JobSerializer for Zone {
    fn serial_state(&self) -> &SerialState {
        &self.state
    }

    /// 이번 배치에서 쌓인 프레임을 세션마다 한 번의 플러시로 내보냅니다.
    fn on_post_flush(&self, _cx: &mut SerialContext) {
        let (frames, targets) = {
            let mut inner = self.inner.lock();
            if inner.pending.is_empty() {
                return;
            }
            let frames = std::mem::take(&mut inner.pending);
            let targets: Vec<_> = inner.sessions.values().cloned().collect();
            (frames, targets)
        };
        for session in targets {
            session.send_batch(frames.iter().cloned());
            session.send_flush();
        }
    }
}
