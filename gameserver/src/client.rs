//! 클라이언트 세션 핸들러
//!
//! 핸드셰이크가 끝나기 전에는 C_HANDSHAKE_SYN 외의 패킷을 거부합니다.
//! 게임 로직은 전부 존 메일박스 잡으로 넘기고, 소켓 태스크에서는
//! 디코딩까지만 수행합니다.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use servercore::cipher::AppSide;
use servercore::packet;
use servercore::job::{
    Job, JobPriority, JobSerializer, JobSerializerExt, JobTimer, SerializedRef,
};
use servercore::session::{NetRuntime, Session, SessionHandler, SessionManager};

use crate::protocol::{self, CChat, SHandshakeSynAck, SNotice};
use crate::zone::{Zone, ZONE_KIND};

const WELCOME_DELAY: Duration = Duration::from_secs(3);

pub struct ClientHandler {
    zone: Arc<Zone>,
    zone_ref: SerializedRef<Arc<Zone>>,
    manager: Arc<SessionManager<ClientHandler>>,
    timer: Arc<JobTimer>,
}

impl ClientHandler {
    pub fn new(
        zone: Arc<Zone>,
        manager: Arc<SessionManager<ClientHandler>>,
        timer: Arc<JobTimer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            zone,
            zone_ref: SerializedRef::new(ZONE_KIND),
            manager,
            timer,
        })
    }

    pub fn zone_ref(&self) -> &SerializedRef<Arc<Zone>> {
        &self.zone_ref
    }

    /// 핸들러와 세션을 함께 만들어 매니저에 등록합니다 (리스너 팩토리용).
    pub fn spawn_session(
        zone: Arc<Zone>,
        manager: Arc<SessionManager<ClientHandler>>,
        timer: Arc<JobTimer>,
        net: Arc<NetRuntime>,
    ) -> Arc<Session<ClientHandler>> {
        let handler = Self::new(zone, manager.clone(), timer);
        let session = Session::new(shared::next_runtime_id(), AppSide::Server, handler, net);
        manager.insert(session.clone());
        session
    }

    fn on_handshake(&self, session: &Arc<Session<Self>>) {
        if session.is_cipher_enabled() {
            session.flush_and_disconnect("중복 핸드셰이크");
            return;
        }
        let seed: i64 = rand::random();
        let ack = SHandshakeSynAck {
            result: protocol::HANDSHAKE_OK,
            server_time_ms: shared::tick_ms(),
            seed,
        };
        if session.send(&ack).is_err() {
            session.disconnect();
            return;
        }
        session.enable_cipher(seed);

        // 암호화 전환 후 존 입장
        let zone = self.zone.clone();
        let entering = session.clone();
        let target = zone.clone();
        target.push_fn(move |cx| zone.enter(cx, entering));

        // 입장 환영 공지는 타이머 경유로 존 메일박스에 전달
        let zone = self.zone.clone();
        let notice = Job::new(JobPriority::Normal, move |cx| {
            zone.queue_notice(cx, "새 플레이어가 입장했습니다".into());
        });
        let target: Arc<dyn JobSerializer> = self.zone.clone();
        self.timer.push_after(WELCOME_DELAY, target, notice);

        info!(id = session.runtime_id(), "핸드셰이크 완료");
    }

    fn on_chat(&self, session: &Arc<Session<Self>>, payload: &[u8]) {
        let chat = match CChat::decode(payload) {
            Ok(chat) => chat,
            Err(e) => {
                warn!(id = session.runtime_id(), error = %e, "채팅 디코딩 실패");
                session.disconnect();
                return;
            }
        };
        // 존 참조 스냅샷은 어느 스레드에서든 안전
        let Some(zone) = self.zone_ref.try_capture() else {
            warn!(id = session.runtime_id(), "존 미입장 상태의 채팅 무시");
            return;
        };
        let sender_id = session.runtime_id();
        let target = zone.clone();
        target.push_fn(move |cx| zone.queue_chat(cx, sender_id, chat.message));
    }
}

impl SessionHandler for ClientHandler {
    fn on_recv_packet(&self, session: &Arc<Session<Self>>, protocol_id: u16, payload: &[u8]) {
        // 핸드셰이크 게이트: 암호화 전에는 SYN만 허용
        if !session.is_cipher_enabled() && protocol_id != protocol::C_HANDSHAKE_SYN {
            warn!(
                id = session.runtime_id(),
                protocol_id, "핸드셰이크 이전 패킷 거부"
            );
            session.disconnect();
            return;
        }
        match protocol_id {
            protocol::C_HANDSHAKE_SYN => self.on_handshake(session),
            protocol::C_CHAT => self.on_chat(session, payload),
            _ => {
                warn!(id = session.runtime_id(), protocol_id, "알 수 없는 프로토콜");
                match packet::encode(&SNotice {
                    message: "지원하지 않는 요청".into(),
                }) {
                    Ok(frame) => session.disconnect_with_last_message("알 수 없는 프로토콜", frame),
                    Err(_) => session.disconnect(),
                }
            }
        }
    }

    fn on_disconnected(&self, session: &Arc<Session<Self>>, reason: &str) {
        info!(id = session.runtime_id(), reason, "클라이언트 종료");
        self.manager.remove(session.runtime_id());
        // 입장 잡이 아직 안 돌았을 수도 있으므로 퇴장 잡은 무조건 쌓는다.
        // 존에 없던 세션이면 leave가 그냥 지나간다.
        let zone = self.zone.clone();
        let leaving = session.clone();
        let target = zone.clone();
        target.push_fn(move |cx| zone.leave(cx, &leaving));
    }
}
