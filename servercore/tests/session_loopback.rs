//! 루프백 세션 통합 테스트: 수락/프레이밍/암호화 전환/종료

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use servercore::cipher::AppSide;
use servercore::packet::{Packet, PacketWriter};
use servercore::session::{connect, Listener, NetRuntime, Session, SessionHandler};

const P_SYN: u16 = 1;
const P_SYN_ACK: u16 = 2;
const P_ECHO_REQ: u16 = 10;
const P_ECHO_RES: u16 = 11;

struct Raw {
    id: u16,
    body: Vec<u8>,
}

impl Packet for Raw {
    fn protocol_id(&self) -> u16 {
        self.id
    }

    fn max_byte_count(&self) -> usize {
        self.body.len()
    }

    fn serialize(&self, w: &mut PacketWriter<'_>) {
        w.write_bytes(&self.body);
    }
}

/// 서버 측: SYN에 시드로 응답 후 암호화, 에코 요청은 그대로 돌려줌
struct ServerSide {
    seed: i64,
}

impl SessionHandler for ServerSide {
    fn on_recv_packet(&self, session: &Arc<Session<Self>>, protocol_id: u16, payload: &[u8]) {
        match protocol_id {
            P_SYN => {
                let _ = session.send(&Raw {
                    id: P_SYN_ACK,
                    body: self.seed.to_le_bytes().to_vec(),
                });
                session.enable_cipher(self.seed);
            }
            P_ECHO_REQ => {
                let _ = session.send(&Raw {
                    id: P_ECHO_RES,
                    body: payload.to_vec(),
                });
            }
            _ => session.disconnect(),
        }
    }
}

/// 클라이언트 측: 수신 패킷 기록, SYN-ACK을 받으면 암호화 전환
struct ClientSide {
    received: Mutex<Vec<(u16, Vec<u8>)>>,
    disconnects: AtomicUsize,
}

impl ClientSide {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
            disconnects: AtomicUsize::new(0),
        })
    }
}

impl SessionHandler for ClientSide {
    fn on_recv_packet(&self, session: &Arc<Session<Self>>, protocol_id: u16, payload: &[u8]) {
        self.received.lock().push((protocol_id, payload.to_vec()));
        if protocol_id == P_SYN_ACK {
            let seed = i64::from_le_bytes(payload.try_into().unwrap());
            session.enable_cipher(seed);
        }
    }

    fn on_disconnected(&self, _session: &Arc<Session<Self>>, _reason: &str) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("조건 대기 시간 초과");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cleartext_echo_round_trip() {
    let net = NetRuntime::new(tokio::runtime::Handle::current());

    let server_net = net.clone();
    let listener = Listener::start("127.0.0.1:0", net.clone(), move || {
        Session::new(
            1,
            AppSide::Server,
            Arc::new(ServerSide { seed: 0x55AA }),
            server_net.clone(),
        )
    })
    .await
    .unwrap();

    let events = ClientSide::new();
    let client_net = net.clone();
    let client_events = events.clone();
    let addr = listener.local_addr().to_string();
    let sessions = connect(
        &addr,
        move || Session::new(2, AppSide::Client, client_events.clone(), client_net.clone()),
        1,
    )
    .await
    .unwrap();
    let client = &sessions[0];

    client
        .send(&Raw {
            id: P_ECHO_REQ,
            body: b"ping".to_vec(),
        })
        .unwrap();

    wait_for(|| !events.received.lock().is_empty()).await;
    let got = events.received.lock().clone();
    assert_eq!(got[0], (P_ECHO_RES, b"ping".to_vec()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn handshake_then_encrypted_echo() {
    let net = NetRuntime::new(tokio::runtime::Handle::current());

    let server_net = net.clone();
    let listener = Listener::start("127.0.0.1:0", net.clone(), move || {
        Session::new(
            1,
            AppSide::Server,
            Arc::new(ServerSide { seed: 0x0102_0304 }),
            server_net.clone(),
        )
    })
    .await
    .unwrap();

    let events = ClientSide::new();
    let client_net = net.clone();
    let client_events = events.clone();
    let addr = listener.local_addr().to_string();
    let sessions = connect(
        &addr,
        move || Session::new(2, AppSide::Client, client_events.clone(), client_net.clone()),
        1,
    )
    .await
    .unwrap();
    let client = sessions[0].clone();

    client
        .send(&Raw {
            id: P_SYN,
            body: Vec::new(),
        })
        .unwrap();
    wait_for(|| client.is_cipher_enabled()).await;

    // 4096바이트 키스트림 배치를 여러 번 다시 채워야 하는 본문이
    // 체크섬까지 통과하는지 확인
    let body: Vec<u8> = (0..12_000usize).map(|i| (i * 13 % 251) as u8).collect();
    client
        .send(&Raw {
            id: P_ECHO_REQ,
            body: body.clone(),
        })
        .unwrap();
    wait_for(|| events.received.lock().iter().any(|(id, _)| *id == P_ECHO_RES)).await;

    let got = events.received.lock().clone();
    let echoed = got.iter().find(|(id, _)| *id == P_ECHO_RES).unwrap();
    assert_eq!(echoed.1, body);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disconnect_notifies_exactly_once() {
    let net = NetRuntime::new(tokio::runtime::Handle::current());

    let server_net = net.clone();
    let listener = Listener::start("127.0.0.1:0", net.clone(), move || {
        Session::new(
            1,
            AppSide::Server,
            Arc::new(ServerSide { seed: 7 }),
            server_net.clone(),
        )
    })
    .await
    .unwrap();

    let events = ClientSide::new();
    let client_net = net.clone();
    let client_events = events.clone();
    let addr = listener.local_addr().to_string();
    let sessions = connect(
        &addr,
        move || Session::new(2, AppSide::Client, client_events.clone(), client_net.clone()),
        1,
    )
    .await
    .unwrap();
    let client = sessions[0].clone();

    client.disconnect();
    client.disconnect();
    let c = client.clone();
    tokio::task::spawn_blocking(move || c.disconnect())
        .await
        .unwrap();

    wait_for(|| events.disconnects.load(Ordering::SeqCst) >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(events.disconnects.load(Ordering::SeqCst), 1);
    assert!(client.is_disconnected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disconnect_closes_socket_while_writer_is_stalled() {
    use tokio::io::AsyncReadExt;

    let net = NetRuntime::new(tokio::runtime::Handle::current());
    let accepted: Arc<Mutex<Vec<Arc<Session<ServerSide>>>>> = Arc::new(Mutex::new(Vec::new()));

    let server_net = net.clone();
    let accepted_in = accepted.clone();
    let listener = Listener::start("127.0.0.1:0", net.clone(), move || {
        let session = Session::new(
            1,
            AppSide::Server,
            Arc::new(ServerSide { seed: 3 }),
            server_net.clone(),
        );
        accepted_in.lock().push(session.clone());
        session
    })
    .await
    .unwrap();

    // 읽지 않는 상대: 커널 버퍼가 차면 write_all이 멈춘다
    let mut idle_peer = tokio::net::TcpStream::connect(listener.local_addr())
        .await
        .unwrap();
    wait_for(|| !accepted.lock().is_empty()).await;
    let server = accepted.lock()[0].clone();

    // 소켓 버퍼를 한참 넘는 양을 잘게 나눠 밀어 넣는다
    for _ in 0..60 {
        for _ in 0..4 {
            server
                .send(&Raw {
                    id: P_ECHO_RES,
                    body: vec![0x5A; 60_000],
                })
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.disconnect();

    // 세션 정리가 소켓까지 닫으면 상대 읽기는 EOF나 오류로 끝난다
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        let mut sink = vec![0u8; 64 * 1024];
        loop {
            match idle_peer.read(&mut sink).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "끊긴 세션의 소켓이 닫히지 않음");
    assert!(server.is_disconnected());
}
