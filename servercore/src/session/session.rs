//! 세션: 연결 하나의 수신/송신 파이프라인
//!
//! 수신은 tokio 태스크 하나가 프레임 경계를 복원해 핸들러로 넘기고,
//! 송신은 무잠금 큐에 프레임을 쌓은 뒤 `is_sending` CAS를 이긴 호출만
//! 플러시 태스크를 띄우는 단일 기록자 방식입니다. 암호화는 플러시
//! 단계에서 헤더 4바이트를 제외한 본문에만 적용됩니다.

use bytes::Bytes;
use crossbeam_queue::SegQueue;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::cipher::{AppSide, CipherSuite};
use crate::error::CoreError;
use crate::packet::{self, Packet, PacketHeader, BODY_MIN_SIZE, HEADER_SIZE};
use crate::session::buffer::{
    BufferPool, RecvBuffer, SendBuffer, MAX_PACKET_SIZE, RECV_BUFFER_SIZE, SEND_BUFFER_SIZE,
};

/// 네트워크 실행 환경: tokio 핸들 + 세션 버퍼 풀
///
/// 전역이 아니라 main에서 만들어 리스너/커넥터에 주입합니다.
pub struct NetRuntime {
    handle: tokio::runtime::Handle,
    recv_pool: BufferPool,
    send_pool: BufferPool,
}

impl NetRuntime {
    pub fn new(handle: tokio::runtime::Handle) -> Arc<Self> {
        Arc::new(Self {
            handle,
            recv_pool: BufferPool::new(RECV_BUFFER_SIZE),
            send_pool: BufferPool::new(SEND_BUFFER_SIZE),
        })
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}

/// 송신 큐 항목
///
/// 프레임 사이에 끼워 넣는 제어 항목으로 "이 지점부터 암호화",
/// "여기까지 보내고 끊기"의 순서를 데이터와 함께 보존합니다.
enum SendEntry {
    Frame(Bytes),
    EnableCipher,
    PoisonPill,
}

/// 세션 이벤트 핸들러
///
/// 콜백은 수신 태스크/플러시 태스크에서 호출되므로 무거운 일은
/// 메일박스 잡으로 넘기는 것을 권장합니다.
pub trait SessionHandler: Send + Sync + 'static {
    fn on_connected(&self, _session: &Arc<Session<Self>>)
    where
        Self: Sized,
    {
    }

    fn on_recv_packet(&self, session: &Arc<Session<Self>>, protocol_id: u16, payload: &[u8])
    where
        Self: Sized;

    fn on_disconnected(&self, _session: &Arc<Session<Self>>, _reason: &str)
    where
        Self: Sized,
    {
    }

    fn on_send(&self, _bytes: usize) {}
}

pub struct Session<H: SessionHandler> {
    runtime_id: u64,
    handler: Arc<H>,
    net: Arc<NetRuntime>,
    peer: OnceCell<SocketAddr>,
    write_half: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    send_queue: SegQueue<SendEntry>,
    send_buffer: Mutex<Option<SendBuffer>>,
    cipher: CipherSuite,
    disconnected: AtomicBool,
    is_sending: AtomicBool,
    send_closed: AtomicBool,
    disconnect_after_flush: AtomicBool,
    last_message: Mutex<String>,
    shutdown: Notify,
    flush_task: Mutex<Option<tokio::task::AbortHandle>>,
}

impl<H: SessionHandler> Session<H> {
    pub fn new(runtime_id: u64, side: AppSide, handler: Arc<H>, net: Arc<NetRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime_id,
            handler,
            net,
            peer: OnceCell::new(),
            write_half: tokio::sync::Mutex::new(None),
            send_queue: SegQueue::new(),
            send_buffer: Mutex::new(None),
            cipher: CipherSuite::new(side),
            disconnected: AtomicBool::new(false),
            is_sending: AtomicBool::new(false),
            send_closed: AtomicBool::new(false),
            disconnect_after_flush: AtomicBool::new(false),
            last_message: Mutex::new(String::new()),
            shutdown: Notify::new(),
            flush_task: Mutex::new(None),
        })
    }

    pub fn runtime_id(&self) -> u64 {
        self.runtime_id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer.get().copied()
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    /// 수신 방향 암호화가 켜졌는지 (핸드셰이크 게이트 판정용)
    pub fn is_cipher_enabled(&self) -> bool {
        self.cipher.is_recv_enabled()
    }

    /// 소켓을 세션에 연결하고 수신 태스크를 띄웁니다.
    pub fn start(self: &Arc<Self>, stream: TcpStream) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(id = self.runtime_id, error = %e, "TCP_NODELAY 설정 실패");
        }
        if let Ok(addr) = stream.peer_addr() {
            let _ = self.peer.set(addr);
        }
        let (read_half, write_half) = stream.into_split();
        *self
            .write_half
            .try_lock()
            .expect("start 이전에 write half를 잡은 곳이 없어야 함") = Some(write_half);
        *self.send_buffer.lock() = Some(SendBuffer::new(self.net.send_pool.rent()));

        self.handler.clone().on_connected(self);

        let session = self.clone();
        self.net.handle.spawn(async move {
            session.recv_loop(read_half).await;
        });
        info!(id = self.runtime_id, peer = ?self.peer(), "세션 시작");
    }

    async fn recv_loop(self: Arc<Self>, mut read_half: OwnedReadHalf) {
        let mut rb = RecvBuffer::new(self.net.recv_pool.rent());

        loop {
            if self.is_disconnected() {
                break;
            }
            rb.trim();
            if rb.free_len() == 0 {
                self.set_last_message("수신 버퍼 고갈 (프레임 경계 없는 데이터)");
                break;
            }

            let n = tokio::select! {
                r = read_half.read(rb.write_slice()) => match r {
                    Ok(0) => {
                        self.set_last_message("상대방 연결 종료");
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        self.set_last_message(&format!("소켓 읽기 실패: {e}"));
                        break;
                    }
                },
                _ = self.shutdown.notified() => break,
            };
            rb.on_write(n);

            if let Err(e) = self.process_frames(&mut rb) {
                error!(id = self.runtime_id, error = %e, "프레임 처리 실패");
                self.set_last_message(&format!("프레임 처리 실패: {e}"));
                break;
            }
        }

        self.net.recv_pool.hand_back(rb.into_inner());
        self.disconnect();
    }

    /// 누적 버퍼에서 완성된 프레임을 차례로 잘라 핸들러에 넘깁니다.
    fn process_frames(self: &Arc<Self>, rb: &mut RecvBuffer) -> Result<(), CoreError> {
        loop {
            if rb.data_len() < HEADER_SIZE {
                return Ok(());
            }
            let raw: [u8; HEADER_SIZE] = rb.data_slice()[..HEADER_SIZE].try_into().unwrap();
            let header = PacketHeader::decode(&raw);
            let total = header.total_size as usize;
            if total < HEADER_SIZE + BODY_MIN_SIZE || total > MAX_PACKET_SIZE {
                return Err(CoreError::InvalidPacketSize {
                    total_size: header.total_size,
                });
            }
            if rb.data_len() < total {
                return Ok(());
            }

            let body = &mut rb.data_slice_mut()[HEADER_SIZE..total];
            self.cipher.decrypt_recv(body);
            packet::verify_body(&header, body)?;

            let protocol_id = u16::from_le_bytes([body[0], body[1]]);
            let payload = &body[2..];

            let session = self.clone();
            let result = catch_unwind(AssertUnwindSafe(|| {
                session
                    .handler
                    .clone()
                    .on_recv_packet(&session, protocol_id, payload);
            }));
            if result.is_err() {
                return Err(CoreError::Internal(format!(
                    "패킷 핸들러 패닉 (protocol_id={protocol_id})"
                )));
            }

            rb.on_read(total);
        }
    }

    /// 패킷을 부호화해 송신 큐에 넣습니다.
    pub fn send<P: Packet>(self: &Arc<Self>, packet: &P) -> Result<(), CoreError> {
        let frame = packet::encode(packet)?;
        self.send_frame(frame);
        Ok(())
    }

    /// 이미 부호화된 프레임을 송신 큐에 넣습니다 (브로드캐스트 공유용).
    pub fn send_frame(self: &Arc<Self>, frame: Bytes) {
        if self.is_disconnected() {
            return;
        }
        self.send_queue.push(SendEntry::Frame(frame));
        self.register_send();
    }

    /// 여러 프레임을 큐에만 쌓습니다. `send_flush`로 한 번에 내보냅니다.
    pub fn send_batch(self: &Arc<Self>, frames: impl IntoIterator<Item = Bytes>) {
        if self.is_disconnected() {
            return;
        }
        for frame in frames {
            self.send_queue.push(SendEntry::Frame(frame));
        }
    }

    /// 쌓인 큐 항목의 플러시를 요청합니다.
    pub fn send_flush(self: &Arc<Self>) {
        self.register_send();
    }

    /// 시드로 키를 설치하고 암호화를 켭니다.
    ///
    /// 수신 방향은 즉시 켜지고, 송신 방향은 이 호출 이전에 쌓인 프레임이
    /// 모두 평문으로 나간 뒤부터 켜집니다. 핸드셰이크 응답을 평문으로
    /// 먼저 보내고 호출하면 전환 시점이 정확히 맞습니다.
    pub fn enable_cipher(self: &Arc<Self>, seed: i64) {
        self.cipher.install_keys(seed);
        self.cipher.enable_recv();
        self.send_queue.push(SendEntry::EnableCipher);
        self.register_send();
        debug!(id = self.runtime_id, "암호화 활성화");
    }

    /// 쌓인 프레임을 모두 내보낸 뒤 연결을 끊습니다.
    pub fn flush_and_disconnect(self: &Arc<Self>, reason: &str) {
        self.set_last_message(reason);
        self.send_queue.push(SendEntry::PoisonPill);
        self.register_send();
    }

    /// 마지막 프레임 하나를 보내고 연결을 끊습니다 (종료 통지용).
    pub fn disconnect_with_last_message(self: &Arc<Self>, reason: &str, frame: Bytes) {
        self.set_last_message(reason);
        self.send_queue.push(SendEntry::Frame(frame));
        self.send_queue.push(SendEntry::PoisonPill);
        self.register_send();
    }

    fn set_last_message(&self, message: &str) {
        let mut guard = self.last_message.lock();
        if guard.is_empty() {
            *guard = message.to_owned();
        }
    }

    /// CAS를 이긴 호출만 플러시 태스크를 띄웁니다.
    fn register_send(self: &Arc<Self>) {
        if self.is_disconnected() {
            return;
        }
        if self
            .is_sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let session = self.clone();
            let task = self.net.handle.spawn(async move {
                session.flush_loop().await;
            });
            // 종료 시 막힌 write_all을 끊을 수 있도록 핸들을 보관
            *self.flush_task.lock() = Some(task.abort_handle());
        }
    }

    async fn flush_loop(self: Arc<Self>) {
        loop {
            let (buf, filled) = match self.fill_send_buffer() {
                Ok(pair) => pair,
                Err(e) => {
                    error!(id = self.runtime_id, error = %e, "송신 버퍼 적재 실패");
                    self.set_last_message(&format!("송신 버퍼 적재 실패: {e}"));
                    self.is_sending.store(false, Ordering::Release);
                    self.disconnect();
                    return;
                }
            };

            if let Some(buf) = buf {
                let write_result = {
                    let mut guard = self.write_half.lock().await;
                    match guard.as_mut() {
                        Some(half) => half.write_all(&buf[..filled]).await,
                        None => Ok(()), // 이미 정리됨
                    }
                };
                {
                    let mut slot = self.send_buffer.lock();
                    if let Some(sb) = slot.as_mut() {
                        sb.restore(buf);
                    }
                }
                if let Err(e) = write_result {
                    self.set_last_message(&format!("소켓 쓰기 실패: {e}"));
                    self.is_sending.store(false, Ordering::Release);
                    self.disconnect();
                    return;
                }
                self.handler.on_send(filled);
            }

            if self.disconnect_after_flush.load(Ordering::Acquire) {
                self.is_sending.store(false, Ordering::Release);
                self.disconnect();
                return;
            }

            self.is_sending.store(false, Ordering::Release);
            if self.send_queue.is_empty() || self.is_disconnected() {
                return;
            }
            // 비우는 사이 도착한 항목: CAS를 되이기면 계속, 지면 새 태스크 몫
            if self
                .is_sending
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
        }
    }

    /// 송신 큐를 비워 송신 버퍼에 적재하고, 내용을 들어내 돌려줍니다.
    fn fill_send_buffer(&self) -> Result<(Option<Vec<u8>>, usize), CoreError> {
        let mut slot = self.send_buffer.lock();
        let sb = match slot.as_mut() {
            Some(sb) => sb,
            None => {
                // 이미 정리된 세션: 남은 항목만 버림
                while self.send_queue.pop().is_some() {}
                return Ok((None, 0));
            }
        };

        while let Some(entry) = self.send_queue.pop() {
            match entry {
                SendEntry::Frame(frame) => {
                    if self.cipher.is_send_enabled() {
                        // 헤더는 그대로, 본문만 암호화
                        let dst = sb.reserve(frame.len())?;
                        dst[..HEADER_SIZE].copy_from_slice(&frame[..HEADER_SIZE]);
                        self.cipher
                            .encrypt_send(&frame[HEADER_SIZE..], &mut dst[HEADER_SIZE..]);
                        sb.commit(frame.len());
                    } else {
                        sb.append(&frame)?;
                    }
                }
                SendEntry::EnableCipher => self.cipher.enable_send(),
                SendEntry::PoisonPill => {
                    self.disconnect_after_flush.store(true, Ordering::Release);
                    break;
                }
            }
        }

        if sb.is_empty() {
            return Ok((None, 0));
        }
        let (buf, filled) = sb.take_filled();
        Ok((Some(buf), filled))
    }

    /// 연결 종료. 첫 호출만 핸들러 통지와 자원 정리를 수행합니다.
    pub fn disconnect(self: &Arc<Self>) {
        if self.disconnected.swap(true, Ordering::AcqRel) {
            return;
        }
        let reason = {
            let guard = self.last_message.lock();
            if guard.is_empty() {
                "연결 종료".to_owned()
            } else {
                guard.clone()
            }
        };
        info!(id = self.runtime_id, peer = ?self.peer(), reason = %reason, "세션 종료");

        self.handler.clone().on_disconnected(self, &reason);
        // notify_one은 대기자가 없으면 허가를 적립하므로 깨움이 유실되지 않음
        self.shutdown.notify_one();
        self.clear_send_resources();
    }

    fn clear_send_resources(self: &Arc<Self>) {
        if self.send_closed.swap(true, Ordering::AcqRel) {
            return;
        }
        while self.send_queue.pop().is_some() {}
        if let Some(sb) = self.send_buffer.lock().take() {
            self.net.send_pool.hand_back(sb.into_inner());
        }
        // 상대가 읽지 않아 write_all이 막혀 있으면 잠금이 풀리지 않으므로
        // 플러시 태스크를 중단시킨 뒤 쓰기 반쪽을 수거한다
        if let Some(task) = self.flush_task.lock().take() {
            task.abort();
        }
        // 쓰기 반쪽은 플러시 태스크가 잡고 있을 수 있으므로 비동기로 수거
        let session = self.clone();
        self.net.handle.spawn(async move {
            let half = session.write_half.lock().await.take();
            drop(half);
        });
    }
}
