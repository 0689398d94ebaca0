//! 세션 암호화 파이프라인
//!
//! 핸드셰이크 시드에서 32바이트 키를 유도해 송신/수신 방향별 16바이트
//! 키로 나눕니다. 서버는 전반부로 송신하고 후반부로 수신하며, 클라이언트는
//! 그 반대입니다. 헤더 4바이트는 난독화만 적용되고 암호화 대상이 아닙니다.

mod aes_cipher;
pub mod key_maker;

pub use aes_cipher::AesCtrCipher;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// 스트림 암호 인터페이스
///
/// 구현은 내부 키스트림 위치를 전진시키므로 `&mut self`를 받습니다.
pub trait Cipher: Send {
    /// 제자리 변환. 카운터 모드에서는 암/복호가 같은 연산입니다.
    fn transform(&mut self, data: &mut [u8]);

    /// `src`를 암호화해 `dst`에 기록합니다. 두 슬라이스 길이는 같아야 합니다.
    fn encrypt_into(&mut self, src: &[u8], dst: &mut [u8]);
}

/// 암호화 미사용 구간의 패스스루
pub struct NullCipher;

impl Cipher for NullCipher {
    fn transform(&mut self, _data: &mut [u8]) {}

    fn encrypt_into(&mut self, src: &[u8], dst: &mut [u8]) {
        dst.copy_from_slice(src);
    }
}

/// 연결이 서버 측인지 클라이언트 측인지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppSide {
    Server,
    Client,
}

/// 세션 하나의 송신/수신 암호 상태
///
/// 방향별 활성 플래그가 따로 있어, 핸드셰이크 응답은 평문으로 나가고
/// 그 직후 프레임부터 암호화되는 전환 시점을 정확히 표현합니다.
pub struct CipherSuite {
    side: AppSide,
    send: Mutex<Box<dyn Cipher>>,
    recv: Mutex<Box<dyn Cipher>>,
    send_enabled: AtomicBool,
    recv_enabled: AtomicBool,
}

impl CipherSuite {
    pub fn new(side: AppSide) -> Self {
        Self {
            side,
            send: Mutex::new(Box::new(NullCipher)),
            recv: Mutex::new(Box::new(NullCipher)),
            send_enabled: AtomicBool::new(false),
            recv_enabled: AtomicBool::new(false),
        }
    }

    pub fn side(&self) -> AppSide {
        self.side
    }

    /// 시드로 방향별 키를 설치합니다. 활성화는 방향별로 따로 일어납니다.
    pub fn install_keys(&self, seed: i64) {
        self.install_key_halves(key_maker::create_key_32(seed));
    }

    /// 16바이트 시드(토큰 교환형 핸드셰이크용)로 키를 설치합니다.
    pub fn install_keys_from_bytes(&self, seed: [u8; 16]) {
        self.install_key_halves(key_maker::create_key_from_bytes(seed));
    }

    fn install_key_halves(&self, key: [u8; 32]) {
        let (send_half, recv_half) = match self.side {
            AppSide::Server => (&key[..16], &key[16..]),
            AppSide::Client => (&key[16..], &key[..16]),
        };
        let mut send_key = [0u8; 16];
        send_key.copy_from_slice(send_half);
        let mut recv_key = [0u8; 16];
        recv_key.copy_from_slice(recv_half);

        *self.send.lock() = Box::new(AesCtrCipher::new(&send_key));
        *self.recv.lock() = Box::new(AesCtrCipher::new(&recv_key));
    }

    pub fn enable_send(&self) {
        self.send_enabled.store(true, Ordering::Release);
    }

    pub fn enable_recv(&self) {
        self.recv_enabled.store(true, Ordering::Release);
    }

    pub fn is_send_enabled(&self) -> bool {
        self.send_enabled.load(Ordering::Acquire)
    }

    pub fn is_recv_enabled(&self) -> bool {
        self.recv_enabled.load(Ordering::Acquire)
    }

    /// 송신 방향 암호화: `src` → `dst`. 비활성이면 그대로 복사합니다.
    pub fn encrypt_send(&self, src: &[u8], dst: &mut [u8]) {
        if self.is_send_enabled() {
            self.send.lock().encrypt_into(src, dst);
        } else {
            dst.copy_from_slice(src);
        }
    }

    /// 수신 방향 제자리 복호. 비활성이면 아무것도 하지 않습니다.
    pub fn decrypt_recv(&self, data: &mut [u8]) {
        if self.is_recv_enabled() {
            self.recv.lock().transform(data);
        }
    }
}
