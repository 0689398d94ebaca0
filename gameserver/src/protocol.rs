//! 게임 프로토콜 패킷 정의
//!
//! C_ 접두사는 클라이언트 발신, S_ 접두사는 서버 발신입니다.

use servercore::packet::{Packet, PacketReader, PacketWriter};
use servercore::CoreError;

pub const C_HANDSHAKE_SYN: u16 = 1;
pub const S_HANDSHAKE_SYN_ACK: u16 = 2;
pub const C_CHAT: u16 = 10;
pub const S_CHAT: u16 = 11;
pub const S_NOTICE: u16 = 12;

/// 클라이언트 → 서버: 암호화 협상 개시 (본문 없음)
pub struct CHandshakeSyn;

impl Packet for CHandshakeSyn {
    fn protocol_id(&self) -> u16 {
        C_HANDSHAKE_SYN
    }

    fn max_byte_count(&self) -> usize {
        0
    }

    fn serialize(&self, _w: &mut PacketWriter<'_>) {}
}

/// 서버 → 클라이언트: 결과/서버 시각/키 유도 시드. 이 응답은 평문으로 나갑니다.
pub struct SHandshakeSynAck {
    pub result: u16,
    pub server_time_ms: u64,
    pub seed: i64,
}

pub const HANDSHAKE_OK: u16 = 0;

impl SHandshakeSynAck {
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let mut r = PacketReader::new(payload);
        Ok(Self {
            result: r.read_u16()?,
            server_time_ms: r.read_u64()?,
            seed: r.read_i64()?,
        })
    }
}

impl Packet for SHandshakeSynAck {
    fn protocol_id(&self) -> u16 {
        S_HANDSHAKE_SYN_ACK
    }

    fn max_byte_count(&self) -> usize {
        2 + 8 + 8
    }

    fn serialize(&self, w: &mut PacketWriter<'_>) {
        w.write_u16(self.result);
        w.write_u64(self.server_time_ms);
        w.write_i64(self.seed);
    }
}

/// 클라이언트 → 서버: 존 채팅
pub struct CChat {
    pub message: String,
}

impl CChat {
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let mut r = PacketReader::new(payload);
        Ok(Self {
            message: r.read_string()?,
        })
    }
}

impl Packet for CChat {
    fn protocol_id(&self) -> u16 {
        C_CHAT
    }

    fn max_byte_count(&self) -> usize {
        2 + self.message.len()
    }

    fn serialize(&self, w: &mut PacketWriter<'_>) {
        w.write_string(&self.message);
    }
}

/// 서버 → 클라이언트: 존 전체 채팅 브로드캐스트
pub struct SChat {
    pub sender_id: u64,
    pub message: String,
}

impl SChat {
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let mut r = PacketReader::new(payload);
        Ok(Self {
            sender_id: r.read_u64()?,
            message: r.read_string()?,
        })
    }
}

impl Packet for SChat {
    fn protocol_id(&self) -> u16 {
        S_CHAT
    }

    fn max_byte_count(&self) -> usize {
        8 + 2 + self.message.len()
    }

    fn serialize(&self, w: &mut PacketWriter<'_>) {
        w.write_u64(self.sender_id);
        w.write_string(&self.message);
    }
}

/// 서버 → 클라이언트: 공지 (타이머 구동)
pub struct SNotice {
    pub message: String,
}

impl SNotice {
    pub fn decode(payload: &[u8]) -> Result<Self, CoreError> {
        let mut r = PacketReader::new(payload);
        Ok(Self {
            message: r.read_string()?,
        })
    }
}

impl Packet for SNotice {
    fn protocol_id(&self) -> u16 {
        S_NOTICE
    }

    fn max_byte_count(&self) -> usize {
        2 + self.message.len()
    }

    fn serialize(&self, w: &mut PacketWriter<'_>) {
        w.write_string(&self.message);
    }
}
