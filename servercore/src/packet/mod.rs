//! 와이어 프레이밍
//!
//! 프레임 = `[난독화 헤더 4B][protocol_id: u16 LE][payload]`.
//! 체크섬은 CRC32C(protocol_id + payload)의 하위 16비트입니다.

mod header;
mod rw;

pub use header::{PacketHeader, HEADER_SIZE};
pub use rw::{PacketReader, PacketWriter};

use bytes::{Bytes, BytesMut};

use crate::error::CoreError;

/// 프레임 본문(protocol_id + payload)의 최소 바이트 수
pub const BODY_MIN_SIZE: usize = 2;

/// 송신 패킷 인터페이스
///
/// `max_byte_count`는 버퍼 예약 힌트일 뿐 강제 한도가 아닙니다.
pub trait Packet {
    fn protocol_id(&self) -> u16;
    fn max_byte_count(&self) -> usize;
    fn serialize(&self, w: &mut PacketWriter<'_>);
}

/// 패킷을 와이어 프레임으로 부호화합니다.
///
/// 반환된 프레임의 헤더는 난독화 완료 상태이며, 페이로드는 평문입니다.
/// 암호화는 송신 직전 세션 플러시 단계에서 수행됩니다.
pub fn encode<P: Packet>(packet: &P) -> Result<Bytes, CoreError> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + BODY_MIN_SIZE + packet.max_byte_count());
    buf.resize(HEADER_SIZE, 0);

    let mut w = PacketWriter::new(&mut buf);
    w.write_u16(packet.protocol_id());
    packet.serialize(&mut w);

    let total = buf.len();
    if total > u16::MAX as usize {
        return Err(CoreError::EncodeOverflow {
            protocol_id: packet.protocol_id(),
            size: total,
        });
    }

    let checksum = crc32c::crc32c(&buf[HEADER_SIZE..]) as u16;
    let header = PacketHeader::new(total as u16, checksum);
    let mut head = [0u8; HEADER_SIZE];
    header.encode_into(&mut head);
    buf[..HEADER_SIZE].copy_from_slice(&head);

    Ok(buf.freeze())
}

/// 수신 측 프레임 본문 검증: 헤더의 체크섬과 본문 CRC32C 하위 16비트 비교.
pub fn verify_body(header: &PacketHeader, body: &[u8]) -> Result<(), CoreError> {
    let actual = crc32c::crc32c(body) as u16;
    if actual != header.checksum {
        return Err(CoreError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping {
        seq: u32,
    }

    impl Packet for Ping {
        fn protocol_id(&self) -> u16 {
            1
        }

        fn max_byte_count(&self) -> usize {
            4
        }

        fn serialize(&self, w: &mut PacketWriter<'_>) {
            w.write_u32(self.seq);
        }
    }

    #[test]
    fn encode_produces_verifiable_frame() {
        let frame = encode(&Ping { seq: 42 }).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 2 + 4);

        let raw: [u8; HEADER_SIZE] = frame[..HEADER_SIZE].try_into().unwrap();
        let header = PacketHeader::decode(&raw);
        assert_eq!(header.total_size as usize, frame.len());
        verify_body(&header, &frame[HEADER_SIZE..]).unwrap();

        let mut r = PacketReader::new(&frame[HEADER_SIZE..]);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert_eq!(r.read_u32().unwrap(), 42);
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let frame = encode(&Ping { seq: 42 }).unwrap();
        let mut tampered = frame.to_vec();
        *tampered.last_mut().unwrap() ^= 0x01;

        let raw: [u8; HEADER_SIZE] = tampered[..HEADER_SIZE].try_into().unwrap();
        let header = PacketHeader::decode(&raw);
        assert!(matches!(
            verify_body(&header, &tampered[HEADER_SIZE..]),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }
}
