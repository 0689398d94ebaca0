//! 패킷 헤더 난독화
//!
//! 와이어 4바이트 = `[total_size: u16 LE][checksum: u16 LE]`를
//! XOR 키 + 좌회전으로 바이트 단위 난독화합니다. 암호화가 아니라
//! 우발적 평문 노출을 막는 수준의 가림막입니다.

pub const HEADER_SIZE: usize = 4;

const HEADER_KEY: u32 = 0x9A3B_5C7D;
const ROTATE_SHIFT: u32 = 5;

/// 프레임 헤더
///
/// `total_size`는 헤더를 포함한 프레임 전체 길이,
/// `checksum`은 CRC32C(protocol_id + payload)의 하위 16비트입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub total_size: u16,
    pub checksum: u16,
}

impl PacketHeader {
    pub fn new(total_size: u16, checksum: u16) -> Self {
        Self {
            total_size,
            checksum,
        }
    }

    /// 난독화된 4바이트를 기록합니다.
    pub fn encode_into(&self, out: &mut [u8; HEADER_SIZE]) {
        out[0..2].copy_from_slice(&self.total_size.to_le_bytes());
        out[2..4].copy_from_slice(&self.checksum.to_le_bytes());
        obfuscate(out);
    }

    /// 난독화된 4바이트에서 복원합니다. 입력은 훼손되지 않습니다.
    pub fn decode(raw: &[u8; HEADER_SIZE]) -> Self {
        let mut image = *raw;
        deobfuscate(&mut image);
        Self {
            total_size: u16::from_le_bytes([image[0], image[1]]),
            checksum: u16::from_le_bytes([image[2], image[3]]),
        }
    }
}

fn obfuscate(bytes: &mut [u8; HEADER_SIZE]) {
    let key = HEADER_KEY.to_le_bytes();
    for (b, k) in bytes.iter_mut().zip(key.iter()) {
        *b = (*b ^ k).rotate_left(ROTATE_SHIFT);
    }
}

fn deobfuscate(bytes: &mut [u8; HEADER_SIZE]) {
    let key = HEADER_KEY.to_le_bytes();
    for (b, k) in bytes.iter_mut().zip(key.iter()) {
        *b = b.rotate_right(ROTATE_SHIFT) ^ k;
    }
}
