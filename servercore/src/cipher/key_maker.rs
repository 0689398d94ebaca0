//! 핸드셰이크 시드로부터 대칭키를 결정적으로 유도합니다.
//!
//! 절차: 시드 바이트를 32바이트 작업 버퍼 앞에 깔고, 선형 합동
//! 뮤테이터(214013/2531011)와 비트 회전으로 버퍼를 휘저은 뒤 SHA-256을
//! 취하고, 해시를 한 바이트 오프셋 자기 XOR로 접어 최종 키를 만듭니다.
//! 같은 시드는 양측에서 항상 같은 32바이트를 냅니다.

use sha2::{Digest, Sha256};

const MUTATOR_SEED: i64 = 0x5F37_59DF;

/// 작업 버퍼를 휘젓고 해시를 접어 최종 키를 만듭니다.
///
/// `stride`는 뮤테이터가 순환 참조하는 시드 구간의 길이입니다.
fn mutate_and_fold(mut work: [u8; 32], stride: usize) -> [u8; 32] {
    let mut mutator = MUTATOR_SEED;
    for i in 0..32 {
        let mut b = work[i % stride] ^ (i as u8);
        b = b.rotate_left(3);
        mutator = (mutator.wrapping_mul(214_013).wrapping_add(2_531_011)) & 0xFFFF_FFFF;
        work[i] = b ^ ((mutator >> 16) as u8);
    }

    let hash = Sha256::digest(work);
    let mut key = [0u8; 32];
    for i in 0..32 {
        key[i] = hash[i] ^ hash[(i + 1) % 32];
    }
    key
}

/// i64 시드에서 32바이트 키를 유도합니다.
pub fn create_key_32(seed: i64) -> [u8; 32] {
    let mut work = [0u8; 32];
    work[..8].copy_from_slice(&seed.to_le_bytes());
    mutate_and_fold(work, 8)
}

/// 16바이트 시드(토큰/식별자 등)에서 32바이트 키를 유도합니다.
///
/// 시드를 앞에 깔고 뒤집은 복사본으로 뒷공간을 채운 뒤, 시드 16바이트
/// 전체가 순환 구간에 들어가도록 휘젓습니다.
pub fn create_key_from_bytes(seed: [u8; 16]) -> [u8; 32] {
    let mut work = [0u8; 32];
    work[..16].copy_from_slice(&seed);
    for i in 0..16 {
        work[16 + i] = seed[15 - i];
    }
    mutate_and_fold(work, 16)
}
