//! AES-128 카운터 모드 스트림 암호
//!
//! 키스트림은 256블록(4096바이트) 배치로 미리 생성해 두고, 데이터에
//! XOR만 적용합니다. 카운터는 블록마다 빅엔디언 1 증가이며, 소비 위치는
//! 배치를 넘어 이어지므로 양측이 같은 호출 순서로 같은 바이트 수를
//! 처리하면 스트림이 일치합니다.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use super::Cipher;

const BLOCK_SIZE: usize = 16;
const BATCH_BLOCKS: usize = 256;
const BATCH_SIZE: usize = BLOCK_SIZE * BATCH_BLOCKS;

/// 초기 카운터 값. 양측 합의 상수이며 비밀이 아닙니다.
const DEFAULT_IV: [u8; BLOCK_SIZE] = [
    0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
    0x00,
];

pub struct AesCtrCipher {
    cipher: Aes128,
    counter: [u8; BLOCK_SIZE],
    keystream: Box<[u8; BATCH_SIZE]>,
    offset: usize,
}

impl AesCtrCipher {
    pub fn new(key: &[u8; 16]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(key)),
            counter: DEFAULT_IV,
            keystream: Box::new([0u8; BATCH_SIZE]),
            offset: BATCH_SIZE, // 첫 사용 시 refill
        }
    }

    fn refill(&mut self) {
        for chunk in self.keystream.chunks_exact_mut(BLOCK_SIZE) {
            chunk.copy_from_slice(&self.counter);
            self.cipher
                .encrypt_block(GenericArray::from_mut_slice(chunk));
            increment_be(&mut self.counter);
        }
        self.offset = 0;
    }

    fn apply(&mut self, data: &mut [u8]) {
        let mut pos = 0;
        while pos < data.len() {
            if self.offset == BATCH_SIZE {
                self.refill();
            }
            let n = (data.len() - pos).min(BATCH_SIZE - self.offset);
            xor_slice(
                &mut data[pos..pos + n],
                &self.keystream[self.offset..self.offset + n],
            );
            self.offset += n;
            pos += n;
        }
    }
}

impl Cipher for AesCtrCipher {
    fn transform(&mut self, data: &mut [u8]) {
        self.apply(data);
    }

    fn encrypt_into(&mut self, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), dst.len());
        dst.copy_from_slice(src);
        self.apply(dst);
    }
}

fn increment_be(counter: &mut [u8; BLOCK_SIZE]) {
    for b in counter.iter_mut().rev() {
        let (v, carry) = b.overflowing_add(1);
        *b = v;
        if !carry {
            break;
        }
    }
}

// u64 단위 와이드 XOR + 바이트 꼬리
fn xor_slice(data: &mut [u8], keystream: &[u8]) {
    let mut chunks = data.chunks_exact_mut(8);
    let mut ks = keystream.chunks_exact(8);
    for (d, k) in chunks.by_ref().zip(ks.by_ref()) {
        let x = u64::from_ne_bytes(d.try_into().unwrap()) ^ u64::from_ne_bytes(k.try_into().unwrap());
        d.copy_from_slice(&x.to_ne_bytes());
    }
    for (d, k) in chunks.into_remainder().iter_mut().zip(ks.remainder()) {
        *d ^= k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (AesCtrCipher, AesCtrCipher) {
        let key = [7u8; 16];
        (AesCtrCipher::new(&key), AesCtrCipher::new(&key))
    }

    #[test]
    fn round_trip_across_batch_boundary() {
        let (mut enc, mut dec) = pair();
        // 4096 경계를 두 번 넘도록 홀수 길이 조각을 이어서 처리
        let sizes = [1usize, 15, 16, 17, 1000, 3000, 4095, 4096, 4097, 100];
        for size in sizes {
            let plain: Vec<u8> = (0..size).map(|i| (i * 31 % 251) as u8).collect();
            let mut wire = plain.clone();
            enc.transform(&mut wire);
            dec.transform(&mut wire);
            assert_eq!(wire, plain, "size {size}");
        }
    }

    #[test]
    fn ciphertext_differs_everywhere_on_long_input() {
        let (mut enc, _) = pair();
        let plain = vec![0u8; 10_000];
        let mut wire = plain.clone();
        enc.transform(&mut wire);
        // 평문이 전부 0이므로 wire == 키스트림. 0 바이트는 드물게만 나와야 함
        let zeros = wire.iter().filter(|&&b| b == 0).count();
        assert!(zeros < 100, "키스트림에 0이 {zeros}개");
    }

    #[test]
    fn encrypt_into_matches_in_place() {
        let key = [3u8; 16];
        let mut a = AesCtrCipher::new(&key);
        let mut b = AesCtrCipher::new(&key);

        let plain: Vec<u8> = (0..500).map(|i| i as u8).collect();
        let mut in_place = plain.clone();
        a.transform(&mut in_place);

        let mut out = vec![0u8; plain.len()];
        b.encrypt_into(&plain, &mut out);
        assert_eq!(in_place, out);
    }

    #[test]
    fn different_keys_disagree() {
        let mut a = AesCtrCipher::new(&[1u8; 16]);
        let mut b = AesCtrCipher::new(&[2u8; 16]);
        let mut x = vec![0xAAu8; 64];
        let mut y = x.clone();
        a.transform(&mut x);
        b.transform(&mut y);
        assert_ne!(x, y);
    }
}
