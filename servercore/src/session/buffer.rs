//! 세션 수신/송신 버퍼와 버퍼 풀
//!
//! 수신 버퍼는 읽기/쓰기 커서 두 개를 가진 단일 바이트 배열이고,
//! 여유 공간이 워터마크 아래로 내려가면 미소비 구간을 앞으로 당깁니다.
//! 송신 버퍼는 프레임들을 이어 붙이는 append 전용이며, 2의 거듭제곱으로
//! 최대 한도까지만 키웁니다. 둘 다 풀에서 빌려 쓰고 끊길 때 반납합니다.

use crossbeam_queue::SegQueue;

use crate::error::CoreError;

pub const RECV_BUFFER_SIZE: usize = 128 * 1024;
pub const RECV_TRIM_WATERMARK: usize = 64 * 1024;
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

pub const SEND_BUFFER_SIZE: usize = 128 * 1024;
pub const SEND_BUFFER_MAX: usize = 512 * 1024;

/// 고정 크기 바이트 배열 풀
///
/// 반납 시 내용은 건드리지 않고, 대여 시 사용자가 커서를 리셋합니다.
pub struct BufferPool {
    queue: SegQueue<Vec<u8>>,
    buffer_size: usize,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            queue: SegQueue::new(),
            buffer_size,
        }
    }

    pub fn rent(&self) -> Vec<u8> {
        self.queue.pop().unwrap_or_else(|| vec![0u8; self.buffer_size])
    }

    pub fn hand_back(&self, buf: Vec<u8>) {
        if buf.len() == self.buffer_size {
            self.queue.push(buf);
        }
    }

    pub fn pooled(&self) -> usize {
        self.queue.len()
    }
}

/// 수신 누적 버퍼
pub struct RecvBuffer {
    buf: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl RecvBuffer {
    pub fn new(mut buf: Vec<u8>) -> Self {
        buf.resize(RECV_BUFFER_SIZE, 0);
        Self {
            buf,
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// 미소비 데이터 길이
    pub fn data_len(&self) -> usize {
        self.write_pos - self.read_pos
    }

    pub fn free_len(&self) -> usize {
        self.buf.len() - self.write_pos
    }

    /// 여유 공간이 워터마크 아래면 미소비 구간을 맨 앞으로 당깁니다.
    pub fn trim(&mut self) {
        if self.free_len() >= RECV_TRIM_WATERMARK {
            return;
        }
        let len = self.data_len();
        self.buf.copy_within(self.read_pos..self.write_pos, 0);
        self.read_pos = 0;
        self.write_pos = len;
    }

    /// 소켓 읽기가 쓸 수 있는 빈 구간
    pub fn write_slice(&mut self) -> &mut [u8] {
        &mut self.buf[self.write_pos..]
    }

    pub fn on_write(&mut self, n: usize) {
        debug_assert!(n <= self.buf.len() - self.write_pos);
        self.write_pos += n;
    }

    /// 미소비 데이터 구간 (제자리 복호를 위해 가변)
    pub fn data_slice_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.read_pos..self.write_pos]
    }

    pub fn data_slice(&self) -> &[u8] {
        &self.buf[self.read_pos..self.write_pos]
    }

    pub fn on_read(&mut self, n: usize) {
        debug_assert!(n <= self.data_len());
        self.read_pos += n;
        if self.read_pos == self.write_pos {
            self.read_pos = 0;
            self.write_pos = 0;
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// 송신 누적 버퍼
pub struct SendBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl SendBuffer {
    pub fn new(mut buf: Vec<u8>) -> Self {
        buf.resize(SEND_BUFFER_SIZE, 0);
        Self { buf, filled: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn filled_len(&self) -> usize {
        self.filled
    }

    /// `n`바이트 이어 쓸 공간을 확보해 돌려줍니다. 한도 초과면 에러.
    pub fn reserve(&mut self, n: usize) -> Result<&mut [u8], CoreError> {
        let required = self.filled + n;
        if required > self.buf.len() {
            if required > SEND_BUFFER_MAX {
                return Err(CoreError::SendBufferOverflow {
                    max: SEND_BUFFER_MAX,
                    required,
                });
            }
            let mut next = self.buf.len().max(1);
            while next < required {
                next *= 2;
            }
            self.buf.resize(next.min(SEND_BUFFER_MAX), 0);
        }
        Ok(&mut self.buf[self.filled..self.filled + n])
    }

    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.filled + n <= self.buf.len());
        self.filled += n;
    }

    pub fn append(&mut self, data: &[u8]) -> Result<(), CoreError> {
        self.reserve(data.len())?.copy_from_slice(data);
        self.commit(data.len());
        Ok(())
    }

    /// 채워진 내용을 들어내 소켓 쓰기에 넘기고, 버퍼를 비웁니다.
    ///
    /// await 지점 너머로 락을 들고 가지 않기 위한 소유권 이전입니다.
    /// 쓰기가 끝나면 `restore`로 배열을 되돌려 받습니다.
    pub fn take_filled(&mut self) -> (Vec<u8>, usize) {
        let filled = self.filled;
        self.filled = 0;
        (std::mem::take(&mut self.buf), filled)
    }

    pub fn restore(&mut self, buf: Vec<u8>) {
        debug_assert!(self.buf.is_empty());
        self.buf = buf;
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
