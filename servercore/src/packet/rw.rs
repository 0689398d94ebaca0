//! 페이로드 직렬화 보조 (리틀엔디언 고정)

use bytes::{BufMut, BytesMut};

use crate::error::CoreError;

/// 페이로드 기록기
pub struct PacketWriter<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> PacketWriter<'a> {
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    /// u16 길이 프리픽스 + UTF-8 본문
    pub fn write_string(&mut self, v: &str) {
        debug_assert!(v.len() <= u16::MAX as usize);
        self.buf.put_u16_le(v.len() as u16);
        self.buf.put_slice(v.as_bytes());
    }
}

/// 페이로드 판독기 (경계 검사 포함)
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if self.remaining() < n {
            return Err(CoreError::Decode("페이로드가 선언된 필드보다 짧음"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CoreError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, CoreError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, CoreError> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, CoreError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, CoreError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, CoreError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, CoreError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64, CoreError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn read_bool(&mut self) -> Result<bool, CoreError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        self.take(n)
    }

    pub fn read_string(&mut self) -> Result<String, CoreError> {
        let len = self.read_u16()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CoreError::Decode("문자열이 UTF-8이 아님"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_all_field_types() {
        let mut buf = BytesMut::new();
        let mut w = PacketWriter::new(&mut buf);
        w.write_u8(7);
        w.write_i16(-300);
        w.write_u32(70_000);
        w.write_i64(-1);
        w.write_f32(2.5);
        w.write_bool(true);
        w.write_string("안녕");

        let mut r = PacketReader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_i16().unwrap(), -300);
        assert_eq!(r.read_u32().unwrap(), 70_000);
        assert_eq!(r.read_i64().unwrap(), -1);
        assert_eq!(r.read_f32().unwrap(), 2.5);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_string().unwrap(), "안녕");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut buf = BytesMut::new();
        let mut w = PacketWriter::new(&mut buf);
        w.write_u16(5);
        // 길이 5를 선언했지만 본문이 없음
        let mut r = PacketReader::new(&buf);
        assert!(r.read_string().is_err());
    }
}
