//! 코어 엔진 공통 에러 타입
//!
//! 전송/프로토콜/인코딩 계층에서 발생하는 모든 에러를 분류합니다.
//! 프로토콜 에러(체크섬 불일치, 크기 위반)는 복구하지 않고
//! 해당 연결을 즉시 종료하는 것이 정책입니다.

use thiserror::Error;

/// 코어 엔진 에러
#[derive(Debug, Error)]
pub enum CoreError {
    /// 소켓 입출력 에러
    #[error("입출력 오류: {0}")]
    Io(#[from] std::io::Error),

    /// 수신 프레임 체크섬 불일치 (패킷 손상)
    #[error("패킷 손상: 체크섬 불일치 (헤더 {expected:#06x}, 계산 {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// 헤더에 기록된 크기가 유효 범위를 벗어남
    #[error("잘못된 패킷 크기: {total_size}")]
    InvalidPacketSize { total_size: u16 },

    /// 인코딩 결과가 u16 프레임 한도를 초과
    #[error("패킷 인코딩 크기 초과: 프로토콜 {protocol_id}, {size}바이트")]
    EncodeOverflow { protocol_id: u16, size: usize },

    /// 송신 버퍼 하드 한도 초과
    #[error("송신 버퍼 한도 초과: 최대 {max}바이트, 요청 {required}바이트")]
    SendBufferOverflow { max: usize, required: usize },

    /// 수신 페이로드 역직렬화 실패
    #[error("패킷 디코딩 실패: {0}")]
    Decode(&'static str),

    /// 코어 내부 계약 위반 (호출측 버그)
    #[error("내부 오류: {0}")]
    Internal(String),
}
