//! 게임 서버 공용 코어
//!
//! - `job`: 메일박스 직렬 실행, 워커 풀, 지연 타이머
//! - `session`: TCP 세션, 프레이밍 수신/송신 파이프라인
//! - `packet`: 헤더 난독화와 체크섬, 페이로드 직렬화
//! - `cipher`: 핸드셰이크 키 유도와 AES 카운터 모드 스트림 암호

pub mod cipher;
pub mod error;
pub mod job;
pub mod packet;
pub mod session;

pub use error::CoreError;
