//! 공통 라이브러리
//!
//! 게임 서버 전체에서 공유하는 설정/로깅/유틸리티 모듈입니다.
//! - **config**: 환경변수 기반 서버 설정 로드
//! - **logging**: tracing 기반 로깅 시스템 초기화
//! - **tool**: 런타임 ID 생성기, 틱 시계 등 공용 도구

pub mod config;
pub mod logging;
pub mod tool;

pub use config::ServerConfig;
pub use tool::{next_runtime_id, tick_ms};
