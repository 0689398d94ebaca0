//! 발신 연결 (클라이언트 측 세션 수립)

use std::sync::Arc;
use tracing::info;

use crate::error::CoreError;
use crate::session::session::{Session, SessionHandler};

/// `addr`로 `count`개의 세션을 수립합니다.
///
/// 부하 테스트 클라이언트와 서버 간 내부 연결에 씁니다. 하나라도
/// 실패하면 이미 맺은 세션은 그대로 두고 에러를 돌려줍니다.
pub async fn connect<H, F>(
    addr: &str,
    factory: F,
    count: usize,
) -> Result<Vec<Arc<Session<H>>>, CoreError>
where
    H: SessionHandler,
    F: Fn() -> Arc<Session<H>>,
{
    let mut sessions = Vec::with_capacity(count);
    for _ in 0..count {
        let stream = tokio::net::TcpStream::connect(addr).await?;
        let session = factory();
        session.start(stream);
        sessions.push(session);
    }
    info!(addr = %addr, count = count, "발신 연결 수립");
    Ok(sessions)
}
