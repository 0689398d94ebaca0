//! TCP 리스너: 수락 루프 + 세션 팩토리

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::CoreError;
use crate::session::session::{NetRuntime, Session, SessionHandler};

/// 수락 루프 핸들
///
/// 드롭하거나 `stop`을 호출하면 수락을 멈춥니다. 기존 세션은 유지됩니다.
pub struct Listener {
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl Listener {
    /// 주소에 바인드하고 수락 루프를 띄웁니다.
    ///
    /// `factory`는 새 연결마다 세션을 만들어 돌려줍니다. 반환된 세션은
    /// 리스너가 `start`까지 대신 호출합니다.
    pub async fn start<H, F>(
        bind_addr: &str,
        net: Arc<NetRuntime>,
        factory: F,
    ) -> Result<Self, CoreError>
    where
        H: SessionHandler,
        F: Fn() -> Arc<Session<H>> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "리스너 시작");

        let accept_task = net.handle().spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "연결 수락");
                        let session = factory();
                        session.start(stream);
                    }
                    Err(e) => {
                        // 일시적 수락 실패(파일 핸들 고갈 등)는 루프 유지
                        error!(error = %e, "연결 수락 실패");
                    }
                }
            }
        });

        Ok(Self {
            local_addr,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&self) {
        self.accept_task.abort();
        info!(addr = %self.local_addr, "리스너 중지");
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
