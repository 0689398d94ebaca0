//! 게임 서버 엔트리포인트
//!
//! 구동 순서: 설정 → 로깅 → 잡 스케줄러/타이머 → 네트워크 런타임 →
//! 존 → 리스너. 종료는 Ctrl-C 수신 후 역순으로, 세션을 전부 플러시
//! 종료한 뒤 워커를 합류시킵니다.

mod client;
mod protocol;
mod zone;

use std::sync::Arc;
use tracing::info;

use servercore::job::{JobScheduler, JobTimer};
use servercore::session::{Listener, NetRuntime, SessionManager};
use shared::ServerConfig;

use crate::client::ClientHandler;
use crate::zone::Zone;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shared::logging::init_logging();
    shared::tick_ms(); // 틱 시계 기준점 고정
    let config = ServerConfig::from_env()?;

    let scheduler = JobScheduler::new();
    scheduler.start(config.resolved_worker_threads());

    let timer = JobTimer::new();
    timer.start();

    let net = NetRuntime::new(tokio::runtime::Handle::current());
    let manager: Arc<SessionManager<ClientHandler>> = SessionManager::new();
    let zone = Zone::new(shared::next_runtime_id(), scheduler.clone());

    let listener = {
        let zone = zone.clone();
        let manager = manager.clone();
        let timer = timer.clone();
        let session_net = net.clone();
        Listener::start(&config.bind_address(), net.clone(), move || {
            ClientHandler::spawn_session(
                zone.clone(),
                manager.clone(),
                timer.clone(),
                session_net.clone(),
            )
        })
        .await?
    };
    info!(addr = %listener.local_addr(), "게임 서버 준비 완료");

    tokio::signal::ctrl_c().await?;
    info!("종료 신호 수신");

    listener.stop();
    manager.kick_all("서버 종료");
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    timer.stop();
    scheduler.shutdown();
    info!(uptime_ms = shared::tick_ms(), "게임 서버 종료 완료");
    Ok(())
}
