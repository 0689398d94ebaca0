//! 연결 계층: 버퍼, 세션, 리스너, 커넥터, 세션 매니저

mod buffer;
mod connector;
mod listener;
mod manager;
#[allow(clippy::module_inception)]
mod session;

pub use buffer::{
    BufferPool, RecvBuffer, SendBuffer, MAX_PACKET_SIZE, RECV_BUFFER_SIZE, SEND_BUFFER_MAX,
    SEND_BUFFER_SIZE,
};
pub use connector::connect;
pub use listener::Listener;
pub use manager::SessionManager;
pub use session::{NetRuntime, Session, SessionHandler};
