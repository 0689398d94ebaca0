//! 공용 도구 모듈

mod get_id;
mod tick;

pub use get_id::next_runtime_id;
pub use tick::tick_ms;
