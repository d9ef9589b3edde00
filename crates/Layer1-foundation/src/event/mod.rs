//! Event - Job 라이프사이클 이벤트와 이벤트 싱크
//!
//! - `types.rs` - `JobEvent` 태그드 이벤트 타입
//! - `sink.rs` - `EventSink` trait + Null/InMemory 구현

mod sink;
mod types;

pub use sink::{EventSink, InMemorySink, NullSink};
pub use types::JobEvent;
