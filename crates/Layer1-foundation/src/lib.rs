//! # hoist-foundation
//!
//! Foundation layer for Hoist:
//! - Error: 중앙 에러 타입 (`Error`, `Result`)
//! - Event: Job 라이프사이클 이벤트 + 이벤트 싱크 (`JobEvent`, `EventSink`)
//! - Config: 에이전트 설정 (`AgentConfig`, `HostEnvVar`, `FileInjection`)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Layer3-job  (composite ops, control-plane API)  │
//! │        │                                         │
//! │        ▼                                         │
//! │  Layer2-shell (marker protocol, output buffer)   │
//! │        │                                         │
//! │        ▼                                         │
//! │  Layer1-foundation (events, errors, config)      │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod event;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Event (Job 라이프사이클)
// ============================================================================
pub use event::{EventSink, InMemorySink, JobEvent, NullSink};

// ============================================================================
// Config
// ============================================================================
pub use config::{keys, AgentConfig, FileInjection, HostEnvVar, VALID_CONFIG_KEYS};
