//! Error types for shell session handling

use thiserror::Error;

/// 쉘 세션 에러
///
/// 세션을 통째로 실패시키는 것은 `start()`뿐입니다. 명령 단위 실패는
/// 에러가 아니라 exit code로 보고됩니다 (마커 파싱 실패 = 1,
/// 스테이징 실패 = 255).
#[derive(Error, Debug)]
pub enum ShellError {
    /// PTY session is not started
    #[error("Shell session not started. Call start() first")]
    SessionNotStarted,

    /// PTY session is already running
    #[error("Shell session already running")]
    SessionAlreadyRunning,

    /// Failed to create PTY
    #[error("Failed to create PTY: {0}")]
    PtyCreationFailed(String),

    /// Failed to spawn shell process
    #[error("Failed to spawn shell: {0}")]
    ShellSpawnFailed(String),

    /// Readiness handshake did not complete
    #[error("Shell handshake failed: {0}")]
    HandshakeFailed(String),

    /// IO error on the PTY streams
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
