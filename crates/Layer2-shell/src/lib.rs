//! # hoist-shell
//!
//! Hoist의 대화형 쉘 세션 계층.
//!
//! 구조화된 RPC 채널 없이, 에코가 살아 있는 터미널 바이트 스트림
//! 하나만으로 명령 경계와 종료 코드를 복원합니다.
//!
//! - **OutputBuffer**: 임의 크기로 도착하는 바이트를 멀티바이트 문자
//!   경계를 깨지 않는 조각으로 잘라내는 크기/시간 이중 임계값 버퍼
//! - **ShellSession**: PTY에 붙은 장수 쉘 프로세스와 마커 기반
//!   명령 실행 프로토콜
//! - **quote**: 환경 파일 생성용 POSIX 쉘 인용
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hoist_shell::{ShellSession, bash_login_command};
//! use hoist_foundation::InMemorySink;
//!
//! let mut session = ShellSession::new("/tmp/hoist-job".into());
//! session.start(bash_login_command())?;
//!
//! let mut sink = InMemorySink::new();
//! let exit_code = session.run_command("echo hello", &mut sink);
//! assert_eq!(exit_code, 0);
//! session.stop();
//! ```

pub mod error;
pub mod output_buffer;
pub mod quote;
pub mod session;

// Re-exports
pub use error::ShellError;
pub use output_buffer::{OutputBuffer, DEFAULT_CUT_LENGTH, MAX_TIME_SINCE_LAST_FLUSH};
pub use quote::shell_quote;
pub use session::{bash_login_command, ShellSession};
