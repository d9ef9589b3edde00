//! # hoist-job
//!
//! Job 계층: 세션 프로토콜 위에 올라가는 소비자들.
//!
//! - **JobExecutor**: 환경 변수 내보내기 / 파일 주입 같은 복합 작업을
//!   `run_command` 시퀀스로 조립
//! - **Api**: 컨트롤 플레인에 에이전트를 등록하는 HTTP 클라이언트
//! - **spawn**: 격리 환경용 서브프로세스 스폰 커맨드 구성

pub mod api;
pub mod executor;
pub mod spawn;

// Re-exports
pub use api::{Api, RegisterRequest, RegisterResponse};
pub use executor::{EnvVar, FileSpec, JobExecutor};
pub use spawn::docker_compose_command;
