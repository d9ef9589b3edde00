//! Job Executor - run_command 시퀀스로 조립한 복합 작업
//!
//! 각 복합 작업은 고정된 명령 시퀀스를 순서대로 실행하고, 첫 번째
//! 0이 아닌 종료 코드에서 멈춰 그 코드를 자신의 결과로 보고합니다.
//! 작업 전체를 하나의 started/finished 이벤트 쌍으로 감싸고, 내부
//! 보조 명령의 이벤트는 버립니다.
//!
//! 실패 코드 규약:
//! - 전송 인코딩(base64) 디코드 실패 = 1, 쉘 명령 실행 전에 보고
//! - 스크래치 파일 기록 실패 = 255
//! - 쉘 명령 실패 = 해당 명령의 종료 코드

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use portable_pty::CommandBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hoist_foundation::{EventSink, JobEvent, NullSink};
use hoist_shell::{shell_quote, ShellError, ShellSession};

/// 스테이징 실패 종료 코드
const EXIT_CODE_STAGING_FAILURE: i32 = 255;

/// 전송 디코드 실패 종료 코드
const EXIT_CODE_DECODE_FAILURE: i32 = 1;

// ============================================================================
// Job 페이로드 타입
// ============================================================================

/// job 요청으로 전달되는 환경 변수
///
/// `value`는 설정/API 필드를 통과하기 위해 base64로 인코딩되어 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    /// base64-encoded value
    pub value: String,
}

/// job 요청으로 전달되는 주입 파일
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// 대상 경로 (상대 경로는 홈 디렉터리 기준)
    pub path: PathBuf,

    /// base64-encoded content
    pub content: String,

    /// chmod에 그대로 전달되는 모드 문자열 (예: "0644")
    pub mode: String,
}

// ============================================================================
// Job Executor
// ============================================================================

/// 세션 하나를 소유하고 복합 작업을 제공하는 실행기
pub struct JobExecutor {
    session: ShellSession,
}

impl JobExecutor {
    pub fn new(scratch_dir: PathBuf) -> Self {
        Self {
            session: ShellSession::new(scratch_dir),
        }
    }

    /// 세션 시작 (스폰 계약: Layer2 참고)
    pub fn start(&mut self, cmd: CommandBuilder) -> Result<(), ShellError> {
        self.session.start(cmd)
    }

    /// 단일 명령 실행
    pub fn run_command(&mut self, command: &str, sink: &mut dyn EventSink) -> i32 {
        self.session.run_command(command, sink)
    }

    /// 세션 종료 (멱등)
    pub fn stop(&mut self) {
        self.session.stop();
    }

    // ========================================================================
    // 환경 변수 내보내기
    // ========================================================================

    /// 환경 변수들을 현재 세션과 이후 서브쉘에 내보내기
    ///
    /// 값을 디코드해 `export NAME=<quoted>` 줄로 모아 스크래치의 `.env`
    /// 파일에 기록한 뒤 세션에서 source하고, 이후에 뜨는 서브쉘도
    /// 물려받도록 `~/.bash_profile`에 source 줄을 덧붙입니다.
    pub fn export_env_vars(&mut self, vars: &[EnvVar], sink: &mut dyn EventSink) -> i32 {
        let directive = "Exporting environment variables";
        let started_at = Utc::now();
        sink.emit(JobEvent::started(directive));

        let exit_code = self.export_env_vars_inner(vars, sink);

        sink.emit(JobEvent::finished(directive, exit_code, started_at, Utc::now()));
        exit_code
    }

    fn export_env_vars_inner(&mut self, vars: &[EnvVar], sink: &mut dyn EventSink) -> i32 {
        let mut env_file = String::new();

        for var in vars {
            sink.emit(JobEvent::output(format!("Exporting {}\n", var.name)));

            let value = match BASE64.decode(&var.value) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    debug!("Failed to decode env var {}: {}", var.name, e);
                    return EXIT_CODE_DECODE_FAILURE;
                }
            };

            env_file.push_str(&format!("export {}={}\n", var.name, shell_quote(&value)));
        }

        let env_path = self.session.scratch_dir().join(".env");
        if std::fs::write(&env_path, env_file).is_err() {
            return EXIT_CODE_STAGING_FAILURE;
        }

        let exit_code = self.run_quiet(&format!("source {}", env_path.display()));
        if exit_code != 0 {
            return exit_code;
        }

        self.run_quiet(&format!(
            "echo 'source {}' >> ~/.bash_profile",
            env_path.display()
        ))
    }

    // ========================================================================
    // 파일 주입
    // ========================================================================

    /// 파일들을 세션 실행 환경에 주입
    ///
    /// 파일마다 네 단계: 디코드 → 스크래치에 스테이징 → 대상 부모
    /// 디렉터리 생성 → 복사 → 모드 설정. 한 단계라도 실패하면 전체
    /// 작업을 중단하고 그 단계의 종료 코드를 보고합니다.
    pub fn inject_files(&mut self, files: &[FileSpec], sink: &mut dyn EventSink) -> i32 {
        let directive = "Injecting Files";
        let started_at = Utc::now();
        sink.emit(JobEvent::started(directive));

        let exit_code = self.inject_files_inner(files, sink);

        sink.emit(JobEvent::finished(directive, exit_code, started_at, Utc::now()));
        exit_code
    }

    fn inject_files_inner(&mut self, files: &[FileSpec], sink: &mut dyn EventSink) -> i32 {
        for file in files {
            sink.emit(JobEvent::output(format!(
                "Injecting {} with file mode {}\n",
                file.path.display(),
                file.mode
            )));

            let content = match BASE64.decode(&file.content) {
                Ok(bytes) => bytes,
                Err(_) => {
                    sink.emit(JobEvent::output(
                        "Failed to decode content of file.\n".to_string(),
                    ));
                    return EXIT_CODE_DECODE_FAILURE;
                }
            };

            let staged_path = self.session.scratch_dir().join("file");
            if let Err(e) = std::fs::write(&staged_path, content) {
                sink.emit(JobEvent::output(format!("{}\n", e)));
                return EXIT_CODE_STAGING_FAILURE;
            }

            let dest_path = destination_path(&file.path);
            let parent = dest_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/"));

            let exit_code = self.run_quiet(&format!("mkdir -p {}", parent.display()));
            if exit_code != 0 {
                sink.emit(JobEvent::output(format!(
                    "Failed to create destination path {}\n",
                    dest_path.display()
                )));
                return exit_code;
            }

            let exit_code = self.run_quiet(&format!(
                "cp {} {}",
                staged_path.display(),
                dest_path.display()
            ));
            if exit_code != 0 {
                sink.emit(JobEvent::output(format!(
                    "Failed to copy to destination path {} {}\n",
                    staged_path.display(),
                    dest_path.display()
                )));
                return exit_code;
            }

            let exit_code = self.run_quiet(&format!(
                "chmod {} {}",
                file.mode,
                dest_path.display()
            ));
            if exit_code != 0 {
                sink.emit(JobEvent::output(format!(
                    "Failed to set file mode to {}\n",
                    file.mode
                )));
                return exit_code;
            }
        }

        0
    }

    /// 이벤트를 버리는 보조 명령 실행
    fn run_quiet(&mut self, command: &str) -> i32 {
        self.session.run_command(command, &mut NullSink)
    }
}

/// 상대 경로 주입 대상을 홈 디렉터리 기준으로 해석
fn destination_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(path)
    }
}

// ============================================================================
// 테스트 (세션이 필요 없는 실패 경로)
// ============================================================================
