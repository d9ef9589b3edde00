//! Shell Session - 마커 기반 명령 실행 프로토콜
//!
//! PTY에 붙은 장수 대화형 쉘 하나를 소유하고, 공유 터미널 바이트
//! 스트림만으로 명령 경계와 종료 코드를 복원합니다.
//!
//! 프레이밍은 전부 인밴드 텍스트 마커로 이루어집니다:
//!
//! 1. 명령 텍스트를 스크래치 파일에 기록 (멀티라인 명령이 쉘의
//!    라인 편집/에코와 얽히지 않도록)
//! 2. `echo '<start>'; source <file>; JOB_CMD_RESULT=$?;`
//!    `echo "<finish> $JOB_CMD_RESULT"; echo "exit $JOB_CMD_RESULT"|sh`
//!    를 한 번의 쓰기로 주입 (중간 출력에 의해 재배열되지 않도록)
//! 3. 출력 라인을 스캔: start 마커 전 라인은 버리고, 이후 라인은
//!    OutputBuffer를 거쳐 `CommandOutput`으로 방출, finish 마커에서
//!    종료 코드를 파싱
//!
//! 마커는 세션/명령마다 런타임에 생성되는 고엔트로피 랜덤 토큰이라
//! 실제 출력과 충돌하지 않습니다.
//!
//! 한 세션에서 동시에 여러 명령을 실행하는 것은 의미가 없습니다
//! (공유 스트림은 역다중화할 수 없음). `&mut self`가 단일 명령
//! 원칙을 컴파일 타임에 강제합니다.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use portable_pty::{native_pty_system, Child, CommandBuilder, PtyPair, PtySize};
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use hoist_foundation::{EventSink, JobEvent};

use crate::error::ShellError;
use crate::output_buffer::OutputBuffer;

/// 스크래치 디렉터리 안의 명령 스테이징 파일명
pub const COMMAND_FILE_NAME: &str = "current-job-cmd";

/// 스테이징(파일 기록) 실패 시 보고하는 종료 코드
pub const EXIT_CODE_STAGING_FAILURE: i32 = 255;

const PTY_ROWS: u16 = 24;
const PTY_COLS: u16 = 120;

/// 기본 대화형 쉘 스폰 커맨드
///
/// 스폰 계약: 어떤 커맨드든 PTY에 붙은 대화형 쉘을 만들어내면
/// 세션은 그 스트림 쌍만 소비합니다 (docker compose 래핑은 Layer3 참고).
pub fn bash_login_command() -> CommandBuilder {
    let mut cmd = CommandBuilder::new("bash");
    cmd.arg("--login");
    cmd.env("TERM", "xterm-256color");
    cmd
}

/// PTY 기반 대화형 쉘 세션
///
/// job 하나당 한 번 생성·시작되고, job 종료 시 `stop()`으로 정확히
/// 한 번 종료됩니다. 종료 후 재사용은 불가능합니다.
pub struct ShellSession {
    /// 컨트롤러와 쉘 양쪽에서 보이는 스테이징 디렉터리
    scratch_dir: PathBuf,

    /// PTY pair (master + slave)
    pty: Option<PtyPair>,

    /// 쉘 프로세스 핸들
    child: Option<Box<dyn Child + Send + Sync>>,

    /// 쉘 입력 스트림
    writer: Option<Box<dyn Write + Send>>,

    /// 쉘 출력 스트림 (라인 스캔용)
    reader: Option<BufReader<Box<dyn Read + Send>>>,
}

impl ShellSession {
    /// 세션 생성 (아직 프로세스는 시작하지 않음)
    pub fn new(scratch_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            pty: None,
            child: None,
            writer: None,
            reader: None,
        }
    }

    /// 스테이징 디렉터리 경로
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// 쉘 프로세스가 살아 있는 세션인지
    pub fn is_started(&self) -> bool {
        self.child.is_some()
    }

    /// 쉘 서브프로세스를 PTY에 붙여 시작하고, 준비 핸드셰이크를 수행
    ///
    /// 핸드셰이크는 프롬프트(`PS1`)를 비우고 터미널 드라이버 수준에서
    /// 입력 에코를 끈 뒤(`stty -echo`), 스크래치 디렉터리로 이동하고,
    /// 준비 마커가 출력에 나타날 때까지 블록합니다. 이후의 모든 명령
    /// 파싱에서 에코 노이즈와 예측 불가능한 프롬프트가 제거됩니다.
    ///
    /// 준비 마커 판정은 트리밍한 라인의 완전 일치입니다. 에코가 아직
    /// 켜져 있는 시점이라 입력 자체가 되돌아오는데, 되돌아온 라인은
    /// 따옴표를 포함하므로(`echo '<mark>'`) 완전 일치에 걸리지 않습니다.
    pub fn start(&mut self, cmd: CommandBuilder) -> Result<(), ShellError> {
        if self.is_started() {
            return Err(ShellError::SessionAlreadyRunning);
        }

        std::fs::create_dir_all(&self.scratch_dir)?;

        let pty_system = native_pty_system();
        let pty = pty_system
            .openpty(PtySize {
                rows: PTY_ROWS,
                cols: PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ShellError::PtyCreationFailed(format!("Failed to open PTY: {}", e)))?;

        let child = pty
            .slave
            .spawn_command(cmd)
            .map_err(|e| ShellError::ShellSpawnFailed(format!("Failed to spawn shell: {}", e)))?;

        let writer = pty
            .master
            .take_writer()
            .map_err(|e| ShellError::PtyCreationFailed(format!("Failed to take writer: {}", e)))?;

        let reader = pty
            .master
            .try_clone_reader()
            .map_err(|e| ShellError::PtyCreationFailed(format!("Failed to clone reader: {}", e)))?;

        self.pty = Some(pty);
        self.child = Some(child);
        self.writer = Some(writer);
        self.reader = Some(BufReader::new(reader));

        let ready_mark = Uuid::new_v4().simple().to_string();
        let handshake = format!(
            "export PS1=''\nstty -echo\ncd '{}'\necho '{}'\n",
            self.scratch_dir.display(),
            ready_mark
        );

        debug!("Starting shell session handshake");
        self.write_input(&handshake)?;

        loop {
            match self.read_line_lossy()? {
                Some(line) => {
                    debug!("(tty) {}", line);
                    if line.trim() == ready_mark {
                        break;
                    }
                }
                None => {
                    self.stop();
                    return Err(ShellError::HandshakeFailed(
                        "stream closed before readiness marker".to_string(),
                    ));
                }
            }
        }

        debug!("Shell session ready, scratch dir {}", self.scratch_dir.display());
        Ok(())
    }

    /// 명령 하나를 실행하고 종료 코드를 반환
    ///
    /// 이벤트 계약: 호출 한 번당 `CommandFinished`가 정확히 하나,
    /// 항상 마지막에 방출됩니다. 죽은 세션에서도 예외가 아닙니다 —
    /// 스트림이 finish 마커 없이 끝나면 종료 코드는 실패 초기값(1)으로
    /// 남고 finished 이벤트는 그대로 나갑니다.
    pub fn run_command(&mut self, command: &str, sink: &mut dyn EventSink) -> i32 {
        debug!("Running command: {}", command);

        let started_at = Utc::now();
        let exit_code = self.run_command_inner(command, sink);

        sink.emit(JobEvent::finished(command, exit_code, started_at, Utc::now()));
        exit_code
    }

    fn run_command_inner(&mut self, command: &str, sink: &mut dyn EventSink) -> i32 {
        let cmd_file = self.scratch_dir.join(COMMAND_FILE_NAME);

        // 멀티라인 명령은 start/finish 마커 스킴과 얽히므로 파일로 우회
        if let Err(e) = std::fs::write(&cmd_file, command) {
            sink.emit(JobEvent::started(command));
            sink.emit(JobEvent::output(format!("Failed to stage command: {}\n", e)));
            return EXIT_CODE_STAGING_FAILURE;
        }

        let start_mark = Uuid::new_v4().simple().to_string();
        let finish_mark = Uuid::new_v4().simple().to_string();

        // 다섯 단계를 한 번의 쓰기로 주입:
        // start 마커 출력 → 파일 source → 종료 코드 캡처 →
        // finish 마커 + 코드 출력 → 캡처한 코드로 명시적 exit
        let framed = [
            format!("echo '{}'", start_mark),
            format!("source {}", cmd_file.display()),
            "JOB_CMD_RESULT=$?".to_string(),
            format!("echo \"{} $JOB_CMD_RESULT\"", finish_mark),
            "echo \"exit $JOB_CMD_RESULT\"|sh".to_string(),
        ]
        .join(";")
            + "\n";

        if let Err(e) = self.write_input(&framed) {
            sink.emit(JobEvent::started(command));
            sink.emit(JobEvent::output(format!("Failed to run command: {}\n", e)));
            return 1;
        }

        let mut scanner = CommandScanner::new(start_mark, finish_mark);

        loop {
            let line = match self.read_line_lossy() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    warn!("Shell stream ended before finish marker");
                    break;
                }
                Err(e) => {
                    warn!("Shell stream read failed: {}", e);
                    break;
                }
            };

            debug!("(tty) {}", line);

            if let Some(exit_code) = scanner.feed(&line, command, sink) {
                return exit_code;
            }
        }

        // 스트림 종료 경로: 모아둔 출력은 버리지 않는다
        scanner.finish(sink);
        1
    }

    /// 쉘 프로세스 강제 종료 (멱등, best-effort)
    ///
    /// 실행 중이던 `run_command`는 스트림 종료를 관찰하고 실패 경로로
    /// 해소됩니다. 종료 에러는 삼킵니다.
    pub fn stop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill() {
                debug!("Failed to kill shell process (already dead?): {}", e);
            }
        }
        self.child = None;
        self.writer = None;
        self.reader = None;
        self.pty = None;
    }

    fn write_input(&mut self, input: &str) -> Result<(), ShellError> {
        let writer = self.writer.as_mut().ok_or(ShellError::SessionNotStarted)?;
        writer.write_all(input.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// 출력 스트림에서 라인 하나를 읽는다 (블로킹)
    ///
    /// EOF면 `Ok(None)`. PTY는 바이트 지향이므로 UTF-8이 아닐 수 있어
    /// lossy 변환하고, 꼬리의 `\r\n`을 제거합니다.
    fn read_line_lossy(&mut self) -> Result<Option<String>, ShellError> {
        let reader = self.reader.as_mut().ok_or(ShellError::SessionNotStarted)?;

        let mut raw = Vec::new();
        let n = reader.read_until(b'\n', &mut raw)?;
        if n == 0 {
            return Ok(None);
        }

        let mut line = String::from_utf8_lossy(&raw).into_owned();
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Command Scanner
// ============================================================================

/// 출력 라인 스캔 상태 기계
///
/// 마커 프레이밍 관찰만 담당하고 PTY I/O는 세션이 가집니다.
/// start 마커 전 라인은 버리고, 이후 라인은 OutputBuffer를 거쳐
/// `CommandOutput`으로 방출하며, finish 마커 라인에서 종료 코드를
/// 파싱해 돌려줍니다.
struct CommandScanner {
    start_mark: String,
    finish_mark: String,
    finish_re: Regex,
    streaming: bool,
    buffer: OutputBuffer,
}

impl CommandScanner {
    /// 마커가 16진수 토큰이므로 패턴은 항상 유효
    fn new(start_mark: String, finish_mark: String) -> Self {
        let finish_re =
            Regex::new(&format!("{} (\\d+)", finish_mark)).expect("finish marker pattern");
        Self {
            start_mark,
            finish_mark,
            finish_re,
            streaming: false,
            buffer: OutputBuffer::new(),
        }
    }

    /// 라인 하나를 소화. finish 마커를 만나면 `Some(exit_code)`.
    fn feed(&mut self, line: &str, command: &str, sink: &mut dyn EventSink) -> Option<i32> {
        if !self.streaming {
            // start 마커 전 라인은 전부 버린다
            if line.contains(&self.start_mark) {
                self.streaming = true;
                sink.emit(JobEvent::started(command));
            }
            return None;
        }

        if line.contains(&self.finish_mark) {
            Self::emit_fragments(self.buffer.drain(), sink);

            let exit_code = match self
                .finish_re
                .captures(line)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<i32>().ok())
            {
                Some(code) => code,
                None => {
                    sink.emit(JobEvent::output(
                        "Failed to read command exit code\n".to_string(),
                    ));
                    1
                }
            };
            return Some(exit_code);
        }

        self.buffer.append(line.as_bytes());
        self.buffer.append(b"\n");
        while let Some(fragment) = self.buffer.flush() {
            sink.emit(JobEvent::output(
                String::from_utf8_lossy(&fragment).into_owned(),
            ));
        }
        None
    }

    /// 스트림 종료 경로: 모아둔 출력은 버리지 않는다
    fn finish(&mut self, sink: &mut dyn EventSink) {
        Self::emit_fragments(self.buffer.drain(), sink);
    }

    fn emit_fragments(fragments: Vec<Vec<u8>>, sink: &mut dyn EventSink) {
        for fragment in fragments {
            sink.emit(JobEvent::output(
                String::from_utf8_lossy(&fragment).into_owned(),
            ));
        }
    }
}

// ============================================================================
// 테스트 (스캐너 단위)
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_foundation::InMemorySink;

    fn scanner() -> CommandScanner {
        CommandScanner::new("startmark0001".to_string(), "finishmark0001".to_string())
    }

    fn outputs(sink: &InMemorySink) -> Vec<String> {
        sink.events()
            .iter()
            .filter_map(|e| match e {
                JobEvent::CommandOutput { output } => Some(output.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scanner_parses_exit_code() {
        let mut scanner = scanner();
        let mut sink = InMemorySink::new();

        assert_eq!(scanner.feed("login noise", "ls", &mut sink), None);
        assert_eq!(scanner.feed("startmark0001", "ls", &mut sink), None);
        assert_eq!(scanner.feed("file.txt", "ls", &mut sink), None);
        assert_eq!(scanner.feed("finishmark0001 42", "ls", &mut sink), Some(42));

        assert_eq!(outputs(&sink), vec!["file.txt\n"]);
    }

    #[test]
    fn test_scanner_discards_lines_before_start_mark() {
        let mut scanner = scanner();
        let mut sink = InMemorySink::new();

        scanner.feed("leaked prompt", "pwd", &mut sink);
        scanner.feed("more noise", "pwd", &mut sink);
        assert!(sink.events().is_empty());

        scanner.feed("startmark0001", "pwd", &mut sink);
        assert!(matches!(
            sink.events().first(),
            Some(JobEvent::CommandStarted { .. })
        ));
    }

    #[test]
    fn test_scanner_corrupt_finish_line_forces_exit_one() {
        // finish 마커는 있지만 종료 코드가 깨진 라인
        let mut scanner = scanner();
        let mut sink = InMemorySink::new();

        scanner.feed("startmark0001", "true", &mut sink);
        scanner.feed("partial output", "true", &mut sink);
        let exit_code = scanner.feed("finishmark0001 garbage", "true", &mut sink);

        assert_eq!(exit_code, Some(1));

        // 진단 이벤트 전에 모아둔 출력이 먼저 배출된다
        let lines = outputs(&sink);
        assert_eq!(
            lines,
            vec![
                "partial output\n".to_string(),
                "Failed to read command exit code\n".to_string()
            ]
        );
    }

    #[test]
    fn test_scanner_stream_end_keeps_buffered_output() {
        let mut scanner = scanner();
        let mut sink = InMemorySink::new();

        scanner.feed("startmark0001", "cat", &mut sink);
        scanner.feed("tail without newline marker", "cat", &mut sink);
        scanner.finish(&mut sink);

        assert_eq!(outputs(&sink), vec!["tail without newline marker\n"]);
    }
}
