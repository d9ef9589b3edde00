//! 세션 통합 테스트 - 실제 bash를 PTY로 띄워 마커 프로토콜 검증
//!
//! `cargo test -p hoist-shell --test session_test -- --nocapture`

#![cfg(unix)]

use hoist_foundation::{InMemorySink, JobEvent};
use hoist_shell::{bash_login_command, ShellSession};

fn started_session() -> (ShellSession, tempfile::TempDir) {
    let scratch = tempfile::tempdir().expect("tempdir");
    let mut session = ShellSession::new(scratch.path().to_path_buf());
    session.start(bash_login_command()).expect("start failed");
    (session, scratch)
}

fn combined_output(sink: &InMemorySink) -> String {
    sink.events()
        .iter()
        .filter_map(|e| match e {
            JobEvent::CommandOutput { output } => Some(output.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_echo_command() {
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    let exit_code = session.run_command("echo Hello World", &mut sink);

    assert_eq!(exit_code, 0);
    assert!(combined_output(&sink).contains("Hello World"));
    session.stop();
}

#[test]
fn test_event_ordering() {
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    session.run_command("echo one", &mut sink);

    let events = sink.events();
    assert!(
        matches!(events.first(), Some(JobEvent::CommandStarted { directive, .. }) if directive == "echo one")
    );
    assert!(
        matches!(events.last(), Some(JobEvent::CommandFinished { exit_code: 0, .. }))
    );

    // started와 finished는 정확히 하나씩
    let started = events
        .iter()
        .filter(|e| matches!(e, JobEvent::CommandStarted { .. }))
        .count();
    let finished = events
        .iter()
        .filter(|e| matches!(e, JobEvent::CommandFinished { .. }))
        .count();
    assert_eq!(started, 1);
    assert_eq!(finished, 1);
    session.stop();
}

#[test]
fn test_nonzero_exit_code() {
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    let exit_code = session.run_command("bash -c 'exit 7'", &mut sink);

    assert_eq!(exit_code, 7);
    assert_eq!(sink.last_exit_code(), Some(7));
    session.stop();
}

#[test]
fn test_large_exit_code() {
    // 두 자리 이상 종료 코드도 온전히 파싱되어야 한다
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    let exit_code = session.run_command("bash -c 'exit 42'", &mut sink);
    assert_eq!(exit_code, 42);
    session.stop();
}

#[test]
fn test_multiline_command() {
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    let exit_code = session.run_command("echo first\necho second", &mut sink);

    assert_eq!(exit_code, 0);
    let output = combined_output(&sink);
    assert!(output.contains("first"));
    assert!(output.contains("second"));
    session.stop();
}

#[test]
fn test_utf8_output() {
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    let exit_code = session.run_command("echo 출력 검증 특", &mut sink);

    assert_eq!(exit_code, 0);
    assert!(combined_output(&sink).contains("출력 검증 특"));
    session.stop();
}

#[test]
fn test_state_persists_between_commands() {
    // 장수 세션: 환경과 작업 디렉터리가 명령 사이에 유지된다
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    assert_eq!(session.run_command("export MARKER_TEST=alive", &mut sink), 0);
    assert_eq!(session.run_command("echo value=$MARKER_TEST", &mut sink), 0);

    assert!(combined_output(&sink).contains("value=alive"));
    session.stop();
}

#[test]
fn test_stopped_session_still_emits_finished() {
    let (mut session, _scratch) = started_session();
    let mut sink = InMemorySink::new();

    session.stop();
    // stop은 멱등
    session.stop();

    let exit_code = session.run_command("echo ghost", &mut sink);

    assert_eq!(exit_code, 1);
    let finished = sink
        .events()
        .iter()
        .filter(|e| matches!(e, JobEvent::CommandFinished { .. }))
        .count();
    assert_eq!(finished, 1);
    assert_eq!(sink.last_exit_code(), Some(1));
}

#[test]
fn test_sequential_commands_do_not_bleed() {
    let (mut session, _scratch) = started_session();

    let mut first = InMemorySink::new();
    session.run_command("echo alpha", &mut first);

    let mut second = InMemorySink::new();
    session.run_command("echo beta", &mut second);

    assert!(combined_output(&first).contains("alpha"));
    assert!(!combined_output(&first).contains("beta"));
    assert!(combined_output(&second).contains("beta"));
    assert!(!combined_output(&second).contains("alpha"));
    session.stop();
}
