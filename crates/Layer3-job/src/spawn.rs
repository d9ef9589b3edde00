//! 컨테이너 쉘 스폰 명령 빌더
//!
//! docker compose 서비스 안에서 로그인 bash를 띄우는 CommandBuilder를
//! 조립합니다. 스크래치 디렉터리는 read-only로 마운트해 세션 스테이징
//! 파일(명령 파일, .env, 주입 파일)을 컨테이너 안에서 읽을 수 있게
//! 합니다.

use std::path::Path;

use portable_pty::CommandBuilder;

/// docker compose 서비스에서 bash를 실행하는 스폰 명령
pub fn docker_compose_command(
    manifest: &Path,
    scratch_dir: &Path,
    service: &str,
) -> CommandBuilder {
    let manifest_arg = manifest.display().to_string();
    let volume_arg = format!("{0}:{0}:ro", scratch_dir.display());

    let mut cmd = CommandBuilder::new("docker");
    cmd.args([
        "compose",
        "-f",
        manifest_arg.as_str(),
        "run",
        "-v",
        volume_arg.as_str(),
        service,
        "bash",
    ]);
    cmd.env("TERM", "xterm-256color");
    cmd
}
