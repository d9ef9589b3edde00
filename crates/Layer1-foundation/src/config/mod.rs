//! Config - 에이전트 설정 관리
//!
//! 컨트롤 플레인 접속 정보와 job 실행에 주입할 호스트 환경을 담습니다.
//! 설정 파일은 TOML이며, CLI 플래그와 같은 키 이름을 사용합니다.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// 설정 키 상수
///
/// CLI 플래그와 설정 파일에서 공통으로 사용합니다.
pub mod keys {
    pub const CONFIG_FILE: &str = "config-file";
    pub const ENDPOINT: &str = "endpoint";
    pub const TOKEN: &str = "token";
    pub const NO_HTTPS: &str = "no-https";
    pub const SHUTDOWN_HOOK_PATH: &str = "shutdown-hook-path";
    pub const DISCONNECT_AFTER_JOB: &str = "disconnect-after-job";
    pub const DISCONNECT_AFTER_IDLE_TIMEOUT: &str = "disconnect-after-idle-timeout";
    pub const ENV_VARS: &str = "env-vars";
    pub const FILES: &str = "files";
    pub const FAIL_ON_MISSING_FILES: &str = "fail-on-missing-files";
}

/// 유효한 설정 키 목록
pub const VALID_CONFIG_KEYS: &[&str] = &[
    keys::CONFIG_FILE,
    keys::ENDPOINT,
    keys::TOKEN,
    keys::NO_HTTPS,
    keys::SHUTDOWN_HOOK_PATH,
    keys::DISCONNECT_AFTER_JOB,
    keys::DISCONNECT_AFTER_IDLE_TIMEOUT,
    keys::ENV_VARS,
    keys::FILES,
    keys::FAIL_ON_MISSING_FILES,
];

// ============================================================================
// Host 환경 주입
// ============================================================================

/// 에이전트 호스트에서 모든 job에 전달되는 환경 변수
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEnvVar {
    pub name: String,
    pub value: String,
}

/// 에이전트 호스트에서 job 환경으로 복사되는 파일
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileInjection {
    /// 호스트 쪽 원본 경로
    pub host_path: PathBuf,

    /// job 환경 내 대상 경로
    pub destination: PathBuf,
}

impl FileInjection {
    /// 호스트 파일이 존재하는지 확인
    pub fn check_file_exists(&self) -> Result<()> {
        std::fs::metadata(&self.host_path)?;
        Ok(())
    }
}

// ============================================================================
// Agent Config
// ============================================================================

/// Hoist 에이전트 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AgentConfig {
    /// 컨트롤 플레인 엔드포인트 (host[:port])
    #[serde(default)]
    pub endpoint: String,

    /// 등록 토큰
    #[serde(default)]
    pub token: String,

    /// https 대신 http 사용
    #[serde(default)]
    pub no_https: bool,

    /// 종료 시 실행할 훅 스크립트 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_hook_path: Option<PathBuf>,

    /// job 하나 실행 후 연결 종료
    #[serde(default)]
    pub disconnect_after_job: bool,

    /// 유휴 시간(초) 경과 후 연결 종료 (0이면 비활성)
    #[serde(default)]
    pub disconnect_after_idle_timeout: u64,

    /// 모든 job에 주입할 호스트 환경 변수
    #[serde(default)]
    pub env_vars: Vec<HostEnvVar>,

    /// 모든 job에 주입할 호스트 파일
    #[serde(default)]
    pub files: Vec<FileInjection>,

    /// 주입 파일이 없으면 job을 실패 처리
    #[serde(default)]
    pub fail_on_missing_files: bool,
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// TOML 설정 파일 로드
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 필수 필드 검증
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(Error::Config("endpoint is required".to_string()));
        }
        if self.token.is_empty() {
            return Err(Error::Config("token is required".to_string()));
        }
        Ok(())
    }

    /// 설정 키가 유효한지 확인
    pub fn is_valid_key(key: &str) -> bool {
        VALID_CONFIG_KEYS.contains(&key)
    }

    /// 주입 파일 존재 여부를 모두 확인
    ///
    /// `fail_on_missing_files`가 켜져 있으면 첫 누락에서 에러를 반환하고,
    /// 꺼져 있으면 경고 로그만 남깁니다.
    pub fn check_files(&self) -> Result<()> {
        for file in &self.files {
            if let Err(e) = file.check_file_exists() {
                if self.fail_on_missing_files {
                    return Err(Error::Config(format!(
                        "missing injected file {}: {}",
                        file.host_path.display(),
                        e
                    )));
                }
                tracing::warn!(
                    "Injected file {} not found, skipping",
                    file.host_path.display()
                );
            }
        }
        Ok(())
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_valid_keys() {
        assert!(AgentConfig::is_valid_key("endpoint"));
        assert!(AgentConfig::is_valid_key("fail-on-missing-files"));
        assert!(!AgentConfig::is_valid_key("endpoints"));
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
endpoint = "hoist.example.com"
token = "secret"
no-https = true
disconnect-after-job = true

[[env-vars]]
name = "CI"
value = "true"

[[files]]
host-path = "/etc/hosts"
destination = "/tmp/hosts"
"#
        )
        .unwrap();

        let config = AgentConfig::load(file.path()).unwrap();
        assert_eq!(config.endpoint, "hoist.example.com");
        assert!(config.no_https);
        assert!(config.disconnect_after_job);
        assert_eq!(config.env_vars.len(), 1);
        assert_eq!(config.env_vars[0].name, "CI");
        assert_eq!(config.files[0].destination, PathBuf::from("/tmp/hosts"));
    }

    #[test]
    fn test_validate_requires_endpoint_and_token() {
        let config = AgentConfig::new();
        assert!(config.validate().is_err());

        let config = AgentConfig {
            endpoint: "hoist.example.com".to_string(),
            token: "secret".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_check_file_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let injection = FileInjection {
            host_path: file.path().to_path_buf(),
            destination: PathBuf::from("/tmp/dest"),
        };
        assert!(injection.check_file_exists().is_ok());

        let missing = FileInjection {
            host_path: PathBuf::from("/nonexistent/definitely-not-here"),
            destination: PathBuf::from("/tmp/dest"),
        };
        assert!(missing.check_file_exists().is_err());
    }
}
