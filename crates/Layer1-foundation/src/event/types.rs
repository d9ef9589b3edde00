//! Event Types - Job 실행 중 발생하는 이벤트 타입 정의
//!
//! 세션이 명령을 실행하는 동안 커맨드 경계와 출력을 호출자에게
//! 구조화된 형태로 전달합니다. 한 번 생성된 이벤트는 불변이며,
//! 소유권은 싱크로 넘어갑니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job 실행 이벤트
///
/// `run_command` 한 번당 `CommandStarted` 하나, `CommandOutput` 0개 이상,
/// `CommandFinished` 정확히 하나가 이 순서로 방출됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum JobEvent {
    /// 명령 실행 시작
    #[serde(rename = "cmd_started")]
    CommandStarted {
        /// 실행 중인 명령의 라벨 (명령 텍스트 또는 복합 작업 이름)
        directive: String,
        /// 시작 시각
        timestamp: DateTime<Utc>,
    },

    /// 명령 출력 조각
    #[serde(rename = "cmd_output")]
    CommandOutput {
        /// 출력 텍스트
        output: String,
    },

    /// 명령 실행 종료
    #[serde(rename = "cmd_finished")]
    CommandFinished {
        /// 실행된 명령의 라벨
        directive: String,
        /// 종료 코드 (파싱 실패/스트림 종료 시 1)
        exit_code: i32,
        /// 시작 시각
        started_at: DateTime<Utc>,
        /// 종료 시각
        finished_at: DateTime<Utc>,
    },
}

impl JobEvent {
    /// 명령 시작 이벤트 생성
    pub fn started(directive: impl Into<String>) -> Self {
        Self::CommandStarted {
            directive: directive.into(),
            timestamp: Utc::now(),
        }
    }

    /// 출력 이벤트 생성
    pub fn output(output: impl Into<String>) -> Self {
        Self::CommandOutput {
            output: output.into(),
        }
    }

    /// 명령 종료 이벤트 생성
    pub fn finished(
        directive: impl Into<String>,
        exit_code: i32,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self::CommandFinished {
            directive: directive.into(),
            exit_code,
            started_at,
            finished_at,
        }
    }

    /// 이벤트 종류 문자열 반환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandStarted { .. } => "cmd_started",
            Self::CommandOutput { .. } => "cmd_output",
            Self::CommandFinished { .. } => "cmd_finished",
        }
    }

    /// 종료 이벤트인 경우 exit code 반환
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFinished { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let started = JobEvent::started("echo hello");
        assert_eq!(started.as_str(), "cmd_started");

        let output = JobEvent::output("hello\n");
        assert_eq!(output.as_str(), "cmd_output");
        assert_eq!(output.exit_code(), None);

        let now = Utc::now();
        let finished = JobEvent::finished("echo hello", 0, now, now);
        assert_eq!(finished.as_str(), "cmd_finished");
        assert_eq!(finished.exit_code(), Some(0));
    }

    #[test]
    fn test_event_serde_tag() {
        let event = JobEvent::output("line\n");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "cmd_output");
        assert_eq!(json["output"], "line\n");
    }

    #[test]
    fn test_wire_tags_match_as_str() {
        let now = Utc::now();
        let events = [
            JobEvent::started("ls"),
            JobEvent::output("x\n"),
            JobEvent::finished("ls", 0, now, now),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.as_str());
        }
    }

    #[test]
    fn test_finished_roundtrip() {
        let now = Utc::now();
        let event = JobEvent::finished("make test", 2, now, now);
        let json = serde_json::to_string(&event).unwrap();
        let back: JobEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
