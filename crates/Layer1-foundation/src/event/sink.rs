//! Event Sink - 이벤트 소비자 추상화
//!
//! 세션의 스캔 루프는 싱크를 동기적으로, 방출 순서대로 호출합니다.
//! 싱크는 출력 소비 스레드 위에서 실행되므로 무기한 블록해서는 안 됩니다.

use super::JobEvent;

/// 이벤트 싱크
///
/// 프로토콜과 이벤트 표시/저장 방식을 분리하는 단일 메서드 인터페이스.
pub trait EventSink: Send {
    /// 이벤트 하나를 수신
    fn emit(&mut self, event: JobEvent);
}

/// 클로저도 싱크로 사용 가능
impl<F> EventSink for F
where
    F: FnMut(JobEvent) + Send,
{
    fn emit(&mut self, event: JobEvent) {
        self(event)
    }
}

// ============================================================================
// Null Sink
// ============================================================================

/// 이벤트를 버리는 싱크 (내부 보조 명령용)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: JobEvent) {}
}

// ============================================================================
// In-Memory Sink
// ============================================================================

/// 이벤트를 메모리에 수집하는 싱크
///
/// 테스트와 job 결과 요약에 사용합니다.
#[derive(Debug, Default)]
pub struct InMemorySink {
    events: Vec<JobEvent>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 수집된 이벤트 전체
    pub fn events(&self) -> &[JobEvent] {
        &self.events
    }

    /// 마지막 종료 이벤트의 exit code
    pub fn last_exit_code(&self) -> Option<i32> {
        self.events.iter().rev().find_map(|e| e.exit_code())
    }

    /// 사람이 읽기 좋은 한 줄 요약 목록
    ///
    /// `include_output`이 false면 출력 이벤트는 건너뜁니다.
    pub fn simplified_events(&self, include_output: bool) -> Vec<String> {
        let mut lines = Vec::new();

        for event in &self.events {
            match event {
                JobEvent::CommandStarted { directive, .. } => {
                    lines.push(format!("directive: {}", directive));
                }
                JobEvent::CommandOutput { output } => {
                    if include_output {
                        lines.push(output.clone());
                    }
                }
                JobEvent::CommandFinished { exit_code, .. } => {
                    lines.push(format!("Exit Code: {}", exit_code));
                }
            }
        }

        lines
    }
}

impl EventSink for InMemorySink {
    fn emit(&mut self, event: JobEvent) {
        self.events.push(event);
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_null_sink() {
        let mut sink = NullSink;
        sink.emit(JobEvent::output("discarded"));
    }

    #[test]
    fn test_in_memory_sink_collects_in_order() {
        let mut sink = InMemorySink::new();
        let now = Utc::now();

        sink.emit(JobEvent::started("ls"));
        sink.emit(JobEvent::output("file.txt\n"));
        sink.emit(JobEvent::finished("ls", 0, now, now));

        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.last_exit_code(), Some(0));
    }

    #[test]
    fn test_simplified_events() {
        let mut sink = InMemorySink::new();
        let now = Utc::now();

        sink.emit(JobEvent::started("echo hi"));
        sink.emit(JobEvent::output("hi\n"));
        sink.emit(JobEvent::finished("echo hi", 0, now, now));

        let with_output = sink.simplified_events(true);
        assert_eq!(with_output, vec!["directive: echo hi", "hi\n", "Exit Code: 0"]);

        let without_output = sink.simplified_events(false);
        assert_eq!(without_output, vec!["directive: echo hi", "Exit Code: 0"]);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: JobEvent| seen.push(event.as_str());
            sink.emit(JobEvent::started("pwd"));
            sink.emit(JobEvent::output("/\n"));
        }
        assert_eq!(seen, vec!["cmd_started", "cmd_output"]);
    }
}
