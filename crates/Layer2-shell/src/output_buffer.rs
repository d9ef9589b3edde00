//! Output Buffer - UTF-8 경계를 보존하는 크기/시간 이중 임계값 버퍼
//!
//! PTY에서 읽은 바이트는 문자 경계나 줄 경계에 맞춰 도착하지 않습니다.
//! 이 버퍼는 무제한 바이트 스트림을 다음 두 규칙으로 조각냅니다:
//!
//! - 크기 임계값: 버퍼가 `cut_length` 이상이면 즉시, 문자 경계를 넘지
//!   않는 최대 지점에서 잘라 반환
//! - 시간 임계값: 크기에 못 미쳐도 마지막 플러시 후
//!   `max_time_since_last_flush`가 지나면 잔여 전체를 반환
//!
//! 조각은 원시 바이트(`Vec<u8>`)로 반환됩니다. 입력이 유효한 UTF-8이면
//! 조각 경계가 문자를 가르지 않으므로 조각 단위 `from_utf8_lossy`가
//! 무손실이고, 입력이 깨진 바이트열이어도 조각을 이어 붙이면 원본이
//! 비트 단위로 복원됩니다 (버려지는 바이트 없음).

use std::time::{Duration, Instant};

/// 크기 임계값 기본치 (bytes)
pub const DEFAULT_CUT_LENGTH: usize = 100;

/// 마지막 플러시 이후 허용하는 최대 유휴 시간
pub const MAX_TIME_SINCE_LAST_FLUSH: Duration = Duration::from_millis(100);

/// 출력 청킹 버퍼
#[derive(Debug)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    cut_length: usize,
    max_time_since_last_flush: Duration,
    last_flush: Instant,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CUT_LENGTH, MAX_TIME_SINCE_LAST_FLUSH)
    }

    /// 임계값을 지정해 생성 (테스트 및 튜닝용)
    pub fn with_limits(cut_length: usize, max_time_since_last_flush: Duration) -> Self {
        Self {
            bytes: Vec::new(),
            cut_length,
            max_time_since_last_flush,
            last_flush: Instant::now(),
        }
    }

    /// 원시 바이트 추가. 길이 제한 없음, 항상 성공.
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// 조각 하나 생성 시도
    ///
    /// - 버퍼 길이 ≥ `cut_length`: 문자 경계를 지키는 최대 지점에서 절단
    /// - 길이 미달이어도 유휴 시간 초과: 잔여 전체 반환
    /// - 그 외: `None` (호출자는 대기 후 재시도)
    ///
    /// 성공할 때마다 유휴 타이머가 리셋됩니다. 빈 버퍼는 항상 `None`.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.bytes.is_empty() {
            return None;
        }

        if self.bytes.len() >= self.cut_length {
            let cut = self.cut_point();
            let fragment: Vec<u8> = self.bytes.drain(..cut).collect();
            self.last_flush = Instant::now();
            return Some(fragment);
        }

        if self.last_flush.elapsed() >= self.max_time_since_last_flush {
            let fragment = std::mem::take(&mut self.bytes);
            self.last_flush = Instant::now();
            return Some(fragment);
        }

        None
    }

    /// 임계값을 무시하고 버퍼 전체를 경계 안전한 조각들로 배출
    ///
    /// 명령 종료 시점에 사용합니다. 유휴 타이머를 기다리면 finish 마커를
    /// 이미 읽고도 지연이 생기므로, 여기서는 시간 규칙 없이 자릅니다.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut fragments = Vec::new();

        while self.bytes.len() > self.cut_length {
            let cut = self.cut_point();
            fragments.push(self.bytes.drain(..cut).collect());
        }

        if !self.bytes.is_empty() {
            fragments.push(std::mem::take(&mut self.bytes));
        }

        self.last_flush = Instant::now();
        fragments
    }

    /// 버퍼에 남은 바이트가 없는지
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 버퍼에 남은 바이트 수
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `cut_length` 이하에서 문자 경계에 맞는 최대 절단 오프셋
    ///
    /// 멀티바이트 시퀀스는 최대 4바이트이므로 `cut_length`에서 뒤로
    /// 최대 3바이트까지 물러나며 조각이 유효한 UTF-8이 되는 첫 지점을
    /// 찾습니다. 못 찾으면 입력 자체가 유효한 UTF-8이 아니므로
    /// `cut_length` 그대로 자릅니다 (바이트는 어차피 보존됨).
    fn cut_point(&self) -> usize {
        let limit = self.cut_length.min(self.bytes.len());
        // 빈 조각은 진전을 만들지 못하므로 0까지는 물러나지 않는다
        let floor = limit.saturating_sub(3).max(1);

        for cut in (floor..=limit).rev() {
            if std::str::from_utf8(&self.bytes[..cut]).is_ok() {
                return cut;
            }
        }

        limit
    }
}

// ============================================================================
// 테스트
// ============================================================================
