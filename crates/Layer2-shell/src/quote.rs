//! Shell quoting - 환경 파일 생성용 POSIX 인용
//!
//! `export NAME=value` 줄에 값을 안전하게 박아 넣기 위한 최소 인용.
//! 안전 문자 집합 밖의 문자가 하나라도 있으면 작은따옴표로 감싸고,
//! 값 안의 작은따옴표는 `'"'"'`로 끊어서 이어 붙입니다.

use std::sync::OnceLock;

use regex::Regex;

/// 인용 없이 쓸 수 있는 문자 집합의 여집합 (ASCII 한정)
const UNSAFE_PATTERN: &str = r"[^0-9A-Za-z_@%+=:,./-]";

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(UNSAFE_PATTERN).expect("static pattern"))
}

/// 쉘에 안전한 형태로 문자열을 인용
///
/// - 빈 문자열은 명시적 `''`
/// - 안전 문자만 있으면 그대로 반환
/// - 그 외에는 작은따옴표 인용 + 내부 작은따옴표 이스케이프
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    if unsafe_chars().is_match(s) {
        format!("'{}'", s.replace('\'', r#"'"'"'"#))
    } else {
        s.to_string()
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_quotes_to_empty_literal() {
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_safe_values_pass_through() {
        assert_eq!(shell_quote("plain"), "plain");
        assert_eq!(shell_quote("v1.2.3"), "v1.2.3");
        assert_eq!(shell_quote("a@b%c+d=e:f,g.h/i-j"), "a@b%c+d=e:f,g.h/i-j");
        assert_eq!(shell_quote("under_score"), "under_score");
    }

    #[test]
    fn test_unsafe_values_are_quoted() {
        assert_eq!(shell_quote("hello world"), "'hello world'");
        assert_eq!(shell_quote("a;rm -rf /"), "'a;rm -rf /'");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
        assert_eq!(shell_quote("tab\there"), "'tab\there'");
    }

    #[test]
    fn test_non_ascii_values_are_quoted() {
        // 안전 집합은 ASCII뿐이다
        assert_eq!(shell_quote("café"), "'café'");
        assert_eq!(shell_quote("값1"), "'값1'");
    }

    #[test]
    fn test_single_quote_escaping() {
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
    }
}
