//! Input rules shared by create and update.

use crate::error::{TaskError, TaskResult};

/// Maximum task text length, in characters, after trimming.
pub const MAX_TEXT_CHARS: usize = 500;

/// Trim and check task text. Returns the text that should be stored.
pub fn normalize_text(raw: &str) -> TaskResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskError::invalid_value("text", "Task text must not be empty"));
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(TaskError::invalid_value(
            "text",
            format!("Task text must not exceed {} characters", MAX_TEXT_CHARS),
        ));
    }
    Ok(trimmed.to_string())
}

/// A duration, when present, is a positive number of days.
pub fn validate_duration(days: Option<i64>) -> TaskResult<()> {
    match days {
        Some(d) if d < 1 => Err(TaskError::invalid_value(
            "duration_days",
            format!("duration_days must be a positive number of days, got {}", d),
        )),
        _ => Ok(()),
    }
}

/// Parse a task id from a path segment. Only plain positive decimal integers
/// are accepted.
pub fn parse_task_id(raw: &str) -> TaskResult<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TaskError::invalid_id(raw));
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TaskError::invalid_id(raw)),
    }
}

/// Reject non-positive ids handed straight to the repository.
pub fn ensure_task_id(id: i64) -> TaskResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(TaskError::invalid_id(&id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn text_is_trimmed() {
        assert_eq!(normalize_text("  buy milk \n").unwrap(), "buy milk");
    }

    #[test]
    fn blank_text_is_rejected() {
        for raw in ["", "   ", "\t\n"] {
            let err = normalize_text(raw).unwrap_err();
            assert_eq!(err.field(), Some("text"));
        }
    }

    #[test]
    fn length_limit_applies_after_trim() {
        let exact = "x".repeat(MAX_TEXT_CHARS);
        assert!(normalize_text(&exact).is_ok());
        assert!(normalize_text(&format!("   {}   ", exact)).is_ok());
        assert!(normalize_text(&"x".repeat(MAX_TEXT_CHARS + 1)).is_err());
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        let accented = "é".repeat(MAX_TEXT_CHARS);
        assert!(accented.len() > MAX_TEXT_CHARS);
        assert!(normalize_text(&accented).is_ok());
    }

    #[test]
    fn duration_must_be_positive() {
        assert!(validate_duration(None).is_ok());
        assert!(validate_duration(Some(1)).is_ok());
        assert!(validate_duration(Some(0)).is_err());
        assert!(validate_duration(Some(-3)).is_err());
    }

    #[test]
    fn parses_plain_positive_ids() {
        assert_eq!(parse_task_id("42").unwrap(), 42);
        assert_eq!(parse_task_id("007").unwrap(), 7);
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["", "abc", "0", "-1", "+1", " 1", "1.5", "99999999999999999999"] {
            let err = parse_task_id(raw).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidId, "input {:?}", raw);
        }
    }
}
