use taskdeck_common::{Error, Result};

pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Priorities run from 0 (none) to 3 (high).
pub const MAX_PRIORITY: i64 = 3;

/// Input validation and sanitization for task fields.
pub struct InputValidator;

impl InputValidator {
    /// Strip control characters. Line breaks and tabs become spaces since a
    /// task description is a single line.
    pub fn sanitize(input: &str) -> String {
        input
            .chars()
            .filter_map(|c| match c {
                '\n' | '\r' | '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect()
    }

    /// Sanitize and trim a description, rejecting blank or over-long text.
    pub fn validate_description(input: &str) -> Result<String> {
        let cleaned = Self::sanitize(input);
        let trimmed = cleaned.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation(
                "task description cannot be empty".into(),
            ));
        }
        let chars = trimmed.chars().count();
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(Error::Validation(format!(
                "task description too long ({chars} characters, max {MAX_DESCRIPTION_CHARS})"
            )));
        }
        Ok(trimmed.to_string())
    }

    pub fn validate_priority(priority: i64) -> Result<i64> {
        if !(0..=MAX_PRIORITY).contains(&priority) {
            return Err(Error::Validation(format!(
                "priority must be between 0 and {MAX_PRIORITY}, got {priority}"
            )));
        }
        Ok(priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_control_chars_and_flattens_line_breaks() {
        let input = "hello\u{0000}\u{001F}\r\n\tworld";
        assert_eq!(InputValidator::sanitize(input), "hello   world");
    }

    #[test]
    fn description_is_trimmed() {
        assert_eq!(
            InputValidator::validate_description("  water the plants \n").unwrap(),
            "water the plants"
        );
    }

    #[test]
    fn blank_descriptions_are_rejected() {
        for blank in ["", "   ", "\n\t", "\u{0007}"] {
            let err = InputValidator::validate_description(blank).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{blank:?}");
        }
    }

    #[test]
    fn length_limit_counts_characters_not_bytes() {
        let at_limit = "я".repeat(MAX_DESCRIPTION_CHARS);
        assert!(InputValidator::validate_description(&at_limit).is_ok());

        let too_long = "a".repeat(MAX_DESCRIPTION_CHARS + 1);
        let err = InputValidator::validate_description(&too_long).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn priority_bounds() {
        assert_eq!(InputValidator::validate_priority(0).unwrap(), 0);
        assert_eq!(InputValidator::validate_priority(MAX_PRIORITY).unwrap(), 3);
        assert!(InputValidator::validate_priority(-1).is_err());
        assert!(InputValidator::validate_priority(4).is_err());
    }
}
