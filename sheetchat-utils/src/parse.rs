/// Parse the leading integer of a query-string value the way browsers' `parseInt` does:
/// surrounding whitespace is ignored, an optional sign is accepted and parsing stops at
/// the first non-digit. Returns `None` when no digit is found.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let value = raw.trim_start();
    let bytes = value.as_bytes();
    let mut cursor = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            cursor += 1;
            true
        }
        Some(b'+') => {
            cursor += 1;
            false
        }
        _ => false,
    };

    let digits_start = cursor;
    while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
        cursor += 1;
    }

    if digits_start == cursor {
        return None;
    }

    // Saturate instead of failing on absurdly long digit runs.
    let magnitude = value[digits_start..cursor]
        .parse::<i64>()
        .unwrap_or(i64::MAX);

    Some(if negative { -magnitude } else { magnitude })
}

/// Interpret common truthy spellings (`1`, `true`, `yes`, `on`), case-insensitively.
pub fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Trim a free-text field and drop it entirely when nothing is left.
pub fn non_empty_trimmed(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{is_truthy, non_empty_trimmed, parse_leading_int};

    #[test]
    fn parses_plain_and_signed_integers() {
        assert_eq!(parse_leading_int("42"), Some(42));
        assert_eq!(parse_leading_int("  7"), Some(7));
        assert_eq!(parse_leading_int("+3"), Some(3));
        assert_eq!(parse_leading_int("-5"), Some(-5));
    }

    #[test]
    fn stops_at_first_non_digit() {
        assert_eq!(parse_leading_int("12abc"), Some(12));
        assert_eq!(parse_leading_int("3.9"), Some(3));
    }

    #[test]
    fn rejects_values_without_leading_digits() {
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("x12"), None);
    }

    #[test]
    fn saturates_overlong_numbers() {
        assert_eq!(parse_leading_int("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn truthy_spellings() {
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" on "));
        assert!(is_truthy("1"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn trims_optional_text() {
        assert_eq!(non_empty_trimmed(Some("  sales ")), Some("sales"));
        assert_eq!(non_empty_trimmed(Some("   ")), None);
        assert_eq!(non_empty_trimmed(None), None);
    }
}
