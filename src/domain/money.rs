use thiserror::Error;

/// Money is stored as integer cents; 1 unit = 100 cents, so 50.00 = 5000.
pub type Cents = i64;

/// Format cents as a decimal string: 5000 -> "50.00", -5 -> "-0.05".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string into cents.
///
/// Accepts "50", "50.5", "50.25" and ".5"; digits past the second decimal
/// place are truncated. A leading '-' is allowed (used for balance adjustments).
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if body.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (units_str, fraction_str) = body.split_once('.').unwrap_or((body, ""));
    if fraction_str.contains('.') {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        parse_digits(units_str).ok_or_else(|| ParseCentsError::InvalidFormat(input.to_string()))?
    };

    let fraction: String = fraction_str.chars().take(2).collect();
    let fraction_cents = match fraction.len() {
        0 => Some(0),
        1 => parse_digits(&fraction).map(|d| d * 10),
        _ => parse_digits(&fraction),
    }
    .ok_or_else(|| ParseCentsError::InvalidFormat(input.to_string()))?;

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction_cents))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.chars().all(|c| c.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Share of `part` in `total` as a percentage clamped to [0, 100].
/// Returns 0 when there is nothing to compare against.
pub fn percent_of(part: Cents, total: Cents) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (part as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid money format: {0}")]
    InvalidFormat(String),
    #[error("amount is too large")]
    Overflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(7), "0.07");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5), "-0.05");
        assert_eq!(format_cents(-123456), "-1234.56");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents("12.3"), Ok(1230));
        assert_eq!(parse_cents("12.34"), Ok(1234));
        assert_eq!(parse_cents(".5"), Ok(50));
        assert_eq!(parse_cents(" 7.999 "), Ok(799));
        assert_eq!(parse_cents("-20.10"), Ok(-2010));
    }

    #[test]
    fn test_parse_cents_without_fraction_digits() {
        assert_eq!(parse_cents("5."), Ok(500));
        assert_eq!(parse_cents("0"), Ok(0));
        assert_eq!(parse_cents("-3"), Ok(-300));
    }

    #[test]
    fn test_parse_cents_rejects_garbage() {
        assert_eq!(parse_cents(""), Err(ParseCentsError::Empty));
        assert_eq!(parse_cents("-"), Err(ParseCentsError::Empty));
        assert!(matches!(parse_cents("abc"), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents("1.2.3"), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents("1,50"), Err(ParseCentsError::InvalidFormat(_))));
        assert!(matches!(parse_cents("+5"), Err(ParseCentsError::InvalidFormat(_))));
        assert_eq!(parse_cents("99999999999999999"), Err(ParseCentsError::Overflow));
    }

    #[test]
    fn test_percent_of_is_clamped() {
        assert_eq!(percent_of(2500, 10000), 25.0);
        assert_eq!(percent_of(15000, 10000), 100.0);
        assert_eq!(percent_of(-10, 10000), 0.0);
        assert_eq!(percent_of(500, 0), 0.0);
    }
}
