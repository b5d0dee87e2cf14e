use chrono::{DateTime, Utc};

/// Format a whole-unit amount with grouped thousands: `12500, "XOF"` gives
/// `12 500 FCFA`.
pub fn format_amount(amount: i64, currency: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    let unit = match currency {
        "XOF" | "XAF" => "FCFA",
        other => other,
    };
    format!("{}{} {}", sign, grouped, unit)
}

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%d %b %Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0, "XOF"), "0 FCFA");
        assert_eq!(format_amount(950, "XOF"), "950 FCFA");
        assert_eq!(format_amount(12500, "XOF"), "12 500 FCFA");
        assert_eq!(format_amount(1234567, "EUR"), "1 234 567 EUR");
        assert_eq!(format_amount(-2000, "XOF"), "-2 000 FCFA");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Attiéké poisson", 10), "Attiéké...");
    }

    #[test]
    fn test_format_optional_and_timestamp() {
        assert_eq!(format_optional(&None, "-"), "-");
        assert_eq!(format_optional(&Some("x".to_string()), "-"), "x");
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 18, 5, 0).unwrap();
        assert_eq!(format_timestamp(&at), "09 Mar 2024 18:05");
    }
}
