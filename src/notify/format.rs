//! Human-readable formatting for notification text.

/// Formats a millisecond duration as hours and minutes.
///
/// 90 minutes renders as "1h 30m", 45 minutes as "45m", exact hours
/// as "2h".
pub fn format_duration(ms: i64) -> String {
    let total_minutes = ms.max(0) / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 && minutes > 0 {
        format!("{}h {}m", hours, minutes)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

/// Rounds a millisecond duration to whole minutes.
pub fn minutes_rounded(ms: i64) -> i64 {
    (ms.max(0) as f64 / 60_000.0).round() as i64
}

/// Formats a millisecond target as hours with one decimal place,
/// dropping a trailing ".0" ("1h", "1.5h").
pub fn goal_hours(target_ms: i64) -> String {
    let hours = target_ms.max(0) as f64 / 3_600_000.0;
    let formatted = format!("{:.1}", hours);
    let trimmed = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{}h", trimmed)
}

/// Renders stored underscore names for display ("deep_work" -> "deep work").
pub fn display_name(raw: &str) -> String {
    raw.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_convention() {
        assert_eq!(format_duration(5_400_000), "1h 30m");
        assert_eq!(format_duration(2_700_000), "45m");
        assert_eq!(format_duration(7_200_000), "2h");
        assert_eq!(format_duration(59_999), "0m");
        assert_eq!(format_duration(-5), "0m");
    }

    #[test]
    fn test_minutes_rounded() {
        assert_eq!(minutes_rounded(1_500_000), 25);
        assert_eq!(minutes_rounded(89_000), 1);
        assert_eq!(minutes_rounded(111_000), 2);
        assert_eq!(minutes_rounded(0), 0);
    }

    #[test]
    fn test_goal_hours_strips_trailing_zero() {
        assert_eq!(goal_hours(3_600_000), "1h");
        assert_eq!(goal_hours(5_400_000), "1.5h");
        assert_eq!(goal_hours(4_680_000), "1.3h");
        assert_eq!(goal_hours(0), "0h");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("short_break"), "short break");
        assert_eq!(display_name("development"), "development");
    }
}
