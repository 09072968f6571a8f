//! Display helpers for elapsed and total time labels.

/// Format seconds as `m:ss`.
///
/// Minutes are unbounded (`75:03`); fractions are truncated. Negative and
/// non-finite input renders as `0:00`.
///
/// ```
/// use core_playback::format::format_time;
///
/// assert_eq!(format_time(65.9), "1:05");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(3.0), "0:03");
        assert_eq!(format_time(59.999), "0:59");
        assert_eq!(format_time(60.0), "1:00");
        assert_eq!(format_time(4503.0), "75:03");
    }

    #[test]
    fn guards_invalid_input() {
        assert_eq!(format_time(-1.0), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }
}
