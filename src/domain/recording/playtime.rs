//! Displayed duration and clock formatting

/// Pick the duration to show for a recording.
///
/// Priority: embedded metadata, then the value reported by the decoder,
/// then the capture timer. Non-finite or non-positive values count as absent.
/// Never yields anything but a whole number of seconds; `0` when nothing is known.
pub fn resolve_duration(metadata: Option<f64>, decoded: Option<f64>, timer: Option<u64>) -> u64 {
    let usable = |value: Option<f64>| value.filter(|v| v.is_finite() && *v > 0.0);

    if let Some(secs) = usable(metadata).or_else(|| usable(decoded)) {
        return secs.round() as u64;
    }
    timer.unwrap_or(0)
}

/// Format seconds as `MM:SS`; invalid input renders as `00:00`
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_wins() {
        assert_eq!(resolve_duration(Some(42.0), Some(17.0), Some(5)), 42);
    }

    #[test]
    fn decoded_when_metadata_absent() {
        assert_eq!(resolve_duration(None, Some(17.0), Some(5)), 17);
    }

    #[test]
    fn timer_when_both_absent() {
        assert_eq!(resolve_duration(None, None, Some(5)), 5);
    }

    #[test]
    fn zero_when_everything_invalid() {
        assert_eq!(resolve_duration(None, None, None), 0);
        assert_eq!(resolve_duration(Some(f64::NAN), Some(f64::INFINITY), None), 0);
    }

    #[test]
    fn invalid_values_fall_through() {
        assert_eq!(resolve_duration(Some(f64::INFINITY), Some(17.4), Some(5)), 17);
        assert_eq!(resolve_duration(Some(0.0), Some(f64::NAN), Some(5)), 5);
        assert_eq!(resolve_duration(Some(-3.0), None, Some(0)), 0);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(65.0), "01:05");
        assert_eq!(format_clock(1800.0), "30:00");
        assert_eq!(format_clock(59.9), "00:59");
    }

    #[test]
    fn clock_handles_invalid_input() {
        assert_eq!(format_clock(f64::NAN), "00:00");
        assert_eq!(format_clock(f64::INFINITY), "00:00");
        assert_eq!(format_clock(-1.0), "00:00");
    }
}
