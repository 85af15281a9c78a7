//! Utility functions
//!
//! Elapsed-time formatting for progress messages.

use std::time::Duration;

/// Format a duration into (minutes, seconds) tuple
#[inline]
pub fn format_duration(dur: Duration) -> (u64, u64) {
    let secs = dur.as_secs();
    (secs / 60, secs % 60)
}

/// Elapsed time as shown in progress messages, e.g. "~ 2 min 5 sec"
pub fn format_elapsed(dur: Duration) -> String {
    match format_duration(dur) {
        (0, secs) => format!("~ {} seconds", secs),
        (mins, secs) => format!("~ {} min {} sec", mins, secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_minutes() {
        let dur = Duration::from_secs(125);
        assert_eq!(format_duration(dur), (2, 5));
    }

    #[test]
    fn test_format_elapsed_seconds() {
        assert_eq!(format_elapsed(Duration::from_millis(45_900)), "~ 45 seconds");
    }

    #[test]
    fn test_format_elapsed_minutes() {
        assert_eq!(format_elapsed(Duration::from_secs(125)), "~ 2 min 5 sec");
    }
}
