//! Night-window evaluation.

use chrono::NaiveTime;
use chrono_tz::Tz;

/// Whether `now` falls inside the auto-response window.
///
/// The window is [20:00, 24:00) ∪ [00:00, 06:00]; both 20:00:00 and
/// 06:00:00 are inclusive boundaries.
pub fn is_night_window(now: NaiveTime) -> bool {
    let night_start = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
    let night_end = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
    now >= night_start || now <= night_end
}

/// Current wall time in the configured timezone.
pub fn local_time(tz: Tz) -> NaiveTime {
    chrono::Utc::now().with_timezone(&tz).time()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_night_start_boundary_inclusive() {
        assert!(is_night_window(at(20, 0, 0)));
    }

    #[test]
    fn test_night_end_boundary_inclusive() {
        assert!(is_night_window(at(6, 0, 0)));
    }

    #[test]
    fn test_just_before_night_start() {
        assert!(!is_night_window(at(19, 59, 59)));
    }

    #[test]
    fn test_just_after_night_end() {
        assert!(!is_night_window(at(6, 0, 1)));
    }

    #[test]
    fn test_late_evening() {
        assert!(is_night_window(at(22, 0, 0)));
        assert!(is_night_window(at(23, 59, 59)));
    }

    #[test]
    fn test_early_morning() {
        assert!(is_night_window(at(0, 0, 0)));
        assert!(is_night_window(at(3, 30, 0)));
    }

    #[test]
    fn test_daytime() {
        assert!(!is_night_window(at(9, 0, 0)));
        assert!(!is_night_window(at(12, 0, 0)));
        assert!(!is_night_window(at(15, 45, 12)));
    }
}
