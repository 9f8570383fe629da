//! Daily time-window partitioning for incremental extraction
//!
//! A sync run covers the span from a stream's bookmark (or the configured
//! default start) up to a target captured once at loop entry. The span is
//! walked in contiguous, strictly increasing steps of at most 24 hours so
//! that each step is a bounded query and a resumable unit of work.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

/// One bounded time range, treated as half-open `[start, end)` by the
/// queries built from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Window start (inclusive)
    pub start: DateTime<Tz>,
    /// Window end; never exceeds the partitioner's target
    pub end: DateTime<Tz>,
}

/// Iterator producing successive daily windows covering `[start, target)`
///
/// Each window is exactly 24 hours except possibly the last, which is
/// clipped to the target. Produces nothing when `start >= target`.
pub struct DayWindows {
    cursor: DateTime<Tz>,
    target: DateTime<Tz>,
}

impl DayWindows {
    /// Partition the span from `start` to `target`
    pub fn new(start: DateTime<Tz>, target: DateTime<Tz>) -> Self {
        Self {
            cursor: start,
            target,
        }
    }
}

impl Iterator for DayWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.cursor >= self.target {
            return None;
        }
        let start = self.cursor;
        let end = (start + Duration::days(1)).min(self.target);
        self.cursor = end;
        Some(Window { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::API_TIMEZONE;
    use chrono::TimeZone;

    fn pacific(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
        API_TIMEZONE.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_windows_are_contiguous_and_bounded() {
        let start = pacific(2023, 1, 1, 0, 0, 0);
        let target = pacific(2023, 1, 10, 7, 30, 0);
        let windows: Vec<Window> = DayWindows::new(start, target).collect();

        assert_eq!(windows[0].start, start);
        assert_eq!(windows.last().unwrap().end, target);
        for pair in windows.windows(2) {
            assert_eq!(pair[1].start, pair[0].end, "windows must be contiguous");
            assert!(pair[1].start > pair[0].start, "windows must increase");
        }
        for w in &windows {
            assert!(w.end - w.start <= Duration::days(1));
            assert!(w.end > w.start);
        }
    }

    #[test]
    fn test_last_window_clipped_to_target() {
        let start = pacific(2023, 1, 1, 0, 0, 0);
        let target = pacific(2023, 1, 2, 12, 0, 0);
        let windows: Vec<Window> = DayWindows::new(start, target).collect();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, pacific(2023, 1, 1, 0, 0, 0));
        assert_eq!(windows[0].end, pacific(2023, 1, 2, 0, 0, 0));
        assert_eq!(windows[1].start, pacific(2023, 1, 2, 0, 0, 0));
        assert_eq!(windows[1].end, target);
    }

    #[test]
    fn test_start_at_target_produces_nothing() {
        let start = pacific(2023, 5, 1, 8, 0, 0);
        assert_eq!(DayWindows::new(start, start).count(), 0);
    }

    #[test]
    fn test_start_past_target_produces_nothing() {
        let start = pacific(2023, 5, 2, 0, 0, 0);
        let target = pacific(2023, 5, 1, 0, 0, 0);
        assert_eq!(DayWindows::new(start, target).count(), 0);
    }

    #[test]
    fn test_sub_day_span_is_single_clipped_window() {
        let start = pacific(2023, 5, 1, 6, 0, 0);
        let target = pacific(2023, 5, 1, 18, 0, 0);
        let windows: Vec<Window> = DayWindows::new(start, target).collect();

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, start);
        assert_eq!(windows[0].end, target);
    }
}
