use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::domain::ids::ServiceId;
use crate::scheduling::interval::TimeInterval;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: u32,
}

/// One availability row: either a weekday default or a special-date override,
/// for an organization or a staff member. The same shape backs all four
/// tables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub is_available: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub break_start_time: Option<NaiveTime>,
    pub break_end_time: Option<NaiveTime>,
}

impl DaySchedule {
    pub fn open(start: NaiveTime, end: NaiveTime) -> Self {
        Self { is_available: true, start_time: Some(start), end_time: Some(end), ..Self::default() }
    }

    pub fn open_with_break(
        start: NaiveTime,
        end: NaiveTime,
        break_start: NaiveTime,
        break_end: NaiveTime,
    ) -> Self {
        Self {
            is_available: true,
            start_time: Some(start),
            end_time: Some(end),
            break_start_time: Some(break_start),
            break_end_time: Some(break_end),
        }
    }

    pub fn closed() -> Self {
        Self::default()
    }

    /// Working intervals for the day, net of the break. A closed day or a row
    /// without a full window yields nothing; a break splits the window into a
    /// before-break and an after-break interval. Degenerate intervals are
    /// discarded.
    pub fn working_intervals(&self) -> Vec<TimeInterval> {
        if !self.is_available {
            return Vec::new();
        }
        let (Some(start), Some(end)) = (self.start_time, self.end_time) else {
            return Vec::new();
        };

        match (self.break_start_time, self.break_end_time) {
            (Some(break_start), Some(break_end)) => {
                [TimeInterval::new(start, break_start), TimeInterval::new(break_end, end)]
                    .into_iter()
                    .flatten()
                    .collect()
            }
            _ => TimeInterval::new(start, end).into_iter().collect(),
        }
    }
}

/// Special-date rows always win over the weekday default; an explicit closed
/// override must not fall back to the weekday window.
pub fn resolve_day_schedule(
    special_date: Option<DaySchedule>,
    weekday_default: Option<DaySchedule>,
) -> Option<DaySchedule> {
    special_date.or(weekday_default)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{resolve_day_schedule, DaySchedule};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn closed_day_has_no_intervals() {
        assert!(DaySchedule::closed().working_intervals().is_empty());
    }

    #[test]
    fn open_day_without_break_is_one_interval() {
        let intervals = DaySchedule::open(t(9, 0), t(17, 0)).working_intervals();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start, t(9, 0));
        assert_eq!(intervals[0].end, t(17, 0));
    }

    #[test]
    fn break_splits_the_window() {
        let intervals = DaySchedule::open_with_break(t(9, 0), t(18, 0), t(13, 0), t(14, 0))
            .working_intervals();
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (t(9, 0), t(13, 0)));
        assert_eq!((intervals[1].start, intervals[1].end), (t(14, 0), t(18, 0)));
    }

    #[test]
    fn break_at_the_window_edge_drops_the_empty_side() {
        let intervals = DaySchedule::open_with_break(t(9, 0), t(18, 0), t(9, 0), t(10, 0))
            .working_intervals();
        assert_eq!(intervals.len(), 1);
        assert_eq!((intervals[0].start, intervals[0].end), (t(10, 0), t(18, 0)));
    }

    #[test]
    fn available_row_without_window_yields_nothing() {
        let schedule = DaySchedule { is_available: true, ..DaySchedule::default() };
        assert!(schedule.working_intervals().is_empty());
    }

    #[test]
    fn special_date_wins_even_when_closed() {
        let weekday = Some(DaySchedule::open(t(9, 0), t(17, 0)));
        let special = Some(DaySchedule::closed());

        let resolved = resolve_day_schedule(special, weekday.clone()).unwrap();
        assert!(!resolved.is_available);

        let fallback = resolve_day_schedule(None, weekday).unwrap();
        assert!(fallback.is_available);

        assert_eq!(resolve_day_schedule(None, None), None);
    }
}
