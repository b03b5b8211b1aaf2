//! Half-open wall-clock intervals and the two operations availability
//! computation is built on: pairwise intersection and booking subtraction.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A `[start, end)` range within a single day. Never empty: construction
/// rejects zero-length and inverted ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        TimeInterval::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Removes `booked` from this interval. A booking strictly inside splits
    /// the interval in two, an edge overlap truncates it, and full cover
    /// removes it. Back-to-back ranges do not count as overlapping, so a free
    /// interval may begin exactly where a booking ends.
    pub fn subtract(&self, booked: &TimeInterval) -> Vec<TimeInterval> {
        if !self.overlaps(booked) {
            return vec![*self];
        }

        let mut remaining = Vec::new();
        if let Some(before) = TimeInterval::new(self.start, booked.start) {
            remaining.push(before);
        }
        if let Some(after) = TimeInterval::new(booked.end, self.end) {
            remaining.push(after);
        }
        remaining
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Applies [`TimeInterval::subtract`] for every booked interval in turn.
pub fn subtract_all(free: Vec<TimeInterval>, booked: &[TimeInterval]) -> Vec<TimeInterval> {
    booked.iter().fold(free, |remaining, blocker| {
        remaining.iter().flat_map(|interval| interval.subtract(blocker)).collect()
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::{subtract_all, TimeInterval};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn iv(start: (u32, u32), end: (u32, u32)) -> TimeInterval {
        TimeInterval::new(t(start.0, start.1), t(end.0, end.1)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(TimeInterval::new(t(9, 0), t(9, 0)).is_none());
        assert!(TimeInterval::new(t(10, 0), t(9, 0)).is_none());
    }

    #[test]
    fn intersection_clips_to_the_overlap() {
        let staff = iv((8, 0), (12, 0));
        let org = iv((9, 0), (17, 0));
        assert_eq!(staff.intersect(&org), Some(iv((9, 0), (12, 0))));

        let disjoint = iv((13, 0), (14, 0));
        assert_eq!(staff.intersect(&disjoint), None);
    }

    #[test]
    fn adjacent_intervals_do_not_overlap() {
        let morning = iv((9, 0), (10, 0));
        let next = iv((10, 0), (11, 0));
        assert!(!morning.overlaps(&next));
    }

    #[test]
    fn subtract_splits_on_interior_booking() {
        let free = iv((9, 0), (17, 0));
        let booked = iv((10, 0), (10, 30));
        assert_eq!(free.subtract(&booked), vec![iv((9, 0), (10, 0)), iv((10, 30), (17, 0))]);
    }

    #[test]
    fn subtract_truncates_on_edge_overlap() {
        let free = iv((9, 0), (12, 0));
        assert_eq!(free.subtract(&iv((8, 0), (10, 0))), vec![iv((10, 0), (12, 0))]);
        assert_eq!(free.subtract(&iv((11, 0), (13, 0))), vec![iv((9, 0), (11, 0))]);
    }

    #[test]
    fn subtract_removes_on_full_cover() {
        let free = iv((9, 0), (10, 0));
        assert!(free.subtract(&iv((8, 30), (10, 30))).is_empty());
    }

    #[test]
    fn subtract_all_applies_every_booking() {
        let free = vec![iv((9, 0), (17, 0))];
        let booked = [iv((10, 0), (10, 30)), iv((15, 0), (16, 0))];
        assert_eq!(
            subtract_all(free, &booked),
            vec![iv((9, 0), (10, 0)), iv((10, 30), (15, 0)), iv((16, 0), (17, 0))]
        );
    }
}
