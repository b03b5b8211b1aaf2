//! Slot generation for one service on one date.
//!
//! The caller resolves schedules (special date over weekday default) and
//! fetches booked appointments; this module does the deterministic part:
//! intersect each staff member's working intervals with the organization's,
//! subtract bookings, walk the free intervals in fixed steps, and keep the
//! single busiest-capacity staff member's slots.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::ids::StaffMemberId;
use crate::scheduling::interval::{subtract_all, TimeInterval};

/// Slots start on a fixed 15-minute grid regardless of service duration.
pub const SLOT_STEP_MINUTES: i64 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub member_id: StaffMemberId,
}

/// One staff member's resolved inputs for the date: working intervals (from
/// the special-date/weekday rule, empty when unavailable or no record exists)
/// and the intervals of their scheduled/confirmed appointments.
#[derive(Clone, Debug)]
pub struct MemberDay {
    pub member_id: StaffMemberId,
    pub working: Vec<TimeInterval>,
    pub booked: Vec<TimeInterval>,
}

/// Computes bookable slots and returns only the staff member with the most of
/// them, sorted by start time. Offering one consistent person avoids fanning
/// a combinatorial set of near-identical options out to the user; the first
/// member processed wins a tie.
pub fn compute_available_slots(
    duration_minutes: u32,
    org_intervals: &[TimeInterval],
    members: &[MemberDay],
) -> Vec<Slot> {
    if duration_minutes == 0 || org_intervals.is_empty() {
        return Vec::new();
    }
    let duration = Duration::minutes(i64::from(duration_minutes));
    let step = Duration::minutes(SLOT_STEP_MINUTES);

    let mut best: Option<Vec<Slot>> = None;
    for member in members {
        let real_work: Vec<TimeInterval> = member
            .working
            .iter()
            .flat_map(|staff| org_intervals.iter().filter_map(|org| staff.intersect(org)))
            .collect();
        let free = subtract_all(real_work, &member.booked);

        let mut slots = Vec::new();
        for interval in &free {
            let mut current = interval.start;
            loop {
                let (slot_end, wrapped) = current.overflowing_add_signed(duration);
                if wrapped != 0 || slot_end > interval.end {
                    break;
                }
                slots.push(Slot { start_time: current, end_time: slot_end, member_id: member.member_id });

                let (next, wrapped) = current.overflowing_add_signed(step);
                if wrapped != 0 {
                    break;
                }
                current = next;
            }
        }

        let replaces = match &best {
            None => !slots.is_empty(),
            Some(held) => slots.len() > held.len(),
        };
        if replaces {
            best = Some(slots);
        }
    }

    let mut slots = best.unwrap_or_default();
    slots.sort_by_key(|slot| slot.start_time);
    slots
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use uuid::Uuid;

    use crate::domain::ids::StaffMemberId;
    use crate::scheduling::interval::TimeInterval;

    use super::{compute_available_slots, MemberDay};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn iv(start: (u32, u32), end: (u32, u32)) -> TimeInterval {
        TimeInterval::new(t(start.0, start.1), t(end.0, end.1)).unwrap()
    }

    fn member(id: u128, working: Vec<TimeInterval>, booked: Vec<TimeInterval>) -> MemberDay {
        MemberDay { member_id: StaffMemberId(Uuid::from_u128(id)), working, booked }
    }

    #[test]
    fn full_open_day_yields_fixed_step_slots() {
        // 09:00-17:00, 30-minute service: starts 09:00 through 16:30 on the
        // 15-minute grid, 31 in total.
        let slots = compute_available_slots(
            30,
            &[iv((9, 0), (17, 0))],
            &[member(1, vec![iv((9, 0), (17, 0))], vec![])],
        );

        assert_eq!(slots.len(), 31);
        assert_eq!(slots.first().unwrap().start_time, t(9, 0));
        assert_eq!(slots.last().unwrap().start_time, t(16, 30));
        assert!(slots.iter().all(|slot| slot.end_time <= t(17, 0)));
    }

    #[test]
    fn booking_blocks_overlapping_slots_only() {
        let slots = compute_available_slots(
            30,
            &[iv((9, 0), (17, 0))],
            &[member(1, vec![iv((9, 0), (17, 0))], vec![iv((10, 0), (10, 30))])],
        );

        let starts: Vec<NaiveTime> = slots.iter().map(|slot| slot.start_time).collect();
        assert!(starts.contains(&t(9, 30)), "slot ending exactly at the booking start stays");
        assert!(starts.contains(&t(10, 30)), "slot starting exactly at the booking end stays");
        assert!(!starts.contains(&t(9, 45)));
        assert!(!starts.contains(&t(10, 0)));
        assert!(!starts.contains(&t(10, 15)));
    }

    #[test]
    fn staff_intervals_are_clipped_to_the_organization() {
        // Staff 08:00-12:00, org 09:00-17:00: nothing before 09:00.
        let slots = compute_available_slots(
            60,
            &[iv((9, 0), (17, 0))],
            &[member(1, vec![iv((8, 0), (12, 0))], vec![])],
        );

        assert_eq!(slots.first().unwrap().start_time, t(9, 0));
        assert!(slots.iter().all(|slot| slot.end_time <= t(12, 0)));
    }

    #[test]
    fn busiest_capacity_member_wins() {
        let slots = compute_available_slots(
            30,
            &[iv((9, 0), (17, 0))],
            &[
                member(1, vec![iv((9, 0), (11, 0))], vec![]),
                member(2, vec![iv((9, 0), (17, 0))], vec![]),
            ],
        );

        assert!(!slots.is_empty());
        assert!(slots.iter().all(|slot| slot.member_id == StaffMemberId(Uuid::from_u128(2))));
    }

    #[test]
    fn first_member_wins_a_tie() {
        let slots = compute_available_slots(
            30,
            &[iv((9, 0), (17, 0))],
            &[
                member(1, vec![iv((9, 0), (11, 0))], vec![]),
                member(2, vec![iv((14, 0), (16, 0))], vec![]),
            ],
        );

        assert!(slots.iter().all(|slot| slot.member_id == StaffMemberId(Uuid::from_u128(1))));
    }

    #[test]
    fn member_without_working_intervals_produces_nothing() {
        let slots = compute_available_slots(
            30,
            &[iv((9, 0), (17, 0))],
            &[member(1, vec![], vec![])],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn duration_longer_than_every_interval_yields_nothing() {
        let slots = compute_available_slots(
            120,
            &[iv((9, 0), (10, 0))],
            &[member(1, vec![iv((9, 0), (10, 0))], vec![])],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn slots_never_cross_a_break() {
        // Org break 13:00-14:00; 60-minute service. No slot may overlap the break.
        let org = [iv((9, 0), (13, 0)), iv((14, 0), (18, 0))];
        let slots = compute_available_slots(
            60,
            &org,
            &[member(1, vec![iv((9, 0), (18, 0))], vec![])],
        );

        let overlaps_break =
            |start: NaiveTime, end: NaiveTime| start < t(14, 0) && end > t(13, 0);
        assert!(!slots.iter().any(|slot| overlaps_break(slot.start_time, slot.end_time)));
        assert!(slots.iter().any(|slot| slot.start_time == t(12, 0)), "12:00 ends at the break");
        assert!(slots.iter().any(|slot| slot.start_time == t(14, 0)));
        assert!(!slots.iter().any(|slot| slot.start_time == t(12, 30)));
    }
}
