use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use reserva_core::{AppointmentId, ContactId, OrganizationId, ServiceId, Slot, StaffMemberId};

/// Per-turn snapshot of everything the conversation has established so far.
/// The snapshot is never mutated in place: each tool reports its effects as a
/// [`ContextPatch`] and [`ConversationContext::apply`] produces the next
/// turn's snapshot, so there is exactly one writer per field per turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub organization_id: Option<OrganizationId>,
    /// Full platform identifier as delivered by the chat gateway.
    pub phone: Option<String>,
    /// National number and dial code, split by the gateway.
    pub phone_number: Option<String>,
    pub country_code: Option<String>,
    pub contact_id: Option<ContactId>,
    pub service_id: Option<ServiceId>,
    pub service_name: Option<String>,
    /// Slots last offered to the user; a booking must pick one of these.
    pub available_slots: Vec<Slot>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<NaiveTime>,
    pub selected_member_id: Option<StaffMemberId>,
    /// The appointment currently under discussion (cancel/confirm/reschedule).
    pub focused_appointment_id: Option<AppointmentId>,
}

/// Explicit diff produced by a tool call. `clear_booking` runs first, then
/// the set fields overwrite.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPatch {
    pub contact_id: Option<ContactId>,
    pub service_id: Option<ServiceId>,
    pub service_name: Option<String>,
    pub available_slots: Option<Vec<Slot>>,
    pub selected_date: Option<NaiveDate>,
    pub selected_time: Option<NaiveTime>,
    pub selected_member_id: Option<StaffMemberId>,
    pub focused_appointment_id: Option<AppointmentId>,
    pub clear_booking: bool,
}

impl ContextPatch {
    /// Drops the in-flight booking state (offered slots and the selection)
    /// when the user changes topic mid-flow.
    pub fn reset_booking() -> Self {
        Self { clear_booking: true, ..Self::default() }
    }
}

impl ConversationContext {
    pub fn apply(&self, patch: &ContextPatch) -> ConversationContext {
        let mut next = self.clone();

        if patch.clear_booking {
            next.available_slots.clear();
            next.selected_date = None;
            next.selected_time = None;
            next.selected_member_id = None;
        }

        if let Some(contact_id) = patch.contact_id {
            next.contact_id = Some(contact_id);
        }
        if let Some(service_id) = patch.service_id {
            next.service_id = Some(service_id);
        }
        if let Some(service_name) = &patch.service_name {
            next.service_name = Some(service_name.clone());
        }
        if let Some(available_slots) = &patch.available_slots {
            next.available_slots = available_slots.clone();
        }
        if let Some(selected_date) = patch.selected_date {
            next.selected_date = Some(selected_date);
        }
        if let Some(selected_time) = patch.selected_time {
            next.selected_time = Some(selected_time);
        }
        if let Some(selected_member_id) = patch.selected_member_id {
            next.selected_member_id = Some(selected_member_id);
        }
        if let Some(focused_appointment_id) = patch.focused_appointment_id {
            next.focused_appointment_id = Some(focused_appointment_id);
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use uuid::Uuid;

    use reserva_core::{ServiceId, Slot, StaffMemberId};

    use super::{ContextPatch, ConversationContext};

    fn slot(h: u32) -> Slot {
        Slot {
            start_time: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(h, 30, 0).unwrap(),
            member_id: StaffMemberId(Uuid::from_u128(7)),
        }
    }

    #[test]
    fn apply_returns_a_new_snapshot() {
        let original = ConversationContext::default();
        let patch = ContextPatch {
            service_id: Some(ServiceId(Uuid::from_u128(1))),
            service_name: Some("Manicure".to_string()),
            ..ContextPatch::default()
        };

        let next = original.apply(&patch);

        assert_eq!(original, ConversationContext::default(), "snapshot is immutable");
        assert_eq!(next.service_id, Some(ServiceId(Uuid::from_u128(1))));
        assert_eq!(next.service_name.as_deref(), Some("Manicure"));
    }

    #[test]
    fn unset_fields_survive_a_patch() {
        let mut base = ConversationContext::default();
        base.service_name = Some("Masaje".to_string());
        base.available_slots = vec![slot(9)];

        let next = base.apply(&ContextPatch {
            selected_date: Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            ..ContextPatch::default()
        });

        assert_eq!(next.service_name.as_deref(), Some("Masaje"));
        assert_eq!(next.available_slots.len(), 1);
        assert!(next.selected_date.is_some());
    }

    #[test]
    fn reset_booking_clears_the_slot_selection_only() {
        let mut base = ConversationContext::default();
        base.service_name = Some("Masaje".to_string());
        base.available_slots = vec![slot(9), slot(10)];
        base.selected_date = Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        base.selected_time = Some(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        base.selected_member_id = Some(StaffMemberId(Uuid::from_u128(7)));

        let next = base.apply(&ContextPatch::reset_booking());

        assert!(next.available_slots.is_empty());
        assert_eq!(next.selected_date, None);
        assert_eq!(next.selected_time, None);
        assert_eq!(next.selected_member_id, None);
        assert_eq!(next.service_name.as_deref(), Some("Masaje"), "service choice survives");
    }

    #[test]
    fn clear_runs_before_sets_in_the_same_patch() {
        let mut base = ConversationContext::default();
        base.available_slots = vec![slot(9)];

        let patch = ContextPatch {
            clear_booking: true,
            available_slots: Some(vec![slot(14), slot(15)]),
            ..ContextPatch::default()
        };
        let next = base.apply(&patch);

        assert_eq!(next.available_slots, vec![slot(14), slot(15)]);
    }
}
