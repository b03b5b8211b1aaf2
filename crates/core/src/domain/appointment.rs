use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{AppointmentId, ContactId, OrganizationId, ServiceId, StaffMemberId};
use crate::errors::DomainError;
use crate::scheduling::interval::TimeInterval;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Only `scheduled` and `confirmed` appointments block slot generation or
    /// show up in listings.
    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    /// Lifecycle rules: scheduled → confirmed, scheduled|confirmed →
    /// cancelled, and a reschedule resets scheduled|confirmed back to
    /// scheduled. Cancelled is terminal.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Confirmed)
                | (Self::Scheduled, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Scheduled, Self::Scheduled)
                | (Self::Confirmed, Self::Scheduled)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub organization_id: OrganizationId,
    pub contact_id: ContactId,
    pub service_id: ServiceId,
    pub member_id: StaffMemberId,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn transition_to(&mut self, next: AppointmentStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidAppointmentTransition { from: self.status, to: next })
    }

    pub fn interval(&self) -> Option<TimeInterval> {
        TimeInterval::new(self.start_time, self.end_time)
    }
}

/// Listing projection used by disambiguation and upcoming-appointment
/// queries; carries the service name for human-readable summaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub appointment_id: AppointmentId,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub service_id: ServiceId,
    pub member_id: StaffMemberId,
    pub service_name: String,
}
