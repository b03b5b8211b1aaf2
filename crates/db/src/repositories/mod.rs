use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use reserva_core::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentSummary, AuthorizationType, Channel,
    Contact, ContactAuthorization, ContactId, DaySchedule, OrganizationId, Service, ServiceId,
    StaffMemberId, TimeInterval,
};

pub mod appointment;
pub mod authorization;
pub mod contact;
pub mod memory;
pub mod schedule;

pub use appointment::SqlAppointmentRepository;
pub use authorization::SqlAuthorizationRepository;
pub use contact::SqlContactRepository;
pub use memory::{
    InMemoryAppointmentRepository, InMemoryAuthorizationRepository, InMemoryContactRepository,
    InMemoryScheduleRepository,
};
pub use schedule::SqlScheduleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-only configuration data: services, who performs them, and the
/// weekday/special-date availability rows for organizations and staff.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn find_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError>;

    /// Staff assigned to a service, in a stable order.
    async fn assigned_staff(
        &self,
        service_id: &ServiceId,
    ) -> Result<Vec<StaffMemberId>, RepositoryError>;

    async fn organization_special_date(
        &self,
        organization_id: &OrganizationId,
        date: NaiveDate,
    ) -> Result<Option<DaySchedule>, RepositoryError>;

    /// `weekday` is ISO (1 = Monday .. 7 = Sunday).
    async fn organization_weekday(
        &self,
        organization_id: &OrganizationId,
        weekday: u32,
    ) -> Result<Option<DaySchedule>, RepositoryError>;

    async fn staff_special_dates(
        &self,
        member_ids: &[StaffMemberId],
        date: NaiveDate,
    ) -> Result<HashMap<StaffMemberId, DaySchedule>, RepositoryError>;

    async fn staff_weekdays(
        &self,
        member_ids: &[StaffMemberId],
        weekday: u32,
    ) -> Result<HashMap<StaffMemberId, DaySchedule>, RepositoryError>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(
        &self,
        appointment: &Appointment,
        created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError>;

    /// Intervals of `scheduled`/`confirmed` appointments per member on a
    /// date; `exclude` drops one appointment (a reschedule ignores its own
    /// row).
    async fn booked_intervals(
        &self,
        member_ids: &[StaffMemberId],
        date: NaiveDate,
        exclude: Option<&AppointmentId>,
    ) -> Result<HashMap<StaffMemberId, Vec<TimeInterval>>, RepositoryError>;

    /// Unconditional status update; returns affected rows.
    async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<u64, RepositoryError>;

    /// Status update guarded on the current status; returns affected rows.
    async fn update_status_if(
        &self,
        id: &AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<u64, RepositoryError>;

    /// Applies a reschedule in one write: new date/times/member/notes and
    /// status reset to `scheduled`. Returns affected rows.
    async fn apply_reschedule(
        &self,
        id: &AppointmentId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        member_id: &StaffMemberId,
        notes: &str,
    ) -> Result<u64, RepositoryError>;

    /// A contact's live appointments on a date, optionally narrowed to an
    /// exact start time, ordered by start time.
    async fn find_for_contact(
        &self,
        contact_id: &ContactId,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
    ) -> Result<Vec<AppointmentSummary>, RepositoryError>;

    /// A contact's live appointments from `from_date` onward; entries on
    /// `from_date` itself must start at or after `from_time`.
    async fn list_from(
        &self,
        contact_id: &ContactId,
        from_date: NaiveDate,
        from_time: NaiveTime,
    ) -> Result<Vec<AppointmentSummary>, RepositoryError>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_phone(
        &self,
        organization_id: &OrganizationId,
        phone: &str,
        country_code: &str,
    ) -> Result<Option<ContactId>, RepositoryError>;

    async fn insert(
        &self,
        contact: &Contact,
        created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// The most recent active authorization for a contact+channel, if any.
    async fn latest_active(
        &self,
        contact_id: &ContactId,
        channel: Channel,
    ) -> Result<Option<AuthorizationType>, RepositoryError>;

    /// Deactivates every active row for the contact+channel. Must run before
    /// inserting a replacement so two active rows never coexist.
    async fn deactivate_active(
        &self,
        contact_id: &ContactId,
        channel: Channel,
    ) -> Result<u64, RepositoryError>;

    async fn insert(
        &self,
        authorization: &ContactAuthorization,
        created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError>;
}
