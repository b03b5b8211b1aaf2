pub mod config;
pub mod domain;
pub mod errors;
pub mod scheduling;
pub mod timefmt;

pub use chrono;

pub use domain::appointment::{Appointment, AppointmentStatus, AppointmentSummary};
pub use domain::contact::{
    AuthorizationType, Channel, Contact, ContactAuthorization, OptInStatus,
};
pub use domain::ids::{
    AppointmentId, AuthorizationId, ContactId, OrganizationId, ServiceId, StaffMemberId,
};
pub use domain::schedule::{resolve_day_schedule, DaySchedule, Service};
pub use errors::DomainError;
pub use scheduling::interval::{subtract_all, TimeInterval};
pub use scheduling::slots::{compute_available_slots, MemberDay, Slot, SLOT_STEP_MINUTES};
