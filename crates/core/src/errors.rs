use thiserror::Error;

use crate::domain::appointment::AppointmentStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid appointment transition from {from:?} to {to:?}")]
    InvalidAppointmentTransition { from: AppointmentStatus, to: AppointmentStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
