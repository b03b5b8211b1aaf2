pub mod appointment;
pub mod contact;
pub mod ids;
pub mod schedule;
