use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use reserva_core::timefmt;
use reserva_core::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentSummary, ContactId, OrganizationId,
    ServiceId, StaffMemberId, TimeInterval,
};

use super::schedule::parse_uuid_column;
use super::{AppointmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAppointmentRepository {
    pool: DbPool,
}

impl SqlAppointmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SUMMARY_SELECT: &str = "SELECT a.id, a.appointment_date, a.start_time, a.service_id,
        a.member_id, s.name AS service_name
     FROM appointments a
     JOIN services s ON s.id = a.service_id";

#[async_trait]
impl AppointmentRepository for SqlAppointmentRepository {
    async fn insert(
        &self,
        appointment: &Appointment,
        created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO appointments (
                id, organization_id, contact_id, service_id, member_id,
                appointment_date, start_time, end_time, status, notes,
                created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(appointment.id.0.to_string())
        .bind(appointment.organization_id.0.to_string())
        .bind(appointment.contact_id.0.to_string())
        .bind(appointment.service_id.0.to_string())
        .bind(appointment.member_id.0.to_string())
        .bind(appointment.appointment_date.to_string())
        .bind(timefmt::fmt_hms(appointment.start_time))
        .bind(timefmt::fmt_hms(appointment.end_time))
        .bind(appointment.status.as_str())
        .bind(appointment.notes.as_deref())
        .bind(created_by.0.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, organization_id, contact_id, service_id, member_id,
                    appointment_date, start_time, end_time, status, notes
             FROM appointments WHERE id = ?",
        )
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| appointment_from_row(&value)).transpose()
    }

    async fn booked_intervals(
        &self,
        member_ids: &[StaffMemberId],
        date: NaiveDate,
        exclude: Option<&AppointmentId>,
    ) -> Result<HashMap<StaffMemberId, Vec<TimeInterval>>, RepositoryError> {
        let excluded_id = exclude.map(|id| id.0.to_string()).unwrap_or_default();

        let mut booked: HashMap<StaffMemberId, Vec<TimeInterval>> = HashMap::new();
        for member_id in member_ids {
            let rows = sqlx::query(
                "SELECT start_time, end_time FROM appointments
                 WHERE member_id = ? AND appointment_date = ?
                   AND status IN ('scheduled', 'confirmed')
                   AND id <> ?
                 ORDER BY start_time",
            )
            .bind(member_id.0.to_string())
            .bind(date.to_string())
            .bind(&excluded_id)
            .fetch_all(&self.pool)
            .await?;

            for row in &rows {
                let start = parse_time_value(row.get::<String, _>("start_time"))?;
                let end = parse_time_value(row.get::<String, _>("end_time"))?;
                if let Some(interval) = TimeInterval::new(start, end) {
                    booked.entry(*member_id).or_default().push(interval);
                }
            }
        }

        Ok(booked)
    }

    async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn update_status_if(
        &self,
        id: &AppointmentId,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id.0.to_string())
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn apply_reschedule(
        &self,
        id: &AppointmentId,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        member_id: &StaffMemberId,
        notes: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE appointments
             SET appointment_date = ?, start_time = ?, end_time = ?, member_id = ?,
                 notes = ?, status = 'scheduled'
             WHERE id = ?",
        )
        .bind(date.to_string())
        .bind(timefmt::fmt_hms(start_time))
        .bind(timefmt::fmt_hms(end_time))
        .bind(member_id.0.to_string())
        .bind(notes)
        .bind(id.0.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_for_contact(
        &self,
        contact_id: &ContactId,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
    ) -> Result<Vec<AppointmentSummary>, RepositoryError> {
        let rows = match start_time {
            Some(start) => {
                sqlx::query(&format!(
                    "{SUMMARY_SELECT}
                     WHERE a.contact_id = ? AND a.appointment_date = ?
                       AND a.start_time = ?
                       AND a.status IN ('scheduled', 'confirmed')
                     ORDER BY a.start_time"
                ))
                .bind(contact_id.0.to_string())
                .bind(date.to_string())
                .bind(timefmt::fmt_hms(start))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{SUMMARY_SELECT}
                     WHERE a.contact_id = ? AND a.appointment_date = ?
                       AND a.status IN ('scheduled', 'confirmed')
                     ORDER BY a.start_time"
                ))
                .bind(contact_id.0.to_string())
                .bind(date.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(summary_from_row).collect()
    }

    async fn list_from(
        &self,
        contact_id: &ContactId,
        from_date: NaiveDate,
        from_time: NaiveTime,
    ) -> Result<Vec<AppointmentSummary>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SUMMARY_SELECT}
             WHERE a.contact_id = ?
               AND a.status IN ('scheduled', 'confirmed')
               AND (a.appointment_date > ?
                    OR (a.appointment_date = ? AND a.start_time >= ?))
             ORDER BY a.appointment_date, a.start_time"
        ))
        .bind(contact_id.0.to_string())
        .bind(from_date.to_string())
        .bind(from_date.to_string())
        .bind(timefmt::fmt_hms(from_time))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }
}

fn appointment_from_row(row: &SqliteRow) -> Result<Appointment, RepositoryError> {
    let status_raw = row.get::<String, _>("status");
    let status = AppointmentStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status: {status_raw}")))?;

    Ok(Appointment {
        id: AppointmentId(parse_uuid_column(row, "id")?),
        organization_id: OrganizationId(parse_uuid_column(row, "organization_id")?),
        contact_id: ContactId(parse_uuid_column(row, "contact_id")?),
        service_id: ServiceId(parse_uuid_column(row, "service_id")?),
        member_id: StaffMemberId(parse_uuid_column(row, "member_id")?),
        appointment_date: parse_date_value(row.get::<String, _>("appointment_date"))?,
        start_time: parse_time_value(row.get::<String, _>("start_time"))?,
        end_time: parse_time_value(row.get::<String, _>("end_time"))?,
        status,
        notes: row.get::<Option<String>, _>("notes"),
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<AppointmentSummary, RepositoryError> {
    Ok(AppointmentSummary {
        appointment_id: AppointmentId(parse_uuid_column(row, "id")?),
        appointment_date: parse_date_value(row.get::<String, _>("appointment_date"))?,
        start_time: parse_time_value(row.get::<String, _>("start_time"))?,
        service_id: ServiceId(parse_uuid_column(row, "service_id")?),
        member_id: StaffMemberId(parse_uuid_column(row, "member_id")?),
        service_name: row.get::<String, _>("service_name"),
    })
}

fn parse_time_value(raw: String) -> Result<NaiveTime, RepositoryError> {
    timefmt::parse_time(&raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid time value: {raw}")))
}

fn parse_date_value(raw: String) -> Result<NaiveDate, RepositoryError> {
    timefmt::parse_date(&raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid date value: {raw}")))
}
