use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use reserva_core::timefmt;
use reserva_core::{DaySchedule, OrganizationId, Service, ServiceId, StaffMemberId};

use super::{RepositoryError, ScheduleRepository};
use crate::DbPool;

pub struct SqlScheduleRepository {
    pool: DbPool,
}

impl SqlScheduleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const DAY_SCHEDULE_COLUMNS: &str =
    "is_available, start_time, end_time, break_start_time, break_end_time";

#[async_trait]
impl ScheduleRepository for SqlScheduleRepository {
    async fn find_service(&self, id: &ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, duration_minutes FROM services WHERE id = ?")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|value| service_from_row(&value)).transpose()
    }

    async fn assigned_staff(
        &self,
        service_id: &ServiceId,
    ) -> Result<Vec<StaffMemberId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT member_id FROM staff_assignments WHERE service_id = ? ORDER BY member_id",
        )
        .bind(service_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| parse_uuid_column(row, "member_id").map(StaffMemberId))
            .collect()
    }

    async fn organization_special_date(
        &self,
        organization_id: &OrganizationId,
        date: NaiveDate,
    ) -> Result<Option<DaySchedule>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DAY_SCHEDULE_COLUMNS} FROM organization_special_dates
             WHERE organization_id = ? AND date = ?"
        ))
        .bind(organization_id.0.to_string())
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| day_schedule_from_row(&value)).transpose()
    }

    async fn organization_weekday(
        &self,
        organization_id: &OrganizationId,
        weekday: u32,
    ) -> Result<Option<DaySchedule>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DAY_SCHEDULE_COLUMNS} FROM organization_availability
             WHERE organization_id = ? AND day_of_week = ?"
        ))
        .bind(organization_id.0.to_string())
        .bind(i64::from(weekday))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| day_schedule_from_row(&value)).transpose()
    }

    async fn staff_special_dates(
        &self,
        member_ids: &[StaffMemberId],
        date: NaiveDate,
    ) -> Result<HashMap<StaffMemberId, DaySchedule>, RepositoryError> {
        let mut schedules = HashMap::new();
        for member_id in member_ids {
            let row = sqlx::query(&format!(
                "SELECT {DAY_SCHEDULE_COLUMNS} FROM staff_special_dates
                 WHERE member_id = ? AND date = ?"
            ))
            .bind(member_id.0.to_string())
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await?;

            if let Some(value) = row {
                schedules.insert(*member_id, day_schedule_from_row(&value)?);
            }
        }
        Ok(schedules)
    }

    async fn staff_weekdays(
        &self,
        member_ids: &[StaffMemberId],
        weekday: u32,
    ) -> Result<HashMap<StaffMemberId, DaySchedule>, RepositoryError> {
        let mut schedules = HashMap::new();
        for member_id in member_ids {
            let row = sqlx::query(&format!(
                "SELECT {DAY_SCHEDULE_COLUMNS} FROM staff_availability
                 WHERE member_id = ? AND day_of_week = ?"
            ))
            .bind(member_id.0.to_string())
            .bind(i64::from(weekday))
            .fetch_optional(&self.pool)
            .await?;

            if let Some(value) = row {
                schedules.insert(*member_id, day_schedule_from_row(&value)?);
            }
        }
        Ok(schedules)
    }
}

fn service_from_row(row: &SqliteRow) -> Result<Service, RepositoryError> {
    let duration = row.get::<i64, _>("duration_minutes");
    let duration_minutes = u32::try_from(duration)
        .map_err(|_| RepositoryError::Decode(format!("invalid duration_minutes: {duration}")))?;

    Ok(Service {
        id: ServiceId(parse_uuid_column(row, "id")?),
        name: row.get::<String, _>("name"),
        duration_minutes,
    })
}

fn day_schedule_from_row(row: &SqliteRow) -> Result<DaySchedule, RepositoryError> {
    Ok(DaySchedule {
        is_available: row.get::<i64, _>("is_available") != 0,
        start_time: parse_time_column(row, "start_time")?,
        end_time: parse_time_column(row, "end_time")?,
        break_start_time: parse_time_column(row, "break_start_time")?,
        break_end_time: parse_time_column(row, "break_end_time")?,
    })
}

fn parse_time_column(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<chrono::NaiveTime>, RepositoryError> {
    match row.get::<Option<String>, _>(column) {
        None => Ok(None),
        Some(raw) => timefmt::parse_time(&raw)
            .map(Some)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid time in `{column}`: {raw}"))),
    }
}

pub(crate) fn parse_uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, RepositoryError> {
    let raw = row.get::<String, _>(column);
    Uuid::parse_str(&raw)
        .map_err(|_| RepositoryError::Decode(format!("invalid uuid in `{column}`: {raw}")))
}
