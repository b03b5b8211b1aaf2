use async_trait::async_trait;
use chrono::Utc;

use reserva_core::{Contact, ContactId, OrganizationId, StaffMemberId};

use super::schedule::parse_uuid_column;
use super::{ContactRepository, RepositoryError};
use crate::DbPool;

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_by_phone(
        &self,
        organization_id: &OrganizationId,
        phone: &str,
        country_code: &str,
    ) -> Result<Option<ContactId>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id FROM contacts
             WHERE organization_id = ? AND phone = ? AND country_code = ?",
        )
        .bind(organization_id.0.to_string())
        .bind(phone)
        .bind(country_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| parse_uuid_column(&value, "id").map(ContactId)).transpose()
    }

    async fn insert(
        &self,
        contact: &Contact,
        created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO contacts (
                id, organization_id, phone, country_code,
                first_name, last_name, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(contact.id.0.to_string())
        .bind(contact.organization_id.0.to_string())
        .bind(&contact.phone)
        .bind(&contact.country_code)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(created_by.0.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
