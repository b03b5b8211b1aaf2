use async_trait::async_trait;
use sqlx::Row;

use reserva_core::{
    AuthorizationType, Channel, ContactAuthorization, ContactId, StaffMemberId,
};

use super::{AuthorizationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuthorizationRepository {
    pool: DbPool,
}

impl SqlAuthorizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationRepository for SqlAuthorizationRepository {
    async fn latest_active(
        &self,
        contact_id: &ContactId,
        channel: Channel,
    ) -> Result<Option<AuthorizationType>, RepositoryError> {
        let row = sqlx::query(
            "SELECT authorization_type FROM contact_authorizations
             WHERE contact_id = ? AND channel = ? AND is_active = 1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(contact_id.0.to_string())
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| {
            let raw = value.get::<String, _>("authorization_type");
            AuthorizationType::parse(&raw)
                .ok_or_else(|| RepositoryError::Decode(format!("unknown authorization_type: {raw}")))
        })
        .transpose()
    }

    async fn deactivate_active(
        &self,
        contact_id: &ContactId,
        channel: Channel,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE contact_authorizations SET is_active = 0
             WHERE contact_id = ? AND channel = ? AND is_active = 1",
        )
        .bind(contact_id.0.to_string())
        .bind(channel.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert(
        &self,
        authorization: &ContactAuthorization,
        created_by: &StaffMemberId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO contact_authorizations (
                id, contact_id, organization_id, authorization_type,
                channel, is_active, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(authorization.id.0.to_string())
        .bind(authorization.contact_id.0.to_string())
        .bind(authorization.organization_id.0.to_string())
        .bind(authorization.authorization_type.as_str())
        .bind(authorization.channel.as_str())
        .bind(i64::from(authorization.is_active))
        .bind(created_by.0.to_string())
        .bind(authorization.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
