use serde::Serialize;
use sqlx::{Executor, Row};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Deterministic demo dataset used by `reserva seed` and the integration
/// tests: one organization open on weekdays, two staff members, two services.
pub struct DemoSeedDataset;

const SEED_SERVICE_IDS: &[&str] = &[
    "11111111-1111-4111-8111-111111111111",
    "22222222-2222-4222-8222-222222222222",
];

const SEED_ORGANIZATION_ID: &str = "99999999-9999-4999-8999-999999999999";

#[derive(Debug, Serialize)]
pub struct SeedReport {
    pub services: i64,
    pub staff_assignments: i64,
    pub availability_rows: i64,
    pub contacts: i64,
}

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(Self::SQL).await?;
        tx.commit().await?;

        Self::verify(pool).await
    }

    /// Confirms the seed landed; the counts double as the seed contract.
    pub async fn verify(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
        let services = count(pool, "SELECT COUNT(*) AS count FROM services").await?;
        let staff_assignments =
            count(pool, "SELECT COUNT(*) AS count FROM staff_assignments").await?;
        let availability_rows = count(
            pool,
            "SELECT (SELECT COUNT(*) FROM organization_availability)
                  + (SELECT COUNT(*) FROM staff_availability) AS count",
        )
        .await?;
        let contacts = count(pool, "SELECT COUNT(*) AS count FROM contacts").await?;

        if services < SEED_SERVICE_IDS.len() as i64 {
            return Err(RepositoryError::Decode(format!(
                "seed verification failed: expected at least {} services, found {services}",
                SEED_SERVICE_IDS.len()
            )));
        }

        Ok(SeedReport { services, staff_assignments, availability_rows, contacts })
    }

    pub fn organization_id() -> &'static str {
        SEED_ORGANIZATION_ID
    }
}

async fn count(pool: &DbPool, sql: &str) -> Result<i64, RepositoryError> {
    Ok(sqlx::query(sql).fetch_one(pool).await?.get::<i64, _>("count"))
}
