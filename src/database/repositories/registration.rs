//! Registration repository implementation

use sqlx::{PgConnection, PgPool};

use crate::models::Registration;
use crate::utils::errors::AdmissionResult;

#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All registrations of an event, cancelled ones included, oldest first
    pub async fn list_for_event(&self, event_id: i64) -> AdmissionResult<Vec<Registration>> {
        let registrations = sqlx::query_as::<_, Registration>(
            "SELECT id, event_id, user_id, status, created_at FROM registrations WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// Insert a registration or update its status
    pub async fn upsert(conn: &mut PgConnection, registration: &Registration) -> AdmissionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO registrations (id, event_id, user_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status
            "#
        )
        .bind(registration.id)
        .bind(registration.event_id)
        .bind(registration.user_id)
        .bind(registration.status.as_str())
        .bind(registration.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }
}
