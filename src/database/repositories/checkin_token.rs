//! Check-in token repository implementation

use sqlx::{PgConnection, PgPool};

use crate::models::CheckinToken;
use crate::utils::errors::AdmissionResult;

#[derive(Debug, Clone)]
pub struct CheckinTokenRepository {
    pool: PgPool,
}

impl CheckinTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_event(&self, event_id: i64) -> AdmissionResult<Vec<CheckinToken>> {
        let tokens = sqlx::query_as::<_, CheckinToken>(
            "SELECT id, event_id, issued_at, expires_at, revoked FROM checkin_tokens WHERE event_id = $1 ORDER BY issued_at ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    /// Insert a token or update its revocation flag
    pub async fn upsert(conn: &mut PgConnection, token: &CheckinToken) -> AdmissionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO checkin_tokens (id, event_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET revoked = EXCLUDED.revoked
            "#
        )
        .bind(&token.id)
        .bind(token.event_id)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(conn)
        .await?;

        Ok(())
    }
}
