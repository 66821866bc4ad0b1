//! Attendance repository implementation

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::AttendanceRecord;
use crate::utils::errors::AdmissionResult;

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_event(&self, event_id: i64) -> AdmissionResult<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(
            "SELECT id, event_id, user_id, registration_id, status, check_in_at, check_out_at FROM attendance_records WHERE event_id = $1"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Insert a record or update its progress
    pub async fn upsert(conn: &mut PgConnection, record: &AttendanceRecord) -> AdmissionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records (id, event_id, user_id, registration_id, status, check_in_at, check_out_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET registration_id = EXCLUDED.registration_id,
                status = EXCLUDED.status,
                check_in_at = EXCLUDED.check_in_at,
                check_out_at = EXCLUDED.check_out_at
            "#
        )
        .bind(record.id)
        .bind(record.event_id)
        .bind(record.user_id)
        .bind(record.registration_id)
        .bind(record.status.as_str())
        .bind(record.check_in_at)
        .bind(record.check_out_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AdmissionResult<()> {
        sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}
