//! Event repository implementation
//!
//! Events are authored by another service, so this repository only reads.

use sqlx::PgPool;

use crate::models::Event;
use crate::utils::errors::AdmissionResult;

const EVENT_COLUMNS: &str = "id, title, location, start_at, end_at, max_attendees, registration_required, registration_deadline, is_active";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> AdmissionResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

}
