//! Database service layer
//!
//! Postgres-backed [`AdmissionStore`] and [`EventCatalog`]. Each changeset is
//! committed in one transaction, in the order the writes were planned, which
//! keeps the partial unique indexes satisfied: revocations and cancellations
//! always precede the rows that replace them.

use async_trait::async_trait;
use tracing::debug;

use crate::admission::store::{AdmissionStore, Changeset, EventCatalog, StoredEventState, Write};
use crate::database::{
    AttendanceRepository, CheckinTokenRepository, DatabasePool, EventRepository, RegistrationRepository,
};
use crate::models::Event;
use crate::utils::errors::AdmissionResult;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
    pub attendance: AttendanceRepository,
    pub tokens: CheckinTokenRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            attendance: AttendanceRepository::new(pool.clone()),
            tokens: CheckinTokenRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

#[async_trait]
impl AdmissionStore for DatabaseService {
    async fn load(&self, event_id: i64) -> AdmissionResult<StoredEventState> {
        let registrations = self.registrations.list_for_event(event_id).await?;
        let attendance = self.attendance.list_for_event(event_id).await?;
        let tokens = self.tokens.list_for_event(event_id).await?;

        debug!(
            event_id = event_id,
            registrations = registrations.len(),
            attendance = attendance.len(),
            tokens = tokens.len(),
            "Loaded admission state"
        );
        Ok(StoredEventState { registrations, attendance, tokens })
    }

    async fn commit(&self, event_id: i64, changeset: &Changeset) -> AdmissionResult<()> {
        let mut tx = self.pool.begin().await?;

        for write in &changeset.writes {
            match write {
                Write::Registration(registration) => RegistrationRepository::upsert(&mut tx, registration).await?,
                Write::Attendance(record) => AttendanceRepository::upsert(&mut tx, record).await?,
                Write::RemoveAttendance(id) => AttendanceRepository::delete(&mut tx, *id).await?,
                Write::Token(token) => CheckinTokenRepository::upsert(&mut tx, token).await?,
            }
        }

        // Dropping `tx` on an early return rolls everything back
        tx.commit().await?;
        debug!(event_id = event_id, writes = changeset.len(), "Committed admission changeset");
        Ok(())
    }
}

#[async_trait]
impl EventCatalog for DatabaseService {
    async fn find_event(&self, event_id: i64) -> AdmissionResult<Option<Event>> {
        self.events.find_by_id(event_id).await
    }
}
