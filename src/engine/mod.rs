mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;

pub use availability::{available_slots, day_availability, first_available, month_availability};
pub use conflict::{is_time_available, overlaps};
pub use error::EngineError;
pub use store::InMemoryStore;

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{info, warn};
use ulid::Ulid;

use crate::config::Schedule;
use crate::model::*;
use crate::notify::NotifyHub;

pub type SharedDayState = Arc<RwLock<DayState>>;

/// In-memory booking ledger for one practitioner.
///
/// Every date has its own lock. Mutations take the date's write lock, re-check
/// overlap and apply while still holding it, so of two concurrent requests for
/// overlapping slots exactly one succeeds and the other gets `Conflict`.
pub struct Engine {
    schedule: Schedule,
    pub(super) store: InMemoryStore,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new(schedule: Schedule, notify: Arc<NotifyHub>) -> Result<Self, EngineError> {
        schedule.validate()?;
        Ok(Self {
            schedule,
            store: InMemoryStore::new(),
            notify,
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Seed the ledger with records that already exist in the persistence layer.
    /// Records are taken as-is: no overlap or past checks, no notifications.
    /// A record whose id is already in the ledger is skipped.
    pub async fn load(&self, bookings: impl IntoIterator<Item = Booking>) -> usize {
        let mut loaded = 0;
        for booking in bookings {
            let day = self.store.get_or_create_day(booking.date);
            let mut guard = day.write().await;
            if self.store.get_date_for_booking(&booking.id).is_some() {
                warn!("skipping duplicate booking {}", booking.id);
                continue;
            }
            self.store
                .apply_event(&mut guard, &Event::BookingCreated { booking });
            loaded += 1;
        }
        info!("loaded {loaded} bookings across {} days", self.store.day_count());
        loaded
    }

    /// Apply + notify in one call. Caller holds the day's write lock.
    pub(super) fn apply_and_notify(&self, ds: &mut DayState, event: &Event) {
        self.store.apply_event(ds, event);
        self.notify.send(event);
    }

    pub(super) async fn read_day(&self, date: NaiveDate) -> Option<OwnedRwLockReadGuard<DayState>> {
        match self.store.get_day(&date) {
            Some(day) => Some(day.read_owned().await),
            None => None,
        }
    }

    /// Lookup booking → date, acquire that date's write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        id: &Ulid,
    ) -> Result<OwnedRwLockWriteGuard<DayState>, EngineError> {
        let date = self
            .store
            .get_date_for_booking(id)
            .ok_or(EngineError::NotFound(*id))?;
        let day = self
            .store
            .get_day(&date)
            .ok_or(EngineError::NotFound(*id))?;
        Ok(day.write_owned().await)
    }
}
