use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::SharedDayState;

/// Bookings bucketed by date, one lock per date.
pub struct InMemoryStore {
    days: DashMap<NaiveDate, SharedDayState>,
    booking_to_date: DashMap<Ulid, NaiveDate>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
            booking_to_date: DashMap::new(),
        }
    }

    // ── Days ─────────────────────────────────────────────────

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn get_day(&self, date: &NaiveDate) -> Option<SharedDayState> {
        self.days.get(date).map(|e| e.value().clone())
    }

    /// The lock for `date`, created on first use. Concurrent callers for the same
    /// date always receive the same lock.
    pub fn get_or_create_day(&self, date: NaiveDate) -> SharedDayState {
        if let Some(day) = self.get_day(&date) {
            return day;
        }
        let day = self
            .days
            .entry(date)
            .or_insert_with(|| Arc::new(RwLock::new(DayState::new(date))))
            .value()
            .clone();
        metrics::gauge!(crate::observability::DAYS_ACTIVE).set(self.days.len() as f64);
        day
    }

    // ── Booking index ────────────────────────────────────────

    pub fn get_date_for_booking(&self, id: &Ulid) -> Option<NaiveDate> {
        self.booking_to_date.get(id).map(|e| *e.value())
    }

    pub fn booking_count(&self) -> usize {
        self.booking_to_date.len()
    }

    // ── Event application ────────────────────────────────────

    pub fn apply_event(&self, ds: &mut DayState, event: &Event) {
        match event {
            Event::BookingCreated { booking } => {
                ds.insert_booking(booking.clone());
                self.booking_to_date.insert(booking.id, booking.date);
            }
            Event::BookingStatusChanged { id, new, .. } => {
                if let Some(b) = ds.get_booking_mut(*id) {
                    b.status = *new;
                }
            }
        }
    }
}
