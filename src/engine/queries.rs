use std::collections::HashMap;
use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;
use ulid::Ulid;

use crate::model::*;
use crate::observability::record_query;
use crate::parse::month_bounds;

use super::availability::{available_slots, day_availability, month_availability};
use super::conflict::{is_time_available, now};
use super::{Engine, EngineError};

impl Engine {
    /// All bookings of `date`, cancelled ones included, in start order.
    pub async fn get_bookings(&self, date: NaiveDate) -> Vec<Booking> {
        match self.read_day(date).await {
            Some(guard) => guard.bookings.clone(),
            None => Vec::new(),
        }
    }

    pub async fn get_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        let date = self
            .store
            .get_date_for_booking(&id)
            .ok_or(EngineError::NotFound(id))?;
        let guard = self.read_day(date).await.ok_or(EngineError::NotFound(id))?;
        guard
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))
    }

    pub async fn available_slots(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<Vec<CandidateSlot>, EngineError> {
        self.available_slots_at(date, duration_minutes, now()).await
    }

    pub async fn available_slots_at(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<CandidateSlot>, EngineError> {
        let started = Instant::now();
        let guard = self.read_day(date).await;
        let bookings = guard.as_ref().map_or(&[][..], |g| g.bookings.as_slice());
        let slots = available_slots(self.schedule(), date, duration_minutes, bookings, now)?;
        debug!("{date}: {} slots of {duration_minutes} min", slots.len());
        record_query("available_slots", started);
        Ok(slots)
    }

    pub async fn day_availability(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<DayAvailability, EngineError> {
        self.day_availability_at(date, duration_minutes, now()).await
    }

    pub async fn day_availability_at(
        &self,
        date: NaiveDate,
        duration_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<DayAvailability, EngineError> {
        let started = Instant::now();
        let guard = self.read_day(date).await;
        let bookings = guard.as_ref().map_or(&[][..], |g| g.bookings.as_slice());
        let day = day_availability(self.schedule(), date, duration_minutes, bookings, now)?;
        record_query("day_availability", started);
        Ok(day)
    }

    pub async fn month_availability(
        &self,
        year: i32,
        month: u32,
        duration_minutes: u32,
    ) -> Result<MonthAvailability, EngineError> {
        self.month_availability_at(year, month, duration_minutes, now()).await
    }

    /// Snapshots the month's non-past days one at a time, then aggregates.
    pub async fn month_availability_at(
        &self,
        year: i32,
        month: u32,
        duration_minutes: u32,
        now: NaiveDateTime,
    ) -> Result<MonthAvailability, EngineError> {
        let started = Instant::now();
        let (first, last) = month_bounds(year, month)?;

        let mut snapshot: HashMap<NaiveDate, Vec<Booking>> = HashMap::new();
        for date in first.iter_days().take_while(|d| *d <= last) {
            if date < now.date() {
                continue;
            }
            if let Some(guard) = self.read_day(date).await {
                snapshot.insert(date, guard.bookings.clone());
            }
        }

        let result =
            month_availability(self.schedule(), year, month, duration_minutes, &snapshot, now)?;
        debug!(
            "{year}-{month:02}: {} of {} days open",
            result.dates.iter().filter(|d| d.has_availability).count(),
            result.dates.len()
        );
        record_query("month_availability", started);
        Ok(result)
    }

    /// Advisory check for a single slot. Authoritative only inside
    /// [`Engine::create_booking`], which re-checks under the write lock.
    pub async fn is_time_available(
        &self,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_minutes: u32,
    ) -> Result<bool, EngineError> {
        let started = Instant::now();
        let guard = self.read_day(date).await;
        let bookings = guard.as_ref().map_or(&[][..], |g| g.bookings.as_slice());
        let free = is_time_available(self.schedule(), date, start_time, duration_minutes, bookings)?;
        record_query("is_time_available", started);
        Ok(free)
    }
}
