use chrono::NaiveDateTime;
use tracing::{info, warn};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::*;

use super::conflict::{check_no_conflict, now, validate_request};
use super::{Engine, EngineError};

impl Engine {
    pub async fn create_booking(&self, request: NewBooking) -> Result<Booking, EngineError> {
        self.create_booking_at(request, now()).await
    }

    /// Check and insert under the date's write lock. New bookings start `Pending`.
    pub async fn create_booking_at(
        &self,
        request: NewBooking,
        now: NaiveDateTime,
    ) -> Result<Booking, EngineError> {
        validate_request(self.schedule(), &request, now)?;

        let day = self.store.get_or_create_day(request.date);
        let mut guard = day.write().await;
        if guard.active_count() >= MAX_BOOKINGS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many bookings on date"));
        }

        let candidate = request.candidate();
        if let Err(e) = check_no_conflict(self.schedule(), &guard, &candidate) {
            metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
            warn!("rejected {} on {}: {e}", candidate.display(), candidate.date);
            return Err(e);
        }

        let booking = Booking {
            id: Ulid::new(),
            date: request.date,
            start_time: request.start_time,
            duration_minutes: request.duration_minutes,
            status: BookingStatus::Pending,
            label: request.label,
        };
        let event = Event::BookingCreated {
            booking: booking.clone(),
        };
        self.apply_and_notify(&mut guard, &event);
        metrics::counter!(BOOKINGS_CREATED_TOTAL).increment(1);
        info!("booked {} on {} ({})", candidate.display(), booking.date, booking.id);
        Ok(booking)
    }

    pub async fn cancel_booking(
        &self,
        id: Ulid,
        reason: Option<String>,
    ) -> Result<Booking, EngineError> {
        if reason.as_ref().is_some_and(|r| r.len() > MAX_LABEL_LEN) {
            return Err(EngineError::LimitExceeded("reason too long"));
        }
        self.change_status(id, BookingStatus::Cancelled, reason).await
    }

    /// Admin status change. Reactivating a cancelled booking re-checks its slot,
    /// which may have been taken since it was freed.
    pub async fn set_status(&self, id: Ulid, status: BookingStatus) -> Result<Booking, EngineError> {
        self.change_status(id, status, None).await
    }

    async fn change_status(
        &self,
        id: Ulid,
        new: BookingStatus,
        reason: Option<String>,
    ) -> Result<Booking, EngineError> {
        let mut guard = self.resolve_booking_write(&id).await?;
        let current = guard
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(EngineError::NotFound(id))?;
        if current.status == new {
            return Ok(current);
        }

        if !current.is_active() && new.is_active() {
            let candidate =
                CandidateSlot::new(current.date, current.start_time, current.duration_minutes);
            if let Err(e) = check_no_conflict(self.schedule(), &guard, &candidate) {
                metrics::counter!(BOOKING_CONFLICTS_TOTAL).increment(1);
                warn!("cannot reactivate {id}: {e}");
                return Err(e);
            }
            if guard.active_count() >= MAX_BOOKINGS_PER_DAY {
                return Err(EngineError::LimitExceeded("too many bookings on date"));
            }
        }

        let event = Event::BookingStatusChanged {
            id,
            date: current.date,
            old: current.status,
            new,
            reason,
        };
        self.apply_and_notify(&mut guard, &event);
        metrics::counter!(BOOKING_STATUS_CHANGES_TOTAL, "status" => new.as_str()).increment(1);
        info!("booking {id}: {} -> {new}", current.status);

        Ok(Booking {
            status: new,
            ..current
        })
    }
}
