use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::Schedule;
use crate::limits::*;
use crate::model::*;
use crate::parse::validate_duration;

use super::EngineError;

pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Half-open intersection of `[candidate.start, candidate.end)` with
/// `[existing.start, existing.end + buffer)`. Touching is not overlapping.
pub fn overlaps(candidate: &CandidateSlot, existing: &BookingInterval) -> bool {
    candidate.date == existing.date
        && candidate.start() < existing.effective_end()
        && candidate.end() > existing.start()
}

/// First active booking the candidate collides with.
pub(crate) fn first_conflict<'a>(
    schedule: &Schedule,
    candidate: &CandidateSlot,
    bookings: &'a [Booking],
) -> Option<&'a Booking> {
    bookings
        .iter()
        .filter(|b| b.is_active())
        .find(|b| overlaps(candidate, &b.interval(schedule.buffer_minutes)))
}

/// Single-point availability check against a day's bookings. Cancelled bookings
/// are ignored, everything else blocks its slot plus the schedule's buffer.
pub fn is_time_available(
    schedule: &Schedule,
    date: NaiveDate,
    start_time: NaiveTime,
    duration_minutes: u32,
    bookings: &[Booking],
) -> Result<bool, EngineError> {
    schedule.validate()?;
    validate_duration(duration_minutes)?;
    let candidate = CandidateSlot::new(date, start_time, duration_minutes);
    Ok(first_conflict(schedule, &candidate, bookings).is_none())
}

/// Ledger-side guard; caller holds the day's write lock.
pub(crate) fn check_no_conflict(
    schedule: &Schedule,
    day: &DayState,
    candidate: &CandidateSlot,
) -> Result<(), EngineError> {
    match day
        .active_overlapping(&candidate.span(), schedule.buffer_minutes)
        .next()
    {
        Some(existing) => Err(EngineError::Conflict(existing.id)),
        None => Ok(()),
    }
}

pub(crate) fn validate_request(
    schedule: &Schedule,
    request: &NewBooking,
    now: NaiveDateTime,
) -> Result<(), EngineError> {
    validate_duration(request.duration_minutes)?;
    if request.label.as_ref().is_some_and(|l| l.len() > MAX_LABEL_LEN) {
        return Err(EngineError::LimitExceeded("label too long"));
    }
    if !is_whole_minute(request.start_time) {
        return Err(EngineError::InvalidDate(format!(
            "start time {} is not on a whole minute",
            request.start_time
        )));
    }
    if NaiveDateTime::new(request.date, request.start_time) < now {
        return Err(EngineError::InPast);
    }
    if !schedule
        .working_hours
        .span()
        .contains_span(&request.candidate().span())
    {
        return Err(EngineError::OutsideWorkingHours);
    }
    Ok(())
}
