use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::config::Schedule;
use crate::model::*;
use crate::parse::{month_bounds, validate_duration};
use crate::source::BookingSource;

use super::conflict::first_conflict;
use super::EngineError;

// ── Availability Algorithm ────────────────────────────────────────

/// Candidate slots of `date` that fit inside working hours, ascending.
/// Starts run from the opening time to the closing time on the schedule's grid;
/// the sequence stops at the first start whose slot would end after closing.
fn grid(schedule: &Schedule, date: NaiveDate, duration_minutes: u32) -> impl Iterator<Item = CandidateSlot> {
    let hours = schedule.working_hours.span();
    let step = schedule.granularity_minutes.max(1) as usize;
    (hours.start..=hours.end)
        .step_by(step)
        .take_while(move |&start| start + duration_minutes as Minute <= hours.end)
        .filter_map(move |start| time_of(start).map(|t| CandidateSlot::new(date, t, duration_minutes)))
}

fn classify(
    schedule: &Schedule,
    slot: &CandidateSlot,
    bookings: &[Booking],
    now: NaiveDateTime,
) -> SlotStatus {
    if slot.date == now.date() && slot.start_time < now.time() {
        return SlotStatus::Elapsed;
    }
    if first_conflict(schedule, slot, bookings).is_some() {
        SlotStatus::Taken
    } else {
        SlotStatus::Available
    }
}

/// Bookable start times on `date`, ascending. Dates before `now`'s date yield
/// nothing; on `now`'s date, starts before the current time of day are dropped.
///
/// The result shrinks as `now` advances, so two calls are only comparable with the
/// same `now` and the same booking snapshot.
pub fn available_slots(
    schedule: &Schedule,
    date: NaiveDate,
    duration_minutes: u32,
    bookings: &[Booking],
    now: NaiveDateTime,
) -> Result<Vec<CandidateSlot>, EngineError> {
    schedule.validate()?;
    validate_duration(duration_minutes)?;
    if date < now.date() {
        return Ok(Vec::new());
    }
    Ok(grid(schedule, date, duration_minutes)
        .filter(|slot| classify(schedule, slot, bookings, now) == SlotStatus::Available)
        .collect())
}

/// Every in-bounds grid slot of `date`, tagged. The available entries are exactly
/// what [`available_slots`] returns.
pub fn day_availability(
    schedule: &Schedule,
    date: NaiveDate,
    duration_minutes: u32,
    bookings: &[Booking],
    now: NaiveDateTime,
) -> Result<DayAvailability, EngineError> {
    schedule.validate()?;
    validate_duration(duration_minutes)?;
    let slots = if date < now.date() {
        Vec::new()
    } else {
        grid(schedule, date, duration_minutes)
            .map(|slot| SlotAvailability {
                status: classify(schedule, &slot, bookings, now),
                slot,
            })
            .collect()
    };
    Ok(DayAvailability {
        date,
        duration_minutes,
        slots,
    })
}

/// Earliest bookable slot on `date`; stops scanning at the first hit.
pub fn first_available(
    schedule: &Schedule,
    date: NaiveDate,
    duration_minutes: u32,
    bookings: &[Booking],
    now: NaiveDateTime,
) -> Result<Option<CandidateSlot>, EngineError> {
    schedule.validate()?;
    validate_duration(duration_minutes)?;
    Ok(earliest(schedule, date, duration_minutes, bookings, now))
}

fn earliest(
    schedule: &Schedule,
    date: NaiveDate,
    duration_minutes: u32,
    bookings: &[Booking],
    now: NaiveDateTime,
) -> Option<CandidateSlot> {
    if date < now.date() {
        return None;
    }
    grid(schedule, date, duration_minutes)
        .find(|slot| classify(schedule, slot, bookings, now) == SlotStatus::Available)
}

/// One entry per calendar day of the month, ascending. Past dates are reported
/// without asking `source`; other dates are an existence check, not an enumeration.
pub fn month_availability<S: BookingSource + ?Sized>(
    schedule: &Schedule,
    year: i32,
    month: u32,
    duration_minutes: u32,
    source: &S,
    now: NaiveDateTime,
) -> Result<MonthAvailability, EngineError> {
    schedule.validate()?;
    validate_duration(duration_minutes)?;
    let (first, last) = month_bounds(year, month)?;
    let today = now.date();

    let dates = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| {
            if date < today {
                return DateAvailability::past(date);
            }
            let bookings = source.bookings_on(date);
            DateAvailability {
                date,
                day: date.day(),
                has_availability: earliest(schedule, date, duration_minutes, &bookings, now)
                    .is_some(),
                is_past: false,
            }
        })
        .collect();

    Ok(MonthAvailability {
        year,
        month,
        duration_minutes,
        dates,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::NaiveTime;

    use super::*;
    use crate::engine::overlaps;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        NaiveDateTime::new(date, t(h, m))
    }

    fn booking(date: NaiveDate, start: NaiveTime, minutes: u32, status: BookingStatus) -> Booking {
        Booking::new(date, start, minutes, status)
    }

    fn starts(slots: &[CandidateSlot]) -> Vec<NaiveTime> {
        slots.iter().map(|s| s.start_time).collect()
    }

    /// Records which dates were asked for.
    struct RecordingSource {
        bookings: Vec<Booking>,
        asked: RefCell<Vec<NaiveDate>>,
    }

    impl BookingSource for RecordingSource {
        fn bookings_on(&self, date: NaiveDate) -> Vec<Booking> {
            self.asked.borrow_mut().push(date);
            self.bookings.bookings_on(date)
        }
    }

    // ── available_slots ──────────────────────────────────

    #[test]
    fn empty_day_has_full_grid() {
        let date = d(2024, 6, 10);
        let slots = available_slots(&Schedule::default(), date, 30, &[], at(d(2024, 6, 1), 8, 0)).unwrap();
        assert_eq!(slots.len(), 31); // 09:00 ..= 16:30
        assert_eq!(slots[0].start_time, t(9, 0));
        assert_eq!(slots.last().unwrap().start_time, t(16, 30));
        assert_eq!(slots.last().unwrap().end_time(), t(17, 0));
    }

    #[test]
    fn buffered_booking_scenario() {
        let date = d(2024, 6, 10);
        let bookings = vec![booking(date, t(10, 0), 30, BookingStatus::Confirmed)];
        let slots =
            available_slots(&Schedule::default(), date, 30, &bookings, at(d(2024, 6, 1), 8, 0)).unwrap();
        let starts = starts(&slots);

        // Ends at 10:00, the existing start: touching, allowed.
        assert!(starts.contains(&t(9, 30)));
        // Ends 10:15, overlaps.
        assert!(!starts.contains(&t(9, 45)));
        for blocked in [t(10, 0), t(10, 15), t(10, 30)] {
            assert!(!starts.contains(&blocked), "{blocked} should be blocked");
        }
        // Exactly at the effective end (10:30 + 15).
        assert!(starts.contains(&t(10, 45)));
        assert_eq!(slots.len(), 27);
    }

    #[test]
    fn buffer_can_be_configured_away() {
        let date = d(2024, 6, 10);
        let schedule = Schedule {
            buffer_minutes: 0,
            ..Schedule::default()
        };
        let bookings = vec![booking(date, t(10, 0), 30, BookingStatus::Confirmed)];
        let slots = available_slots(&schedule, date, 30, &bookings, at(d(2024, 6, 1), 8, 0)).unwrap();
        assert!(starts(&slots).contains(&t(10, 30)));
    }

    #[test]
    fn granularity_controls_grid() {
        let date = d(2024, 6, 10);
        let schedule = Schedule {
            granularity_minutes: 30,
            ..Schedule::default()
        };
        let slots = available_slots(&schedule, date, 60, &[], at(d(2024, 6, 1), 8, 0)).unwrap();
        assert!(slots.iter().all(|s| s.start() % 30 == 0));
        assert_eq!(slots.len(), 15); // 09:00 ..= 16:00
    }

    #[test]
    fn past_date_is_empty() {
        let bookings: Vec<Booking> = Vec::new();
        let slots =
            available_slots(&Schedule::default(), d(2024, 6, 9), 30, &bookings, at(d(2024, 6, 10), 8, 0))
                .unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn today_drops_elapsed_starts() {
        let date = d(2024, 6, 10);
        let slots = available_slots(&Schedule::default(), date, 30, &[], at(date, 14, 0)).unwrap();
        assert!(slots.iter().all(|s| s.start_time >= t(14, 0)));
        // 14:00 itself is not strictly before now.
        assert_eq!(slots[0].start_time, t(14, 0));

        let later = NaiveDateTime::new(date, NaiveTime::from_hms_opt(14, 0, 30).unwrap());
        let slots = available_slots(&Schedule::default(), date, 30, &[], later).unwrap();
        assert_eq!(slots[0].start_time, t(14, 15));
    }

    #[test]
    fn today_after_closing_is_empty() {
        let date = d(2024, 6, 10);
        let slots = available_slots(&Schedule::default(), date, 30, &[], at(date, 16, 45)).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn slot_must_fit_in_working_hours() {
        let date = d(2024, 6, 10);
        let now = at(d(2024, 6, 1), 8, 0);
        let slots = available_slots(&Schedule::default(), date, 480, &[], now).unwrap();
        assert_eq!(starts(&slots), vec![t(9, 0)]);
        let slots = available_slots(&Schedule::default(), date, 60, &[], now).unwrap();
        assert!(slots.iter().all(|s| s.end() <= 17 * 60));
    }

    #[test]
    fn cancelled_booking_excludes_nothing() {
        let date = d(2024, 6, 10);
        let now = at(d(2024, 6, 1), 8, 0);
        let bookings = vec![booking(date, t(10, 0), 60, BookingStatus::Cancelled)];
        let with_cancelled = available_slots(&Schedule::default(), date, 45, &bookings, now).unwrap();
        let without = available_slots(&Schedule::default(), date, 45, &[], now).unwrap();
        assert_eq!(with_cancelled, without);
    }

    #[test]
    fn bookings_on_other_dates_are_ignored() {
        let date = d(2024, 6, 10);
        let now = at(d(2024, 6, 1), 8, 0);
        let bookings = vec![booking(d(2024, 6, 11), t(10, 0), 60, BookingStatus::Confirmed)];
        let slots = available_slots(&Schedule::default(), date, 30, &bookings, now).unwrap();
        assert_eq!(slots.len(), 31);
    }

    #[test]
    fn returned_slots_never_overlap_active_bookings() {
        let date = d(2024, 6, 10);
        let now = at(date, 9, 20);
        let bookings = vec![
            booking(date, t(9, 30), 45, BookingStatus::Confirmed),
            booking(date, t(11, 0), 30, BookingStatus::Pending),
            booking(date, t(12, 15), 60, BookingStatus::Cancelled),
            booking(date, t(13, 40), 20, BookingStatus::Completed),
            booking(date, t(16, 0), 60, BookingStatus::Confirmed),
        ];
        let schedule = Schedule::default();
        for minutes in [15, 30, 45, 60, 90] {
            let slots = available_slots(&schedule, date, minutes, &bookings, now).unwrap();
            assert!(!slots.is_empty());
            for s in &slots {
                assert!(s.start_time >= now.time());
                for b in bookings.iter().filter(|b| b.is_active()) {
                    assert!(
                        !overlaps(s, &b.interval(schedule.buffer_minutes)),
                        "{} overlaps booking at {}",
                        s.display(),
                        b.start_time
                    );
                }
            }
            assert!(slots.windows(2).all(|w| w[0].start_time < w[1].start_time));
        }
    }

    #[test]
    fn invalid_duration_rejected() {
        let date = d(2024, 6, 10);
        let now = at(d(2024, 6, 1), 8, 0);
        assert!(matches!(
            available_slots(&Schedule::default(), date, 0, &[], now),
            Err(EngineError::InvalidDuration(_))
        ));
        assert!(matches!(
            available_slots(&Schedule::default(), date, 481, &[], now),
            Err(EngineError::InvalidDuration(_))
        ));
    }

    // ── day_availability ─────────────────────────────────

    #[test]
    fn day_view_tags_each_slot() {
        let date = d(2024, 6, 10);
        let bookings = vec![booking(date, t(10, 0), 30, BookingStatus::Confirmed)];
        let now = at(date, 9, 10);
        let day = day_availability(&Schedule::default(), date, 30, &bookings, now).unwrap();

        assert_eq!(day.slots.len(), 31);
        let status_at = |h, m| {
            day.slots
                .iter()
                .find(|s| s.slot.start_time == t(h, m))
                .map(|s| s.status)
        };
        assert_eq!(status_at(9, 0), Some(SlotStatus::Elapsed));
        assert_eq!(status_at(9, 15), Some(SlotStatus::Available));
        assert_eq!(status_at(9, 45), Some(SlotStatus::Taken));
        assert_eq!(status_at(10, 45), Some(SlotStatus::Available));

        let listed: Vec<CandidateSlot> = day.available().copied().collect();
        assert_eq!(
            listed,
            available_slots(&Schedule::default(), date, 30, &bookings, now).unwrap()
        );
    }

    #[test]
    fn day_view_of_past_date_is_empty() {
        let day = day_availability(&Schedule::default(), d(2024, 6, 9), 30, &[], at(d(2024, 6, 10), 8, 0))
            .unwrap();
        assert!(day.slots.is_empty());
    }

    // ── month_availability ───────────────────────────────

    #[test]
    fn empty_month_is_available_from_today_on() {
        let source = RecordingSource {
            bookings: Vec::new(),
            asked: RefCell::new(Vec::new()),
        };
        let now = at(d(2024, 6, 15), 8, 0);
        let month = month_availability(&Schedule::default(), 2024, 6, 45, &source, now).unwrap();

        assert_eq!(month.dates.len(), 30);
        for entry in &month.dates {
            if entry.date < now.date() {
                assert!(entry.is_past);
                assert!(!entry.has_availability);
            } else {
                assert!(!entry.is_past);
                assert!(entry.has_availability, "{} should be available", entry.date);
            }
        }
    }

    #[test]
    fn past_dates_never_touch_the_source() {
        let source = RecordingSource {
            bookings: Vec::new(),
            asked: RefCell::new(Vec::new()),
        };
        let now = at(d(2024, 6, 15), 8, 0);
        month_availability(&Schedule::default(), 2024, 6, 45, &source, now).unwrap();
        let asked = source.asked.borrow();
        assert_eq!(asked.len(), 16);
        assert!(asked.iter().all(|date| *date >= now.date()));
    }

    #[test]
    fn month_entries_are_contiguous_and_ascending() {
        let now = at(d(2024, 1, 1), 8, 0);
        let bookings: Vec<Booking> = Vec::new();
        let month = month_availability(&Schedule::default(), 2024, 2, 30, &bookings, now).unwrap();
        assert_eq!(month.dates.len(), 29);
        for (i, entry) in month.dates.iter().enumerate() {
            assert_eq!(entry.day as usize, i + 1);
            assert_eq!(entry.date, d(2024, 2, i as u32 + 1));
        }
    }

    #[test]
    fn fully_booked_day_has_no_availability() {
        let date = d(2024, 6, 20);
        let bookings = vec![booking(date, t(9, 0), 480, BookingStatus::Confirmed)];
        let now = at(d(2024, 6, 1), 8, 0);
        let month = month_availability(&Schedule::default(), 2024, 6, 30, &bookings, now).unwrap();
        let entry = month.dates.iter().find(|e| e.date == date).unwrap();
        assert!(!entry.has_availability);
        assert!(!entry.is_past);
        // Neighbours unaffected.
        assert!(month.dates.iter().filter(|e| e.date != date).all(|e| e.has_availability));
    }

    #[test]
    fn today_after_closing_reports_no_availability() {
        let now = at(d(2024, 6, 15), 16, 50);
        let bookings: Vec<Booking> = Vec::new();
        let month = month_availability(&Schedule::default(), 2024, 6, 30, &bookings, now).unwrap();
        let today = &month.dates[14];
        assert_eq!(today.date, now.date());
        assert!(!today.is_past);
        assert!(!today.has_availability);
    }

    #[test]
    fn month_agrees_with_day_scan() {
        let date = d(2024, 6, 12);
        let bookings = vec![
            booking(date, t(9, 0), 120, BookingStatus::Confirmed),
            booking(date, t(11, 30), 60, BookingStatus::Confirmed),
            booking(date, t(13, 0), 240, BookingStatus::Pending),
        ];
        let now = at(d(2024, 6, 1), 8, 0);
        let schedule = Schedule::default();
        for minutes in [15, 30, 45, 60] {
            let month = month_availability(&schedule, 2024, 6, minutes, &bookings, now).unwrap();
            let slots = available_slots(&schedule, date, minutes, &bookings, now).unwrap();
            assert_eq!(month.dates[11].has_availability, !slots.is_empty(), "minutes={minutes}");
        }
    }

    #[test]
    fn invalid_month_rejected() {
        let bookings: Vec<Booking> = Vec::new();
        let now = at(d(2024, 6, 1), 8, 0);
        assert!(matches!(
            month_availability(&Schedule::default(), 2024, 13, 30, &bookings, now),
            Err(EngineError::InvalidDate(_))
        ));
        assert!(matches!(
            month_availability(&Schedule::default(), 2024, 6, 0, &bookings, now),
            Err(EngineError::InvalidDuration(_))
        ));
    }

    #[test]
    fn hand_built_bad_schedules_are_errors_not_panics() {
        let date = d(2024, 6, 10);
        let now = at(d(2024, 6, 1), 8, 0);
        let inverted = Schedule {
            working_hours: WorkingHours {
                start: t(17, 0),
                end: t(9, 0),
            },
            ..Schedule::default()
        };
        let empty = Schedule {
            working_hours: WorkingHours {
                start: t(9, 0),
                end: t(9, 0),
            },
            ..Schedule::default()
        };
        let no_step = Schedule {
            granularity_minutes: 0,
            ..Schedule::default()
        };

        for schedule in [inverted, empty, no_step] {
            assert!(matches!(
                available_slots(&schedule, date, 30, &[], now),
                Err(EngineError::InvalidConfig(_))
            ));
            assert!(matches!(
                day_availability(&schedule, date, 30, &[], now),
                Err(EngineError::InvalidConfig(_))
            ));
            assert!(matches!(
                first_available(&schedule, date, 30, &[], now),
                Err(EngineError::InvalidConfig(_))
            ));
            assert!(matches!(
                month_availability(&schedule, 2024, 6, 30, &Vec::<Booking>::new(), now),
                Err(EngineError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn first_available_skips_partial_minute_buffer() {
        let date = d(2024, 6, 10);
        let odd = NaiveTime::from_hms_opt(9, 0, 30).unwrap();
        let bookings = vec![booking(date, odd, 30, BookingStatus::Confirmed)];
        // Blocked until 09:45:30, so the 15-minute grid resumes at 10:00.
        let next = first_available(&Schedule::default(), date, 30, &bookings, at(d(2024, 6, 1), 8, 0))
            .unwrap()
            .unwrap();
        assert_eq!(next.start_time, t(10, 0));
    }

}
