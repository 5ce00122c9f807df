use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use ulid::Ulid;

/// Minutes since midnight of the date a value belongs to. This is the only time-of-day
/// type used in overlap arithmetic; values past 1440 mean "after midnight" and are never wrapped.
pub type Minute = i64;

/// Buffer applied after every existing booking unless the schedule says otherwise.
pub const DEFAULT_BUFFER_MINUTES: u32 = 15;

/// Whole minutes since midnight, rounded down.
pub fn minute_of(t: NaiveTime) -> Minute {
    (t.hour() * 60 + t.minute()) as Minute
}

/// Minutes since midnight, rounded up to the next whole minute.
pub fn minute_ceil(t: NaiveTime) -> Minute {
    minute_of(t) + Minute::from(t.second() > 0 || t.nanosecond() > 0)
}

pub fn is_whole_minute(t: NaiveTime) -> bool {
    t.second() == 0 && t.nanosecond() == 0
}

/// Inverse of [`minute_of`]. `None` outside `[0, 1440)`.
pub fn time_of(m: Minute) -> Option<NaiveTime> {
    if !(0..24 * 60).contains(&m) {
        return None;
    }
    NaiveTime::from_hms_opt((m / 60) as u32, (m % 60) as u32, 0)
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Minute,
    pub end: Minute,
}

impl Span {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minute {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Lifecycle of a booking record. Owned by the booking layer; the engine only reads it
/// to decide whether a booking still occupies its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Everything except `Cancelled` blocks its slot.
    pub fn is_active(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An existing booking as returned by the booking source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub status: BookingStatus,
    pub label: Option<String>,
}

impl Booking {
    pub fn new(date: NaiveDate, start_time: NaiveTime, duration_minutes: u32, status: BookingStatus) -> Self {
        Self {
            id: Ulid::new(),
            date,
            start_time,
            duration_minutes,
            status,
            label: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// The interval this booking blocks, with `buffer_minutes` appended after its end.
    pub fn interval(&self, buffer_minutes: u32) -> BookingInterval {
        BookingInterval {
            date: self.date,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
            buffer_minutes,
        }
    }
}

/// An existing booking seen as an obstacle: `[start, end + buffer)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingInterval {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub buffer_minutes: u32,
}

impl BookingInterval {
    pub fn new(date: NaiveDate, start_time: NaiveTime, duration_minutes: u32) -> Self {
        Self {
            date,
            start_time,
            duration_minutes,
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
        }
    }

    pub fn with_buffer(mut self, buffer_minutes: u32) -> Self {
        self.buffer_minutes = buffer_minutes;
        self
    }

    pub fn start(&self) -> Minute {
        minute_of(self.start_time)
    }

    /// Rounded up, so a record with a seconds part blocks its last partial minute.
    pub fn end(&self) -> Minute {
        minute_ceil(self.start_time) + self.duration_minutes as Minute
    }

    /// End of the booking plus buffer; the exclusion boundary for candidates.
    pub fn effective_end(&self) -> Minute {
        self.end() + self.buffer_minutes as Minute
    }

    pub fn span(&self) -> Span {
        Span::new(self.start(), self.effective_end())
    }
}

/// A proposed start time and duration. Never buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
}

impl CandidateSlot {
    pub fn new(date: NaiveDate, start_time: NaiveTime, duration_minutes: u32) -> Self {
        Self {
            date,
            start_time,
            duration_minutes,
        }
    }

    pub fn start(&self) -> Minute {
        minute_of(self.start_time)
    }

    pub fn end(&self) -> Minute {
        minute_ceil(self.start_time) + self.duration_minutes as Minute
    }

    pub fn span(&self) -> Span {
        Span::new(self.start(), self.end())
    }

    /// Wall-clock end. Wraps past midnight; compare with [`CandidateSlot::span`] instead.
    pub fn end_time(&self) -> NaiveTime {
        self.start_time + chrono::Duration::minutes(self.duration_minutes as i64)
    }

    /// `"09:30 AM – 10:00 AM"`.
    pub fn display(&self) -> String {
        format!(
            "{} – {}",
            self.start_time.format("%I:%M %p"),
            self.end_time().format("%I:%M %p")
        )
    }
}

impl Serialize for CandidateSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CandidateSlot", 5)?;
        s.serialize_field("date", &self.date)?;
        s.serialize_field("start_time", &self.start_time.format("%H:%M").to_string())?;
        s.serialize_field("end_time", &self.end_time().format("%H:%M").to_string())?;
        s.serialize_field("duration_minutes", &self.duration_minutes)?;
        s.serialize_field("display", &self.display())?;
        s.end()
    }
}

/// Daily window within which appointments may be scheduled. Same for every weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn span(&self) -> Span {
        Span::new(minute_of(self.start), minute_of(self.end))
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

// ── Availability results ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    /// Today, and the start is already behind the clock.
    Elapsed,
    /// Overlaps an active booking (buffer included).
    Taken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    #[serde(flatten)]
    pub slot: CandidateSlot,
    pub status: SlotStatus,
}

impl SlotAvailability {
    pub fn is_available(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

/// Every in-bounds grid slot of one date, tagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub duration_minutes: u32,
    pub slots: Vec<SlotAvailability>,
}

impl DayAvailability {
    pub fn available(&self) -> impl Iterator<Item = &CandidateSlot> {
        self.slots.iter().filter(|s| s.is_available()).map(|s| &s.slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateAvailability {
    pub date: NaiveDate,
    pub day: u32,
    pub has_availability: bool,
    pub is_past: bool,
}

impl DateAvailability {
    pub fn past(date: NaiveDate) -> Self {
        Self {
            date,
            day: date.day(),
            has_availability: false,
            is_past: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthAvailability {
    pub year: i32,
    pub month: u32,
    pub duration_minutes: u32,
    pub dates: Vec<DateAvailability>,
}

// ── Ledger state ─────────────────────────────────────────────────

/// Request to book a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub label: Option<String>,
}

impl NewBooking {
    pub fn candidate(&self) -> CandidateSlot {
        CandidateSlot::new(self.date, self.start_time, self.duration_minutes)
    }
}

/// All bookings of one date, cancelled ones included.
#[derive(Debug, Clone)]
pub struct DayState {
    pub date: NaiveDate,
    /// Sorted by `start_time`.
    pub bookings: Vec<Booking>,
}

impl DayState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            bookings: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by start time.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.start_time, |b| b.start_time)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn get_booking_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.bookings.iter().filter(|b| b.is_active()).count()
    }

    /// Active bookings whose buffered interval overlaps `query`.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn active_overlapping(&self, query: &Span, buffer_minutes: u32) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| minute_of(b.start_time) < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.is_active() && b.interval(buffer_minutes).effective_end() > query.start)
    }
}

/// Ledger events, published to subscribers of the notify hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        booking: Booking,
    },
    BookingStatusChanged {
        id: Ulid,
        date: NaiveDate,
        old: BookingStatus,
        new: BookingStatus,
        reason: Option<String>,
    },
}

impl Event {
    pub fn date(&self) -> NaiveDate {
        match self {
            Event::BookingCreated { booking } => booking.date,
            Event::BookingStatusChanged { date, .. } => *date,
        }
    }
}
