use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::Booking;

/// Point-in-time read of the booking store. Implementations return every booking on
/// `date`, cancelled ones included; filtering is the engine's job.
pub trait BookingSource {
    fn bookings_on(&self, date: NaiveDate) -> Vec<Booking>;
}

impl BookingSource for [Booking] {
    fn bookings_on(&self, date: NaiveDate) -> Vec<Booking> {
        self.iter().filter(|b| b.date == date).cloned().collect()
    }
}

impl BookingSource for Vec<Booking> {
    fn bookings_on(&self, date: NaiveDate) -> Vec<Booking> {
        self.as_slice().bookings_on(date)
    }
}

impl BookingSource for HashMap<NaiveDate, Vec<Booking>> {
    fn bookings_on(&self, date: NaiveDate) -> Vec<Booking> {
        self.get(&date).cloned().unwrap_or_default()
    }
}
