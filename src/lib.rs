//! Appointment availability for a single practitioner: which start times on a day
//! are bookable, which days of a month still have room, and an overlap guard that
//! decides whether a new booking may be accepted.

pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod parse;
pub mod source;

pub use config::Schedule;
pub use engine::{
    Engine, EngineError, available_slots, day_availability, first_available, is_time_available,
    month_availability, overlaps,
};
pub use source::BookingSource;
