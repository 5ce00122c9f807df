/// Longest consultation a single booking may cover.
pub const MAX_DURATION_MINUTES: u32 = 8 * 60;

/// Active bookings a single date may hold before the ledger refuses more.
pub const MAX_BOOKINGS_PER_DAY: usize = 96;

pub const MAX_LABEL_LEN: usize = 256;

/// Years accepted from request parameters.
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 9999;
