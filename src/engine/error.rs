use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unparsable or out-of-range date, month, year or time of day.
    InvalidDate(String),
    /// Non-positive, unparsable or too-long duration.
    InvalidDuration(String),
    Conflict(Ulid),
    InPast,
    OutsideWorkingHours,
    NotFound(Ulid),
    LimitExceeded(&'static str),
    InvalidConfig(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidDate(msg) => write!(f, "invalid date: {msg}"),
            EngineError::InvalidDuration(msg) => write!(f, "invalid duration: {msg}"),
            EngineError::Conflict(id) => write!(f, "conflict with booking: {id}"),
            EngineError::InPast => write!(f, "cannot book appointments in the past"),
            EngineError::OutsideWorkingHours => {
                write!(f, "slot does not fit within working hours")
            }
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
