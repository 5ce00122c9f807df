use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::model::{DEFAULT_BUFFER_MINUTES, WorkingHours, is_whole_minute, minute_of};

pub const ENV_WORK_START: &str = "SLOTWISE_WORK_START";
pub const ENV_WORK_END: &str = "SLOTWISE_WORK_END";
pub const ENV_BUFFER_MINUTES: &str = "SLOTWISE_BUFFER_MINUTES";
pub const ENV_GRANULARITY_MINUTES: &str = "SLOTWISE_GRANULARITY_MINUTES";

/// Immutable scheduling parameters, passed into every availability computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub working_hours: WorkingHours,
    /// Idle time required after an existing booking ends.
    pub buffer_minutes: u32,
    /// Step between candidate start times.
    pub granularity_minutes: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            working_hours: WorkingHours::default(),
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            granularity_minutes: 15,
        }
    }
}

impl Schedule {
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults, unparsable ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let mut schedule = Schedule::default();
        if let Some(v) = lookup(ENV_WORK_START) {
            schedule.working_hours.start = parse_clock(ENV_WORK_START, &v)?;
        }
        if let Some(v) = lookup(ENV_WORK_END) {
            schedule.working_hours.end = parse_clock(ENV_WORK_END, &v)?;
        }
        if let Some(v) = lookup(ENV_BUFFER_MINUTES) {
            schedule.buffer_minutes = parse_minutes(ENV_BUFFER_MINUTES, &v)?;
        }
        if let Some(v) = lookup(ENV_GRANULARITY_MINUTES) {
            schedule.granularity_minutes = parse_minutes(ENV_GRANULARITY_MINUTES, &v)?;
        }
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let WorkingHours { start, end } = self.working_hours;
        if !is_whole_minute(start) || !is_whole_minute(end) {
            return Err(EngineError::InvalidConfig(format!(
                "working hours {start}-{end} must fall on whole minutes"
            )));
        }
        if minute_of(start) >= minute_of(end) {
            return Err(EngineError::InvalidConfig(format!(
                "working hours start {start} must be before end {end}"
            )));
        }
        if self.granularity_minutes == 0 {
            return Err(EngineError::InvalidConfig("granularity must be positive".into()));
        }
        if self.granularity_minutes as i64 > self.working_hours.span().duration() {
            return Err(EngineError::InvalidConfig(
                "granularity longer than the working day".into(),
            ));
        }
        Ok(())
    }
}

fn parse_clock(key: &str, value: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| EngineError::InvalidConfig(format!("{key}={value:?}: {e}")))
}

fn parse_minutes(key: &str, value: &str) -> Result<u32, EngineError> {
    value
        .trim()
        .parse()
        .map_err(|e| EngineError::InvalidConfig(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_nine_to_five() {
        let s = Schedule::from_lookup(lookup(&[])).unwrap();
        assert_eq!(s, Schedule::default());
        assert_eq!(s.working_hours.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(s.working_hours.end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
        assert_eq!(s.buffer_minutes, 15);
        assert_eq!(s.granularity_minutes, 15);
    }

    #[test]
    fn overrides_are_applied() {
        let s = Schedule::from_lookup(lookup(&[
            (ENV_WORK_START, "08:30"),
            (ENV_WORK_END, "12:00"),
            (ENV_BUFFER_MINUTES, "0"),
            (ENV_GRANULARITY_MINUTES, "30"),
        ]))
        .unwrap();
        assert_eq!(s.working_hours.start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(s.working_hours.end, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(s.buffer_minutes, 0);
        assert_eq!(s.granularity_minutes, 30);
    }

    #[test]
    fn unparsable_values_are_errors() {
        for pairs in [
            [(ENV_WORK_START, "9am")],
            [(ENV_BUFFER_MINUTES, "-5")],
            [(ENV_GRANULARITY_MINUTES, "quarter")],
        ] {
            assert!(matches!(
                Schedule::from_lookup(lookup(&pairs)),
                Err(EngineError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn inverted_or_degenerate_hours_rejected() {
        assert!(Schedule::from_lookup(lookup(&[(ENV_WORK_START, "18:00")])).is_err());
        assert!(Schedule::from_lookup(lookup(&[(ENV_WORK_END, "09:00")])).is_err());
        assert!(Schedule::from_lookup(lookup(&[(ENV_GRANULARITY_MINUTES, "0")])).is_err());
        assert!(Schedule::from_lookup(lookup(&[(ENV_GRANULARITY_MINUTES, "600")])).is_err());
    }
}
