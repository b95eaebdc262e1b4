use chrono::Weekday;
use thiserror::Error;

use crate::schedule::time::{CandidateTimes, candidate_end_times, format_time_label};

pub const MINUTES_PER_DAY: u16 = 1440;
pub const TIME_STEP_MINUTES: u16 = 15;
/// Latest quarter-hour an open period may end on; periods never cross midnight.
pub const LAST_END_MINUTE: u16 = MINUTES_PER_DAY - TIME_STEP_MINUTES;

const DEFAULT_START_MINUTE: u16 = 9 * 60;
const DEFAULT_END_MINUTE: u16 = 9 * 60 + 30;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PeriodError {
    #[error("time {0} is outside of the day")]
    OutOfDay(u16),
    #[error("{0} is not on a quarter hour")]
    OffGrid(String),
    #[error("end time must be after the start time")]
    EndNotAfterStart,
    #[error("no end time fits between {0} and midnight")]
    NoRoomBeforeMidnight(String),
}

/// A weekly window during which the account stays unlocked.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SchedulePeriod {
    pub weekday: Weekday,
    pub start_minute: u16,
    pub end_minute: u16,
    pub note: String,
}

impl Default for SchedulePeriod {
    fn default() -> Self {
        Self {
            weekday: Weekday::Sun,
            start_minute: DEFAULT_START_MINUTE,
            end_minute: DEFAULT_END_MINUTE,
            note: String::new(),
        }
    }
}

impl SchedulePeriod {
    #[cfg(test)]
    pub fn new(
        weekday: Weekday,
        start_minute: u16,
        end_minute: u16,
        note: impl Into<String>,
    ) -> Result<Self, PeriodError> {
        let period = Self {
            weekday,
            start_minute,
            end_minute,
            note: note.into(),
        };
        period.validate()?;
        Ok(period)
    }

    pub fn duration(&self) -> u16 {
        self.end_minute.saturating_sub(self.start_minute)
    }

    pub fn validate(&self) -> Result<(), PeriodError> {
        if self.start_minute >= MINUTES_PER_DAY {
            return Err(PeriodError::OutOfDay(self.start_minute));
        }
        if self.end_minute >= MINUTES_PER_DAY {
            return Err(PeriodError::OutOfDay(self.end_minute));
        }
        check_grid(self.start_minute)?;
        check_grid(self.end_minute)?;
        if self.end_minute <= self.start_minute {
            return Err(PeriodError::EndNotAfterStart);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Moves the start while holding the duration. An end that would run past
    /// midnight is clamped to [`LAST_END_MINUTE`].
    pub fn set_start(&mut self, start_minute: u16) -> Result<(), PeriodError> {
        if start_minute >= MINUTES_PER_DAY {
            return Err(PeriodError::OutOfDay(start_minute));
        }
        check_grid(start_minute)?;
        if start_minute >= LAST_END_MINUTE {
            return Err(PeriodError::NoRoomBeforeMidnight(format_time_label(
                start_minute,
                None,
            )));
        }

        let duration = self.duration().max(TIME_STEP_MINUTES);
        let end_minute = start_minute.saturating_add(duration).min(LAST_END_MINUTE);
        self.start_minute = start_minute;
        self.end_minute = end_minute;
        Ok(())
    }

    pub fn set_end(&mut self, end_minute: u16) -> Result<(), PeriodError> {
        if end_minute >= MINUTES_PER_DAY {
            return Err(PeriodError::OutOfDay(end_minute));
        }
        check_grid(end_minute)?;
        if end_minute <= self.start_minute {
            return Err(PeriodError::EndNotAfterStart);
        }
        self.end_minute = end_minute;
        Ok(())
    }

    pub fn end_options(&self) -> CandidateTimes {
        candidate_end_times(Some(self.start_minute))
    }
}

fn check_grid(minutes: u16) -> Result<(), PeriodError> {
    if minutes % TIME_STEP_MINUTES != 0 {
        return Err(PeriodError::OffGrid(format_time_label(minutes, None)));
    }
    Ok(())
}

pub fn weekday_to_index(day: Weekday) -> u8 {
    // num_days_from_sunday is always < 7
    day.num_days_from_sunday() as u8
}

pub fn index_to_weekday(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}
