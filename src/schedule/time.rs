use chrono::{NaiveTime, Timelike};
use thiserror::Error;

use crate::schedule::model::{MINUTES_PER_DAY, TIME_STEP_MINUTES};

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid time '{0}', expected e.g. 9:30am or 21:30")]
pub struct TimeParseError(pub String);

/// Quarter-hour times after a start, up to (not including) midnight.
///
/// Cloning yields an independent cursor, so a picker can walk the list again
/// without recomputing anything.
#[derive(Debug, Clone)]
pub struct CandidateTimes {
    next: u16,
}

impl Iterator for CandidateTimes {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.next >= MINUTES_PER_DAY {
            return None;
        }
        let value = self.next;
        self.next += TIME_STEP_MINUTES;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::from(
            MINUTES_PER_DAY
                .saturating_sub(self.next)
                .div_ceil(TIME_STEP_MINUTES),
        );
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CandidateTimes {}

/// End times selectable after `start`. With no start the list begins at 0:15,
/// which is what the start picker offers.
pub fn candidate_end_times(start: Option<u16>) -> CandidateTimes {
    CandidateTimes {
        next: start.unwrap_or(0).saturating_add(TIME_STEP_MINUTES),
    }
}

pub fn start_time_options() -> CandidateTimes {
    candidate_end_times(None)
}

pub fn format_time_label(minutes: u16, reference_start: Option<u16>) -> String {
    let hour = minutes / 60;
    let minute = minutes % 60;
    let display_hour = match hour {
        0 => 12,
        1..=12 => hour,
        _ => hour - 12,
    };
    let meridiem = if hour >= 12 { "pm" } else { "am" };
    let mut label = format!("{display_hour}:{minute:02}{meridiem}");

    if let Some(start) = reference_start
        && minutes >= start
    {
        label.push_str(&format_duration_suffix(minutes - start));
    }
    label
}

fn format_duration_suffix(duration: u16) -> String {
    let hours = duration / 60;
    let remainder = duration % 60;
    if hours == 0 {
        format!(" ({duration} mins)")
    } else if remainder == 0 {
        if hours == 1 {
            " (1 hr)".to_string()
        } else {
            format!(" ({hours} hrs)")
        }
    } else {
        format!(" ({hours}.{} hrs)", hour_fraction_digits(remainder))
    }
}

/// Quarter-hour remainders read as decimal fractions. Anything else is not on
/// the picker grid and keeps its raw minute count after the point.
fn hour_fraction_digits(remainder: u16) -> String {
    match remainder {
        15 => "25".to_string(),
        30 => "5".to_string(),
        45 => "75".to_string(),
        other => other.to_string(),
    }
}

pub fn parse_time_label(input: &str) -> Result<u16, TimeParseError> {
    let normalized = input
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    let time = NaiveTime::parse_from_str(&normalized, "%I:%M%p")
        .or_else(|_| NaiveTime::parse_from_str(&normalized, "%H:%M"))
        .map_err(|_| TimeParseError(input.trim().to_string()))?;
    // hour < 24 and minute < 60, so this stays under MINUTES_PER_DAY
    Ok((time.hour() * 60 + time.minute()) as u16)
}
