use std::fmt;

use chrono::Weekday;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::credentials::REDACTED;
use crate::schedule::model::{SchedulePeriod, weekday_to_index};
use crate::wizard::{EventOutcome, Wizard, WizardSession};

/// Body of `POST /api/userconfig/`.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationRequest {
    pub username: String,
    pub normal_password: String,
    pub lockdown_password: String,
    pub schedule: WireSchedule,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WireSchedule {
    pub open_periods: Vec<OpenPeriod>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OpenPeriod {
    pub start: WeekInstant,
    pub end: WeekInstant,
    pub note: String,
}

/// A point in the week: weekday index (Sunday = 0) plus wall-clock time.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct WeekInstant {
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
}

impl WeekInstant {
    pub fn from_minutes(weekday: Weekday, minutes: u16) -> Self {
        // minutes < 1440 keeps hour < 24
        Self {
            weekday: weekday_to_index(weekday),
            hour: (minutes / 60) as u8,
            minute: (minutes % 60) as u8,
        }
    }
}

impl From<&SchedulePeriod> for OpenPeriod {
    fn from(period: &SchedulePeriod) -> Self {
        Self {
            start: WeekInstant::from_minutes(period.weekday, period.start_minute),
            end: WeekInstant::from_minutes(period.weekday, period.end_minute),
            note: period.note.clone(),
        }
    }
}

impl ConfigurationRequest {
    pub fn from_parts(
        username: &str,
        normal_password: &str,
        lockdown_password: &str,
        periods: &[SchedulePeriod],
    ) -> Self {
        Self {
            username: username.to_string(),
            normal_password: normal_password.to_string(),
            lockdown_password: lockdown_password.to_string(),
            schedule: WireSchedule {
                open_periods: periods.iter().map(OpenPeriod::from).collect(),
            },
        }
    }

    /// Copy safe to print: both passwords replaced.
    pub fn redacted(&self) -> Self {
        Self {
            normal_password: REDACTED.to_string(),
            lockdown_password: REDACTED.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ConfigurationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationRequest")
            .field("username", &self.username)
            .field("normal_password", &REDACTED)
            .field("lockdown_password", &REDACTED)
            .field("schedule", &self.schedule)
            .finish()
    }
}

/// Projects a completed session onto the wire format. `None` until a user,
/// credentials and schedule have all been stored.
pub fn build_request(session: &WizardSession) -> Option<ConfigurationRequest> {
    let user = session.selected_user()?;
    let credentials = session.credentials()?;
    let schedule = session.schedule()?;
    Some(ConfigurationRequest::from_parts(
        &user.username,
        credentials.current_password(),
        credentials.lockdown_password(),
        schedule,
    ))
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitOutcome {
    Succeeded,
    Failed(String),
    /// The wizard was not in a state that allows enabling.
    Ignored,
}

/// Runs one confirm-and-post round. Failures land the wizard in its error
/// stage; retrying is the caller's decision.
pub fn submit(backend: &dyn Backend, wizard: &mut Wizard) -> SubmitOutcome {
    let Some(request) = wizard.confirm_enable() else {
        return SubmitOutcome::Ignored;
    };

    match backend.submit_config(&request) {
        Ok(()) => {
            info!("configuration accepted for {}", request.username);
            match wizard.submit_succeeded() {
                EventOutcome::Applied => SubmitOutcome::Succeeded,
                EventOutcome::Ignored => SubmitOutcome::Ignored,
            }
        }
        Err(err) => {
            let reason = err.to_string();
            warn!("configuration submit failed: {reason}");
            match wizard.submit_failed(reason.clone()) {
                EventOutcome::Applied => SubmitOutcome::Failed(reason),
                EventOutcome::Ignored => SubmitOutcome::Ignored,
            }
        }
    }
}
