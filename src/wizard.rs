//! Setup wizard state machine.
//!
//! The wizard advances strictly forward:
//!
//! ```text
//! SelectUser -> EnterCredentials -> BuildSchedule -> ReadyToSubmit -> Submitting -> Done
//!                                                         Error <--------'   |
//!                                                           '--(confirm)-----'
//! ```
//!
//! Every event method checks the current stage and its guard first. An event
//! that does not fit is dropped and reported as [`EventOutcome::Ignored`], so
//! a repeated or late UI event can never move the session backwards or skip
//! a stage. Front-ends read [`Wizard::stage`] or hold a [`Wizard::subscribe`]
//! receiver and render exactly one sub-view per stage.

use std::sync::mpsc::{self, Receiver, Sender};

use log::debug;

use crate::credentials::{CredentialForm, CredentialPair};
use crate::directory::{DirectoryState, User};
use crate::schedule::model::SchedulePeriod;
use crate::submit::{ConfigurationRequest, build_request};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Stage {
    SelectUser,
    EnterCredentials,
    BuildSchedule,
    ReadyToSubmit,
    Submitting,
    Done,
    Error { reason: String },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[must_use]
pub enum EventOutcome {
    Applied,
    Ignored,
}

impl EventOutcome {
    pub fn is_applied(self) -> bool {
        self == EventOutcome::Applied
    }
}

/// Everything collected so far. Owned by exactly one [`Wizard`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WizardSession {
    stage: Stage,
    selected_user: Option<User>,
    credentials: Option<CredentialPair>,
    schedule: Option<Vec<SchedulePeriod>>,
}

impl WizardSession {
    fn new() -> Self {
        Self {
            stage: Stage::SelectUser,
            selected_user: None,
            credentials: None,
            schedule: None,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.selected_user.as_ref()
    }

    pub fn credentials(&self) -> Option<&CredentialPair> {
        self.credentials.as_ref()
    }

    pub fn schedule(&self) -> Option<&[SchedulePeriod]> {
        self.schedule.as_deref()
    }
}

#[derive(Debug)]
pub struct Wizard {
    session: WizardSession,
    directory: DirectoryState,
    observers: Vec<Sender<Stage>>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            session: WizardSession::new(),
            directory: DirectoryState::Loading,
            observers: Vec::new(),
        }
    }

    pub fn stage(&self) -> &Stage {
        self.session.stage()
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn directory(&self) -> &DirectoryState {
        &self.directory
    }

    /// Receives every stage the wizard enters from now on.
    pub fn subscribe(&mut self) -> Receiver<Stage> {
        let (tx, rx) = mpsc::channel();
        self.observers.push(tx);
        rx
    }

    pub fn users_loaded(&mut self, users: Vec<User>) -> EventOutcome {
        if self.session.stage != Stage::SelectUser {
            return self.ignore("users_loaded");
        }
        self.directory = DirectoryState::Ready(users);
        EventOutcome::Applied
    }

    pub fn users_failed(&mut self, reason: impl Into<String>) -> EventOutcome {
        if self.session.stage != Stage::SelectUser {
            return self.ignore("users_failed");
        }
        self.directory = DirectoryState::Failed(reason.into());
        EventOutcome::Applied
    }

    pub fn retry_directory(&mut self) -> EventOutcome {
        if self.session.stage != Stage::SelectUser
            || !matches!(self.directory, DirectoryState::Failed(_))
        {
            return self.ignore("retry_directory");
        }
        self.directory = DirectoryState::Loading;
        EventOutcome::Applied
    }

    pub fn user_chosen(&mut self, user: User) -> EventOutcome {
        if self.session.stage != Stage::SelectUser {
            return self.ignore("user_chosen");
        }
        debug!("user selected: {}", user.username);
        self.session.selected_user = Some(user);
        self.transition(Stage::EnterCredentials)
    }

    pub fn credentials_entered(&mut self, form: &CredentialForm) -> EventOutcome {
        if self.session.stage != Stage::EnterCredentials {
            return self.ignore("credentials_entered");
        }
        let Ok(pair) = form.to_pair() else {
            return self.ignore("credentials_entered");
        };
        self.session.credentials = Some(pair);
        self.transition(Stage::BuildSchedule)
    }

    pub fn schedule_submitted(&mut self, periods: Vec<SchedulePeriod>) -> EventOutcome {
        if self.session.stage != Stage::BuildSchedule
            || periods.is_empty()
            || !periods.iter().all(SchedulePeriod::is_valid)
        {
            return self.ignore("schedule_submitted");
        }
        self.session.schedule = Some(periods);
        self.transition(Stage::ReadyToSubmit)
    }

    /// Starts a submission and hands back the request to post. Returns `None`
    /// unless the wizard is ready or recovering from a failed attempt, which
    /// also keeps a second submission from starting while one is in flight.
    pub fn confirm_enable(&mut self) -> Option<ConfigurationRequest> {
        if !matches!(
            self.session.stage,
            Stage::ReadyToSubmit | Stage::Error { .. }
        ) {
            let _ = self.ignore("confirm_enable");
            return None;
        }
        let request = build_request(&self.session)?;
        let _ = self.transition(Stage::Submitting);
        Some(request)
    }

    pub fn submit_succeeded(&mut self) -> EventOutcome {
        if self.session.stage != Stage::Submitting {
            return self.ignore("submit_succeeded");
        }
        self.session.credentials = None;
        self.transition(Stage::Done)
    }

    pub fn submit_failed(&mut self, reason: impl Into<String>) -> EventOutcome {
        if self.session.stage != Stage::Submitting {
            return self.ignore("submit_failed");
        }
        self.transition(Stage::Error {
            reason: reason.into(),
        })
    }

    fn transition(&mut self, next: Stage) -> EventOutcome {
        debug!("wizard stage {:?} -> {:?}", self.session.stage, next);
        self.session.stage = next;
        let stage = &self.session.stage;
        self.observers.retain(|tx| tx.send(stage.clone()).is_ok());
        EventOutcome::Applied
    }

    fn ignore(&self, event: &str) -> EventOutcome {
        debug!("ignoring {event} in stage {:?}", self.session.stage);
        EventOutcome::Ignored
    }
}
