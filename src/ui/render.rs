use std::fmt::Write as _;

use crate::directory::User;
use crate::schedule::model::{SchedulePeriod, weekday_label};
use crate::schedule::time::{format_time_label, start_time_options};
use crate::wizard::{Stage, WizardSession};

pub const SCHEDULE_HELP: &str = "\
Commands:
  add                 append a period (Sunday 9:00am-9:30am)
  remove N            delete period N
  day N DAY           set the weekday, e.g. day 2 wed
  start N TIME        move the start, keeping the duration, e.g. start 1 4:30pm
  end N TIME          set the end time, e.g. end 1 6:00pm
  note N TEXT         attach a note
  times N             list end times available for period N
  starts              list the start times on offer
  done                finish the schedule
  help                show this list";

/// Title shown once when the wizard enters a stage. Transient stages have none.
pub fn render_stage_heading(stage: &Stage) -> Option<&'static str> {
    match stage {
        Stage::SelectUser => Some("Step 1 of 4: choose an account"),
        Stage::EnterCredentials => Some("Step 2 of 4: passwords"),
        Stage::BuildSchedule => Some("Step 3 of 4: open periods"),
        Stage::ReadyToSubmit => Some("Step 4 of 4: confirm"),
        Stage::Submitting | Stage::Done | Stage::Error { .. } => None,
    }
}

pub fn render_user_list(users: &[User]) -> String {
    let mut out = String::from("Which account should be locked down?\n");
    for (index, user) in users.iter().enumerate() {
        let _ = write!(out, "  {}) {} ({})", index + 1, user.display_name(), user.username);
        if let Some(avatar) = &user.avatar {
            let _ = write!(
                out,
                " [picture: {}, {} bytes]",
                avatar.mimetype,
                avatar.bytes.len()
            );
        }
        out.push('\n');
    }
    out
}

pub fn render_period_row(index: usize, period: &SchedulePeriod) -> String {
    format!(
        "{:>3}  {:<9}  {:<8}  {:<20}  {}",
        index + 1,
        weekday_label(period.weekday),
        format_time_label(period.start_minute, None),
        format_time_label(period.end_minute, Some(period.start_minute)),
        period.note
    )
    .trim_end()
    .to_string()
}

pub fn render_schedule(periods: &[SchedulePeriod], can_remove: bool) -> String {
    let mut out = String::from("Open periods (the account is unlocked during these):\n");
    let _ = writeln!(
        out,
        "{:>3}  {:<9}  {:<8}  {:<20}  {}",
        "#", "Day", "Start", "End", "Note"
    );
    for (index, period) in periods.iter().enumerate() {
        out.push_str(&render_period_row(index, period));
        out.push('\n');
    }
    if !can_remove {
        out.push_str("(at least one period is required)\n");
    }
    out
}

pub fn render_end_options(index: usize, period: &SchedulePeriod) -> String {
    let mut out = format!(
        "End times for period {} (starts {}):\n",
        index + 1,
        format_time_label(period.start_minute, None)
    );
    for minutes in period.end_options() {
        let _ = writeln!(
            out,
            "  {}",
            format_time_label(minutes, Some(period.start_minute))
        );
    }
    out
}

pub fn render_start_options() -> String {
    let labels = start_time_options()
        .map(|minutes| format_time_label(minutes, None))
        .collect::<Vec<_>>();
    let mut out = String::from("Start times:\n");
    for row in labels.chunks(8) {
        let _ = writeln!(out, "  {}", row.join("  "));
    }
    out
}

pub fn render_summary(session: &WizardSession) -> String {
    let mut out = String::from("Ready to enable lockdown.\n");
    if let Some(user) = session.selected_user() {
        let _ = writeln!(out, "  Account: {} ({})", user.display_name(), user.username);
    }
    if let Some(periods) = session.schedule() {
        let _ = writeln!(out, "  Open periods:");
        for (index, period) in periods.iter().enumerate() {
            let _ = writeln!(out, "  {}", render_period_row(index, period));
        }
    }
    out
}
