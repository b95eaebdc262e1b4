use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::Receiver;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Weekday;

use crate::backend::Backend;
use crate::credentials::CredentialForm;
use crate::directory::{DirectoryState, User, load_directory};
use crate::schedule::list::ScheduleList;
use crate::schedule::model::index_to_weekday;
use crate::schedule::time::{format_time_label, parse_time_label};
use crate::submit::{SubmitOutcome, submit};
use crate::ui::render::{
    SCHEDULE_HELP, render_end_options, render_schedule, render_stage_heading,
    render_start_options, render_summary, render_user_list,
};
use crate::ui::secret::read_hidden_line;
use crate::wizard::{Stage, Wizard};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WizardOutcome {
    Configured { username: String },
    Cancelled,
}

/// How password prompts read their answer.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SecretEntry {
    /// Same line reader as every other prompt; used for piped input.
    #[default]
    Echo,
    /// Straight from the terminal in raw mode, nothing echoed.
    Hidden,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct WizardOptions {
    pub secret_entry: SecretEntry,
    /// The backend only captures the request, so nothing is enabled.
    pub dry_run: bool,
}

/// Drives one setup run over a line-oriented terminal.
pub fn run_wizard<R: BufRead, W: Write>(
    backend: &dyn Backend,
    input: R,
    output: W,
    options: WizardOptions,
) -> Result<WizardOutcome> {
    let mut wizard = Wizard::new();
    let stages = wizard.subscribe();
    WizardApp {
        backend,
        input,
        output,
        wizard,
        stages,
        draft: ScheduleList::new(),
        options,
    }
    .run()
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum ScheduleCommand {
    Add,
    Remove(usize),
    Day(usize, Weekday),
    Start(usize, u16),
    End(usize, u16),
    Note(usize, String),
    Times(usize),
    Starts,
    Help,
    Done,
}

struct WizardApp<'a, R, W> {
    backend: &'a dyn Backend,
    input: R,
    output: W,
    wizard: Wizard,
    stages: Receiver<Stage>,
    draft: ScheduleList,
    options: WizardOptions,
}

impl<R: BufRead, W: Write> WizardApp<'_, R, W> {
    fn run(mut self) -> Result<WizardOutcome> {
        self.print_heading(&Stage::SelectUser)?;
        loop {
            let entered = self.stages.try_iter().collect::<Vec<_>>();
            for stage in &entered {
                self.print_heading(stage)?;
            }
            match self.wizard.stage().clone() {
                Stage::SelectUser => self.select_user()?,
                Stage::EnterCredentials => self.enter_credentials()?,
                Stage::BuildSchedule => self.build_schedule()?,
                Stage::ReadyToSubmit => {
                    if !self.confirm()? {
                        writeln!(self.output, "Setup cancelled; nothing was sent.")?;
                        return Ok(WizardOutcome::Cancelled);
                    }
                }
                Stage::Submitting => bail!("wizard stalled with a submission in flight"),
                Stage::Error { reason } => {
                    writeln!(self.output, "Enabling lockdown failed: {reason}")?;
                    if !self.ask_yes_no("Try again? [Y/n] ", true)? {
                        bail!("submission failed: {reason}");
                    }
                    self.send()?;
                }
                Stage::Done => {
                    let username = self
                        .wizard
                        .session()
                        .selected_user()
                        .map(|user| user.username.clone())
                        .unwrap_or_default();
                    if self.options.dry_run {
                        writeln!(
                            self.output,
                            "Setup for {username} is complete; lockdown was left unchanged."
                        )?;
                    } else {
                        writeln!(self.output, "Lockdown schedule enabled for {username}.")?;
                    }
                    return Ok(WizardOutcome::Configured { username });
                }
            }
        }
    }

    fn print_heading(&mut self, stage: &Stage) -> Result<()> {
        if let Some(heading) = render_stage_heading(stage) {
            writeln!(self.output, "\n{heading}")?;
        }
        Ok(())
    }

    fn select_user(&mut self) -> Result<()> {
        match self.wizard.directory().clone() {
            DirectoryState::Loading => {
                writeln!(self.output, "Loading user accounts...")?;
                let _ = load_directory(self.backend, &mut self.wizard);
            }
            DirectoryState::Failed(reason) => {
                writeln!(self.output, "Could not load user accounts: {reason}")?;
                if !self.ask_yes_no("Retry? [Y/n] ", true)? {
                    bail!("user directory unavailable: {reason}");
                }
                let _ = self.wizard.retry_directory();
            }
            DirectoryState::Ready(users) => {
                if users.is_empty() {
                    bail!("the backend offered no user accounts to configure");
                }
                write!(self.output, "{}", render_user_list(&users))?;
                let answer = self.prompt("Account (number or username): ")?;
                match pick_user(&users, &answer) {
                    Some(user) => {
                        let _ = self.wizard.user_chosen(user);
                    }
                    None => writeln!(self.output, "No account matches '{}'.", answer.trim())?,
                }
            }
        }
        Ok(())
    }

    fn enter_credentials(&mut self) -> Result<()> {
        let form = CredentialForm::new(
            self.prompt_secret("Current password: ")?,
            self.prompt_secret("Lockdown password: ")?,
            self.prompt_secret("Repeat lockdown password: ")?,
        );
        let check = form.check();
        if check.ok {
            let _ = self.wizard.credentials_entered(&form);
        } else if let Some(message) = check.message() {
            writeln!(self.output, "{message}")?;
        }
        Ok(())
    }

    fn build_schedule(&mut self) -> Result<()> {
        write!(
            self.output,
            "{}",
            render_schedule(self.draft.periods(), self.draft.can_remove())
        )?;
        let line = self.prompt("schedule> ")?;
        if line.trim().is_empty() {
            return Ok(());
        }
        match parse_schedule_command(&line, self.draft.len()) {
            Ok(command) => self.apply_schedule_command(command)?,
            Err(err) => writeln!(self.output, "{err}")?,
        }
        Ok(())
    }

    fn apply_schedule_command(&mut self, command: ScheduleCommand) -> Result<()> {
        match command {
            ScheduleCommand::Add => {
                let index = self.draft.add_period();
                writeln!(self.output, "Added period {}.", index + 1)?;
            }
            ScheduleCommand::Remove(index) => {
                if !self.draft.remove_period(index) {
                    writeln!(self.output, "The last period cannot be removed.")?;
                }
            }
            ScheduleCommand::Day(index, weekday) => {
                if let Some(period) = self.draft.period_mut(index) {
                    period.weekday = weekday;
                }
            }
            ScheduleCommand::Start(index, minutes) => {
                if let Some(period) = self.draft.period_mut(index)
                    && let Err(err) = period.set_start(minutes)
                {
                    writeln!(self.output, "{err}")?;
                }
            }
            ScheduleCommand::End(index, minutes) => {
                let Some(period) = self.draft.period_mut(index) else {
                    return Ok(());
                };
                if !period.end_options().any(|option| option == minutes) {
                    writeln!(
                        self.output,
                        "{} is not an end time for period {}; type times {} for the list.",
                        format_time_label(minutes, None),
                        index + 1,
                        index + 1
                    )?;
                } else if let Err(err) = period.set_end(minutes) {
                    writeln!(self.output, "{err}")?;
                }
            }
            ScheduleCommand::Note(index, note) => {
                if let Some(period) = self.draft.period_mut(index) {
                    period.note = note;
                }
            }
            ScheduleCommand::Times(index) => {
                if let Some(period) = self.draft.periods().get(index) {
                    write!(self.output, "{}", render_end_options(index, period))?;
                }
            }
            ScheduleCommand::Starts => write!(self.output, "{}", render_start_options())?,
            ScheduleCommand::Help => writeln!(self.output, "{SCHEDULE_HELP}")?,
            ScheduleCommand::Done => {
                if !self
                    .wizard
                    .schedule_submitted(self.draft.to_periods())
                    .is_applied()
                {
                    writeln!(self.output, "Every period needs an end after its start.")?;
                }
            }
        }
        Ok(())
    }

    fn confirm(&mut self) -> Result<bool> {
        write!(self.output, "{}", render_summary(self.wizard.session()))?;
        if !self.ask_yes_no("Enable lockdown now? [y/N] ", false)? {
            return Ok(false);
        }
        self.send()?;
        Ok(true)
    }

    fn send(&mut self) -> Result<()> {
        if self.options.dry_run {
            writeln!(self.output, "Preparing configuration (dry run)...")?;
        } else {
            writeln!(self.output, "Sending configuration...")?;
        }
        if let SubmitOutcome::Ignored = submit(self.backend, &mut self.wizard) {
            bail!("wizard was not ready to submit");
        }
        Ok(())
    }

    fn prompt(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read from input")?;
        if read == 0 {
            bail!("input closed before setup finished");
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    fn prompt_secret(&mut self, label: &str) -> Result<String> {
        match self.options.secret_entry {
            SecretEntry::Echo => self.prompt(label),
            SecretEntry::Hidden => {
                write!(self.output, "{label}")?;
                self.output.flush()?;
                let line = read_hidden_line()?;
                writeln!(self.output)?;
                Ok(line)
            }
        }
    }

    fn ask_yes_no(&mut self, label: &str, default: bool) -> Result<bool> {
        loop {
            let answer = self.prompt(label)?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

fn pick_user(users: &[User], answer: &str) -> Option<User> {
    let answer = answer.trim();
    if let Ok(number) = answer.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| users.get(index))
            .cloned();
    }
    users.iter().find(|user| user.username == answer).cloned()
}

fn parse_schedule_command(line: &str, len: usize) -> Result<ScheduleCommand> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "add" => Ok(ScheduleCommand::Add),
        "done" => Ok(ScheduleCommand::Done),
        "starts" => Ok(ScheduleCommand::Starts),
        "help" | "?" => Ok(ScheduleCommand::Help),
        "remove" | "rm" => Ok(ScheduleCommand::Remove(parse_index(rest, len)?)),
        "times" => Ok(ScheduleCommand::Times(parse_index(rest, len)?)),
        "day" | "start" | "end" | "note" => {
            let (index, value) = match rest.split_once(char::is_whitespace) {
                Some((index, value)) => (index, value.trim()),
                None => (rest, ""),
            };
            let index = parse_index(index, len)?;
            match verb.to_ascii_lowercase().as_str() {
                "day" => Ok(ScheduleCommand::Day(index, parse_weekday(value)?)),
                "start" => Ok(ScheduleCommand::Start(index, parse_time_label(value)?)),
                "end" => Ok(ScheduleCommand::End(index, parse_time_label(value)?)),
                _ => Ok(ScheduleCommand::Note(index, value.to_string())),
            }
        }
        other => bail!("unknown command '{other}'; type help for a list"),
    }
}

/// Accepts a weekday name or its index with Sunday as 0.
fn parse_weekday(raw: &str) -> Result<Weekday> {
    if let Ok(index) = raw.parse::<u8>() {
        return index_to_weekday(index).ok_or_else(|| anyhow!("weekday index {index} is not 0-6"));
    }
    Weekday::from_str(raw).map_err(|_| anyhow!("unknown weekday '{raw}'"))
}

fn parse_index(raw: &str, len: usize) -> Result<usize> {
    let number = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| anyhow!("expected a period number, got '{}'", raw.trim()))?;
    if number == 0 || number > len {
        bail!("period {number} does not exist (1-{len})");
    }
    Ok(number - 1)
}
