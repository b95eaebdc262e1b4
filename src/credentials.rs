//! Password entry for the lockdown account.
//!
//! Validation is a pure function of the three form fields and is meant to be
//! re-run after every edit. Nothing here logs or prints a password; both the
//! form and the validated pair redact themselves in `Debug` output.

use std::fmt;

use thiserror::Error;

pub const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum CredentialIssue {
    #[error("Lockdown passwords do not match")]
    Mismatch,
    #[error("Current password is required")]
    MissingCurrent,
    #[error("Lockdown password is required")]
    MissingLockdown,
    #[error("Please repeat the lockdown password")]
    MissingRepeat,
}

/// Result of one validation pass. `ok` is the gate for leaving the
/// credentials stage.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CredentialCheck {
    pub ok: bool,
    pub issue: Option<CredentialIssue>,
}

impl CredentialCheck {
    pub fn message(&self) -> Option<String> {
        self.issue.map(|issue| issue.to_string())
    }
}

pub fn validate(current: &str, lockdown: &str, lockdown_repeat: &str) -> CredentialCheck {
    let issue = if lockdown != lockdown_repeat {
        Some(CredentialIssue::Mismatch)
    } else if current.trim().is_empty() {
        Some(CredentialIssue::MissingCurrent)
    } else if lockdown.trim().is_empty() {
        Some(CredentialIssue::MissingLockdown)
    } else if lockdown_repeat.trim().is_empty() {
        Some(CredentialIssue::MissingRepeat)
    } else {
        None
    };

    CredentialCheck {
        ok: issue.is_none(),
        issue,
    }
}

#[derive(Clone, Default, Eq, PartialEq)]
pub struct CredentialForm {
    pub current_password: String,
    pub lockdown_password: String,
    pub lockdown_password_repeat: String,
}

impl CredentialForm {
    pub fn new(
        current_password: impl Into<String>,
        lockdown_password: impl Into<String>,
        lockdown_password_repeat: impl Into<String>,
    ) -> Self {
        Self {
            current_password: current_password.into(),
            lockdown_password: lockdown_password.into(),
            lockdown_password_repeat: lockdown_password_repeat.into(),
        }
    }

    pub fn check(&self) -> CredentialCheck {
        validate(
            &self.current_password,
            &self.lockdown_password,
            &self.lockdown_password_repeat,
        )
    }

    pub fn to_pair(&self) -> Result<CredentialPair, CredentialIssue> {
        match self.check().issue {
            Some(issue) => Err(issue),
            None => Ok(CredentialPair {
                current_password: self.current_password.clone(),
                lockdown_password: self.lockdown_password.clone(),
            }),
        }
    }
}

impl fmt::Debug for CredentialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialForm")
            .field("current_password", &REDACTED)
            .field("lockdown_password", &REDACTED)
            .field("lockdown_password_repeat", &REDACTED)
            .finish()
    }
}

/// Validated pair. Only obtainable through [`CredentialForm::to_pair`].
#[derive(Clone, Eq, PartialEq)]
pub struct CredentialPair {
    current_password: String,
    lockdown_password: String,
}

impl CredentialPair {
    pub fn current_password(&self) -> &str {
        &self.current_password
    }

    pub fn lockdown_password(&self) -> &str {
        &self.lockdown_password
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("current_password", &REDACTED)
            .field("lockdown_password", &REDACTED)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_lockdown_passwords_fail() {
        let check = validate("a", "x", "y");
        assert!(!check.ok);
        assert_eq!(check.issue, Some(CredentialIssue::Mismatch));
        assert_eq!(
            check.message().as_deref(),
            Some("Lockdown passwords do not match")
        );
    }

    #[test]
    fn matching_non_blank_fields_pass() {
        let check = validate("a", "x", "x");
        assert!(check.ok);
        assert_eq!(check.message(), None);
    }

    #[test]
    fn blank_fields_keep_gate_closed() {
        assert_eq!(
            validate("   ", "x", "x").issue,
            Some(CredentialIssue::MissingCurrent)
        );
        assert_eq!(
            validate("a", " ", " ").issue,
            Some(CredentialIssue::MissingLockdown)
        );
        assert!(!validate("", "", "").ok);
    }

    #[test]
    fn revalidation_depends_only_on_current_values() {
        let mut form = CredentialForm::new("cur123", "lock1", "lock");
        assert_eq!(form.check().issue, Some(CredentialIssue::Mismatch));
        form.lockdown_password_repeat.push('1');
        assert!(form.check().ok);
        form.current_password.clear();
        assert_eq!(form.check().issue, Some(CredentialIssue::MissingCurrent));
    }

    #[test]
    fn pair_drops_the_repeat_and_redacts_debug_output() {
        let pair = CredentialForm::new("cur123", "lock1", "lock1")
            .to_pair()
            .expect("valid form");
        assert_eq!(pair.current_password(), "cur123");
        assert_eq!(pair.lockdown_password(), "lock1");

        let debug = format!("{pair:?}");
        assert!(debug.contains(REDACTED));
        assert!(!debug.contains("cur123"));
        assert!(!debug.contains("lock1"));
    }
}
