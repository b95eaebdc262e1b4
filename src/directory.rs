use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use serde::Deserialize;

use crate::backend::Backend;
use crate::wizard::{EventOutcome, Wizard};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Avatar {
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

impl Avatar {
    /// Decodes a picture payload. Line breaks and other whitespace inside the
    /// base64 text are tolerated; anything else malformed is an error.
    pub fn decode(mimetype: String, encoded: &str) -> Result<Self, base64::DecodeError> {
        let compact = encoded
            .chars()
            .filter(|ch| !ch.is_ascii_whitespace())
            .collect::<String>();
        let bytes = STANDARD.decode(compact)?;
        Ok(Self { mimetype, bytes })
    }
}

/// An OS account the backend offers for lockdown.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct User {
    pub username: String,
    pub realname: String,
    pub avatar: Option<Avatar>,
}

impl User {
    pub fn new(username: impl Into<String>, realname: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            realname: realname.into(),
            avatar: None,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.realname.trim().is_empty() {
            &self.username
        } else {
            &self.realname
        }
    }
}

/// One entry of `GET /api/users`.
#[derive(Debug, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(default)]
    pub realname: String,
    #[serde(default)]
    pub picture_base64: Option<String>,
    #[serde(default)]
    pub picture_mimetype: Option<String>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let avatar = match (record.picture_base64, record.picture_mimetype) {
            (Some(encoded), Some(mimetype))
                if !encoded.trim().is_empty() && !mimetype.trim().is_empty() =>
            {
                match Avatar::decode(mimetype, &encoded) {
                    Ok(avatar) => Some(avatar),
                    Err(err) => {
                        warn!("dropping picture for {}: {err}", record.username);
                        None
                    }
                }
            }
            _ => None,
        };
        Self {
            avatar,
            ..Self::new(record.username, record.realname)
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DirectoryState {
    Loading,
    Ready(Vec<User>),
    Failed(String),
}

pub fn load_directory(backend: &dyn Backend, wizard: &mut Wizard) -> EventOutcome {
    match backend.users() {
        Ok(users) => {
            debug!("user directory returned {} accounts", users.len());
            wizard.users_loaded(users)
        }
        Err(err) => {
            warn!("user directory unavailable: {err}");
            wizard.users_failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_picture_has_no_avatar() {
        let records = serde_json::from_str::<Vec<UserRecord>>(
            r#"[
  {"username": "alice", "realname": "Alice", "picture_base64": "", "picture_mimetype": ""},
  {"username": "bob", "realname": "Bob", "picture_base64": null, "picture_mimetype": null},
  {"username": "carol"}
]"#,
        )
        .expect("valid user list");
        let users = records.into_iter().map(User::from).collect::<Vec<_>>();
        assert!(users.iter().all(|user| user.avatar.is_none()));
        assert_eq!(users[2].display_name(), "carol");
        assert_eq!(users[0].display_name(), "Alice");
    }

    #[test]
    fn record_with_picture_keeps_mimetype_and_data() {
        let record = serde_json::from_str::<UserRecord>(
            r#"{"username": "dave", "realname": "Dave", "picture_base64": "aGVsbG8=", "picture_mimetype": "image/png"}"#,
        )
        .expect("valid user");
        let user = User::from(record);
        let avatar = user.avatar.expect("avatar");
        assert_eq!(avatar.mimetype, "image/png");
        assert_eq!(avatar.bytes, b"hello");
    }

    #[test]
    fn wrapped_picture_decodes_to_its_real_length() {
        let record = serde_json::from_str::<UserRecord>(
            r#"{"username": "erin", "picture_base64": "aGVs\nbG8g\nd29y\nbGQ=", "picture_mimetype": "image/jpeg"}"#,
        )
        .expect("valid user");
        let avatar = User::from(record).avatar.expect("avatar");
        assert_eq!(avatar.bytes.len(), "hello world".len());
    }

    #[test]
    fn undecodable_picture_is_dropped() {
        let record = serde_json::from_str::<UserRecord>(
            r#"{"username": "frank", "picture_base64": "not*base64!", "picture_mimetype": "image/png"}"#,
        )
        .expect("valid user");
        let user = User::from(record);
        assert!(user.avatar.is_none());
        assert_eq!(user.username, "frank");
    }
}
