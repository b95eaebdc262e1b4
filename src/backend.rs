use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::directory::{User, UserRecord};
use crate::submit::ConfigurationRequest;

pub const STATUS_PATH: &str = "api/status";
pub const USERS_PATH: &str = "api/users";
pub const USER_CONFIG_PATH: &str = "api/userconfig/";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("could not create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct BackendStatus {
    pub hostname: String,
    pub is_configured: bool,
}

/// The enforcement service as seen by the setup wizard.
pub trait Backend {
    fn status(&self) -> Result<BackendStatus, BackendError>;
    fn users(&self) -> Result<Vec<User>, BackendError>;
    fn submit_config(&self, request: &ConfigurationRequest) -> Result<(), BackendError>;
}

pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::Client)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = self.endpoint(path);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| classify_error(&url, err))?;
        let response = ensure_success(&url, response)?;
        response.json::<T>().map_err(|err| classify_error(&url, err))
    }
}

impl Backend for HttpBackend {
    fn status(&self) -> Result<BackendStatus, BackendError> {
        self.get_json(STATUS_PATH)
    }

    fn users(&self) -> Result<Vec<User>, BackendError> {
        let records = self.get_json::<Vec<UserRecord>>(USERS_PATH)?;
        Ok(records.into_iter().map(User::from).collect())
    }

    fn submit_config(&self, request: &ConfigurationRequest) -> Result<(), BackendError> {
        let url = self.endpoint(USER_CONFIG_PATH);
        info!(
            "POST {url} for user {} with {} open periods",
            request.username,
            request.schedule.open_periods.len()
        );
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|err| classify_error(&url, err))?;
        ensure_success(&url, response)?;
        Ok(())
    }
}

fn ensure_success(url: &str, response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn classify_error(url: &str, err: reqwest::Error) -> BackendError {
    let url = url.to_string();
    if err.is_timeout() {
        BackendError::Timeout { url }
    } else if err.is_decode() {
        BackendError::Decode { url, source: err }
    } else {
        BackendError::Transport { url, source: err }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::str::FromStr;
    use std::sync::mpsc::{self, Receiver};
    use std::thread;

    use chrono::Weekday;
    use tiny_http::{Header, Response, Server, StatusCode};

    use super::*;
    use crate::schedule::model::SchedulePeriod;
    use crate::submit::{ConfigurationRequest, WeekInstant};

    struct Reply {
        status: u16,
        body: &'static str,
        delay: Duration,
    }

    fn reply(status: u16, body: &'static str) -> Reply {
        Reply {
            status,
            body,
            delay: Duration::ZERO,
        }
    }

    /// Serves `replies` in order and forwards each request line and body.
    fn spawn_server(replies: Vec<Reply>) -> (String, Receiver<(String, String)>) {
        let server = Server::http("127.0.0.1:0").expect("bind test server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("ip listener")
            .port();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for reply in replies {
                let Ok(mut request) = server.recv() else {
                    return;
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let _ = tx.send((format!("{} {}", request.method(), request.url()), body));
                thread::sleep(reply.delay);
                let header = Header::from_str("Content-Type: application/json")
                    .expect("content type header");
                let _ = request.respond(
                    Response::from_string(reply.body)
                        .with_status_code(StatusCode(reply.status))
                        .with_header(header),
                );
            }
        });
        (format!("http://127.0.0.1:{port}/"), rx)
    }

    fn sample_request() -> ConfigurationRequest {
        ConfigurationRequest::from_parts(
            "alice",
            "cur123",
            "lock1",
            &[SchedulePeriod::new(Weekday::Mon, 1020, 1080, "homework").expect("valid")],
        )
    }

    #[test]
    fn status_and_users_decode_backend_payloads() {
        let (url, requests) = spawn_server(vec![
            reply(200, r#"{"hostname": "family-mac", "is_configured": false}"#),
            reply(
                200,
                r#"[{"username": "alice", "realname": "Alice", "picture_base64": "", "picture_mimetype": ""}]"#,
            ),
        ]);
        let backend = HttpBackend::new(&url, Duration::from_secs(5)).expect("client");
        assert!(!backend.base_url().ends_with('/'));

        let status = backend.status().expect("status");
        assert_eq!(status.hostname, "family-mac");
        assert!(!status.is_configured);

        let users = backend.users().expect("users");
        assert_eq!(users, vec![User::new("alice", "Alice")]);

        let seen = requests.try_iter().map(|(line, _)| line).collect::<Vec<_>>();
        assert_eq!(seen, vec!["GET /api/status", "GET /api/users"]);
    }

    #[test]
    fn submit_posts_wire_payload() {
        let (url, requests) = spawn_server(vec![reply(200, "{}")]);
        let backend = HttpBackend::new(&url, Duration::from_secs(5)).expect("client");
        backend.submit_config(&sample_request()).expect("submitted");

        let (line, body) = requests.recv().expect("request seen");
        assert_eq!(line, "POST /api/userconfig/");
        let posted = serde_json::from_str::<ConfigurationRequest>(&body).expect("json body");
        assert_eq!(posted.username, "alice");
        assert_eq!(posted.schedule.open_periods[0].start, WeekInstant {
            weekday: 1,
            hour: 17,
            minute: 0
        });
    }

    #[test]
    fn non_success_status_is_reported() {
        let (url, _requests) = spawn_server(vec![reply(500, r#"{"error": "disk full"}"#)]);
        let backend = HttpBackend::new(&url, Duration::from_secs(5)).expect("client");
        let err = backend
            .submit_config(&sample_request())
            .expect_err("server error");
        assert!(matches!(err, BackendError::Status { status: 500, .. }));
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let (url, _requests) = spawn_server(vec![reply(200, "not json")]);
        let backend = HttpBackend::new(&url, Duration::from_secs(5)).expect("client");
        let err = backend.status().expect_err("bad body");
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[test]
    fn slow_backend_times_out() {
        let (url, _requests) = spawn_server(vec![Reply {
            status: 200,
            body: "{}",
            delay: Duration::from_secs(2),
        }]);
        let backend = HttpBackend::new(&url, Duration::from_millis(200)).expect("client");
        let err = backend
            .submit_config(&sample_request())
            .expect_err("timeout");
        assert!(matches!(err, BackendError::Timeout { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn unreachable_backend_is_a_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let backend = HttpBackend::new(&format!("http://127.0.0.1:{port}"), Duration::from_secs(2))
            .expect("client");
        let err = backend.users().expect_err("nothing listening");
        assert!(matches!(err, BackendError::Transport { .. }));
    }
}
