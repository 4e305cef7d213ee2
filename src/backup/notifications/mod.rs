use crate::backup::notifications::smtp::SmtpNotificationConfig;
use crate::backup::result_error::result::Result;
use derive_more::From;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::result;
use validator::{Validate, ValidationErrors};

pub mod smtp;

#[derive(Clone, From, Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum NotificationConfig {
    Smtp(SmtpNotificationConfig),
}

impl Validate for NotificationConfig {
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        match self {
            Self::Smtp(inner) => inner.validate(),
        }
    }
}

impl Notification for NotificationConfig {
    fn send<D1: Display, D2: Display>(&self, topic: D1, msg: D2) -> Result<()> {
        match self {
            Self::Smtp(inner) => inner.send(topic, msg),
        }
    }
}

pub trait Notification {
    fn send<D1: Display, D2: Display>(&self, topic: D1, msg: D2) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Terminal result of one run, as told to the recipients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub outcome: Outcome,
    pub subject: String,
    pub body: String,
}

impl NotificationEvent {
    pub fn success<D: Display>(job: &str, published: D) -> Self {
        Self {
            outcome: Outcome::Success,
            subject: format!("[{job}] backup succeeded"),
            body: format!("Backup {job} completed. Published artifact: {published}"),
        }
    }

    pub fn failure<D1: Display, D2: Display>(job: &str, stage: D1, reason: D2) -> Self {
        Self {
            outcome: Outcome::Failure,
            subject: format!("[{job}] backup failed during {stage}"),
            body: format!("Backup {job} failed during {stage}:\n{reason}"),
        }
    }

    /// Sends once. A failed delivery is logged and otherwise ignored.
    pub fn dispatch<N: Notification>(&self, notifier: &N) -> bool {
        match notifier.send(&self.subject, &self.body) {
            Ok(()) => {
                tracing::info!("Sent {:?} notification", self.outcome);
                true
            }
            Err(e) => {
                tracing::error!("Sending {:?} notification failed: {e}", self.outcome);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::result_error::error::Error;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<(String, String)>>,
        fail: bool,
    }

    impl Notification for Recorder {
        fn send<D1: Display, D2: Display>(&self, topic: D1, msg: D2) -> Result<()> {
            if self.fail {
                return Err(Error::smtp_send_error("mailbox unavailable"));
            }
            self.sent
                .borrow_mut()
                .push((topic.to_string(), msg.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_success_event_names_published_path() {
        let event = NotificationEvent::success("vault", "/mnt/backups/vault.tar.age");
        assert_eq!(event.outcome, Outcome::Success);
        assert!(event.body.contains("/mnt/backups/vault.tar.age"));
    }

    #[test]
    fn test_failure_event_names_stage_and_reason() {
        let event = NotificationEvent::failure("vault", "encrypting", "disk full");
        assert_eq!(event.outcome, Outcome::Failure);
        assert!(event.subject.contains("encrypting"));
        assert!(event.body.contains("disk full"));
    }

    #[test]
    fn test_dispatch_sends_subject_and_body() {
        let recorder = Recorder::default();
        let event = NotificationEvent::success("vault", "/dest/a.age");

        assert!(event.dispatch(&recorder));
        assert_eq!(
            recorder.sent.borrow().as_slice(),
            &[(event.subject.clone(), event.body.clone())]
        );
    }

    #[test]
    fn test_dispatch_failure_is_swallowed() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };

        assert!(!NotificationEvent::failure("vault", "publishing", "x").dispatch(&recorder));
    }

    #[test]
    fn test_notification_config_deserialization() {
        let yaml = r#"
type: smtp
host: smtp.example.com
smtp_mode: StartTls
from: backup@example.com
to: [ops@example.com]
username: backup
password: hunter22
"#;
        let config: NotificationConfig = serde_yml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert!(!format!("{:?}", config).contains("hunter22"));
    }
}
