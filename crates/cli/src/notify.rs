//! Novelty notification sinks for the `milla` binary.

use std::time::Duration;

use serde::Serialize;

use milla_config::NotifySettings;
use milla_core::ports::NotificationSink;
use milla_core::{Notification, NotifyError};

const USER_AGENT: &str = concat!("milla/", env!("CARGO_PKG_VERSION"));

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogNotifier {
    sender: String,
}

impl LogNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self { sender: sender.into() }
    }
}

impl NotificationSink for LogNotifier {
    fn send(&self, recipients: &[String], notification: &Notification) -> Result<(), NotifyError> {
        log::info!(
            "notification from {} to {}: {}\n{}",
            self.sender,
            recipients.join(", "),
            notification.subject,
            notification.body
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    sender: &'a str,
    recipients: &'a [String],
    subject: &'a str,
    body: &'a str,
}

/// POSTs each notification as JSON to a webhook (mail relay, chat bridge).
pub struct WebhookNotifier {
    http: reqwest::blocking::Client,
    url: String,
    sender: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, sender: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NotifyError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, url: url.to_string(), sender: sender.to_string() })
    }
}

impl NotificationSink for WebhookNotifier {
    fn send(&self, recipients: &[String], notification: &Notification) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            sender: &self.sender,
            recipients,
            subject: &notification.subject,
            body: &notification.body,
        };
        let body = serde_json::to_string(&payload).map_err(|e| NotifyError(e.to_string()))?;

        let resp = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| NotifyError(format!("webhook unreachable: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError(format!("webhook answered HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

/// Pick the sink the settings ask for. A webhook that cannot be set up
/// falls back to the log sink.
pub fn notifier_from_settings(settings: &NotifySettings) -> Box<dyn NotificationSink> {
    match &settings.webhook_url {
        Some(url) => match WebhookNotifier::new(url, &settings.sender, settings.timeout_secs) {
            Ok(n) => {
                log::debug!("novelty notifications go to webhook {url}");
                Box::new(n)
            }
            Err(e) => {
                log::warn!("{e}; novelties will only be logged");
                Box::new(LogNotifier::new(settings.sender.clone()))
            }
        },
        None => Box::new(LogNotifier::new(settings.sender.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> Notification {
        Notification { subject: "Novedad".into(), body: "- SKU-1".into() }
    }

    #[test]
    fn log_notifier_never_fails() {
        let sink = LogNotifier::new("no-reply@milla7.com");
        assert!(sink.send(&["a@b.c".into()], &note()).is_ok());
    }

    #[test]
    fn unreachable_webhook_is_a_notify_error() {
        // port 9 (discard) on loopback: nothing listens in the test sandbox
        let sink = WebhookNotifier::new("http://127.0.0.1:9/novedades", "no-reply@milla7.com", 1).unwrap();
        let err = sink.send(&["a@b.c".into()], &note()).unwrap_err();
        assert!(err.to_string().starts_with("notification failed: webhook unreachable"));
    }

    #[test]
    fn payload_shape() {
        let recipients = vec!["a@b.c".to_string()];
        let n = note();
        let payload = WebhookPayload { sender: "s", recipients: &recipients, subject: &n.subject, body: &n.body };
        let v: serde_json::Value = serde_json::from_str(&serde_json::to_string(&payload).unwrap()).unwrap();
        assert_eq!(v["recipients"][0], "a@b.c");
        assert_eq!(v["subject"], "Novedad");
    }
}
