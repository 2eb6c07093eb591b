//! Critical water-level notifications.
//!
//! [`EmailNotifier`] turns a HIGH reading into one message for the fixed
//! alert recipient. There is no batching, retry or deduplication: every call
//! is exactly one send attempt.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::mailer::{MailError, Mailer, OutgoingMail};
use crate::models::AlertTier;

// ---

/// Receives HIGH alerts from the reading service.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_high_alert(
        &self,
        sensor_id: &str,
        level_cm: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<(), MailError>;
}

/// Emails HIGH alerts to a single configured recipient.
pub struct EmailNotifier {
    mailer: Arc<dyn Mailer>,
    recipient: String,
}

impl EmailNotifier {
    pub fn new(mailer: Arc<dyn Mailer>, recipient: impl Into<String>) -> Self {
        Self {
            mailer,
            recipient: recipient.into(),
        }
    }

    fn compose(&self, sensor_id: &str, level_cm: i32, timestamp: DateTime<Utc>) -> OutgoingMail {
        // ---
        let subject = format!("CRITICAL ALERT: potential overflow at sensor {sensor_id}");
        let body = format!(
            "ATTENTION ADMINISTRATOR\n\n\
             Sensor {sensor_id} has detected a CRITICAL water level.\n\
             Recorded level: {level_cm} cm.\n\
             Alert tier: {tier}.\n\n\
             Please check the state of the canal immediately.\n\
             Alert time: {time}\n\n\
             Canal Monitoring System",
            tier = AlertTier::High,
            time = timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        OutgoingMail {
            to: self.recipient.clone(),
            subject,
            body,
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify_high_alert(
        &self,
        sensor_id: &str,
        level_cm: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<(), MailError> {
        let mail = self.compose(sensor_id, level_cm, timestamp);
        self.mailer.send(&mail).await?;
        tracing::info!(sensor_id, level_cm, recipient = %self.recipient, "High alert notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::mailer::testing::RecordingMailer;

    #[tokio::test]
    async fn sends_one_message_to_fixed_recipient() {
        // ---
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = EmailNotifier::new(mailer.clone(), "ops@canal.test");
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 14, 30, 0).unwrap();

        notifier.notify_high_alert("SEN3", 140, at).await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ops@canal.test");
        assert!(sent[0].subject.contains("SEN3"));
        assert!(sent[0].body.contains("140 cm"));
        assert!(sent[0].body.contains("HIGH"));
        assert!(sent[0].body.contains("2025-05-01 14:30:00 UTC"));
    }

    #[tokio::test]
    async fn repeated_alerts_are_not_deduplicated() {
        // ---
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = EmailNotifier::new(mailer.clone(), "ops@canal.test");
        let at = Utc::now();

        notifier.notify_high_alert("SEN1", 200, at).await.unwrap();
        notifier.notify_high_alert("SEN1", 200, at).await.unwrap();

        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_returned() {
        let mailer = Arc::new(RecordingMailer::failing());
        let notifier = EmailNotifier::new(mailer, "ops@canal.test");

        let result = notifier.notify_high_alert("SEN1", 200, Utc::now()).await;
        assert!(result.is_err());
    }
}
