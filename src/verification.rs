//! Email verification codes.
//!
//! [`VerificationCodes`] owns an in-process map from email address to the
//! single live code for that address. Every operation takes one process-wide
//! mutex, so concurrent issue/verify/clear calls are serialized. The lock is
//! released before any mail is sent. Codes do not survive a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::mailer::{MailError, Mailer, OutgoingMail};

// ---

/// Smallest and largest code that can be issued (six digits).
const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

#[derive(Debug, Clone)]
struct CodeEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

impl CodeEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

pub struct VerificationCodes {
    entries: Mutex<HashMap<String, CodeEntry>>,
    ttl: Duration,
    mailer: Arc<dyn Mailer>,
}

impl VerificationCodes {
    // ---
    pub fn new(mailer: Arc<dyn Mailer>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            mailer,
        }
    }

    /// A poisoned lock only means another request panicked mid-operation;
    /// the map itself is still consistent.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CodeEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Generate a code for `email`, replacing any previous one, and mail it.
    ///
    /// The code stays registered even if the mail fails; the error is
    /// returned to the caller.
    pub async fn issue(&self, email: &str) -> Result<String, MailError> {
        self.issue_at(email, Utc::now()).await
    }

    async fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<String, MailError> {
        // ---
        let code = rand::rng().random_range(CODE_MIN..=CODE_MAX).to_string();
        let expires_at = now + self.ttl;

        self.entries().insert(
            email.to_string(),
            CodeEntry {
                code: code.clone(),
                expires_at,
            },
        );
        tracing::debug!(email, %expires_at, "Verification code issued");

        let mail = OutgoingMail {
            to: email.to_string(),
            subject: "Temporary verification code".to_string(),
            body: format!(
                "Your verification code is: {code}\n\
                 This code expires at: {}\n\
                 You have {} minutes to use it.",
                expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
                self.ttl.num_minutes()
            ),
        };
        self.mailer.send(&mail).await?;

        Ok(code)
    }

    /// Check `code` against the live code for `email`.
    ///
    /// An expired entry is purged and never matches.
    pub fn verify(&self, email: &str, code: &str) -> bool {
        self.verify_at(email, code, Utc::now())
    }

    fn verify_at(&self, email: &str, code: &str, now: DateTime<Utc>) -> bool {
        self.check_at(email, code, now, false)
    }

    /// Like [`VerificationCodes::verify`], but a match also removes the code,
    /// all under one lock acquisition.
    pub fn consume(&self, email: &str, code: &str) -> bool {
        self.check_at(email, code, Utc::now(), true)
    }

    fn check_at(&self, email: &str, code: &str, now: DateTime<Utc>, consume: bool) -> bool {
        // ---
        let mut entries = self.entries();
        let Some(entry) = entries.get(email) else {
            return false;
        };

        if entry.is_expired(now) {
            entries.remove(email);
            tracing::debug!(email, "Verification code expired");
            return false;
        }

        let matched = entry.code == code;
        if matched && consume {
            entries.remove(email);
        }
        matched
    }

    /// Forget any code for `email`.
    pub fn clear(&self, email: &str) {
        self.entries().remove(email);
    }
}
