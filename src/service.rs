//! Reading service: classification, persistence, filtering and HIGH-alert
//! dispatch.
//!
//! Notification runs inline after a successful write. A failed notification
//! is logged and swallowed, so a write never fails because of mail.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::models::{AlertTier, Reading, ReadingDraft};
use crate::notifier::Notifier;
use crate::store::{ReadingStore, StoreResult};

// ---

/// Optional criteria for [`ReadingService::filter`]. Absent fields match all.
#[derive(Debug, Clone, Default)]
pub struct ReadingFilter {
    pub date: Option<NaiveDate>,
    /// Raw tier name as received from the caller.
    pub tier: Option<String>,
    pub sensor_id: Option<String>,
}

pub struct ReadingService {
    store: Arc<dyn ReadingStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReadingService {
    // ---
    pub fn new(store: Arc<dyn ReadingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn list_all(&self) -> StoreResult<Vec<Reading>> {
        self.store.list_all().await
    }

    /// Readings matching every supplied criterion.
    ///
    /// A tier name that does not parse yields an empty result rather than an
    /// error. An empty tier string counts as absent.
    pub async fn filter(&self, filter: &ReadingFilter) -> StoreResult<Vec<Reading>> {
        // ---
        let tier = match filter.tier.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => match name.parse::<AlertTier>() {
                Ok(tier) => Some(tier),
                Err(e) => {
                    debug!("Filter by {}: returning no readings", e);
                    return Ok(Vec::new());
                }
            },
        };
        let sensor_id = filter.sensor_id.as_deref().filter(|s| !s.is_empty());

        // Narrow with the most selective store lookup, then apply the rest
        let candidates = match (filter.date, tier, sensor_id) {
            (Some(date), _, _) => self.store.find_by_date(date).await?,
            (None, Some(tier), _) => self.store.find_by_tier(tier).await?,
            (None, None, Some(sensor_id)) => self.store.find_by_sensor(sensor_id).await?,
            (None, None, None) => self.store.list_all().await?,
        };

        Ok(candidates
            .into_iter()
            .filter(|r| tier.map_or(true, |t| r.alert_tier == t))
            .filter(|r| sensor_id.map_or(true, |s| r.sensor_id == s))
            .collect())
    }

    pub async fn count(&self) -> StoreResult<i64> {
        self.store.count().await
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<Reading>> {
        self.store.find_by_id(id).await
    }

    /// Persist a new reading and notify if it is HIGH.
    pub async fn save(&self, draft: ReadingDraft) -> StoreResult<Reading> {
        // ---
        let saved = self.store.insert(&draft).await?;
        info!(
            id = saved.id,
            sensor_id = %saved.sensor_id,
            level_cm = saved.water_level_cm,
            tier = %saved.alert_tier,
            "Reading saved"
        );

        self.notify_if_high(&saved).await;
        Ok(saved)
    }

    /// Replace reading `id` with `draft`, keeping its identity.
    ///
    /// Returns `None` when no reading has that id. A HIGH result notifies
    /// exactly as [`ReadingService::save`] does.
    pub async fn update(&self, id: i64, draft: ReadingDraft) -> StoreResult<Option<Reading>> {
        // ---
        let Some(updated) = self.store.update(id, &draft).await? else {
            debug!(id, "Update of unknown reading");
            return Ok(None);
        };
        info!(
            id,
            level_cm = updated.water_level_cm,
            tier = %updated.alert_tier,
            "Reading updated"
        );

        self.notify_if_high(&updated).await;
        Ok(Some(updated))
    }

    /// Remove reading `id`. An unknown id is not an error; returns whether
    /// anything was removed.
    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        let removed = self.store.delete(id).await?;
        debug!(id, removed, "Reading delete");
        Ok(removed)
    }

    async fn notify_if_high(&self, reading: &Reading) {
        // ---
        if reading.alert_tier != AlertTier::High {
            return;
        }

        warn!(
            sensor_id = %reading.sensor_id,
            level_cm = reading.water_level_cm,
            "HIGH water level detected, sending notification"
        );
        if let Err(e) = self
            .notifier
            .notify_high_alert(&reading.sensor_id, reading.water_level_cm, Utc::now())
            .await
        {
            error!(
                sensor_id = %reading.sensor_id,
                "Failed to send high alert notification: {}",
                e
            );
        }
    }
}

/// Recording notifier shared by the unit tests of other modules.
#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::mailer::MailError;
    use crate::notifier::Notifier;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub calls: Mutex<Vec<(String, i32)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn calls(&self) -> Vec<(String, i32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_high_alert(
            &self,
            sensor_id: &str,
            level_cm: i32,
            _timestamp: DateTime<Utc>,
        ) -> Result<(), MailError> {
            self.calls.lock().unwrap().push((sensor_id.to_string(), level_cm));
            if self.fail {
                return Err(MailError::Build("simulated failure".to_string()));
            }
            Ok(())
        }
    }
}
