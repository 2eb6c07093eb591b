//! Demo data for empty installations.
//!
//! Seeding writes straight to the store, so demo readings never trigger
//! notifications.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rand::Rng;

use crate::models::ReadingDraft;
use crate::store::ReadingStore;

/// Demo sensors are named `SEN1` through `SEN4`.
const DEMO_SENSORS: u32 = 4;

/// Demo levels are drawn from `0..DEMO_MAX_LEVEL_CM`.
const DEMO_MAX_LEVEL_CM: i32 = 140;

/// Insert random readings dated `today` until the store holds `target` rows.
///
/// Returns the number of readings inserted.
pub async fn seed_readings(store: &dyn ReadingStore, target: u32, today: NaiveDate) -> Result<u32> {
    // ---
    let mut inserted = 0;
    while store.count().await? < i64::from(target) {
        let draft = {
            let mut rng = rand::rng();
            let sensor = format!("SEN{}", rng.random_range(1..=DEMO_SENSORS));
            ReadingDraft::new(today, sensor, rng.random_range(0..DEMO_MAX_LEVEL_CM))?
        };
        let reading = store.insert(&draft).await?;
        tracing::debug!(
            id = reading.id,
            sensor_id = %reading.sensor_id,
            level_cm = reading.water_level_cm,
            "Demo reading inserted"
        );
        inserted += 1;
    }

    if inserted > 0 {
        tracing::info!("Seeded {} demo readings", inserted);
    }
    Ok(inserted)
}

/// Today's date in UTC, the date stamped on demo readings.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryReadingStore;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn fills_store_up_to_target() {
        // ---
        let store = MemoryReadingStore::new();
        assert_eq!(seed_readings(&store, 15, day()).await.unwrap(), 15);

        let readings = store.list_all().await.unwrap();
        assert_eq!(readings.len(), 15);
        for r in &readings {
            assert_eq!(r.date, day());
            assert!((0..DEMO_MAX_LEVEL_CM).contains(&r.water_level_cm));
            assert!(["SEN1", "SEN2", "SEN3", "SEN4"].contains(&r.sensor_id.as_str()));
        }
    }

    #[tokio::test]
    async fn noop_when_already_full() {
        let store = MemoryReadingStore::new();
        seed_readings(&store, 3, day()).await.unwrap();
        assert_eq!(seed_readings(&store, 3, day()).await.unwrap(), 0);
        assert_eq!(seed_readings(&store, 0, day()).await.unwrap(), 0);
    }
}
