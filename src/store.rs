//! Reading persistence.
//!
//! [`ReadingStore`] is the seam between the service and the persistence
//! engine. [`PgReadingStore`] is the production backend; [`MemoryReadingStore`]
//! keeps readings in process for local runs and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

use crate::models::{AlertTier, Reading, ReadingDraft, ReadingRow, UnknownTier};

// ---

/// Failure inside the persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(#[from] UnknownTier),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD and lookup operations over persisted readings.
///
/// All listing operations return readings ordered by id.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn list_all(&self) -> StoreResult<Vec<Reading>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Reading>>;

    async fn find_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Reading>>;

    async fn find_by_tier(&self, tier: AlertTier) -> StoreResult<Vec<Reading>>;

    async fn find_by_sensor(&self, sensor_id: &str) -> StoreResult<Vec<Reading>>;

    async fn count(&self) -> StoreResult<i64>;

    /// Persist a new reading and return it with its assigned id.
    async fn insert(&self, draft: &ReadingDraft) -> StoreResult<Reading>;

    /// Replace every mutable field of reading `id`. `None` if it does not exist.
    async fn update(&self, id: i64, draft: &ReadingDraft) -> StoreResult<Option<Reading>>;

    /// Remove reading `id`. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> StoreResult<bool>;
}

// ---

/// Column list for `sensor_readings` queries.
const COLUMNS: &str = "id, reading_date, sensor_id, water_level_cm, alert_tier";

/// PostgreSQL-backed store over the `sensor_readings` table.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where<T>(&self, clause: &str, value: T) -> StoreResult<Vec<Reading>>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send + 'static,
    {
        // ---
        let sql = format!("SELECT {COLUMNS} FROM sensor_readings WHERE {clause} ORDER BY id");
        let rows = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        debug!("sensor_readings WHERE {}: {} rows", clause, rows.len());
        rows_to_readings(rows)
    }
}

fn rows_to_readings(rows: Vec<ReadingRow>) -> StoreResult<Vec<Reading>> {
    rows.into_iter()
        .map(|row| Reading::try_from(row).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    // ---
    async fn list_all(&self) -> StoreResult<Vec<Reading>> {
        // ---
        let sql = format!("SELECT {COLUMNS} FROM sensor_readings ORDER BY id");
        let rows = sqlx::query_as::<_, ReadingRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows_to_readings(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Reading>> {
        // ---
        let sql = format!("SELECT {COLUMNS} FROM sensor_readings WHERE id = $1");
        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Reading::try_from).transpose()?)
    }

    async fn find_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Reading>> {
        self.fetch_where("reading_date = $1", date).await
    }

    async fn find_by_tier(&self, tier: AlertTier) -> StoreResult<Vec<Reading>> {
        self.fetch_where("alert_tier = $1", tier.as_str()).await
    }

    async fn find_by_sensor(&self, sensor_id: &str) -> StoreResult<Vec<Reading>> {
        self.fetch_where("sensor_id = $1", sensor_id.to_string())
            .await
    }

    async fn count(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sensor_readings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert(&self, draft: &ReadingDraft) -> StoreResult<Reading> {
        // ---
        let sql = format!(
            "INSERT INTO sensor_readings (reading_date, sensor_id, water_level_cm, alert_tier) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(draft.date())
            .bind(draft.sensor_id())
            .bind(draft.water_level_cm())
            .bind(draft.alert_tier().as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(Reading::try_from(row)?)
    }

    async fn update(&self, id: i64, draft: &ReadingDraft) -> StoreResult<Option<Reading>> {
        // ---
        let sql = format!(
            "UPDATE sensor_readings \
             SET reading_date = $2, sensor_id = $3, water_level_cm = $4, alert_tier = $5 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ReadingRow>(&sql)
            .bind(id)
            .bind(draft.date())
            .bind(draft.sensor_id())
            .bind(draft.water_level_cm())
            .bind(draft.alert_tier().as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Reading::try_from).transpose()?)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sensor_readings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---

#[derive(Default)]
struct MemoryInner {
    readings: BTreeMap<i64, Reading>,
    next_id: i64,
}

/// In-process store. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct MemoryReadingStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn select(&self, pred: impl Fn(&Reading) -> bool) -> StoreResult<Vec<Reading>> {
        Ok(self
            .lock()?
            .readings
            .values()
            .filter(|r| pred(r))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    // ---
    async fn list_all(&self) -> StoreResult<Vec<Reading>> {
        self.select(|_| true)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Reading>> {
        Ok(self.lock()?.readings.get(&id).cloned())
    }

    async fn find_by_date(&self, date: NaiveDate) -> StoreResult<Vec<Reading>> {
        self.select(|r| r.date == date)
    }

    async fn find_by_tier(&self, tier: AlertTier) -> StoreResult<Vec<Reading>> {
        self.select(|r| r.alert_tier == tier)
    }

    async fn find_by_sensor(&self, sensor_id: &str) -> StoreResult<Vec<Reading>> {
        self.select(|r| r.sensor_id == sensor_id)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.lock()?.readings.len() as i64)
    }

    async fn insert(&self, draft: &ReadingDraft) -> StoreResult<Reading> {
        // ---
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let reading = draft.clone().into_reading(inner.next_id);
        inner.readings.insert(reading.id, reading.clone());
        Ok(reading)
    }

    async fn update(&self, id: i64, draft: &ReadingDraft) -> StoreResult<Option<Reading>> {
        // ---
        let mut inner = self.lock()?;
        match inner.readings.get_mut(&id) {
            Some(slot) => {
                *slot = draft.clone().into_reading(id);
                Ok(Some(slot.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        Ok(self.lock()?.readings.remove(&id).is_some())
    }
}
