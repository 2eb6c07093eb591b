//! Data models for canal water-level readings.
//!
//! The alert tier of a reading is never set directly. It is derived from the
//! water level when a [`ReadingDraft`] is constructed, and a draft is the only
//! way to write a reading through the store.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---

/// Highest level (cm, inclusive) still classified as [`AlertTier::Low`].
pub const LOW_MAX_CM: i32 = 50;

/// Highest level (cm, inclusive) still classified as [`AlertTier::Medium`].
pub const MEDIUM_MAX_CM: i32 = 120;

/// Maximum length of a sensor identifier, matching the storage column.
pub const SENSOR_ID_MAX_LEN: usize = 20;

/// Alert tier of a reading, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertTier {
    Low,
    Medium,
    High,
}

/// Map a water level in centimeters to its alert tier.
///
/// Boundaries are inclusive of the lower tier: 50 is LOW, 120 is MEDIUM.
pub fn classify(level_cm: i32) -> AlertTier {
    // ---
    if level_cm <= LOW_MAX_CM {
        AlertTier::Low
    } else if level_cm <= MEDIUM_MAX_CM {
        AlertTier::Medium
    } else {
        AlertTier::High
    }
}

impl AlertTier {
    /// Stored and wire name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertTier::Low => "LOW",
            AlertTier::Medium => "MEDIUM",
            AlertTier::High => "HIGH",
        }
    }
}

impl fmt::Display for AlertTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert tier: {0:?}")]
pub struct UnknownTier(pub String);

impl FromStr for AlertTier {
    type Err = UnknownTier;

    /// Case-insensitive. The legacy names BAJA, MEDIA and ALTA are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" | "BAJA" => Ok(AlertTier::Low),
            "MEDIUM" | "MEDIA" => Ok(AlertTier::Medium),
            "HIGH" | "ALTA" => Ok(AlertTier::High),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

// ---

/// Rejection reasons for a reading submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReading {
    #[error("sensor_id must not be empty")]
    EmptySensorId,

    #[error("sensor_id must be at most 20 characters, got {0}")]
    SensorIdTooLong(usize),

    #[error("water_level_cm must be non-negative, got {0}")]
    NegativeLevel(i32),
}

/// Reading body as submitted by clients on create and update.
///
/// Any `alert_tier` in the body is ignored; the tier is always derived.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingInput {
    // ---
    #[serde(alias = "fecha")]
    pub date: NaiveDate,

    #[serde(alias = "sensorId")]
    pub sensor_id: String,

    #[serde(alias = "nivelDeAguaCm")]
    pub water_level_cm: i32,
}

/// A validated, not yet persisted reading with its tier already derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingDraft {
    date: NaiveDate,
    sensor_id: String,
    water_level_cm: i32,
    alert_tier: AlertTier,
}

impl ReadingDraft {
    // ---
    pub fn new(
        date: NaiveDate,
        sensor_id: impl Into<String>,
        water_level_cm: i32,
    ) -> Result<Self, InvalidReading> {
        // ---
        let sensor_id = sensor_id.into().trim().to_string();
        if sensor_id.is_empty() {
            return Err(InvalidReading::EmptySensorId);
        }
        let len = sensor_id.chars().count();
        if len > SENSOR_ID_MAX_LEN {
            return Err(InvalidReading::SensorIdTooLong(len));
        }
        if water_level_cm < 0 {
            return Err(InvalidReading::NegativeLevel(water_level_cm));
        }

        Ok(Self {
            date,
            sensor_id,
            water_level_cm,
            alert_tier: classify(water_level_cm),
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn water_level_cm(&self) -> i32 {
        self.water_level_cm
    }

    pub fn alert_tier(&self) -> AlertTier {
        self.alert_tier
    }

    /// Attach a store-assigned identifier.
    pub fn into_reading(self, id: i64) -> Reading {
        Reading {
            id,
            date: self.date,
            sensor_id: self.sensor_id,
            water_level_cm: self.water_level_cm,
            alert_tier: self.alert_tier,
        }
    }
}

impl TryFrom<ReadingInput> for ReadingDraft {
    type Error = InvalidReading;

    fn try_from(input: ReadingInput) -> Result<Self, Self::Error> {
        ReadingDraft::new(input.date, input.sensor_id, input.water_level_cm)
    }
}

/// A persisted sensor observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reading {
    // ---
    pub id: i64,
    pub date: NaiveDate,
    pub sensor_id: String,
    pub water_level_cm: i32,
    pub alert_tier: AlertTier,
}

/// Row shape of the `sensor_readings` table.
#[derive(Debug, sqlx::FromRow)]
pub struct ReadingRow {
    pub id: i64,
    pub reading_date: NaiveDate,
    pub sensor_id: String,
    pub water_level_cm: i32,
    pub alert_tier: String,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = UnknownTier;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        Ok(Reading {
            id: row.id,
            date: row.reading_date,
            sensor_id: row.sensor_id,
            water_level_cm: row.water_level_cm,
            alert_tier: row.alert_tier.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[test]
    fn test_classify_boundaries() {
        // ---
        assert_eq!(classify(0), AlertTier::Low);
        assert_eq!(classify(50), AlertTier::Low);
        assert_eq!(classify(51), AlertTier::Medium);
        assert_eq!(classify(120), AlertTier::Medium);
        assert_eq!(classify(121), AlertTier::High);
        assert_eq!(classify(i32::MAX), AlertTier::High);

        // Total over integers, even though the model never stores negatives
        assert_eq!(classify(-5), AlertTier::Low);
    }

    #[test]
    fn test_tier_ordering() {
        // ---
        assert!(AlertTier::Low < AlertTier::Medium);
        assert!(AlertTier::Medium < AlertTier::High);
        assert_eq!(classify(200).max(classify(10)), AlertTier::High);
    }

    #[test]
    fn test_tier_parsing() {
        // ---
        assert_eq!("high".parse::<AlertTier>(), Ok(AlertTier::High));
        assert_eq!(" Medium ".parse::<AlertTier>(), Ok(AlertTier::Medium));
        assert_eq!("alta".parse::<AlertTier>(), Ok(AlertTier::High));
        assert_eq!("BAJA".parse::<AlertTier>(), Ok(AlertTier::Low));
        assert!("bogus".parse::<AlertTier>().is_err());
        assert!("".parse::<AlertTier>().is_err());
    }

    #[test]
    fn test_tier_wire_names() {
        // ---
        assert_eq!(serde_json::to_string(&AlertTier::High).unwrap(), "\"HIGH\"");
        assert_eq!(AlertTier::Medium.to_string(), "MEDIUM");
    }

    #[test]
    fn test_draft_derives_tier() {
        // ---
        let draft = ReadingDraft::new(test_date(), "SEN1", 140).unwrap();
        assert_eq!(draft.alert_tier(), AlertTier::High);

        let draft = ReadingDraft::new(test_date(), "SEN1", 30).unwrap();
        assert_eq!(draft.alert_tier(), AlertTier::Low);
    }

    #[test]
    fn test_draft_validation() {
        // ---
        assert_eq!(
            ReadingDraft::new(test_date(), "   ", 10),
            Err(InvalidReading::EmptySensorId)
        );
        assert_eq!(
            ReadingDraft::new(test_date(), "S".repeat(21), 10),
            Err(InvalidReading::SensorIdTooLong(21))
        );
        assert_eq!(
            ReadingDraft::new(test_date(), "SEN1", -1),
            Err(InvalidReading::NegativeLevel(-1))
        );
        assert!(ReadingDraft::new(test_date(), "S".repeat(20), 0).is_ok());
    }

    #[test]
    fn test_input_ignores_client_tier() {
        // ---
        let body = r#"{"date":"2025-05-01","sensor_id":"SEN2","water_level_cm":10,"alert_tier":"HIGH"}"#;
        let input: ReadingInput = serde_json::from_str(body).unwrap();
        let draft = ReadingDraft::try_from(input).unwrap();
        assert_eq!(draft.alert_tier(), AlertTier::Low);
    }

    #[test]
    fn test_input_accepts_legacy_keys() {
        // ---
        let body = r#"{"fecha":"2025-05-01","sensorId":"SEN3","nivelDeAguaCm":90}"#;
        let input: ReadingInput = serde_json::from_str(body).unwrap();
        assert_eq!(input.sensor_id, "SEN3");
        assert_eq!(input.water_level_cm, 90);
        assert_eq!(input.date, test_date());
    }

    #[test]
    fn test_reading_output_keys() {
        // ---
        let reading = ReadingDraft::new(test_date(), "SEN1", 140).unwrap().into_reading(1);
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 1,
                "date": "2025-05-01",
                "sensor_id": "SEN1",
                "water_level_cm": 140,
                "alert_tier": "HIGH"
            })
        );
        assert!(value.get("fecha").is_none());
    }

    #[test]
    fn test_row_conversion() {
        // ---
        let row = ReadingRow {
            id: 7,
            reading_date: test_date(),
            sensor_id: "SEN4".to_string(),
            water_level_cm: 60,
            alert_tier: "MEDIUM".to_string(),
        };
        let reading = Reading::try_from(row).unwrap();
        assert_eq!(reading.id, 7);
        assert_eq!(reading.alert_tier, AlertTier::Medium);
    }
}
