use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored soil-moisture sample. Immutable once written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub raw_value: i64,
    /// 0..=100, derived on the device from the raw value
    pub moisture_percentage: u8,
}

impl SensorReading {
    pub fn from_new(id: i64, reading: NewReading) -> Self {
        Self {
            id,
            timestamp: reading.timestamp,
            raw_value: reading.raw_value,
            moisture_percentage: reading.moisture_percentage,
        }
    }
}

/// A validated sample waiting to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewReading {
    pub timestamp: DateTime<Utc>,
    pub raw_value: i64,
    pub moisture_percentage: u8,
}

/// Inclusive timestamp window for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}
