//! Reading - the unit of data flowing through the pipeline
//!
//! Produced by the generator, carried over the stream, persisted by a worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensor measurement
///
/// Immutable once created. Readings carry no identity beyond their fields,
/// so duplicates and gaps are tolerated downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Measured value
    pub value: f64,

    /// Sensor type label (e.g. "Temperature")
    pub sensor_type: String,

    /// First identifier
    pub id1: String,

    /// Second identifier
    pub id2: String,

    /// Time the reading was produced (UTC)
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Create a reading stamped with the current time
    pub fn now(value: f64, labels: &SensorLabels) -> Self {
        Self {
            value,
            sensor_type: labels.sensor_type.clone(),
            id1: labels.id1.clone(),
            id2: labels.id2.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Whether this reading carries the given labels
    pub fn has_labels(&self, labels: &SensorLabels) -> bool {
        self.sensor_type == labels.sensor_type && self.id1 == labels.id1 && self.id2 == labels.id2
    }
}

/// The fixed tags a generator stamps on every reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorLabels {
    pub sensor_type: String,
    pub id1: String,
    pub id2: String,
}

impl SensorLabels {
    pub fn new(
        sensor_type: impl Into<String>,
        id1: impl Into<String>,
        id2: impl Into<String>,
    ) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            id1: id1.into(),
            id2: id2.into(),
        }
    }
}

/// Session-closure acknowledgment
///
/// Confirms that a stream was closed cleanly, not that every reading was
/// delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

impl Ack {
    /// Acknowledgment sent after a clean end of stream
    pub fn received_all() -> Self {
        Self {
            ok: true,
            message: "All data received".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_now_copies_labels() {
        let labels = SensorLabels::new("Temperature", "A", "1");
        let reading = Reading::now(42.0, &labels);

        assert_eq!(reading.sensor_type, "Temperature");
        assert_eq!(reading.id1, "A");
        assert_eq!(reading.id2, "1");
        assert!(reading.has_labels(&labels));
        assert!(!reading.has_labels(&SensorLabels::new("Humidity", "A", "1")));
    }

    #[test]
    fn test_reading_json_shape() {
        let reading = Reading::now(1.5, &SensorLabels::new("Temperature", "A", "1"));
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["value"], 1.5);
        assert_eq!(json["sensor_type"], "Temperature");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_ack_received_all() {
        let ack = Ack::received_all();
        assert!(ack.ok);
        assert_eq!(ack.message, "All data received");
    }
}
