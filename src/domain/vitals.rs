//! Instantaneous vital sign readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time vital sign reading for one user.
///
/// All fields are optional; a device may report any subset. Missing
/// sub-readings fall back to physiological defaults only inside the
/// risk scorer's vital-sign sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    /// Heart rate in beats per minute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    /// Systolic blood pressure in mmHg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_systolic: Option<f64>,
    /// Diastolic blood pressure in mmHg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure_diastolic: Option<f64>,
    /// Oxygen saturation (SpO2) in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_level: Option<f64>,
    /// Body temperature in °C
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
}

impl VitalSigns {
    /// A reading with no sub-values, timestamped now.
    pub fn empty() -> Self {
        Self {
            heart_rate: None,
            blood_pressure_systolic: None,
            blood_pressure_diastolic: None,
            oxygen_level: None,
            temperature: None,
            timestamp: Utc::now(),
        }
    }

    /// Whether at least one sub-reading is present.
    pub fn has_any(&self) -> bool {
        self.heart_rate.is_some()
            || self.blood_pressure_systolic.is_some()
            || self.blood_pressure_diastolic.is_some()
            || self.oxygen_level.is_some()
            || self.temperature.is_some()
    }
}

/// Normal physiological defaults used when a vital-sign sub-score is
/// requested but an individual reading is missing.
pub mod defaults {
    /// Resting heart rate (bpm)
    pub const HEART_RATE: f64 = 72.0;
    /// Systolic blood pressure (mmHg)
    pub const BP_SYSTOLIC: f64 = 120.0;
    /// Diastolic blood pressure (mmHg)
    pub const BP_DIASTOLIC: f64 = 80.0;
    /// Oxygen saturation (%)
    pub const OXYGEN: f64 = 98.0;
    /// Body temperature (°C)
    pub const TEMPERATURE: f64 = 36.8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reading_has_no_values() {
        let v = VitalSigns::empty();
        assert!(!v.has_any());
    }

    #[test]
    fn partial_reading_counts_as_present() {
        let v = VitalSigns {
            heart_rate: Some(80.0),
            ..VitalSigns::empty()
        };
        assert!(v.has_any());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let v = VitalSigns {
            heart_rate: Some(80.0),
            oxygen_level: Some(97.0),
            ..VitalSigns::empty()
        };
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.contains("heartRate"));
        assert!(json.contains("oxygenLevel"));
        assert!(!json.contains("temperature"));
    }
}
