//! Weight tables and physiological bands for the risk scorer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{EcgFeature, RiskFactor};

/// A normal physiological band with critical outer bounds.
///
/// Severity is 0 inside `[min, max]`, ramps linearly toward 1 between
/// a normal bound and its critical bound, and saturates at 1 at or
/// beyond the critical bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalBand {
    pub min: f64,
    pub max: f64,
    pub critical_min: f64,
    pub critical_max: f64,
}

impl VitalBand {
    /// Severity of `value` against this band, in [0, 1].
    pub fn severity(&self, value: f64) -> f64 {
        if value <= self.critical_min || value >= self.critical_max {
            1.0
        } else if value < self.min {
            ((self.min - value) / (self.min - self.critical_min)).min(1.0)
        } else if value > self.max {
            ((value - self.max) / (self.critical_max - self.max)).min(1.0)
        } else {
            0.0
        }
    }
}

/// Per-vital normal bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalThresholds {
    pub heart_rate: VitalBand,
    pub systolic: VitalBand,
    pub diastolic: VitalBand,
    /// Oxygen saturation only has a low side; severity below `min`
    /// ramps toward 1 at `critical_min`.
    pub oxygen_min: f64,
    pub oxygen_critical_min: f64,
    pub temperature: VitalBand,
}

impl VitalThresholds {
    /// Low-side-only severity for oxygen saturation.
    pub fn oxygen_severity(&self, value: f64) -> f64 {
        if value <= self.oxygen_critical_min {
            1.0
        } else if value < self.oxygen_min {
            ((self.oxygen_min - value) / (self.oxygen_min - self.oxygen_critical_min)).min(1.0)
        } else {
            0.0
        }
    }
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            heart_rate: VitalBand {
                min: 60.0,
                max: 100.0,
                critical_min: 40.0,
                critical_max: 130.0,
            },
            systolic: VitalBand {
                min: 90.0,
                max: 120.0,
                critical_min: 80.0,
                critical_max: 180.0,
            },
            diastolic: VitalBand {
                min: 60.0,
                max: 80.0,
                critical_min: 50.0,
                critical_max: 120.0,
            },
            oxygen_min: 95.0,
            oxygen_critical_min: 90.0,
            temperature: VitalBand {
                min: 36.0,
                max: 37.5,
                critical_min: 35.0,
                critical_max: 39.0,
            },
        }
    }
}

/// Relative weights of each vital within the vitals sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalWeights {
    pub heart_rate: f64,
    pub blood_pressure: f64,
    pub oxygen: f64,
    pub temperature: f64,
}

impl Default for VitalWeights {
    fn default() -> Self {
        Self {
            heart_rate: 7.0,
            blood_pressure: 8.0,
            oxygen: 6.0,
            temperature: 4.0,
        }
    }
}

/// Relative weights of each category in the combined score. Only the
/// categories actually present in an input participate; their weights
/// are renormalized over the present set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub age: f64,
    pub risk_factors: f64,
    pub ecg: f64,
    pub vitals: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            age: 0.15,
            risk_factors: 0.25,
            ecg: 0.35,
            vitals: 0.25,
        }
    }
}

/// Complete weight configuration for a [`super::RiskScorer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RiskWeights {
    /// Severity weight of each ECG feature, on a 0–10 scale
    pub ecg: HashMap<EcgFeature, f64>,
    /// Severity weight of each discrete risk factor, on a 0–10 scale
    pub factors: HashMap<RiskFactor, f64>,
    pub vitals: VitalWeights,
    pub thresholds: VitalThresholds,
    pub categories: CategoryWeights,
}

impl RiskWeights {
    /// Weight of an ECG feature; unknown features score zero.
    pub fn ecg_weight(&self, feature: EcgFeature) -> f64 {
        self.ecg.get(&feature).copied().unwrap_or(0.0)
    }

    /// Weight of a risk factor; unknown factors score zero.
    pub fn factor_weight(&self, factor: RiskFactor) -> f64 {
        self.factors.get(&factor).copied().unwrap_or(0.0)
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        let ecg = HashMap::from([
            (EcgFeature::Normal, 0.0),
            (EcgFeature::Tachycardia, 3.0),
            (EcgFeature::Bradycardia, 2.0),
            (EcgFeature::StElevation, 9.0),
            (EcgFeature::StDepression, 7.0),
            (EcgFeature::TWaveInversion, 6.0),
            (EcgFeature::QtProlongation, 4.0),
            (EcgFeature::HeartBlock, 5.0),
            (EcgFeature::AtrialFibrillation, 6.0),
            (EcgFeature::PrematureComplexes, 3.0),
        ]);
        let factors = HashMap::from([
            (RiskFactor::Age, 5.0),
            (RiskFactor::Gender, 1.0),
            (RiskFactor::Smoking, 7.0),
            (RiskFactor::Diabetes, 6.0),
            (RiskFactor::Hypertension, 7.0),
            (RiskFactor::HighCholesterol, 6.0),
            (RiskFactor::FamilyHistory, 4.0),
            (RiskFactor::PreviousCardiacEvent, 9.0),
            (RiskFactor::Obesity, 5.0),
            (RiskFactor::SedentaryLifestyle, 4.0),
            (RiskFactor::Stress, 3.0),
            (RiskFactor::SleepDisorder, 2.0),
        ]);
        Self {
            ecg,
            factors,
            vitals: VitalWeights::default(),
            thresholds: VitalThresholds::default(),
            categories: CategoryWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_severity_ramps_linearly() {
        let band = VitalBand {
            min: 60.0,
            max: 100.0,
            critical_min: 40.0,
            critical_max: 130.0,
        };
        assert_eq!(band.severity(80.0), 0.0);
        assert_eq!(band.severity(60.0), 0.0);
        assert_eq!(band.severity(100.0), 0.0);
        assert!((band.severity(50.0) - 0.5).abs() < 1e-9);
        assert!((band.severity(115.0) - 0.5).abs() < 1e-9);
        assert_eq!(band.severity(40.0), 1.0);
        assert_eq!(band.severity(180.0), 1.0);
    }

    #[test]
    fn oxygen_severity_is_low_side_only() {
        let thresholds = VitalThresholds::default();
        assert_eq!(thresholds.oxygen_severity(98.0), 0.0);
        assert_eq!(thresholds.oxygen_severity(100.0), 0.0);
        assert!((thresholds.oxygen_severity(92.5) - 0.5).abs() < 1e-9);
        assert_eq!(thresholds.oxygen_severity(85.0), 1.0);
    }

    #[test]
    fn default_weight_tables_are_complete() {
        let weights = RiskWeights::default();
        assert_eq!(weights.ecg.len(), 10);
        assert_eq!(weights.factors.len(), 12);
        assert_eq!(weights.ecg_weight(EcgFeature::StElevation), 9.0);
        assert_eq!(weights.factor_weight(RiskFactor::PreviousCardiacEvent), 9.0);
        assert_eq!(weights.ecg_weight(EcgFeature::Normal), 0.0);
    }
}
