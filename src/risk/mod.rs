//! Multi-factor cardiovascular risk scoring.
//!
//! Combines age, discrete risk factors, extracted ECG features and
//! instantaneous vitals into one bounded 0–100 score. Each category
//! is normalized to 0–10 and the categories are combined as a
//! weighted average over whichever categories are present. Weight
//! tables are immutable configuration injected at construction, not
//! module-level globals.

mod scorer;
mod weights;

pub use scorer::{ContributingFactor, RiskAssessment, RiskInput, RiskScorer};
pub use weights::{CategoryWeights, RiskWeights, VitalBand, VitalThresholds, VitalWeights};

use serde::{Deserialize, Serialize};

/// Discrete cardiovascular risk factors with static severity weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskFactor {
    /// Advanced age (also captured by the age band sub-score)
    Age,
    /// Biological sex differences in baseline risk
    Gender,
    /// Active smoking
    Smoking,
    /// Diabetes mellitus
    Diabetes,
    /// Hypertension
    Hypertension,
    /// Elevated cholesterol
    HighCholesterol,
    /// Family history of cardiac disease
    FamilyHistory,
    /// Prior cardiac event
    PreviousCardiacEvent,
    /// Obesity
    Obesity,
    /// Sedentary lifestyle
    SedentaryLifestyle,
    /// Chronic stress
    Stress,
    /// Sleep disorder
    SleepDisorder,
}

/// ECG features that can indicate risk, with static severity weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EcgFeature {
    /// Normal sinus rhythm; contributes no risk
    Normal,
    /// Fast heart rate
    Tachycardia,
    /// Slow heart rate
    Bradycardia,
    /// ST-segment elevation (possible myocardial injury)
    StElevation,
    /// ST-segment depression
    StDepression,
    /// T-wave inversion
    TWaveInversion,
    /// Prolonged QT interval
    QtProlongation,
    /// Conduction block
    HeartBlock,
    /// Atrial fibrillation
    AtrialFibrillation,
    /// Premature complexes
    PrematureComplexes,
}

/// Risk level band. A pure function of the score, shared by the
/// threshold alert evaluator so displayed level and alerting behavior
/// cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Score < 25
    Low,
    /// Score < 50
    Moderate,
    /// Score < 75
    High,
    /// Score ≥ 75
    Critical,
}

impl RiskLevel {
    /// Map a 0–100 score onto its band.
    pub fn from_score(score: u8) -> Self {
        if score < 25 {
            RiskLevel::Low
        } else if score < 50 {
            RiskLevel::Moderate
        } else if score < 75 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Short status description for display.
    pub fn description(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low risk",
            RiskLevel::Moderate => "Caution advised",
            RiskLevel::High => "High risk",
            RiskLevel::Critical => "Critical risk",
        }
    }

    /// Recommended action for display.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Low => "No special measures needed at this time.",
            RiskLevel::Moderate => "Keep up regular monitoring and health checks.",
            RiskLevel::High => {
                "Consult a physician; a cardiac health evaluation is recommended."
            }
            RiskLevel::Critical => {
                "Immediate medical attention required. Contact emergency services."
            }
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Moderate => write!(f, "moderate"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}
