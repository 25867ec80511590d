//! Weighted-average combination of category sub-scores.

use serde::{Deserialize, Serialize};

use super::weights::RiskWeights;
use super::{EcgFeature, RiskFactor, RiskLevel};
use crate::domain::vitals::{defaults, VitalSigns};

/// Input to a risk assessment. Every field is optional; absent
/// categories simply do not participate in the combined score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskInput {
    pub age: Option<u32>,
    pub risk_factors: Option<Vec<RiskFactor>>,
    pub ecg_features: Option<Vec<EcgFeature>>,
    pub heart_rate: Option<f64>,
    pub blood_pressure_systolic: Option<f64>,
    pub blood_pressure_diastolic: Option<f64>,
    pub oxygen_level: Option<f64>,
    pub temperature: Option<f64>,
}

impl RiskInput {
    /// Build an input from an instantaneous vitals reading.
    pub fn from_vitals(vitals: &VitalSigns) -> Self {
        Self {
            heart_rate: vitals.heart_rate,
            blood_pressure_systolic: vitals.blood_pressure_systolic,
            blood_pressure_diastolic: vitals.blood_pressure_diastolic,
            oxygen_level: vitals.oxygen_level,
            temperature: vitals.temperature,
            ..Self::default()
        }
    }

    fn has_vitals(&self) -> bool {
        self.heart_rate.is_some()
            || self.blood_pressure_systolic.is_some()
            || self.blood_pressure_diastolic.is_some()
            || self.oxygen_level.is_some()
            || self.temperature.is_some()
    }
}

/// One category's share of a computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributingFactor {
    /// Category name (`age`, `riskFactors`, `ecg`, `vitalSigns`)
    pub name: String,
    /// Share of the weighted sum, in percent. Shares of all present
    /// categories sum to 100 whenever the score is nonzero.
    pub contribution_percent: f64,
    /// Human-readable summary of this category's finding
    pub description: String,
}

/// Result of a risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Combined score, 0 to 100
    pub score: u8,
    /// Band the score falls in
    pub level: RiskLevel,
    /// Per-category breakdown of the score
    pub contributing_factors: Vec<ContributingFactor>,
    /// False when the input carried no scoreable category. A score of
    /// 0 with `has_input == false` means "no data", not "healthy".
    pub has_input: bool,
}

/// Pure scoring engine over an injected weight configuration.
///
/// Scoring is deterministic and has no side effects; calling
/// [`RiskScorer::score`] twice with the same input yields identical
/// assessments.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
}

impl RiskScorer {
    /// Create a scorer with explicit weight tables.
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    /// The active weight configuration.
    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Assess an input. Each present category yields a 0–10 sub-score;
    /// the sub-scores are combined as a weighted average with the
    /// category weights renormalized over the present set, then scaled
    /// to 0–100, rounded and clamped.
    pub fn score(&self, input: &RiskInput) -> RiskAssessment {
        let mut categories: Vec<(&'static str, f64, f64, String)> = Vec::new();

        if let Some(age) = input.age {
            let sub = self.age_subscore(age);
            categories.push((
                "age",
                sub,
                self.weights.categories.age,
                format!("Age band contribution for age {age}"),
            ));
        }

        if let Some(factors) = &input.risk_factors {
            if !factors.is_empty() {
                let sub = self.factor_subscore(factors);
                categories.push((
                    "riskFactors",
                    sub,
                    self.weights.categories.risk_factors,
                    format!("{} lifestyle and history factors reported", factors.len()),
                ));
            }
        }

        if let Some(features) = &input.ecg_features {
            if !features.is_empty() {
                let sub = self.ecg_subscore(features);
                let abnormal = features.iter().filter(|f| **f != EcgFeature::Normal).count();
                categories.push((
                    "ecg",
                    sub,
                    self.weights.categories.ecg,
                    format!("{abnormal} abnormal ECG feature(s) detected"),
                ));
            }
        }

        if input.has_vitals() {
            let sub = self.vitals_subscore(input);
            categories.push((
                "vitalSigns",
                sub,
                self.weights.categories.vitals,
                "Deviation of current vitals from normal bands".to_string(),
            ));
        }

        if categories.is_empty() {
            return RiskAssessment {
                score: 0,
                level: RiskLevel::Low,
                contributing_factors: Vec::new(),
                has_input: false,
            };
        }

        let total_weight: f64 = categories.iter().map(|(_, _, w, _)| w).sum();
        let weighted_sum: f64 = categories.iter().map(|(_, sub, w, _)| sub * w).sum();
        let final_score = (weighted_sum / total_weight) * 10.0;
        let score = final_score.round().clamp(0.0, 100.0) as u8;

        let contributing_factors = categories
            .into_iter()
            .map(|(name, sub, weight, description)| ContributingFactor {
                name: name.to_string(),
                contribution_percent: if weighted_sum > 0.0 {
                    (sub * weight / weighted_sum) * 100.0
                } else {
                    0.0
                },
                description,
            })
            .collect();

        RiskAssessment {
            score,
            level: RiskLevel::from_score(score),
            contributing_factors,
            has_input: true,
        }
    }

    fn age_subscore(&self, age: u32) -> f64 {
        if age < 40 {
            1.0
        } else if age < 50 {
            3.0
        } else if age < 60 {
            5.0
        } else if age < 70 {
            7.0
        } else {
            9.0
        }
    }

    /// Mean factor weight over the reported set, scaled to 0–10.
    fn factor_subscore(&self, factors: &[RiskFactor]) -> f64 {
        let total: f64 = factors.iter().map(|f| self.weights.factor_weight(*f)).sum();
        let max = factors.len() as f64 * 10.0;
        (total / max) * 10.0
    }

    /// Mean weight over the abnormal features, scaled to 0–10. A set
    /// of only `Normal` features scores zero.
    fn ecg_subscore(&self, features: &[EcgFeature]) -> f64 {
        let abnormal: Vec<&EcgFeature> =
            features.iter().filter(|f| **f != EcgFeature::Normal).collect();
        if abnormal.is_empty() {
            return 0.0;
        }
        let total: f64 = abnormal.iter().map(|f| self.weights.ecg_weight(**f)).sum();
        let max = abnormal.len() as f64 * 10.0;
        (total / max) * 10.0
    }

    /// Weighted severity over the vitals the caller actually provided,
    /// normalized against the weight total of that same set. Blood
    /// pressure is evaluated as a pair; a missing half falls back to
    /// its physiological default so the pair severity stays defined.
    fn vitals_subscore(&self, input: &RiskInput) -> f64 {
        let w = &self.weights.vitals;
        let t = &self.weights.thresholds;
        let mut risk = 0.0;
        let mut max_possible = 0.0;

        if let Some(hr) = input.heart_rate {
            max_possible += w.heart_rate;
            risk += w.heart_rate * t.heart_rate.severity(hr);
        }

        if input.blood_pressure_systolic.is_some() || input.blood_pressure_diastolic.is_some() {
            max_possible += w.blood_pressure;
            let sys = input
                .blood_pressure_systolic
                .unwrap_or(defaults::BP_SYSTOLIC);
            let dia = input
                .blood_pressure_diastolic
                .unwrap_or(defaults::BP_DIASTOLIC);
            let pair = 0.5 * t.systolic.severity(sys) + 0.5 * t.diastolic.severity(dia);
            risk += w.blood_pressure * pair;
        }

        if let Some(oxygen) = input.oxygen_level {
            max_possible += w.oxygen;
            risk += w.oxygen * t.oxygen_severity(oxygen);
        }

        if let Some(temp) = input.temperature {
            max_possible += w.temperature;
            risk += w.temperature * t.temperature.severity(temp);
        }

        if max_possible > 0.0 {
            (risk / max_possible) * 10.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_vitals_score_critical() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            heart_rate: Some(180.0),
            oxygen_level: Some(85.0),
            ..RiskInput::default()
        });
        assert!(assessment.score >= 75, "score = {}", assessment.score);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!(assessment.has_input);
    }

    #[test]
    fn young_age_alone_scores_low() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            age: Some(35),
            ..RiskInput::default()
        });
        assert_eq!(assessment.score, 10);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert_eq!(assessment.contributing_factors.len(), 1);
        assert_eq!(assessment.contributing_factors[0].name, "age");
    }

    #[test]
    fn empty_input_is_flagged_as_no_data() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput::default());
        assert_eq!(assessment.score, 0);
        assert!(!assessment.has_input);
        assert!(assessment.contributing_factors.is_empty());
    }

    #[test]
    fn normal_only_ecg_contributes_zero() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            ecg_features: Some(vec![EcgFeature::Normal]),
            ..RiskInput::default()
        });
        assert_eq!(assessment.score, 0);
        assert!(assessment.has_input);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn st_elevation_dominates_ecg_category() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            ecg_features: Some(vec![EcgFeature::StElevation]),
            ..RiskInput::default()
        });
        // Single feature of weight 9 → sub-score 9 → score 90
        assert_eq!(assessment.score, 90);
        assert_eq!(assessment.level, RiskLevel::Critical);
    }

    #[test]
    fn scoring_is_idempotent() {
        let scorer = RiskScorer::default();
        let input = RiskInput {
            age: Some(62),
            risk_factors: Some(vec![RiskFactor::Smoking, RiskFactor::Hypertension]),
            ecg_features: Some(vec![EcgFeature::Tachycardia]),
            heart_rate: Some(115.0),
            ..RiskInput::default()
        };
        let first = scorer.score(&input);
        let second = scorer.score(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn contributions_sum_to_one_hundred() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            age: Some(70),
            risk_factors: Some(vec![RiskFactor::Diabetes]),
            heart_rate: Some(125.0),
            ..RiskInput::default()
        });
        assert!(assessment.score > 0);
        let total: f64 = assessment
            .contributing_factors
            .iter()
            .map(|f| f.contribution_percent)
            .sum();
        assert!((total - 100.0).abs() < 1e-6, "total = {total}");
    }

    #[test]
    fn in_band_vitals_score_zero() {
        let scorer = RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            heart_rate: Some(72.0),
            blood_pressure_systolic: Some(118.0),
            blood_pressure_diastolic: Some(76.0),
            oxygen_level: Some(98.0),
            temperature: Some(36.8),
            ..RiskInput::default()
        });
        assert_eq!(assessment.score, 0);
        assert!(assessment.has_input);
    }
}
