//! Request and response shapes for the REST surface.

use serde::{Deserialize, Serialize};

use crate::risk::{ContributingFactor, EcgFeature, RiskAssessment, RiskFactor, RiskInput, RiskLevel};

/// Body of `POST /api/analysis/risk`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskAnalysisRequest {
    pub age: Option<u32>,
    pub risk_factors: Option<Vec<RiskFactor>>,
    pub ecg_features: Option<Vec<EcgFeature>>,
    pub heart_rate: Option<f64>,
    pub blood_pressure_systolic: Option<f64>,
    pub blood_pressure_diastolic: Option<f64>,
    pub oxygen_level: Option<f64>,
    pub temperature: Option<f64>,
}

impl RiskAnalysisRequest {
    pub fn into_input(self) -> RiskInput {
        RiskInput {
            age: self.age,
            risk_factors: self.risk_factors,
            ecg_features: self.ecg_features,
            heart_rate: self.heart_rate,
            blood_pressure_systolic: self.blood_pressure_systolic,
            blood_pressure_diastolic: self.blood_pressure_diastolic,
            oxygen_level: self.oxygen_level,
            temperature: self.temperature,
        }
    }
}

/// Response of `POST /api/analysis/risk`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysisResponse {
    pub score: u8,
    pub level: RiskLevel,
    pub description: &'static str,
    pub recommendation: &'static str,
    pub contributing_factors: Vec<ContributingFactor>,
    pub has_input: bool,
}

impl From<RiskAssessment> for RiskAnalysisResponse {
    fn from(assessment: RiskAssessment) -> Self {
        Self {
            score: assessment.score,
            level: assessment.level,
            description: assessment.level.description(),
            recommendation: assessment.level.recommendation(),
            contributing_factors: assessment.contributing_factors,
            has_input: assessment.has_input,
        }
    }
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_with_partial_fields() {
        let json = r#"{"heartRate": 180, "oxygenLevel": 85}"#;
        let request: RiskAnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.heart_rate, Some(180.0));
        assert!(request.age.is_none());
    }

    #[test]
    fn response_carries_level_texts() {
        let scorer = crate::risk::RiskScorer::default();
        let assessment = scorer.score(&RiskInput {
            age: Some(35),
            ..Default::default()
        });
        let response = RiskAnalysisResponse::from(assessment);
        assert_eq!(response.level, RiskLevel::Low);
        assert_eq!(response.description, "Low risk");
    }
}
