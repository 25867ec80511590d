//! REST handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use super::dto::{HealthResponse, RiskAnalysisRequest, RiskAnalysisResponse};
use super::error::ApiError;
use super::state::AppState;
use crate::domain::alert::AlertThresholdConfig;
use crate::domain::UserId;

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        connections: state.broadcast().total_connections(),
    })
}

/// `POST /api/analysis/risk`
pub async fn analyze_risk(
    State(state): State<AppState>,
    Json(request): Json<RiskAnalysisRequest>,
) -> Json<RiskAnalysisResponse> {
    let assessment = state.scorer().score(&request.into_input());
    info!(
        score = assessment.score,
        level = %assessment.level,
        has_input = assessment.has_input,
        "risk analysis served"
    );
    Json(RiskAnalysisResponse::from(assessment))
}

/// `GET /api/users/:user_id/thresholds`
pub async fn get_thresholds(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<AlertThresholdConfig> {
    Json(state.thresholds_for(UserId(user_id)))
}

/// `PUT /api/users/:user_id/thresholds`
pub async fn put_thresholds(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(config): Json<AlertThresholdConfig>,
) -> Result<Json<AlertThresholdConfig>, ApiError> {
    if config.heart_rate_low >= config.heart_rate_high {
        return Err(ApiError::bad_request(
            "heartRateLow must be below heartRateHigh",
        ));
    }
    if !(0.0..=100.0).contains(&config.oxygen_low) {
        return Err(ApiError::bad_request("oxygenLow must be within 0..=100"));
    }
    state.set_thresholds(UserId(user_id), config.clone());
    Ok(Json(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_version() {
        let response = health(State(AppState::new())).await;
        assert_eq!(response.0.status, "ok");
        assert_eq!(response.0.version, crate::VERSION);
    }

    #[tokio::test]
    async fn risk_endpoint_scores_critical_vitals() {
        let request = RiskAnalysisRequest {
            heart_rate: Some(180.0),
            oxygen_level: Some(85.0),
            ..RiskAnalysisRequest::default()
        };
        let response = analyze_risk(State(AppState::new()), Json(request)).await;
        assert!(response.0.score >= 75);
    }

    #[tokio::test]
    async fn inverted_heart_rate_bounds_are_rejected() {
        let config = AlertThresholdConfig {
            heart_rate_high: 40.0,
            heart_rate_low: 120.0,
            ..AlertThresholdConfig::default()
        };
        let result = put_thresholds(State(AppState::new()), Path(1), Json(config)).await;
        assert!(matches!(result, Err(ApiError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn thresholds_persist_per_user() {
        let state = AppState::new();
        let config = AlertThresholdConfig {
            heart_rate_high: 140.0,
            ..AlertThresholdConfig::default()
        };
        put_thresholds(State(state.clone()), Path(8), Json(config.clone()))
            .await
            .unwrap();
        let fetched = get_thresholds(State(state), Path(8)).await;
        assert_eq!(fetched.0, config);
    }
}
