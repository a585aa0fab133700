use super::AppState;
use crate::error::ApiError;
use crate::estimator::is_plausible_reading;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub rssi_dbm: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub estimated_meters: f64,
}

/// Estimate distance in meters from a tag's RSSI (anonymous)
pub async fn estimate_distance(
    State(state): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let Json(request) = payload?;

    if !is_plausible_reading(request.rssi_dbm) {
        return Err(ApiError::bad_request(
            "Invalid RSSI",
            "Provide a negative RSSI in dBm (e.g. -65)",
        ));
    }

    let meters = state.estimator.estimate(request.rssi_dbm)?;
    debug!("{} dBm -> {:.2} m", request.rssi_dbm, meters);

    Ok(Json(EstimateResponse {
        estimated_meters: meters,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{send, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    const URI: &str = "/api/v1/ml/estimate-distance";

    #[tokio::test]
    async fn test_estimate_is_anonymous() {
        let app = test_app();
        let (status, body) = send(&app, Method::POST, URI, None, Some(json!({ "rssiDbm": -35 }))).await;
        assert_eq!(status, StatusCode::OK);

        let meters = body["estimatedMeters"].as_f64().unwrap();
        assert!((meters - 1.0).abs() < 0.1, "got {}", meters);
    }

    #[tokio::test]
    async fn test_weak_signal_is_farther() {
        let app = test_app();
        let (_, near) = send(&app, Method::POST, URI, None, Some(json!({ "rssiDbm": -60.0 }))).await;
        let (_, far) = send(&app, Method::POST, URI, None, Some(json!({ "rssiDbm": -80.0 }))).await;

        let near = near["estimatedMeters"].as_f64().unwrap();
        let far = far["estimatedMeters"].as_f64().unwrap();
        assert!(near > 0.0);
        assert!(far > near);
    }

    #[tokio::test]
    async fn test_rejects_non_negative_rssi() {
        let app = test_app();
        for rssi in [0.0, 12.5] {
            let (status, body) = send(&app, Method::POST, URI, None, Some(json!({ "rssiDbm": rssi }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["title"], "Invalid RSSI");
        }
    }

    #[tokio::test]
    async fn test_rejects_malformed_body() {
        let app = test_app();
        let (status, _) = send(&app, Method::POST, URI, None, Some(json!({ "rssiDbm": "loud" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, URI, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
