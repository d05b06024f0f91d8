use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::targeting::select_survey_for_segment;
use serde::Deserialize;
use serde_json::json;

use super::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBody {
    #[serde(default)]
    wallet_address: String,
}

/// Display profile for the wallet-connect screen. Upstream failures answer
/// 500; the caller shows a "profile unavailable" card.
pub async fn wallet_profile(
    State(state): State<SharedState>,
    Json(body): Json<WalletBody>,
) -> Response {
    if body.wallet_address.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Wallet address is required"})),
        )
            .into_response();
    }

    match state.profiler.profile_wallet(&body.wallet_address).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => {
            tracing::error!(wallet = %body.wallet_address, error = %err, "wallet profile failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Profile unavailable", "details": err.to_string()})),
            )
                .into_response()
        }
    }
}

/// Behavioral classification plus the survey it routes to. Never fails:
/// unanalyzable wallets come back as ineligible beginners.
pub async fn behavioral_analysis(
    State(state): State<SharedState>,
    Json(body): Json<WalletBody>,
) -> Response {
    let profile = state.profiler.classify_wallet(&body.wallet_address).await;
    let recommended = select_survey_for_segment(profile.segment);

    let mut value = serde_json::to_value(&profile).unwrap_or_else(|_| json!({}));
    if let Some(map) = value.as_object_mut() {
        map.insert("recommendedSurvey".to_string(), json!(recommended));
    }
    Json(value).into_response()
}
