use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use common::types::{
    is_valid_wallet_address, normalize_wallet, RewardRecord, RewardStatus,
};
use engine::finalize::ResponseStore;
use engine::rewards::Disburser;
use engine::targeting::eth_equivalent;
use serde::Deserialize;
use serde_json::json;

use super::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBody {
    #[serde(default)]
    wallet_address: String,
    #[serde(default)]
    survey_id: String,
    #[serde(default)]
    amount: u32,
}

/// Direct reward claim. The reward row is written first with an atomic
/// insert-if-absent, so a wallet can never be rewarded twice for one survey
/// even under concurrent claims.
pub async fn claim(State(state): State<SharedState>, Json(body): Json<ClaimBody>) -> Response {
    if body.wallet_address.is_empty() || body.survey_id.is_empty() || body.amount == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Missing required fields"})),
        )
            .into_response();
    }
    if !is_valid_wallet_address(&body.wallet_address) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "Invalid wallet address"})),
        )
            .into_response();
    }

    let wallet_address = normalize_wallet(&body.wallet_address);
    let record = RewardRecord {
        survey_id: body.survey_id.clone(),
        wallet_address: wallet_address.clone(),
        amount: f64::from(body.amount),
        transaction_hash: None,
        timestamp: Utc::now(),
        status: RewardStatus::Pending,
    };

    let inserted = match state.store.insert_reward_if_absent(&record).await {
        Ok(inserted) => inserted,
        Err(err) => {
            tracing::error!(survey = %body.survey_id, error = %err, "reward insert failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Reward distribution failed"})),
            )
                .into_response();
        }
    };
    if !inserted {
        return (
            StatusCode::CONFLICT,
            Json(json!({"success": false, "error": "Already rewarded for this survey"})),
        )
            .into_response();
    }

    match state
        .disburser
        .disburse(&wallet_address, &body.survey_id, body.amount)
        .await
    {
        Ok(claim) => Json(json!({
            "success": claim.success,
            "transactionHash": claim.transaction_hash,
            "amount": body.amount,
            "ethEquivalent": eth_equivalent(body.amount),
            "note": claim.note,
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(survey = %body.survey_id, error = %err, "disbursement failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Reward distribution failed"})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{body_json, post_json, test_router};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[tokio::test]
    async fn test_claim_then_conflict() {
        let app = test_router().await;
        let body = json!({
            "walletAddress": WALLET,
            "surveyId": "memecoin-sentiment",
            "amount": 2
        });

        let response = app
            .clone()
            .oneshot(post_json("/api/rewards", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json_body = body_json(response).await;
        assert_eq!(json_body["success"], true);
        assert_eq!(json_body["transactionHash"], serde_json::Value::Null);
        assert_eq!(json_body["ethEquivalent"], "0.0008");

        let response = app
            .oneshot(post_json("/api/rewards", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json_body = body_json(response).await;
        assert_eq!(json_body["error"], "Already rewarded for this survey");
    }

    #[tokio::test]
    async fn test_claim_validates_input() {
        let app = test_router().await;
        let response = app
            .clone()
            .oneshot(post_json("/api/rewards", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json(
                "/api/rewards",
                json!({"walletAddress": "nope", "surveyId": "demo", "amount": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
