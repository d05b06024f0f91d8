use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::{normalize_wallet, AnswerMap};
use engine::finalize::{finalize_submission, SubmitError};
use engine::targeting::eth_equivalent;
use serde::Deserialize;
use serde_json::json;

use super::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    #[serde(default)]
    survey_id: String,
    #[serde(default)]
    wallet_address: String,
    #[serde(default)]
    responses: AnswerMap,
}

/// Embed surface: the whole answer map arrives in one call, driving the
/// machine's terminal transition directly.
pub async fn submit(State(state): State<SharedState>, Json(body): Json<SubmitBody>) -> Response {
    let receipt = match finalize_submission(
        &state.store,
        &state.disburser,
        &body.survey_id,
        &body.wallet_address,
        body.responses,
        true,
    )
    .await
    {
        Ok(receipt) => receipt,
        Err(err) => return submit_error_response(&body.survey_id, err),
    };

    let response_id = format!(
        "{}-{}-{}",
        receipt.response.survey_id,
        receipt.response.wallet_address,
        receipt.response.submitted_at.timestamp_millis()
    );

    Json(json!({
        "success": true,
        "message": "Response saved successfully",
        "responseId": response_id,
        "reward": {
            "amount": receipt.reward_amount,
            "ethEquivalent": eth_equivalent(receipt.reward_amount),
            "transactionHash": receipt.claim.as_ref().and_then(|c| c.transaction_hash.clone()),
            "note": receipt.claim.as_ref().map(|c| c.note.clone()),
        },
    }))
    .into_response()
}

fn submit_error_response(survey_id: &str, err: SubmitError) -> Response {
    let status = match &err {
        SubmitError::MissingField
        | SubmitError::InvalidWallet
        | SubmitError::SurveyInactive
        | SubmitError::RequiredUnanswered(_) => StatusCode::BAD_REQUEST,
        SubmitError::SurveyNotFound => StatusCode::NOT_FOUND,
        SubmitError::AlreadyResponded => StatusCode::CONFLICT,
        SubmitError::Storage(inner) => {
            tracing::error!(survey = %survey_id, error = %inner, "embed submit failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response();
        }
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckParams {
    survey_id: Option<String>,
    wallet_address: Option<String>,
}

/// Wallet-connect pre-check: has this wallet already answered the survey.
pub async fn check_response(
    State(state): State<SharedState>,
    Query(params): Query<CheckParams>,
) -> Response {
    let (Some(survey_id), Some(wallet_address)) = (params.survey_id, params.wallet_address) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Survey ID and wallet address are required"})),
        )
            .into_response();
    };

    match state.store.has_response(&survey_id, &wallet_address).await {
        Ok(has_responded) => Json(json!({
            "hasResponded": has_responded,
            "surveyId": survey_id,
            "walletAddress": normalize_wallet(&wallet_address),
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(survey = %survey_id, error = %err, "response check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
                .into_response()
        }
    }
}
