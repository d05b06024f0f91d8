use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::{is_valid_wallet_address, AnswerMap};
use engine::delivery::{advance, Step};
use engine::finalize::{finalize_submission, SubmitError};
use engine::frame_state::FrameState;
use serde::Deserialize;
use serde_json::json;

use super::SharedState;

#[derive(Deserialize)]
pub struct InitialParams {
    #[serde(rename = "surveyId")]
    survey_id: Option<String>,
}

/// Initial Frame for a survey, shown when the cast is first rendered.
pub async fn initial(
    State(state): State<SharedState>,
    Query(params): Query<InitialParams>,
) -> Response {
    let survey_id = params.survey_id.as_deref().unwrap_or("demo");
    let survey = match state.store.get_survey(survey_id).await {
        Ok(survey) => survey,
        Err(err) => {
            tracing::error!(survey = %survey_id, error = %err, "survey lookup failed");
            return internal_error();
        }
    };

    match survey.filter(|s| s.is_active) {
        Some(survey) => Json(state.renderer.render_start(&survey)).into_response(),
        None => Json(state.renderer.render_not_found()).into_response(),
    }
}

/// Interaction fields the Frame client POSTs back. Everything here crossed
/// the client and is untrusted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UntrustedData {
    fid: Option<serde_json::Number>,
    timestamp: Option<serde_json::Number>,
    network: Option<serde_json::Number>,
    button_index: Option<u32>,
    input_text: Option<String>,
    address: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    untrusted_data: Option<UntrustedData>,
}

impl FrameRequest {
    fn validate(&self) -> Option<&UntrustedData> {
        let data = self.untrusted_data.as_ref()?;
        if data.fid.is_none() || data.timestamp.is_none() || data.network.is_none() {
            return None;
        }
        Some(data)
    }
}

/// Frame button-press handler: one state machine transition per POST.
pub async fn interact(State(state): State<SharedState>, Json(body): Json<FrameRequest>) -> Response {
    let Some(data) = body.validate() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid frame request"})),
        )
            .into_response();
    };

    let frame_state = FrameState::decode(data.state.as_deref());
    let survey = match &frame_state.survey_id {
        Some(survey_id) => match state.store.get_survey(survey_id).await {
            Ok(survey) => survey,
            Err(err) => {
                tracing::error!(survey = %survey_id, error = %err, "survey lookup failed");
                return internal_error();
            }
        },
        None => None,
    };

    let step = advance(
        survey.as_ref(),
        &frame_state,
        data.button_index,
        data.input_text.as_deref(),
    );

    let response = match (step, survey) {
        (Step::Home, _) => state.renderer.render_home(),
        (Step::SurveyNotFound, _) | (_, None) => state.renderer.render_not_found(),
        (Step::Start, Some(survey)) => state.renderer.render_start(&survey),
        (
            Step::AskQuestion {
                question_index,
                responses,
            },
            Some(survey),
        ) => state.renderer.render_question(&survey, question_index, responses),
        (Step::Finalize { responses }, Some(survey)) => {
            let wallet = data
                .address
                .as_deref()
                .filter(|a| is_valid_wallet_address(a))
                .map(str::to_string)
                .unwrap_or_else(placeholder_wallet);

            match finalize_submission(
                &state.store,
                &state.disburser,
                &survey.id,
                &wallet,
                responses,
                false,
            )
            .await
            {
                // The duplicate case still shows completion so a re-tapped
                // button is not an error for the respondent.
                Ok(_) | Err(SubmitError::AlreadyResponded) => {
                    state.renderer.render_complete(&survey.title)
                }
                Err(SubmitError::SurveyNotFound | SubmitError::SurveyInactive) => {
                    state.renderer.render_not_found()
                }
                Err(err) => {
                    tracing::error!(survey = %survey.id, error = %err, "frame finalization failed");
                    return internal_error();
                }
            }
        }
    };

    Json(response).into_response()
}

#[derive(Deserialize)]
pub struct StepParams {
    state: Option<String>,
    button: Option<u32>,
    input: Option<String>,
    wallet: Option<String>,
}

/// Browser surface: the same state machine driven by query parameters,
/// returning the view plus the next progress token as JSON.
pub async fn browser_step(
    State(state): State<SharedState>,
    Path(survey_id): Path<String>,
    Query(params): Query<StepParams>,
) -> Response {
    let decoded = FrameState::decode(params.state.as_deref());
    // A missing or foreign token starts the survey named in the path.
    let frame_state = if decoded.survey_id.as_deref() == Some(survey_id.as_str()) {
        decoded
    } else {
        FrameState::new(&survey_id, 0, AnswerMap::new())
    };

    let survey = match state.store.get_survey(&survey_id).await {
        Ok(survey) => survey,
        Err(err) => {
            tracing::error!(survey = %survey_id, error = %err, "survey lookup failed");
            return internal_error();
        }
    };

    let step = advance(
        survey.as_ref(),
        &frame_state,
        params.button,
        params.input.as_deref(),
    );

    let response = match (step, survey) {
        (Step::Home, _) => state.renderer.render_home(),
        (Step::SurveyNotFound, _) | (_, None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Survey not found"})),
            )
                .into_response();
        }
        (Step::Start, Some(survey)) => state.renderer.render_start(&survey),
        (
            Step::AskQuestion {
                question_index,
                responses,
            },
            Some(survey),
        ) => state.renderer.render_question(&survey, question_index, responses),
        (Step::Finalize { responses }, Some(survey)) => {
            let Some(wallet) = params.wallet.as_deref() else {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Wallet address is required"})),
                )
                    .into_response();
            };

            match finalize_submission(
                &state.store,
                &state.disburser,
                &survey.id,
                wallet,
                responses,
                false,
            )
            .await
            {
                Ok(_) => state.renderer.render_complete(&survey.title),
                Err(err) => return submit_error_response(&survey_id, err),
            }
        }
    };

    Json(response).into_response()
}

fn submit_error_response(survey_id: &str, err: SubmitError) -> Response {
    let status = match &err {
        SubmitError::SurveyNotFound => StatusCode::NOT_FOUND,
        SubmitError::AlreadyResponded => StatusCode::CONFLICT,
        SubmitError::Storage(inner) => {
            tracing::error!(survey = %survey_id, error = %inner, "finalization failed");
            return internal_error();
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}

/// Frame interactions do not always carry a verified wallet; responses from
/// anonymous casters get a throwaway address so the uniqueness key still
/// holds.
fn placeholder_wallet() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}
