use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use common::types::{Question, Survey};
use serde::Deserialize;
use serde_json::json;

use super::SharedState;

pub async fn list(State(state): State<SharedState>) -> Response {
    match state.store.list_surveys().await {
        Ok(surveys) => Json(surveys).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "listing surveys failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to fetch surveys"})),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSurvey {
    id: String,
    title: String,
    questions: Vec<Question>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Survey ids are slugs: they travel in URLs and inside state tokens.
fn is_valid_survey_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub async fn create(
    State(state): State<SharedState>,
    Json(body): Json<CreateSurvey>,
) -> Response {
    if !is_valid_survey_id(&body.id) || body.title.is_empty() || body.questions.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Survey id, title, and questions are required"})),
        )
            .into_response();
    }

    match state.store.get_survey(&body.id).await {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({"error": "Survey already exists"})),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(err) => {
            tracing::error!(survey = %body.id, error = %err, "survey lookup failed");
            return internal_error();
        }
    }

    let survey = Survey {
        id: body.id,
        title: body.title,
        questions: body.questions,
        created_at: Utc::now(),
        is_active: body.is_active,
    };

    match state.store.save_survey(&survey).await {
        Ok(()) => (StatusCode::CREATED, Json(survey)).into_response(),
        Err(err) => {
            tracing::error!(survey = %survey.id, error = %err, "saving survey failed");
            internal_error()
        }
    }
}

/// Survey metadata for the embed SDK. Questions themselves are not exposed
/// here; the SDK drives the flow through the step surface.
pub async fn embed_metadata(
    State(state): State<SharedState>,
    Path(survey_id): Path<String>,
) -> Response {
    let survey = match state.store.get_survey(&survey_id).await {
        Ok(survey) => survey,
        Err(err) => {
            tracing::error!(survey = %survey_id, error = %err, "survey lookup failed");
            return internal_error();
        }
    };

    let Some(survey) = survey else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Survey not found"})),
        )
            .into_response();
    };
    if !survey.is_active {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Survey is not active"})),
        )
            .into_response();
    }

    Json(json!({
        "id": survey.id,
        "title": survey.title,
        "questionCount": survey.questions.len(),
        "isActive": survey.is_active,
    }))
    .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::tests::{body_json, get_request, post_json, test_router};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_includes_seeded_demo() {
        let app = test_router().await;
        let response = app.oneshot(get_request("/api/surveys")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let surveys = body.as_array().unwrap();
        assert!(surveys.iter().any(|s| s["id"] == "demo"));
    }

    #[tokio::test]
    async fn test_create_then_conflict_on_duplicate() {
        let app = test_router().await;
        let survey = json!({
            "id": "memecoin-sentiment",
            "title": "Memecoin Sentiment",
            "questions": [{
                "id": "mood",
                "type": "multiple-choice",
                "question": "How do you feel about memecoins today?",
                "options": ["Bullish", "Bearish"],
                "required": true
            }]
        });

        let response = app
            .clone()
            .oneshot(post_json("/api/surveys", survey.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["isActive"], true);

        let response = app
            .oneshot(post_json("/api/surveys", survey))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_slug() {
        let app = test_router().await;
        let response = app
            .oneshot(post_json(
                "/api/surveys",
                json!({
                    "id": "Not A Slug",
                    "title": "Bad",
                    "questions": [{
                        "id": "q",
                        "type": "text",
                        "question": "?",
                        "required": false
                    }]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_embed_metadata() {
        let app = test_router().await;
        let response = app
            .clone()
            .oneshot(get_request("/api/embed/survey/demo"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["questionCount"], 3);

        let response = app
            .oneshot(get_request("/api/embed/survey/ghost"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
