use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::types::AnswerMap;
use serde::{Deserialize, Serialize};

/// Progress token carried between Frame steps: base64 over compact JSON.
///
/// The token travels through the client untrusted. Anything that fails to
/// decode or parse collapses to the default state, which the state machine
/// renders as the home screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameState {
    pub survey_id: Option<String>,
    pub question_index: usize,
    pub responses: AnswerMap,
    /// Milliseconds since the epoch at token creation.
    pub timestamp: i64,
}

impl FrameState {
    pub fn new(survey_id: &str, question_index: usize, responses: AnswerMap) -> Self {
        Self {
            survey_id: Some(survey_id.to_string()),
            question_index,
            responses,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn encode(&self) -> String {
        // Serialization of this shape cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    pub fn decode(token: Option<&str>) -> Self {
        let Some(token) = token else {
            return Self::default();
        };
        let Ok(bytes) = STANDARD.decode(token) else {
            tracing::debug!("frame state token is not valid base64");
            return Self::default();
        };
        match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                tracing::debug!(error = %err, "frame state token is not valid JSON");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::Answer;

    #[test]
    fn test_round_trip_preserves_state() {
        let mut responses = AnswerMap::new();
        responses.insert("satisfaction".into(), Answer::Text("Satisfied".into()));
        responses.insert("rating".into(), Answer::Number(4.0));

        let state = FrameState::new("demo", 2, responses.clone());
        let decoded = FrameState::decode(Some(&state.encode()));
        assert_eq!(decoded.survey_id.as_deref(), Some("demo"));
        assert_eq!(decoded.question_index, 2);
        assert_eq!(decoded.responses, responses);
        assert_eq!(decoded.timestamp, state.timestamp);
    }

    #[test]
    fn test_missing_token_is_default() {
        assert_eq!(FrameState::decode(None), FrameState::default());
    }

    #[test]
    fn test_garbage_tokens_collapse_to_default() {
        assert_eq!(
            FrameState::decode(Some("!!!not-base64!!!")),
            FrameState::default()
        );
        let not_json = STANDARD.encode("surveyId=demo");
        assert_eq!(FrameState::decode(Some(&not_json)), FrameState::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let partial = STANDARD.encode(r#"{"surveyId":"demo"}"#);
        let state = FrameState::decode(Some(&partial));
        assert_eq!(state.survey_id.as_deref(), Some("demo"));
        assert_eq!(state.question_index, 0);
        assert!(state.responses.is_empty());
    }
}
