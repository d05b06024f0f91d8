use common::types::{Answer, AnswerMap, Question, QuestionType, Survey};
use serde::Serialize;

use crate::frame_state::FrameState;

/// Frames cap a step at four buttons; longer option lists are cut off.
pub const MAX_FRAME_BUTTONS: usize = 4;
const MAX_LABEL_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameButton {
    pub label: String,
    pub action: &'static str,
    pub post_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameInput {
    pub text: String,
    pub placeholder: String,
}

/// Frames vNext response body.
#[derive(Debug, Clone, Serialize)]
pub struct FrameResponse {
    pub version: &'static str,
    pub image: String,
    pub image_aspect_ratio: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<FrameButton>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<FrameInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl FrameResponse {
    fn new(image: String) -> Self {
        Self {
            version: "vNext",
            image,
            image_aspect_ratio: "1.91:1",
            buttons: None,
            input: None,
            post_url: None,
            state: None,
        }
    }
}

/// What the state machine decided for one interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// No survey in the token: offer the demo survey.
    Home,
    SurveyNotFound,
    /// Progress token exhausted the questions without a press: restart.
    Start,
    AskQuestion {
        question_index: usize,
        responses: AnswerMap,
    },
    /// Last answer recorded: persist and show completion.
    Finalize { responses: AnswerMap },
}

/// One transition of the survey state machine, shared by every surface.
///
/// A button press records an answer for the question the token points at
/// and moves forward; no press re-renders the current question. Button
/// indices are 1-based, so a zero index counts as no press. The caller
/// resolves `survey` from the token's survey id beforehand (None when the
/// id is unknown).
pub fn advance(
    survey: Option<&Survey>,
    state: &FrameState,
    button_index: Option<u32>,
    input_text: Option<&str>,
) -> Step {
    if state.survey_id.is_none() {
        return Step::Home;
    }
    let Some(survey) = survey else {
        return Step::SurveyNotFound;
    };

    if let Some(button_index) = button_index.filter(|&b| b > 0) {
        if state.question_index < survey.questions.len() {
            let question = &survey.questions[state.question_index];
            let answer = record_answer(question, button_index, input_text);

            let mut responses = state.responses.clone();
            responses.insert(question.id.clone(), answer);

            let next_index = state.question_index + 1;
            if next_index >= survey.questions.len() {
                return Step::Finalize { responses };
            }
            return Step::AskQuestion {
                question_index: next_index,
                responses,
            };
        }
    } else if state.question_index < survey.questions.len() {
        return Step::AskQuestion {
            question_index: state.question_index,
            responses: state.responses.clone(),
        };
    }

    Step::Start
}

/// Map a raw interaction onto an answer for `question`. Out-of-range option
/// presses record an empty answer rather than failing the step.
pub fn record_answer(question: &Question, button_index: u32, input_text: Option<&str>) -> Answer {
    match question.question_type {
        QuestionType::MultipleChoice => {
            let options = question.options.as_deref().unwrap_or(&[]);
            let option_index = (button_index as usize).wrapping_sub(1);
            match options.get(option_index) {
                Some(option) => Answer::Text(option.clone()),
                None => Answer::Text(String::new()),
            }
        }
        QuestionType::Rating => Answer::Number(f64::from(button_index)),
        QuestionType::Text => Answer::Text(input_text.unwrap_or_default().to_string()),
    }
}

/// Builds Frame responses for each screen of the flow.
pub struct FrameRenderer {
    base_url: String,
}

impl FrameRenderer {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn post_url(&self) -> String {
        format!("{}/api/frame", self.base_url)
    }

    fn image_url(&self, params: &[(&str, &str)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        format!("{}/api/frame/image?{}", self.base_url, query.join("&"))
    }

    fn button(&self, label: impl Into<String>) -> FrameButton {
        FrameButton {
            label: label.into(),
            action: "post",
            post_url: self.post_url(),
        }
    }

    pub fn render_home(&self) -> FrameResponse {
        let mut response = FrameResponse::new(self.image_url(&[("type", "home")]));
        response.buttons = Some(vec![self.button("Try Demo Survey")]);
        response.state = Some(FrameState::new("demo", 0, AnswerMap::new()).encode());
        response
    }

    pub fn render_not_found(&self) -> FrameResponse {
        let mut response = FrameResponse::new(self.image_url(&[
            ("type", "error"),
            ("message", "Survey not found"),
        ]));
        response.buttons = Some(vec![self.button("Back to Home")]);
        response
    }

    pub fn render_start(&self, survey: &Survey) -> FrameResponse {
        let question_count = survey.questions.len().to_string();
        let mut response = FrameResponse::new(self.image_url(&[
            ("type", "start"),
            ("surveyId", &survey.id),
            ("title", &survey.title),
            ("questionCount", &question_count),
        ]));
        response.buttons = Some(vec![self.button("Start Survey")]);
        response.post_url = Some(self.post_url());
        response.state = Some(FrameState::new(&survey.id, 0, AnswerMap::new()).encode());
        response
    }

    pub fn render_question(
        &self,
        survey: &Survey,
        question_index: usize,
        responses: AnswerMap,
    ) -> FrameResponse {
        let question = &survey.questions[question_index];
        let index_text = question_index.to_string();
        let total_text = survey.questions.len().to_string();
        let type_text = serde_json::to_value(question.question_type)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let mut response = FrameResponse::new(self.image_url(&[
            ("type", "question"),
            ("surveyId", &survey.id),
            ("questionIndex", &index_text),
            ("questionText", &question.question),
            ("questionType", &type_text),
            ("totalQuestions", &total_text),
        ]));

        response.buttons = Some(self.question_buttons(question));
        if question.question_type == QuestionType::Text {
            response.input = Some(FrameInput {
                text: "Enter your response...".to_string(),
                placeholder: "Type your answer here".to_string(),
            });
        }
        response.state = Some(FrameState::new(&survey.id, question_index, responses).encode());
        response
    }

    pub fn render_complete(&self, survey_title: &str) -> FrameResponse {
        let mut response = FrameResponse::new(self.image_url(&[
            ("type", "complete"),
            ("surveyTitle", survey_title),
        ]));
        response.buttons = Some(vec![self.button("Take Another Survey")]);
        response
    }

    fn question_buttons(&self, question: &Question) -> Vec<FrameButton> {
        match question.question_type {
            QuestionType::MultipleChoice => question
                .options
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .take(MAX_FRAME_BUTTONS)
                .map(|option| self.button(truncate_label(option)))
                .collect(),
            QuestionType::Rating => (1..=5).map(|n| self.button(format!("{n}⭐"))).collect(),
            QuestionType::Text => vec![self.button("Submit Answer")],
        }
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(17).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}
