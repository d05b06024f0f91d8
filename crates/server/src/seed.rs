use anyhow::Result;
use chrono::Utc;
use common::types::{Question, QuestionType, Survey};
use engine::store_impls::SqliteStore;

/// The demo survey every wallet can take. Created once at startup so the
/// Frame and embed surfaces always have a fallback target.
pub fn demo_survey() -> Survey {
    Survey {
        id: "demo".to_string(),
        title: "Demo Feedback Survey".to_string(),
        questions: vec![
            Question {
                id: "satisfaction".to_string(),
                question_type: QuestionType::MultipleChoice,
                question: "How satisfied are you with our service?".to_string(),
                options: Some(vec![
                    "Very Satisfied".to_string(),
                    "Satisfied".to_string(),
                    "Neutral".to_string(),
                    "Dissatisfied".to_string(),
                ]),
                required: true,
            },
            Question {
                id: "rating".to_string(),
                question_type: QuestionType::Rating,
                question: "Rate us from 1-5 stars".to_string(),
                options: None,
                required: true,
            },
            Question {
                id: "feedback".to_string(),
                question_type: QuestionType::Text,
                question: "Any additional feedback?".to_string(),
                options: None,
                required: false,
            },
        ],
        created_at: Utc::now(),
        is_active: true,
    }
}

pub async fn ensure_demo_survey(store: &SqliteStore) -> Result<()> {
    if store.get_survey("demo").await?.is_none() {
        store.save_survey(&demo_survey()).await?;
        tracing::info!("seeded demo survey");
    }
    Ok(())
}
