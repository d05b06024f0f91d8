use anyhow::Result;
use chrono::Utc;
use common::types::{
    is_valid_wallet_address, normalize_wallet, Answer, AnswerMap, RewardRecord, RewardStatus,
    Survey, SurveyResponse,
};
use thiserror::Error;

use crate::rewards::{ClaimResult, Disburser};
use crate::targeting::reward_amount_for_survey;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Survey ID, wallet address, and responses are required")]
    MissingField,
    #[error("Invalid wallet address")]
    InvalidWallet,
    #[error("Survey not found")]
    SurveyNotFound,
    #[error("Survey is not active")]
    SurveyInactive,
    #[error("User has already responded to this survey")]
    AlreadyResponded,
    #[error("Required question \"{0}\" not answered")]
    RequiredUnanswered(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Persistence seam for finalization. The insert methods are
/// insert-if-absent: they return false when a row for the same
/// (survey, wallet) pair already exists, and never overwrite it.
pub trait ResponseStore {
    fn get_survey(
        &self,
        survey_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Survey>>> + Send;

    fn insert_response_if_absent(
        &self,
        response: &SurveyResponse,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn insert_reward_if_absent(
        &self,
        record: &RewardRecord,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

#[derive(Debug)]
pub struct SubmissionReceipt {
    pub response: SurveyResponse,
    pub reward_amount: u32,
    /// False when a reward row already existed for this pair, so no new
    /// obligation was created.
    pub reward_issued: bool,
    pub claim: Option<ClaimResult>,
}

/// Persist a completed survey and issue its reward, atomically enforcing
/// one response and one reward per (survey, wallet) pair.
///
/// `enforce_required` is on for the embed surface, where the client sends
/// the whole answer map at once; the Frame surface collects answers
/// per-step and skips it.
pub async fn finalize_submission<S, D>(
    store: &S,
    disburser: &D,
    survey_id: &str,
    wallet_address: &str,
    responses: AnswerMap,
    enforce_required: bool,
) -> Result<SubmissionReceipt, SubmitError>
where
    S: ResponseStore,
    D: Disburser,
{
    if survey_id.is_empty() || wallet_address.is_empty() || responses.is_empty() {
        return Err(SubmitError::MissingField);
    }
    if !is_valid_wallet_address(wallet_address) {
        return Err(SubmitError::InvalidWallet);
    }
    let wallet_address = normalize_wallet(wallet_address);

    let survey = store
        .get_survey(survey_id)
        .await?
        .ok_or(SubmitError::SurveyNotFound)?;
    if !survey.is_active {
        return Err(SubmitError::SurveyInactive);
    }

    if enforce_required {
        for question in survey.questions.iter().filter(|q| q.required) {
            if !is_answered(responses.get(&question.id)) {
                return Err(SubmitError::RequiredUnanswered(question.question.clone()));
            }
        }
    }

    let response = SurveyResponse {
        survey_id: survey_id.to_string(),
        wallet_address: wallet_address.clone(),
        responses,
        submitted_at: Utc::now(),
    };

    if !store.insert_response_if_absent(&response).await? {
        return Err(SubmitError::AlreadyResponded);
    }
    metrics::counter!("survey_responses_total", "survey" => survey_id.to_string()).increment(1);

    let reward_amount = reward_amount_for_survey(survey_id);
    let record = RewardRecord {
        survey_id: survey_id.to_string(),
        wallet_address: wallet_address.clone(),
        amount: f64::from(reward_amount),
        transaction_hash: None,
        timestamp: Utc::now(),
        status: RewardStatus::Pending,
    };

    let reward_issued = store.insert_reward_if_absent(&record).await?;
    let claim = if reward_issued {
        // The response is already saved; a disbursement failure must not
        // surface as a submission failure.
        match disburser
            .disburse(&wallet_address, survey_id, reward_amount)
            .await
        {
            Ok(claim) => Some(claim),
            Err(err) => {
                tracing::error!(
                    survey = survey_id,
                    wallet = %wallet_address,
                    error = %err,
                    "reward disbursement failed"
                );
                None
            }
        }
    } else {
        tracing::warn!(
            survey = survey_id,
            wallet = %wallet_address,
            "reward already recorded for this pair, skipping disbursement"
        );
        None
    };

    Ok(SubmissionReceipt {
        response,
        reward_amount,
        reward_issued,
        claim,
    })
}

fn is_answered(answer: Option<&Answer>) -> bool {
    match answer {
        None => false,
        Some(Answer::Text(s)) => !s.is_empty(),
        Some(Answer::Number(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{Question, QuestionType};
    use std::sync::Mutex;

    struct MemStore {
        survey: Option<Survey>,
        responses: Mutex<Vec<SurveyResponse>>,
        rewards: Mutex<Vec<RewardRecord>>,
    }

    impl MemStore {
        fn with_survey(survey: Survey) -> Self {
            Self {
                survey: Some(survey),
                responses: Mutex::new(Vec::new()),
                rewards: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self {
                survey: None,
                responses: Mutex::new(Vec::new()),
                rewards: Mutex::new(Vec::new()),
            }
        }
    }

    impl ResponseStore for MemStore {
        async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>> {
            Ok(self.survey.clone().filter(|s| s.id == survey_id))
        }

        async fn insert_response_if_absent(&self, response: &SurveyResponse) -> Result<bool> {
            let mut responses = self.responses.lock().unwrap();
            if responses.iter().any(|r| {
                r.survey_id == response.survey_id && r.wallet_address == response.wallet_address
            }) {
                return Ok(false);
            }
            responses.push(response.clone());
            Ok(true)
        }

        async fn insert_reward_if_absent(&self, record: &RewardRecord) -> Result<bool> {
            let mut rewards = self.rewards.lock().unwrap();
            if rewards.iter().any(|r| {
                r.survey_id == record.survey_id && r.wallet_address == record.wallet_address
            }) {
                return Ok(false);
            }
            rewards.push(record.clone());
            Ok(true)
        }
    }

    struct OkDisburser;

    impl Disburser for OkDisburser {
        async fn disburse(
            &self,
            _wallet_address: &str,
            _survey_id: &str,
            _amount: u32,
        ) -> Result<ClaimResult> {
            Ok(ClaimResult {
                success: true,
                transaction_hash: None,
                note: "test".to_string(),
            })
        }
    }

    const WALLET: &str = "0xABCdef1234567890abcdef1234567890abcdef12";

    fn demo_survey() -> Survey {
        Survey {
            id: "demo".to_string(),
            title: "Demo Feedback Survey".to_string(),
            questions: vec![
                Question {
                    id: "satisfaction".to_string(),
                    question_type: QuestionType::MultipleChoice,
                    question: "How satisfied are you with our service?".to_string(),
                    options: Some(vec!["Very Satisfied".to_string(), "Satisfied".to_string()]),
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

    fn answers() -> AnswerMap {
        let mut map = AnswerMap::new();
        map.insert(
            "satisfaction".to_string(),
            Answer::Text("Satisfied".to_string()),
        );
        map
    }

    #[tokio::test]
    async fn test_successful_submission_issues_reward() {
        let store = MemStore::with_survey(demo_survey());
        let receipt =
            finalize_submission(&store, &OkDisburser, "demo", WALLET, answers(), true)
                .await
                .unwrap();
        assert_eq!(receipt.reward_amount, 1);
        assert!(receipt.reward_issued);
        assert!(receipt.claim.unwrap().success);
        assert_eq!(
            receipt.response.wallet_address,
            WALLET.to_lowercase(),
            "wallet must be normalized before storage"
        );
        assert_eq!(store.rewards.lock().unwrap()[0].status, RewardStatus::Pending);
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected() {
        let store = MemStore::with_survey(demo_survey());
        finalize_submission(&store, &OkDisburser, "demo", WALLET, answers(), true)
            .await
            .unwrap();

        // Same wallet in different case counts as the same respondent.
        let err = finalize_submission(
            &store,
            &OkDisburser,
            "demo",
            &WALLET.to_uppercase().replace("0X", "0x"),
            answers(),
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SubmitError::AlreadyResponded));
        assert_eq!(store.responses.lock().unwrap().len(), 1);
        assert_eq!(store.rewards.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_required_answer_rejected() {
        let store = MemStore::with_survey(demo_survey());
        let mut map = AnswerMap::new();
        map.insert("feedback".to_string(), Answer::Text("hi".to_string()));
        let err = finalize_submission(&store, &OkDisburser, "demo", WALLET, map, true)
            .await
            .unwrap_err();
        let SubmitError::RequiredUnanswered(question) = err else {
            panic!("expected RequiredUnanswered");
        };
        assert_eq!(question, "How satisfied are you with our service?");
    }

    #[tokio::test]
    async fn test_required_check_skipped_for_frame_surface() {
        let store = MemStore::with_survey(demo_survey());
        let mut map = AnswerMap::new();
        // Out-of-range press on the frame surface records an empty answer.
        map.insert("satisfaction".to_string(), Answer::Text(String::new()));
        let receipt = finalize_submission(&store, &OkDisburser, "demo", WALLET, map, false)
            .await
            .unwrap();
        assert!(receipt.reward_issued);
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_surveys_rejected() {
        let store = MemStore::empty();
        let err = finalize_submission(&store, &OkDisburser, "demo", WALLET, answers(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::SurveyNotFound));

        let mut survey = demo_survey();
        survey.is_active = false;
        let store = MemStore::with_survey(survey);
        let err = finalize_submission(&store, &OkDisburser, "demo", WALLET, answers(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::SurveyInactive));
    }

    #[tokio::test]
    async fn test_missing_fields_and_bad_wallet() {
        let store = MemStore::with_survey(demo_survey());
        let err = finalize_submission(&store, &OkDisburser, "", WALLET, answers(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::MissingField));

        let err = finalize_submission(
            &store,
            &OkDisburser,
            "demo",
            "demo-wallet",
            answers(),
            true,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidWallet));
    }
}
