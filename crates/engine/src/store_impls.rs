use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::db::AsyncDb;
use common::types::{
    normalize_wallet, RewardRecord, RewardStatus, Survey, SurveyResponse,
};
use rusqlite::params;

use crate::finalize::ResponseStore;

/// SQLite-backed survey store. Clone is cheap (shares the `AsyncDb`
/// background thread).
#[derive(Clone)]
pub struct SqliteStore {
    db: AsyncDb,
}

impl SqliteStore {
    pub fn new(db: AsyncDb) -> Self {
        Self { db }
    }

    pub async fn save_survey(&self, survey: &Survey) -> Result<()> {
        let survey = survey.clone();
        self.db
            .call_named("save_survey", move |conn| {
                let questions_json = serde_json::to_string(&survey.questions)?;
                conn.execute(
                    "INSERT OR REPLACE INTO surveys (id, title, questions_json, created_at, is_active) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        survey.id,
                        survey.title,
                        questions_json,
                        survey.created_at.to_rfc3339(),
                        survey.is_active,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>> {
        let survey_id = survey_id.to_string();
        self.db
            .call_named("get_survey", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, questions_json, created_at, is_active \
                     FROM surveys WHERE id = ?1",
                )?;
                let mut rows = stmt.query(params![survey_id])?;
                let Some(row) = rows.next()? else {
                    return Ok(None);
                };
                Ok(Some(survey_from_row(row)?))
            })
            .await
    }

    pub async fn list_surveys(&self) -> Result<Vec<Survey>> {
        self.db
            .call_named("list_surveys", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, questions_json, created_at, is_active \
                     FROM surveys ORDER BY created_at DESC",
                )?;
                let mut rows = stmt.query([])?;
                let mut surveys = Vec::new();
                while let Some(row) = rows.next()? {
                    surveys.push(survey_from_row(row)?);
                }
                Ok(surveys)
            })
            .await
    }

    pub async fn has_response(&self, survey_id: &str, wallet_address: &str) -> Result<bool> {
        let survey_id = survey_id.to_string();
        let wallet_address = normalize_wallet(wallet_address);
        self.db
            .call_named("has_response", move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM survey_responses \
                     WHERE survey_id = ?1 AND wallet_address = ?2)",
                    params![survey_id, wallet_address],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
    }

    pub async fn get_reward(
        &self,
        survey_id: &str,
        wallet_address: &str,
    ) -> Result<Option<RewardRecord>> {
        let survey_id = survey_id.to_string();
        let wallet_address = normalize_wallet(wallet_address);
        self.db
            .call_named("get_reward", move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT survey_id, wallet_address, amount, transaction_hash, created_at, status \
                     FROM reward_records WHERE survey_id = ?1 AND wallet_address = ?2",
                )?;
                let mut rows = stmt.query(params![survey_id, wallet_address])?;
                let Some(row) = rows.next()? else {
                    return Ok(None);
                };
                let status_text: String = row.get(5)?;
                Ok(Some(RewardRecord {
                    survey_id: row.get(0)?,
                    wallet_address: row.get(1)?,
                    amount: row.get(2)?,
                    transaction_hash: row.get(3)?,
                    timestamp: parse_timestamp(&row.get::<_, String>(4)?)?,
                    status: RewardStatus::from_str_loose(&status_text)
                        .with_context(|| format!("unknown reward status {status_text:?}"))?,
                }))
            })
            .await
    }
}

impl ResponseStore for SqliteStore {
    async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>> {
        SqliteStore::get_survey(self, survey_id).await
    }

    async fn insert_response_if_absent(&self, response: &SurveyResponse) -> Result<bool> {
        let response = response.clone();
        self.db
            .call_named("insert_response", move |conn| {
                let responses_json = serde_json::to_string(&response.responses)?;
                // INSERT OR IGNORE plus changes() makes the one-response
                // invariant a single atomic statement.
                conn.execute(
                    "INSERT OR IGNORE INTO survey_responses \
                     (survey_id, wallet_address, responses_json, submitted_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        response.survey_id,
                        response.wallet_address,
                        responses_json,
                        response.submitted_at.to_rfc3339(),
                    ],
                )?;
                Ok(conn.changes() > 0)
            })
            .await
    }

    async fn insert_reward_if_absent(&self, record: &RewardRecord) -> Result<bool> {
        let record = record.clone();
        self.db
            .call_named("insert_reward", move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO reward_records \
                     (survey_id, wallet_address, amount, transaction_hash, created_at, status) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        record.survey_id,
                        record.wallet_address,
                        record.amount,
                        record.transaction_hash,
                        record.timestamp.to_rfc3339(),
                        record.status.as_str(),
                    ],
                )?;
                Ok(conn.changes() > 0)
            })
            .await
    }
}

fn survey_from_row(row: &rusqlite::Row<'_>) -> Result<Survey> {
    let questions_json: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    Ok(Survey {
        id: row.get(0)?,
        title: row.get(1)?,
        questions: serde_json::from_str(&questions_json)
            .context("malformed questions_json in surveys row")?,
        created_at: parse_timestamp(&created_at)?,
        is_active: row.get(4)?,
    })
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("bad timestamp {text:?}"))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{Answer, AnswerMap, Question, QuestionType};

    async fn store() -> SqliteStore {
        let db = AsyncDb::open(":memory:").await.unwrap();
        SqliteStore::new(db)
    }

    fn demo_survey() -> Survey {
        Survey {
            id: "demo".to_string(),
            title: "Demo Feedback Survey".to_string(),
            questions: vec![Question {
                id: "rating".to_string(),
                question_type: QuestionType::Rating,
                question: "Rate us from 1-5 stars".to_string(),
                options: None,
                required: true,
            }],
            created_at: Utc::now(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_survey_round_trip() {
        let store = store().await;
        store.save_survey(&demo_survey()).await.unwrap();

        let loaded = store.get_survey("demo").await.unwrap().unwrap();
        assert_eq!(loaded.id, "demo");
        assert_eq!(loaded.questions.len(), 1);
        assert_eq!(loaded.questions[0].question_type, QuestionType::Rating);
        assert!(loaded.is_active);

        assert!(store.get_survey("missing").await.unwrap().is_none());
        assert_eq!(store.list_surveys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_response_insert_if_absent() {
        let store = store().await;
        store.save_survey(&demo_survey()).await.unwrap();

        let mut responses = AnswerMap::new();
        responses.insert("rating".to_string(), Answer::Number(5.0));
        let response = SurveyResponse {
            survey_id: "demo".to_string(),
            wallet_address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            responses,
            submitted_at: Utc::now(),
        };

        assert!(store.insert_response_if_absent(&response).await.unwrap());
        assert!(!store.insert_response_if_absent(&response).await.unwrap());
        assert!(store
            .has_response("demo", "0x1234567890ABCDEF1234567890abcdef12345678")
            .await
            .unwrap());
        assert!(!store.has_response("demo", "0xother").await.unwrap());
    }

    #[tokio::test]
    async fn test_reward_insert_if_absent_and_lookup() {
        let store = store().await;
        let record = RewardRecord {
            survey_id: "demo".to_string(),
            wallet_address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            amount: 1.0,
            transaction_hash: None,
            timestamp: Utc::now(),
            status: RewardStatus::Pending,
        };

        assert!(store.insert_reward_if_absent(&record).await.unwrap());
        assert!(!store.insert_reward_if_absent(&record).await.unwrap());

        let loaded = store
            .get_reward("demo", &record.wallet_address)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, RewardStatus::Pending);
        assert_eq!(loaded.transaction_hash, None);
        assert!((loaded.amount - 1.0).abs() < f64::EPSILON);
    }
}
