use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Question kinds a survey may contain. `options` on [`Question`] is only
/// meaningful for `MultipleChoice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    Text,
    Rating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    /// kebab-case, no spaces.
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A single answer: option text or free text for string questions, the star
/// value for ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Number(f64),
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Answer::Text(s.to_string())
    }
}

impl From<f64> for Answer {
    fn from(n: f64) -> Self {
        Answer::Number(n)
    }
}

/// Question id → answer. BTreeMap keeps serialized form deterministic.
pub type AnswerMap = BTreeMap<String, Answer>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub survey_id: String,
    /// Always stored lowercased; see [`normalize_wallet`].
    pub wallet_address: String,
    pub responses: AnswerMap,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Pending,
    Completed,
    Failed,
}

impl RewardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRecord {
    pub survey_id: String,
    pub wallet_address: String,
    pub amount: f64,
    /// None until an actual on-chain transfer happens (disbursement is a
    /// logged stub, so currently always None at creation).
    pub transaction_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: RewardStatus,
}

/// Standard Ethereum address: 0x + 40 hex chars.
pub fn is_valid_wallet_address(addr: &str) -> bool {
    addr.len() == 42 && addr.starts_with("0x") && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Wallet addresses are compared case-insensitively everywhere; normalize at
/// the boundary so storage and lookups can use plain equality.
pub fn normalize_wallet(addr: &str) -> String {
    addr.to_lowercase()
}
