use anyhow::Result;
use serde::Serialize;

use crate::targeting::eth_equivalent;

/// Outcome of a disbursement attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResult {
    pub success: bool,
    /// Set once an actual on-chain transfer happens. The logged disburser
    /// never produces one.
    pub transaction_hash: Option<String>,
    pub note: String,
}

pub trait Disburser {
    fn disburse(
        &self,
        wallet_address: &str,
        survey_id: &str,
        amount: u32,
    ) -> impl std::future::Future<Output = Result<ClaimResult>> + Send;
}

/// Disbursement stub: records the obligation in the logs for manual payout.
///
/// TODO: replace with an on-chain transfer once the reward wallet signer is
/// available.
pub struct LoggedDisburser {
    reward_wallet: String,
}

impl LoggedDisburser {
    pub fn new(reward_wallet: &str) -> Self {
        Self {
            reward_wallet: reward_wallet.to_string(),
        }
    }
}

impl Disburser for LoggedDisburser {
    async fn disburse(
        &self,
        wallet_address: &str,
        survey_id: &str,
        amount: u32,
    ) -> Result<ClaimResult> {
        tracing::info!(
            wallet = wallet_address,
            survey = survey_id,
            amount,
            eth = eth_equivalent(amount),
            reward_wallet = %self.reward_wallet,
            "REWARD DUE: {amount} USDC equivalent ({} ETH) to {wallet_address}",
            eth_equivalent(amount),
        );
        metrics::counter!("survey_rewards_logged_total").increment(1);

        Ok(ClaimResult {
            success: true,
            transaction_hash: None,
            note: "Reward logged for manual distribution".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logged_disburser_never_fabricates_a_hash() {
        let disburser = LoggedDisburser::new("0x1C18c17804795B7F3bbF2f98102460242A0C12ed");
        let result = disburser
            .disburse("0x1234567890abcdef1234567890abcdef12345678", "demo", 1)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.transaction_hash, None);
        assert_eq!(result.note, "Reward logged for manual distribution");
    }
}
