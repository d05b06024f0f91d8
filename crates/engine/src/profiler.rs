use anyhow::Result;
use common::etherscan::WalletMetrics;
use common::types::is_valid_wallet_address;
use common::zapper::PortfolioPayload;

use crate::portfolio::{PortfolioSnapshot, ProfileSummary};
use crate::segmentation::{classify, BehavioralProfile, ClassifierConfig};

pub trait PortfolioSource {
    fn fetch_portfolio(
        &self,
        wallet_address: &str,
    ) -> impl std::future::Future<Output = Result<PortfolioPayload>> + Send;
}

pub trait LedgerSource {
    fn fetch_wallet_metrics(
        &self,
        wallet_address: &str,
    ) -> impl std::future::Future<Output = Result<WalletMetrics>> + Send;
}

/// Drives the full wallet analysis: fetch portfolio and ledger facts, then
/// classify. Failure policy differs per output: `classify_wallet` never
/// fails (callers always get a profile), `profile_wallet` propagates
/// upstream errors so the HTTP layer can answer 500.
pub struct WalletProfiler<P, L> {
    portfolio_source: P,
    ledger_source: L,
    config: ClassifierConfig,
}

impl<P, L> WalletProfiler<P, L>
where
    P: PortfolioSource,
    L: LedgerSource,
{
    pub fn new(portfolio_source: P, ledger_source: L, config: ClassifierConfig) -> Self {
        Self {
            portfolio_source,
            ledger_source,
            config,
        }
    }

    /// Behavioral classification. Absorbs every upstream failure: a wallet
    /// that cannot be analyzed is an ineligible beginner, not an error.
    pub async fn classify_wallet(&self, wallet_address: &str) -> BehavioralProfile {
        if !is_valid_wallet_address(wallet_address) {
            return BehavioralProfile::unavailable("Invalid wallet address");
        }

        let payload = match self.portfolio_source.fetch_portfolio(wallet_address).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(wallet = wallet_address, error = %err, "portfolio fetch failed");
                return BehavioralProfile::unavailable("Analysis failed");
            }
        };

        // Ledger failures degrade to zero metrics, which the eligibility
        // gate then rejects.
        let metrics = match self
            .ledger_source
            .fetch_wallet_metrics(wallet_address)
            .await
        {
            Ok(metrics) => metrics,
            Err(err) => {
                tracing::warn!(wallet = wallet_address, error = %err, "wallet metrics fetch failed");
                WalletMetrics {
                    age_in_days: 0,
                    transaction_count: 0,
                }
            }
        };

        let snapshot = PortfolioSnapshot::from_payload(&payload);
        // No NFT valuation source is wired; the nft-collector rule sees 0.
        classify(&self.config, &snapshot, &metrics, 0.0)
    }

    /// Display profile for the wallet connect screen.
    pub async fn profile_wallet(&self, wallet_address: &str) -> Result<ProfileSummary> {
        let payload = self.portfolio_source.fetch_portfolio(wallet_address).await?;
        let snapshot = PortfolioSnapshot::from_payload(&payload);
        Ok(ProfileSummary::from_snapshot(&snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Segment;
    use anyhow::anyhow;

    struct FixedPortfolio(Option<PortfolioPayload>);

    impl PortfolioSource for FixedPortfolio {
        async fn fetch_portfolio(&self, _wallet_address: &str) -> Result<PortfolioPayload> {
            self.0.clone().ok_or_else(|| anyhow!("upstream down"))
        }
    }

    struct FixedLedger(Option<WalletMetrics>);

    impl LedgerSource for FixedLedger {
        async fn fetch_wallet_metrics(&self, _wallet_address: &str) -> Result<WalletMetrics> {
            self.0.ok_or_else(|| anyhow!("upstream down"))
        }
    }

    const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[tokio::test]
    async fn test_invalid_address_short_circuits() {
        let profiler = WalletProfiler::new(
            FixedPortfolio(None),
            FixedLedger(None),
            ClassifierConfig::default_for_test(),
        );
        let profile = profiler.classify_wallet("not-a-wallet").await;
        assert!(!profile.is_eligible);
        assert_eq!(profile.reasons, vec!["Invalid wallet address"]);
    }

    #[tokio::test]
    async fn test_portfolio_failure_degrades_to_analysis_failed() {
        let profiler = WalletProfiler::new(
            FixedPortfolio(None),
            FixedLedger(Some(WalletMetrics {
                age_in_days: 100,
                transaction_count: 50,
            })),
            ClassifierConfig::default_for_test(),
        );
        let profile = profiler.classify_wallet(WALLET).await;
        assert!(!profile.is_eligible);
        assert_eq!(profile.segment, Segment::Beginner);
        assert_eq!(profile.reasons, vec!["Analysis failed"]);
    }

    #[tokio::test]
    async fn test_ledger_failure_fails_eligibility_gate() {
        let profiler = WalletProfiler::new(
            FixedPortfolio(Some(PortfolioPayload::default())),
            FixedLedger(None),
            ClassifierConfig::default_for_test(),
        );
        let profile = profiler.classify_wallet(WALLET).await;
        assert!(!profile.is_eligible);
        assert_eq!(profile.wallet_age, 0);
        assert_eq!(profile.transaction_count, 0);
    }

    #[tokio::test]
    async fn test_profile_wallet_propagates_errors() {
        let profiler = WalletProfiler::new(
            FixedPortfolio(None),
            FixedLedger(None),
            ClassifierConfig::default_for_test(),
        );
        assert!(profiler.profile_wallet(WALLET).await.is_err());
    }
}
