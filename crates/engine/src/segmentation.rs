use common::etherscan::WalletMetrics;
use serde::{Deserialize, Serialize};

use crate::portfolio::PortfolioSnapshot;

/// Behavioral segments, most specific first. Classification walks them in
/// declaration order and takes the first match; `Beginner` is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Segment {
    YieldOptimizer,
    YieldCurious,
    MemecoinDegen,
    ConservativeDefi,
    NftCollector,
    Beginner,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YieldOptimizer => "yield-optimizer",
            Self::YieldCurious => "yield-curious",
            Self::MemecoinDegen => "memecoin-degen",
            Self::ConservativeDefi => "conservative-defi",
            Self::NftCollector => "nft-collector",
            Self::Beginner => "beginner",
        }
    }
}

/// Classification thresholds. Built from config in production, from test
/// defaults in unit tests.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub min_wallet_age_days: i64,
    pub min_portfolio_value_usd: f64,
    pub min_transaction_count: u64,
    pub yield_optimizer_min_lending_usd: f64,
    pub yield_curious_min_portfolio_usd: f64,
    pub memecoin_min_ratio: f64,
    pub nft_collector_min_value_usd: f64,
}

impl ClassifierConfig {
    pub fn from_config(
        eligibility: &common::config::Eligibility,
        segmentation: &common::config::Segmentation,
    ) -> Self {
        Self {
            min_wallet_age_days: eligibility.min_wallet_age_days,
            min_portfolio_value_usd: eligibility.min_portfolio_value_usd,
            min_transaction_count: eligibility.min_transaction_count,
            yield_optimizer_min_lending_usd: segmentation.yield_optimizer_min_lending_usd,
            yield_curious_min_portfolio_usd: segmentation.yield_curious_min_portfolio_usd,
            memecoin_min_ratio: segmentation.memecoin_min_ratio,
            nft_collector_min_value_usd: segmentation.nft_collector_min_value_usd,
        }
    }

    pub fn default_for_test() -> Self {
        Self {
            min_wallet_age_days: 30,
            min_portfolio_value_usd: 500.0,
            min_transaction_count: 20,
            yield_optimizer_min_lending_usd: 50_000.0,
            yield_curious_min_portfolio_usd: 100_000.0,
            memecoin_min_ratio: 0.20,
            nft_collector_min_value_usd: 10_000.0,
        }
    }
}

/// Output of the behavioral classifier: segment plus the facts it was
/// derived from, and human-readable reasons. For an eligible wallet the
/// last reason is always `Classified as <segment>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralProfile {
    pub segment: Segment,
    pub is_eligible: bool,
    pub reasons: Vec<String>,
    pub portfolio_value: f64,
    pub wallet_age: i64,
    pub transaction_count: u64,
}

impl BehavioralProfile {
    /// Profile for a wallet that could not be analyzed at all. Never
    /// eligible, always `beginner`.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            segment: Segment::Beginner,
            is_eligible: false,
            reasons: vec![reason.to_string()],
            portfolio_value: 0.0,
            wallet_age: 0,
            transaction_count: 0,
        }
    }
}

/// Classify a wallet from its normalized portfolio and on-chain metrics.
///
/// Two stages: an eligibility gate (wallet age, portfolio value, tx count;
/// failures reported in that order), then a priority-ordered segment walk.
/// `nft_value_usd` is passed in because NFT valuation has no data source
/// yet; callers currently supply 0.
pub fn classify(
    config: &ClassifierConfig,
    snapshot: &PortfolioSnapshot,
    metrics: &WalletMetrics,
    nft_value_usd: f64,
) -> BehavioralProfile {
    let portfolio_value = snapshot.total_value_usd();

    let mut failures = Vec::new();
    if metrics.age_in_days < config.min_wallet_age_days {
        failures.push(format!(
            "Wallet too new (< {} days)",
            config.min_wallet_age_days
        ));
    }
    if portfolio_value < config.min_portfolio_value_usd {
        failures.push(format!(
            "Portfolio too small (< ${})",
            config.min_portfolio_value_usd
        ));
    }
    if metrics.transaction_count < config.min_transaction_count {
        failures.push(format!(
            "Not enough transactions (< {})",
            config.min_transaction_count
        ));
    }

    if !failures.is_empty() {
        return BehavioralProfile {
            segment: Segment::Beginner,
            is_eligible: false,
            reasons: failures,
            portfolio_value,
            wallet_age: metrics.age_in_days,
            transaction_count: metrics.transaction_count,
        };
    }

    let lending = snapshot.lending_exposure_usd();
    let memecoin_value = snapshot.memecoin_value_usd();
    let memecoin_ratio = if portfolio_value > 0.0 {
        memecoin_value / portfolio_value
    } else {
        0.0
    };

    let segment = if lending > config.yield_optimizer_min_lending_usd {
        Segment::YieldOptimizer
    } else if portfolio_value > config.yield_curious_min_portfolio_usd && lending <= 0.0 {
        Segment::YieldCurious
    } else if memecoin_ratio > config.memecoin_min_ratio {
        Segment::MemecoinDegen
    } else if lending > 0.0 && snapshot.has_only_blue_chip_protocols() {
        Segment::ConservativeDefi
    } else if nft_value_usd > config.nft_collector_min_value_usd {
        Segment::NftCollector
    } else {
        Segment::Beginner
    };

    BehavioralProfile {
        segment,
        is_eligible: true,
        reasons: vec![format!("Classified as {}", segment.as_str())],
        portfolio_value,
        wallet_age: metrics.age_in_days,
        transaction_count: metrics.transaction_count,
    }
}
