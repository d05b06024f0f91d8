use anyhow::Result;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub database: Database,
    pub server: Server,
    pub zapper: Zapper,
    pub etherscan: Etherscan,
    pub eligibility: Eligibility,
    pub segmentation: Segmentation,
    pub observability: Observability,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Absolute base URL embedded in Frame post_url and image links.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Zapper {
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Etherscan {
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// Anti-abuse gate thresholds. A wallet failing any of these is pinned to the
/// `beginner` segment and marked ineligible.
#[derive(Debug, Deserialize, Clone)]
pub struct Eligibility {
    pub min_wallet_age_days: i64,
    pub min_portfolio_value_usd: f64,
    pub min_transaction_count: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Segmentation {
    pub yield_optimizer_min_lending_usd: f64,
    pub yield_curious_min_portfolio_usd: f64,
    pub memecoin_min_ratio: f64,
    pub nft_collector_min_value_usd: f64,
}

#[derive(Debug, Deserialize)]
pub struct Observability {
    pub prometheus_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        let content = std::fs::read_to_string("config/default.toml")?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.port, 3000);
        assert!(config.eligibility.min_wallet_age_days > 0);
        assert!(config.segmentation.yield_optimizer_min_lending_usd > 0.0);
    }

    #[test]
    fn test_default_thresholds_match_documented_values() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.eligibility.min_wallet_age_days, 30);
        assert!((config.eligibility.min_portfolio_value_usd - 500.0).abs() < f64::EPSILON);
        assert_eq!(config.eligibility.min_transaction_count, 20);
        assert!(
            (config.segmentation.yield_optimizer_min_lending_usd - 50_000.0).abs() < f64::EPSILON
        );
        assert!((config.segmentation.memecoin_min_ratio - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timeouts_present() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.zapper.timeout_secs, 10);
        assert_eq!(config.etherscan.timeout_secs, 10);
    }
}
