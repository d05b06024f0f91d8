use anyhow::Result;
use common::etherscan::{EtherscanClient, WalletMetrics};
use common::zapper::{PortfolioPayload, ZapperClient};
use std::time::Instant;

use crate::profiler::{LedgerSource, PortfolioSource};

impl PortfolioSource for ZapperClient {
    async fn fetch_portfolio(&self, wallet_address: &str) -> Result<PortfolioPayload> {
        let start = Instant::now();
        let res = ZapperClient::fetch_portfolio(self, wallet_address).await;
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("survey_upstream_latency_ms", "endpoint" => "zapper_portfolio")
            .record(ms);
        match res {
            Ok(v) => {
                metrics::counter!("survey_upstream_requests_total", "endpoint" => "zapper_portfolio", "status" => "ok").increment(1);
                Ok(v)
            }
            Err(e) => {
                metrics::counter!("survey_upstream_requests_total", "endpoint" => "zapper_portfolio", "status" => "error").increment(1);
                Err(e)
            }
        }
    }
}

impl LedgerSource for EtherscanClient {
    async fn fetch_wallet_metrics(&self, wallet_address: &str) -> Result<WalletMetrics> {
        let start = Instant::now();
        let res = EtherscanClient::fetch_wallet_metrics(self, wallet_address).await;
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("survey_upstream_latency_ms", "endpoint" => "etherscan_metrics")
            .record(ms);
        match res {
            Ok(v) => {
                metrics::counter!("survey_upstream_requests_total", "endpoint" => "etherscan_metrics", "status" => "ok").increment(1);
                Ok(v)
            }
            Err(e) => {
                metrics::counter!("survey_upstream_requests_total", "endpoint" => "etherscan_metrics", "status" => "error").increment(1);
                Err(e)
            }
        }
    }
}
