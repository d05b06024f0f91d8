use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

/// On-chain activity facts used by the eligibility gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalletMetrics {
    pub age_in_days: i64,
    pub transaction_count: u64,
}

#[derive(Debug, Deserialize)]
struct TxListResponse {
    status: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TxEntry {
    #[serde(rename = "timeStamp")]
    time_stamp: String,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    result: Option<String>,
}

pub struct EtherscanClient {
    api_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl EtherscanClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    /// Wallet age from the first transaction plus the nonce-based tx count.
    /// Both upstream calls must succeed; the caller treats any failure as an
    /// unknown wallet and gates accordingly.
    pub async fn fetch_wallet_metrics(&self, wallet_address: &str) -> Result<WalletMetrics> {
        let age_in_days = self.wallet_age_days(wallet_address).await?;
        let transaction_count = self.transaction_count(wallet_address).await?;
        Ok(WalletMetrics {
            age_in_days,
            transaction_count,
        })
    }

    /// Days since the wallet's earliest transaction. Asks for exactly one
    /// transaction sorted ascending. A wallet with no transactions has age 0.
    async fn wallet_age_days(&self, wallet_address: &str) -> Result<i64> {
        let resp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", wallet_address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", "1"),
                ("sort", "asc"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("etherscan returned status {}", resp.status()));
        }

        let body: TxListResponse = resp.json().await?;
        // status "0" with a string result means "No transactions found" or an
        // API error message. Only the former maps to age 0.
        if body.status != "1" {
            if let Some(msg) = body.result.as_str() {
                if msg.contains("No transactions") {
                    return Ok(0);
                }
                return Err(anyhow!("etherscan txlist error: {msg}"));
            }
            return Ok(0);
        }

        let entries: Vec<TxEntry> = serde_json::from_value(body.result)?;
        let Some(first) = entries.first() else {
            return Ok(0);
        };
        let first_ts: i64 = first
            .time_stamp
            .parse()
            .map_err(|e| anyhow!("bad timeStamp in txlist: {e}"))?;
        let age_secs = (Utc::now().timestamp() - first_ts).max(0);
        Ok(age_secs / 86_400)
    }

    /// Outgoing transaction count via the eth_getTransactionCount proxy
    /// (the account nonce, returned as a 0x-prefixed hex string).
    async fn transaction_count(&self, wallet_address: &str) -> Result<u64> {
        let resp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("module", "proxy"),
                ("action", "eth_getTransactionCount"),
                ("address", wallet_address),
                ("tag", "latest"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("etherscan returned status {}", resp.status()));
        }

        let body: ProxyResponse = resp.json().await?;
        let hex = body
            .result
            .ok_or_else(|| anyhow!("no result in eth_getTransactionCount response"))?;
        parse_hex_quantity(&hex)
    }
}

fn parse_hex_quantity(hex: &str) -> Result<u64> {
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("quantity missing 0x prefix: {hex}"))?;
    u64::from_str_radix(digits, 16).map_err(|e| anyhow!("bad hex quantity {hex}: {e}"))
}
