use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;

/// portfolioV2 query: token balances + app (protocol) balances, with network
/// names so active chains can be derived. Kept as one query so a wallet
/// profile costs a single upstream round trip.
const PORTFOLIO_QUERY: &str = "
query WalletPortfolio($addresses: [Address!]!) {
  portfolioV2(addresses: $addresses) {
    tokenBalances {
      totalBalanceUSD
      byToken(first: 50) {
        edges {
          node {
            symbol
            balance
            balanceUSD
            network { name }
          }
        }
      }
    }
    appBalances {
      totalBalanceUSD
      byApp(first: 20) {
        edges {
          node {
            balanceUSD
            network { name }
            app {
              displayName
              category { name }
            }
          }
        }
      }
    }
  }
}
";

/// Raw portfolioV2 payload. Every field is optional: the upstream shape is
/// not contractually guaranteed, and normalization must degrade rather than
/// fail on partial data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPayload {
    pub token_balances: Option<TokenBalances>,
    pub app_balances: Option<AppBalances>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalances {
    #[serde(rename = "totalBalanceUSD")]
    pub total_balance_usd: Option<f64>,
    pub by_token: Option<TokenConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenConnection {
    pub edges: Option<Vec<TokenEdge>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenEdge {
    pub node: Option<TokenNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenNode {
    pub symbol: Option<String>,
    /// Upstream sometimes sends this as a string, sometimes as a number.
    pub balance: Option<serde_json::Value>,
    #[serde(rename = "balanceUSD")]
    pub balance_usd: Option<f64>,
    pub network: Option<Network>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Network {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBalances {
    #[serde(rename = "totalBalanceUSD")]
    pub total_balance_usd: Option<f64>,
    pub by_app: Option<AppConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConnection {
    pub edges: Option<Vec<AppEdge>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppEdge {
    pub node: Option<AppNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNode {
    #[serde(rename = "balanceUSD")]
    pub balance_usd: Option<f64>,
    pub network: Option<Network>,
    pub app: Option<AppInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub display_name: Option<String>,
    pub category: Option<Category>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Category {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    data: Option<GraphQlData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlData {
    portfolio_v2: Option<PortfolioPayload>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

pub struct ZapperClient {
    api_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl ZapperClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetch the raw portfolio for one wallet. Errors here (timeout, HTTP
    /// status, GraphQL errors, malformed body) are absorbed by the caller,
    /// which degrades to an empty portfolio rather than failing.
    pub async fn fetch_portfolio(&self, wallet_address: &str) -> Result<PortfolioPayload> {
        let body = serde_json::json!({
            "query": PORTFOLIO_QUERY,
            "variables": { "addresses": [wallet_address] },
        });

        let resp = self
            .http
            .post(&self.api_url)
            .header("x-zapper-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("zapper returned status {}", resp.status()));
        }

        let envelope: GraphQlEnvelope = resp.json().await?;

        if let Some(errors) = envelope.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(anyhow!("graphql errors: {}", messages.join(", ")));
        }

        envelope
            .data
            .and_then(|d| d.portfolio_v2)
            .ok_or_else(|| anyhow!("no portfolio data in response"))
    }
}
