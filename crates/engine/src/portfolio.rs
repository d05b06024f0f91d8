use common::zapper::PortfolioPayload;
use serde::Serialize;

/// Lending protocols recognized by name. Category matching (below) catches
/// the long tail.
const LENDING_PROTOCOLS: &[&str] = &["aave", "compound", "maker"];

const BLUE_CHIP_PROTOCOLS: &[&str] = &["aave", "compound", "uniswap", "curve", "maker"];

const MEMECOIN_SYMBOLS: &[&str] = &["DOGE", "SHIB", "PEPE", "FLOKI", "BONK", "WIF", "POPCAT"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenHolding {
    pub symbol: String,
    /// Raw balance as the upstream sent it (string or number, kept as text).
    pub balance: String,
    pub value_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefiPosition {
    pub protocol: String,
    pub value_usd: f64,
    pub category: Option<String>,
}

/// Normalized view of a wallet portfolio. Built defensively from the raw
/// upstream payload: any missing or null field becomes an empty default,
/// never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioSnapshot {
    pub token_value_usd: f64,
    pub app_value_usd: f64,
    pub tokens: Vec<TokenHolding>,
    pub defi_positions: Vec<DefiPosition>,
    pub chains: Vec<String>,
}

impl PortfolioSnapshot {
    pub fn from_payload(payload: &PortfolioPayload) -> Self {
        let mut snapshot = Self::default();

        if let Some(token_balances) = &payload.token_balances {
            snapshot.token_value_usd = token_balances.total_balance_usd.unwrap_or(0.0);
            let edges = token_balances
                .by_token
                .as_ref()
                .and_then(|c| c.edges.as_deref())
                .unwrap_or(&[]);
            for edge in edges {
                let Some(node) = &edge.node else { continue };
                let Some(symbol) = &node.symbol else { continue };
                snapshot.tokens.push(TokenHolding {
                    symbol: symbol.clone(),
                    balance: balance_text(node.balance.as_ref()),
                    value_usd: node.balance_usd.unwrap_or(0.0),
                });
                if let Some(name) = node.network.as_ref().and_then(|n| n.name.clone()) {
                    push_chain(&mut snapshot.chains, name);
                }
            }
        }

        if let Some(app_balances) = &payload.app_balances {
            snapshot.app_value_usd = app_balances.total_balance_usd.unwrap_or(0.0);
            let edges = app_balances
                .by_app
                .as_ref()
                .and_then(|c| c.edges.as_deref())
                .unwrap_or(&[]);
            for edge in edges {
                let Some(node) = &edge.node else { continue };
                let Some(app) = &node.app else { continue };
                let Some(protocol) = &app.display_name else {
                    continue;
                };
                snapshot.defi_positions.push(DefiPosition {
                    protocol: protocol.clone(),
                    value_usd: node.balance_usd.unwrap_or(0.0),
                    category: app.category.as_ref().and_then(|c| c.name.clone()),
                });
                if let Some(name) = node.network.as_ref().and_then(|n| n.name.clone()) {
                    push_chain(&mut snapshot.chains, name);
                }
            }
        }

        snapshot
    }

    pub fn total_value_usd(&self) -> f64 {
        self.token_value_usd + self.app_value_usd
    }

    /// USD exposure to lending protocols: matched by name or by the app
    /// category containing "lending".
    pub fn lending_exposure_usd(&self) -> f64 {
        self.defi_positions
            .iter()
            .filter(|p| {
                let name = p.protocol.to_lowercase();
                let category = p
                    .category
                    .as_deref()
                    .map(str::to_lowercase)
                    .unwrap_or_default();
                LENDING_PROTOCOLS.iter().any(|l| name.contains(l)) || category.contains("lending")
            })
            .map(|p| p.value_usd)
            .sum()
    }

    /// Total USD value held in known memecoin symbols (exact symbol match).
    pub fn memecoin_value_usd(&self) -> f64 {
        self.tokens
            .iter()
            .filter(|t| MEMECOIN_SYMBOLS.contains(&t.symbol.as_str()))
            .map(|t| t.value_usd)
            .sum()
    }

    /// True when every DeFi position is in a blue-chip protocol. A wallet
    /// with no positions at all does not qualify.
    pub fn has_only_blue_chip_protocols(&self) -> bool {
        if self.defi_positions.is_empty() {
            return false;
        }
        self.defi_positions.iter().all(|p| {
            let name = p.protocol.to_lowercase();
            BLUE_CHIP_PROTOCOLS.iter().any(|b| name.contains(b))
        })
    }

    /// Top `n` tokens by USD value, skipping zero-value dust.
    pub fn top_tokens(&self, n: usize) -> Vec<TokenHolding> {
        let mut tokens: Vec<TokenHolding> = self
            .tokens
            .iter()
            .filter(|t| t.value_usd > 0.0)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
        tokens.truncate(n);
        tokens
    }

    pub fn top_positions(&self, n: usize) -> Vec<DefiPosition> {
        let mut positions: Vec<DefiPosition> = self
            .defi_positions
            .iter()
            .filter(|p| p.value_usd > 0.0)
            .cloned()
            .collect();
        positions.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
        positions.truncate(n);
        positions
    }
}

/// Public wallet-profile shape returned by the profile endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub total_value: f64,
    pub top_tokens: Vec<TokenHolding>,
    pub defi_positions: Vec<DefiPosition>,
    pub chains: Vec<String>,
}

impl ProfileSummary {
    pub fn from_snapshot(snapshot: &PortfolioSnapshot) -> Self {
        let mut chains = snapshot.chains.clone();
        chains.truncate(5);
        Self {
            total_value: snapshot.total_value_usd(),
            top_tokens: snapshot.top_tokens(5),
            defi_positions: snapshot.top_positions(5),
            chains,
        }
    }
}

fn balance_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => "0".to_string(),
    }
}

fn push_chain(chains: &mut Vec<String>, name: String) {
    if !chains.contains(&name) {
        chains.push(name);
    }
}
