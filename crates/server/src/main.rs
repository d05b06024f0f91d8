mod api;
mod seed;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::config::Config;
use common::db::AsyncDb;
use common::etherscan::EtherscanClient;
use common::zapper::ZapperClient;
use engine::delivery::FrameRenderer;
use engine::profiler::WalletProfiler;
use engine::rewards::LoggedDisburser;
use engine::segmentation::ClassifierConfig;
use engine::store_impls::SqliteStore;

use api::AppState;

/// Wallet the manual reward payouts are funded from.
const REWARD_WALLET: &str = "0x1C18c17804795B7F3bbF2f98102460242A0C12ed";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("loading config/default.toml")?;

    let dispatch = common::observability::build_dispatch(&config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).context("setting tracing dispatcher")?;

    let prometheus_addr: SocketAddr =
        format!("0.0.0.0:{}", config.observability.prometheus_port).parse()?;
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(prometheus_addr)
        .install()
        .context("installing prometheus exporter")?;
    tracing::info!(addr = %prometheus_addr, "prometheus exporter listening");

    if let Some(dir) = std::path::Path::new(&config.database.path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let db = AsyncDb::open(&config.database.path).await?;
    let store = SqliteStore::new(db);
    seed::ensure_demo_survey(&store).await?;

    let zapper = ZapperClient::new(
        &config.zapper.api_url,
        &config.zapper.api_key,
        Duration::from_secs(config.zapper.timeout_secs),
    )?;
    let etherscan = EtherscanClient::new(
        &config.etherscan.api_url,
        &config.etherscan.api_key,
        Duration::from_secs(config.etherscan.timeout_secs),
    )?;
    let profiler = WalletProfiler::new(
        zapper,
        etherscan,
        ClassifierConfig::from_config(&config.eligibility, &config.segmentation),
    );

    let state = Arc::new(AppState {
        store,
        profiler,
        disburser: LoggedDisburser::new(REWARD_WALLET),
        renderer: FrameRenderer::new(&config.server.base_url),
    });

    let app = api::create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(addr = %addr, "survey server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
