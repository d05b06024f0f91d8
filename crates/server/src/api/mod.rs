mod embed;
mod frame;
mod profile;
mod rewards;
mod surveys;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use common::etherscan::EtherscanClient;
use common::zapper::ZapperClient;
use engine::delivery::FrameRenderer;
use engine::profiler::WalletProfiler;
use engine::rewards::LoggedDisburser;
use engine::store_impls::SqliteStore;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub store: SqliteStore,
    pub profiler: WalletProfiler<ZapperClient, EtherscanClient>,
    pub disburser: LoggedDisburser,
    pub renderer: FrameRenderer,
}

pub type SharedState = Arc<AppState>;

async fn health() -> &'static str {
    "ok"
}

pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/frame", get(frame::initial).post(frame::interact))
        .route("/api/survey/{survey_id}/step", get(frame::browser_step))
        .route("/api/surveys", get(surveys::list).post(surveys::create))
        .route("/api/embed/survey/{survey_id}", get(surveys::embed_metadata))
        .route("/api/embed/submit", post(embed::submit))
        .route("/api/embed/check-response", get(embed::check_response))
        .route("/api/wallet-profile", post(profile::wallet_profile))
        .route(
            "/api/behavioral-analysis",
            post(profile::behavioral_analysis),
        )
        .route("/api/rewards", post(rewards::claim))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
