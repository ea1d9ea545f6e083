use std::sync::Arc;

use cocotte_core::pipeline::Pipeline;

use crate::admission::single_flight::SingleFlight;
use crate::config::Config;
use crate::db::DbPool;
use crate::limits::cost_gate::CostGate;
use crate::limits::rate_gate::RateGate;
use crate::persistence::storage::StorageClient;

/// Application state shared across all handlers.
pub struct AppState {
    pub config: Config,
    /// Pre-computed expected token issuer.
    pub jwt_issuer: String,
    pub pool: DbPool,
    pub http: reqwest::Client,
    /// Standard profile, for /analyze.
    pub rate_standard: RateGate,
    /// Strict profile, for /generate.
    pub rate_strict: RateGate,
    pub cost_gate: CostGate,
    pub single_flight: Arc<SingleFlight>,
    pub pipeline: Pipeline,
    pub storage: StorageClient,
}

pub type SharedState = Arc<AppState>;
