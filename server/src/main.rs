mod admission;
mod api;
mod auth;
mod config;
mod db;
mod limits;
mod models;
mod persistence;
mod schema;
mod state;
mod sweeper;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use cocotte_core::llm::image::create_image_provider_from_env;
use cocotte_core::llm::create_provider_from_env;
use cocotte_core::pipeline::Pipeline;
use cocotte_core::platform::PlatformRegistry;
use cocotte_core::stt::WhisperTranscriber;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

use crate::admission::single_flight::SingleFlight;
use crate::config::Config;
use crate::limits::cost_gate::{CostGate, CostLimits};
use crate::limits::rate_gate::{RateGate, RateProfile};
use crate::persistence::storage::StorageClient;
use crate::state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        let spec = api::openapi().to_pretty_json().unwrap();
        println!("{}", spec);
        return;
    }

    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("invalid configuration");

    let pool = db::create_pool(&config.database_url);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (compatible; Cocotte/1.0)")
        .build()
        .expect("failed to build HTTP client");

    let llm = create_provider_from_env(http.clone()).expect("LLM provider configuration");
    let image = create_image_provider_from_env(http.clone()).expect("image provider configuration");
    let whisper_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let transcriber = Arc::new(WhisperTranscriber::new(http.clone(), whisper_key));

    let temp_dir = env::temp_dir().join("cocotte-audio");
    std::fs::create_dir_all(&temp_dir).expect("failed to create temp audio dir");

    let pipeline = Pipeline::new(
        PlatformRegistry::new(http.clone()),
        transcriber,
        llm,
        image,
        temp_dir,
    );

    let storage = StorageClient::new(
        http.clone(),
        &config.supabase_url,
        config.supabase_service_key.clone(),
    );

    let state: SharedState = Arc::new(AppState {
        jwt_issuer: config.jwt_issuer(),
        pool,
        http,
        rate_standard: RateGate::new(RateProfile::standard()),
        rate_strict: RateGate::new(RateProfile::strict()),
        cost_gate: CostGate::new(CostLimits {
            daily_global: config.daily_global_limit,
            hourly_global: config.hourly_global_limit,
            daily_user: config.daily_user_limit,
        }),
        single_flight: SingleFlight::new(),
        pipeline,
        storage,
        config,
    });

    sweeper::spawn(state.clone());

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = Router::new()
        .route("/health", get(api::health::health))
        .route("/analyze", post(api::analyze::analyze))
        .route("/generate", post(api::generate::generate))
        .route("/admin/stats", get(api::admin::stats))
        .merge(swagger_ui)
        .with_state(state.clone())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::info!(
                            status = %response.status().as_u16(),
                            latency_ms = %latency.as_millis(),
                            "request completed"
                        );
                    },
                ),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());
    tracing::info!("Swagger UI available at /swagger-ui/");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
