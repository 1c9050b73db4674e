use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{info, warn};

use axum::{
    extract::State, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use super::admin_routes::make_admin_routes;
use super::survey_routes::make_survey_routes;
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig, survey_store: GuardedSurveyStore) -> Result<Router> {
    let state = ServerState::new(config, survey_store);

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let mut app: Router = home_router.nest("/v1/survey", make_survey_routes(state.clone()));

    match make_admin_routes(state.clone()) {
        Some(admin_routes) => app = app.nest("/v1/admin", admin_routes),
        None => info!("No admin API key configured, admin routes are disabled"),
    }

    app = app
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Ok(app)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run_server(config: ServerConfig, survey_store: GuardedSurveyStore) -> Result<()> {
    let port = config.port;
    let app = make_app(config, survey_store)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Survey server listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
