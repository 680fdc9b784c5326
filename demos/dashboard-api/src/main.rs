mod error;
mod routes;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use floorwatch::{AsyncFloorTracker, FloorTrackerBuilder};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("initializing floor tracker");
    let tracker = match AsyncFloorTracker::build(FloorTrackerBuilder::from_env()).await {
        Ok(tracker) => tracker,
        Err(e) => {
            error!(error = %e, "failed to initialize floor tracker");
            std::process::exit(1);
        }
    };
    info!(tracker = %tracker.inner(), "tracker ready");

    let scheduler = tracker.spawn_scheduler();
    let last_handle = tracker.clone();
    let state = Arc::new(AppState { tracker });

    let app = Router::new()
        .route("/api/meta", get(routes::meta::get_meta))
        .route("/api/dashboard", get(routes::dashboard::get_dashboard))
        .route("/api/refresh", post(routes::dashboard::refresh))
        .route("/api/history", get(routes::history::all_history))
        .route("/api/history/combined", get(routes::history::combined_history))
        .route("/api/history/{symbol}", get(routes::history::entity_history))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = "0.0.0.0:3000";
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, addr, "failed to bind");
            std::process::exit(1);
        }
    };
    info!("listening on http://{addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "server error");
    }

    info!("stopping refresh scheduler");
    scheduler.stop().await;

    // The blocking HTTP clients must not be dropped on an async worker.
    let _ = tokio::task::spawn_blocking(move || drop(last_handle)).await;
}
