//! Dashboard web server
//!
//! JSON-only HTTP service over a shared [`Orchestrator`].

use anyhow::Result;
use axum::{response::IntoResponse, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState};
use crate::runner::Orchestrator;

/// Dashboard server configuration
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

pub struct DashboardServer {
    config: DashboardConfig,
    orchestrator: Orchestrator,
}

impl DashboardServer {
    pub fn new(config: DashboardConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Serve until the process is stopped.
    pub async fn start(&self) -> Result<()> {
        let state = Arc::new(AppState {
            orchestrator: self.orchestrator.clone(),
        });
        let app = router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));

        println!("\n📊 Dashboard started!");
        println!("   API: http://localhost:{}/api/status", self.config.port);
        println!(
            "   Reports: {}",
            self.orchestrator.config().reports_dir.display()
        );
        println!("\n   Press Ctrl+C to stop.\n");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("dashboard listening on {}", addr);
        axum::serve(listener, app.into_make_service()).await?;

        Ok(())
    }
}

/// Full application router with state applied.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(api::api_router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Service description for clients hitting the root.
async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/run",
            "GET /api/status",
            "GET /api/tested-data",
            "GET /api/results",
            "POST /api/export",
            "GET /api/download?path=",
            "GET /api/reports",
            "GET /api/suites",
            "POST /api/stop",
            "GET /api/sample-data",
        ],
    }))
}
