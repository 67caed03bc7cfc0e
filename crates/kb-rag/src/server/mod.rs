//! Minimal HTTP health-check server

use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// Body of `GET /api/health`
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
}

/// Health-check HTTP server
pub struct HealthServer {
    config: ServerConfig,
}

impl HealthServer {
    /// Create a new health server
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Build the router with all routes
    pub fn build_router() -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/health", get(api_health))
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        tracing::info!("Starting health server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, Self::build_router())
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn api_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        message: "Backend is running!",
    })
}
