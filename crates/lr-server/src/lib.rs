//! HTTP interface for lessonrag
//!
//! Exposes `POST /api/query` and `GET /api/courses` over a shared
//! [`RagSystem`], and serves the static frontend for every other path.

mod error;
mod models;
mod routes;


use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lr_rag::RagSystem;

pub use error::ApiError;
pub use models::{CourseStats, QueryRequest, QueryResponse};

// Re-export core types
pub use lr_core::{Error, Result};

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub rag: Arc<RagSystem>,
}

impl AppState {
    pub fn new(rag: RagSystem) -> Self {
        Self { rag: Arc::new(rag) }
    }
}

/// Build the router; `frontend_dir` is served as the fallback when it exists
pub fn create_app(state: AppState, frontend_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/api/query", post(routes::query_handler))
        .route("/api/courses", get(routes::courses_handler))
        .with_state(state);

    match frontend_dir {
        Some(dir) if dir.is_dir() => {
            info!(path = %dir.display(), "Serving frontend");
            app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        }
        Some(dir) => warn!(path = %dir.display(), "Frontend directory not found, serving API only"),
        None => {}
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve `app` until Ctrl-C
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;

    Ok(())
}
