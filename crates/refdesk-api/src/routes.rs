//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, and all
//! endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS middleware: allow localhost origins for the chat page.
    // Use the configured port plus port+1 for a dev server.
    let port = state.config.lock().map(|c| c.general.port).unwrap_or(3040);
    let dev_port = port.saturating_add(1);
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            format!("http://127.0.0.1:{}", port)
                .parse::<HeaderValue>()
                .unwrap(),
            format!("http://localhost:{}", port)
                .parse::<HeaderValue>()
                .unwrap(),
            format!("http://127.0.0.1:{}", dev_port)
                .parse::<HeaderValue>()
                .unwrap(),
            format!("http://localhost:{}", dev_port)
                .parse::<HeaderValue>()
                .unwrap(),
        ]))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ui", get(handlers::ui))
        .route("/guide", get(handlers::guide))
        .route("/sessions", post(handlers::create_session))
        .route(
            "/chat",
            post(handlers::chat).layer(DefaultBodyLimit::max(64 * 1024)), // 64KB for chat
        )
        .route("/sessions/{id}/log", get(handlers::get_log))
        .route(
            "/sessions/{id}/mode",
            get(handlers::get_mode).put(handlers::put_mode),
        )
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to 127.0.0.1 (localhost only) on the port from config.
pub async fn start_server(state: AppState) -> Result<(), refdesk_core::error::RefdeskError> {
    let port = state.config.lock().map(|c| c.general.port).unwrap_or(3040);
    let addr = format!("127.0.0.1:{}", port);

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| refdesk_core::error::RefdeskError::Api(format!("Failed to bind: {}", e)))?;

    tracing::info!(addr = %addr, "API server listening");
    tracing::info!("Chat page at http://{}/ui", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| refdesk_core::error::RefdeskError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
