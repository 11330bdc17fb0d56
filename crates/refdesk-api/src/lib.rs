//! Refdesk API crate - axum HTTP server and route handlers.
//!
//! Provides the REST API for the Refdesk assistant: session creation, chat
//! turns, conversation log retrieval, mode selection, the sidebar guide,
//! health checks, and the embedded chat page.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::{AppState, ChatBoot};
