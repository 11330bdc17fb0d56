//! Application state shared across all route handlers.
//!
//! AppState holds the configuration and the boot outcome of the chat
//! service. It is passed to handlers via axum's State extractor.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use refdesk_chat::ChatService;
use refdesk_core::config::RefdeskConfig;

use crate::error::ApiError;

/// Outcome of one-time chat initialization.
///
/// Initialization runs at most once per process start. When it fails, the
/// process keeps serving, but every chat route answers with the fatal notice
/// until a restart; no session or log is ever created.
pub enum ChatBoot {
    Ready(ChatService),
    Failed { notice: String },
}

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Mutex<RefdeskConfig>>,
    /// Chat service, or the fatal notice if initialization failed.
    pub boot: Arc<ChatBoot>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create state for a successfully initialized chat service.
    pub fn new(config: RefdeskConfig, service: ChatService) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            boot: Arc::new(ChatBoot::Ready(service)),
            start_time: Instant::now(),
        }
    }

    /// Create state for a failed initialization. Only the fatal notice is
    /// reachable through the API.
    pub fn failed(config: RefdeskConfig, notice: String) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            boot: Arc::new(ChatBoot::Failed { notice }),
            start_time: Instant::now(),
        }
    }

    /// The chat service, or the initialization fatal notice as a 503.
    pub fn service(&self) -> Result<&ChatService, ApiError> {
        match self.boot.as_ref() {
            ChatBoot::Ready(service) => Ok(service),
            ChatBoot::Failed { notice } => Err(ApiError::ServiceUnavailable(notice.clone())),
        }
    }
}
