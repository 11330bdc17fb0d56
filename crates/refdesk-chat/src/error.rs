//! Error taxonomy for the conversational interface.
//!
//! The four phase errors (initialization, log render, backend call, response
//! render) each map to one static user-facing notice. The containment policy
//! is uniform: log full context at the boundary, surface the notice, halt the
//! current cycle. Nothing is retried automatically and nothing is committed
//! to the log on failure.

use refdesk_core::error::RefdeskError;
use uuid::Uuid;

/// Closing line appended to every user-facing notice.
pub const COMMON_NOTICE: &str = "If the problem persists, contact the system administrator.";

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("conversation log render failed: {0}")]
    LogRender(String),
    #[error("backend call failed: {0}")]
    BackendCall(String),
    #[error("response render failed: {0}")]
    ResponseRender(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("a turn for this session is already in flight")]
    Busy,
}

impl ChatError {
    /// The static notice shown to the user for this error kind.
    pub fn notice(&self) -> &'static str {
        match self {
            ChatError::Initialization(_) => {
                "Initialization failed and the assistant is unavailable."
            }
            ChatError::LogRender(_) => "The conversation log could not be displayed.",
            ChatError::BackendCall(_) => "Failed to get a response from the assistant.",
            ChatError::ResponseRender(_) => "Failed to display the assistant's response.",
            ChatError::EmptyMessage => "Enter a message before sending.",
            ChatError::MessageTooLong(_) => "The message is too long.",
            ChatError::SessionNotFound(_) => "The conversation session was not found.",
            ChatError::Busy => "A response is still being generated. Wait for it to finish.",
        }
    }

    /// The full user-facing notice: the static phase message plus the shared
    /// closing line. This is the single place the two are composed.
    pub fn user_notice(&self) -> String {
        format!("{} {}", self.notice(), COMMON_NOTICE)
    }
}

impl From<ChatError> for RefdeskError {
    fn from(err: ChatError) -> Self {
        RefdeskError::Chat(err.to_string())
    }
}
