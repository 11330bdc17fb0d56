//! Conversational interface for Refdesk.
//!
//! Provides session management, the per-turn dispatch state machine,
//! mode-specific response rendering, and the error-containment taxonomy
//! for the internal-document assistant.

pub mod backend;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod render;
pub mod service;
pub mod session;
pub mod types;

pub use backend::{BackendError, FailingBackend, KnowledgeDoc, ResponseBackend, StaticBackend};
pub use dispatcher::{Turn, TurnDispatcher, TurnOutcome, TurnPhase};
pub use error::{ChatError, COMMON_NOTICE};
pub use log::ConversationLog;
pub use render::{render_doc_search, render_inquiry, render_reply};
pub use service::ChatService;
pub use session::{Session, SessionManager};
pub use types::{
    BackendResponse, ChatTurn, DocumentRef, Message, Mode, RenderedReply, ReplyBlock, Role,
    SessionSummary,
};
