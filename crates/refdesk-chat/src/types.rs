//! Shared types for the conversational interface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// The response mode a message is handled in.
///
/// Exactly two modes exist; the renderer for a turn is selected by an
/// exhaustive match, so adding a mode is a compile-time-checked change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Locate the internal documents most relevant to the message.
    #[default]
    DocSearch,
    /// Synthesize an answer from the knowledge base and cite sources.
    Inquiry,
}

impl Mode {
    /// Parse a mode from its configuration string.
    pub fn parse(s: &str) -> Option<Mode> {
        match s {
            "doc_search" => Some(Mode::DocSearch),
            "inquiry" => Some(Mode::Inquiry),
            _ => None,
        }
    }

    /// Human-readable label shown in the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::DocSearch => "Document search",
            Mode::Inquiry => "Internal inquiry",
        }
    }
}

/// Who authored a logged message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

// =============================================================================
// Conversation
// =============================================================================

/// One entry in the conversation log. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Summary of an active session, for listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub mode: Mode,
    pub started_at: String,
    pub last_message_at: String,
    pub message_count: usize,
}

// =============================================================================
// Backend response
// =============================================================================

/// A reference to a retrieved internal document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document title.
    pub title: String,
    /// Repository-relative location of the document.
    pub path: String,
    /// Page number, for paginated formats.
    pub page: Option<u32>,
    /// Relevance score (0.0 to 1.0).
    pub score: f32,
}

/// The opaque result of one backend call.
///
/// The shape is owned by the backend; the mode-specific renderers extract
/// the logged content string from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendResponse {
    /// Synthesized answer text.
    pub answer: String,
    /// Documents the answer was drawn from, most relevant first.
    pub documents: Vec<DocumentRef>,
}

// =============================================================================
// Rendered output
// =============================================================================

/// A rich display element emitted by a renderer alongside the content string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyBlock {
    /// Plain paragraph text.
    Text { text: String },
    /// A document location card.
    Document {
        title: String,
        path: String,
        page: Option<u32>,
    },
    /// A highlighted informational notice.
    Notice { text: String },
}

/// The output of a mode-specific renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedReply {
    /// The exact string stored as the assistant's logged content.
    pub content: String,
    /// Rich UI payload for the browser.
    pub blocks: Vec<ReplyBlock>,
}

/// A committed turn as returned to the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub session_id: Uuid,
    /// The mode snapshot the turn was dispatched under.
    pub mode: Mode,
    pub reply: RenderedReply,
    /// Length of the durable log after the commit.
    pub log_len: usize,
}

// =============================================================================
// Tests
// =============================================================================
