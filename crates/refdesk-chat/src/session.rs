//! Session lifecycle management.
//!
//! A session is the state scope for one browser session: its mode, its
//! conversation log, and its activity timestamps. Sessions are created on
//! first contact, expire after a configurable idle timeout, and are never
//! persisted across restarts.

use chrono::Local;
use uuid::Uuid;

use crate::log::ConversationLog;
use crate::types::Mode;

/// Mutable state for one user's conversation.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    /// Current response mode. Read once per dispatch; changing it never
    /// touches the log.
    pub mode: Mode,
    pub log: ConversationLog,
    /// Creation time, epoch seconds.
    pub started_at: i64,
    /// Last activity time, epoch seconds.
    pub last_message_at: i64,
    /// True while a turn is dispatching; concurrent submissions are rejected.
    pub in_flight: bool,
}

/// Creates sessions and decides when they expire.
pub struct SessionManager {
    /// Minutes of inactivity before a session is discarded.
    pub session_timeout_minutes: u32,
    /// Mode a fresh session starts in.
    pub default_mode: Mode,
}

impl SessionManager {
    pub fn new(session_timeout_minutes: u32, default_mode: Mode) -> Self {
        Self {
            session_timeout_minutes,
            default_mode,
        }
    }

    /// Create a fresh session with an empty log.
    pub fn create_session(&self) -> Session {
        let now = Local::now().timestamp();
        Session {
            id: Uuid::new_v4(),
            mode: self.default_mode,
            log: ConversationLog::new(),
            started_at: now,
            last_message_at: now,
            in_flight: false,
        }
    }

    /// Check whether a session has been idle past the configured timeout.
    pub fn is_expired(&self, session: &Session) -> bool {
        let now = Local::now().timestamp();
        let timeout_secs = i64::from(self.session_timeout_minutes) * 60;
        now - session.last_message_at > timeout_secs
    }

    /// Record activity on a session.
    pub fn touch(&self, session: &mut Session) {
        session.last_message_at = Local::now().timestamp();
    }
}

// =============================================================================
// Tests
// =============================================================================
