//! Chat service: central coordinator wiring sessions, dispatch, and the log.
//!
//! Owns the session registry and applies the turn invariant: a committed
//! turn appends exactly two messages, a failed turn appends none. The
//! sessions lock is never held across the backend call; the per-session
//! `in_flight` flag rejects concurrent submissions instead.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeZone};
use uuid::Uuid;

use refdesk_core::config::RefdeskConfig;

use crate::backend::ResponseBackend;
use crate::dispatcher::{Turn, TurnDispatcher, TurnOutcome, TurnPhase};
use crate::error::ChatError;
use crate::session::{Session, SessionManager};
use crate::types::{ChatTurn, Message, Mode, SessionSummary};

/// Central chat service coordinating sessions, dispatch, and commits.
pub struct ChatService {
    dispatcher: TurnDispatcher,
    manager: SessionManager,
    sessions: Mutex<HashMap<Uuid, Session>>,
    greeting: String,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish_non_exhaustive()
    }
}

impl ChatService {
    /// One-time initialization: validate configuration, wire the backend,
    /// and log the boot event. Called at most once per process start; a
    /// failure here leaves the assistant unavailable until restart.
    pub fn initialize(
        config: &RefdeskConfig,
        backend: Box<dyn ResponseBackend>,
    ) -> Result<Self, ChatError> {
        let default_mode = Mode::parse(&config.chat.default_mode).ok_or_else(|| {
            ChatError::Initialization(format!(
                "unknown default_mode '{}' (expected 'doc_search' or 'inquiry')",
                config.chat.default_mode
            ))
        })?;
        if config.chat.max_message_chars == 0 {
            return Err(ChatError::Initialization(
                "max_message_chars must be positive".to_string(),
            ));
        }

        let service = Self {
            dispatcher: TurnDispatcher::new(backend, config.chat.max_message_chars),
            manager: SessionManager::new(config.chat.session_timeout_minutes, default_mode),
            sessions: Mutex::new(HashMap::new()),
            greeting: config.chat.greeting.clone(),
        };
        tracing::info!(default_mode = ?default_mode, "chat service initialized");
        Ok(service)
    }

    /// Greeting shown above the conversation log.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Create a fresh session and return its id and starting mode.
    pub fn create_session(&self) -> Result<(Uuid, Mode), ChatError> {
        let mut sessions = self.lock_sessions()?;
        let session = self.manager.create_session();
        let id = session.id;
        let mode = session.mode;
        sessions.insert(id, session);
        tracing::info!(session = %id, "session created");
        Ok((id, mode))
    }

    /// Handle an incoming chat message.
    ///
    /// Returns `Ok(None)` for empty input (no state change). On success the
    /// turn is committed atomically: the user message and the rendered
    /// assistant content, in that order. On failure nothing is committed and
    /// the phase error is returned.
    pub fn handle_message(
        &self,
        message: &str,
        session_id: Option<Uuid>,
    ) -> Result<Option<ChatTurn>, ChatError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        // Resolve the session and snapshot its mode. The snapshot governs
        // the whole turn: the mode is not re-read after this point.
        let (sid, mode) = {
            let mut sessions = self.lock_sessions()?;
            let sid = self.resolve_session(&mut sessions, session_id);
            let session = sessions
                .get_mut(&sid)
                .ok_or(ChatError::SessionNotFound(sid))?;
            if session.in_flight {
                return Err(ChatError::Busy);
            }
            session.in_flight = true;
            (sid, session.mode)
        };

        // Blocking backend call and rendering run without the lock.
        let mut turn = Turn::new();
        let result = self.dispatcher.dispatch(&mut turn, mode, trimmed);

        // Re-acquire to clear in_flight and, on success, commit.
        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .get_mut(&sid)
            .ok_or(ChatError::SessionNotFound(sid))?;
        session.in_flight = false;

        match result {
            Ok(TurnOutcome::Completed(reply)) => {
                session
                    .log
                    .commit_turn(trimmed.to_string(), reply.content.clone());
                self.manager.touch(session);
                turn.advance(TurnPhase::Committed);
                tracing::info!(
                    session = %sid,
                    mode = ?mode,
                    log_len = session.log.len(),
                    "turn committed"
                );
                Ok(Some(ChatTurn {
                    session_id: sid,
                    mode,
                    reply,
                    log_len: session.log.len(),
                }))
            }
            Ok(TurnOutcome::Ignored) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The full validated log for a session.
    pub fn render_log(&self, session_id: Uuid) -> Result<Vec<Message>, ChatError> {
        let sessions = self.lock_sessions()?;
        let session = sessions
            .get(&session_id)
            .ok_or(ChatError::SessionNotFound(session_id))?;
        session.log.render().map(|messages| messages.to_vec())
    }

    /// Current mode of a session.
    pub fn mode(&self, session_id: Uuid) -> Result<Mode, ChatError> {
        let sessions = self.lock_sessions()?;
        sessions
            .get(&session_id)
            .map(|s| s.mode)
            .ok_or(ChatError::SessionNotFound(session_id))
    }

    /// Switch a session's mode. Takes effect on the next submitted message;
    /// the existing log is untouched. Allowed while a turn is in flight —
    /// the in-flight turn keeps its dispatch-time snapshot.
    pub fn set_mode(&self, session_id: Uuid, mode: Mode) -> Result<(), ChatError> {
        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(ChatError::SessionNotFound(session_id))?;
        if session.mode != mode {
            tracing::info!(session = %session_id, from = ?session.mode, to = ?mode, "mode changed");
            session.mode = mode;
        }
        Ok(())
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.lock_sessions().map(|s| s.len()).unwrap_or(0)
    }

    /// List all active sessions as summaries.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions = match self.lock_sessions() {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        sessions
            .values()
            .map(|s| SessionSummary {
                id: s.id,
                mode: s.mode,
                started_at: format_epoch(s.started_at),
                last_message_at: format_epoch(s.last_message_at),
                message_count: s.log.len(),
            })
            .collect()
    }

    // -- Private helpers --

    fn lock_sessions(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Session>>, ChatError> {
        // A poisoned lock means a panic mid-update; the registry can no
        // longer be trusted, which is a corrupt-state condition.
        self.sessions
            .lock()
            .map_err(|e| ChatError::LogRender(format!("session state poisoned: {}", e)))
    }

    /// Resolve or create a session, discarding an expired one.
    fn resolve_session(
        &self,
        sessions: &mut HashMap<Uuid, Session>,
        requested: Option<Uuid>,
    ) -> Uuid {
        if let Some(sid) = requested {
            if let Some(session) = sessions.get(&sid) {
                if !self.manager.is_expired(session) {
                    return sid;
                }
                tracing::info!(session = %sid, "session expired; starting a new one");
                sessions.remove(&sid);
            }
        }

        let session = self.manager.create_session();
        let sid = session.id;
        sessions.insert(sid, session);
        sid
    }
}

/// Format epoch seconds as ISO 8601 string.
fn format_epoch(epoch: i64) -> String {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|dt: DateTime<Local>| dt.to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    use crate::backend::{BackendError, FailingBackend, StaticBackend};
    use crate::types::{BackendResponse, Role};

    fn default_service() -> ChatService {
        ChatService::initialize(
            &RefdeskConfig::default(),
            Box::new(StaticBackend::new(5, 0.05)),
        )
        .unwrap()
    }

    fn failing_service() -> ChatService {
        ChatService::initialize(&RefdeskConfig::default(), Box::new(FailingBackend::default()))
            .unwrap()
    }

    // ---- Initialization ----

    #[test]
    fn test_initialize_default_config() {
        let service = default_service();
        assert_eq!(service.session_count(), 0);
        assert!(!service.greeting().is_empty());
    }

    #[test]
    fn test_initialize_rejects_unknown_default_mode() {
        let mut config = RefdeskConfig::default();
        config.chat.default_mode = "psychic".to_string();
        let err = ChatService::initialize(&config, Box::new(StaticBackend::new(5, 0.05)))
            .unwrap_err();
        assert!(matches!(err, ChatError::Initialization(_)));
        assert!(err.to_string().contains("psychic"));
    }

    #[test]
    fn test_initialize_rejects_zero_message_limit() {
        let mut config = RefdeskConfig::default();
        config.chat.max_message_chars = 0;
        let err = ChatService::initialize(&config, Box::new(StaticBackend::new(5, 0.05)))
            .unwrap_err();
        assert!(matches!(err, ChatError::Initialization(_)));
    }

    // ---- Turn commits ----

    #[test]
    fn test_turn_commits_two_messages() {
        let service = default_service();
        let turn = service
            .handle_message("employee training policy", None)
            .unwrap()
            .unwrap();
        assert_eq!(turn.log_len, 2);

        let log = service.render_log(turn.session_id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[0].content, "employee training policy");
        assert_eq!(log[1].role, Role::Assistant);
        assert_eq!(log[1].content, turn.reply.content);
    }

    #[test]
    fn test_n_turns_commit_2n_messages() {
        let service = default_service();
        let (sid, _) = service.create_session().unwrap();
        for i in 0..5 {
            let turn = service
                .handle_message(&format!("employee question {}", i), Some(sid))
                .unwrap()
                .unwrap();
            assert_eq!(turn.session_id, sid);
        }
        let log = service.render_log(sid).unwrap();
        assert_eq!(log.len(), 10);
        for (i, message) in log.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
    }

    #[test]
    fn test_input_is_trimmed_before_commit() {
        let service = default_service();
        let turn = service
            .handle_message("  employee roster  ", None)
            .unwrap()
            .unwrap();
        let log = service.render_log(turn.session_id).unwrap();
        assert_eq!(log[0].content, "employee roster");
    }

    #[test]
    fn test_doc_search_scenario_logs_renderer_output() {
        let service = default_service();
        let (sid, mode) = service.create_session().unwrap();
        assert_eq!(mode, Mode::DocSearch);

        let turn = service
            .handle_message("社員の育成方針に関するMTGの議事録", Some(sid))
            .unwrap()
            .unwrap();
        assert_eq!(turn.mode, Mode::DocSearch);
        assert!(turn
            .reply
            .content
            .contains("docs/meetings/development_policy_mtg_minutes.md"));

        let log = service.render_log(sid).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].content, turn.reply.content);
    }

    // ---- Empty input ----

    #[test]
    fn test_empty_message_is_noop() {
        let service = default_service();
        let (sid, _) = service.create_session().unwrap();
        let outcome = service.handle_message("   ", Some(sid)).unwrap();
        assert!(outcome.is_none());
        assert!(service.render_log(sid).unwrap().is_empty());
    }

    // ---- Failure containment ----

    #[test]
    fn test_backend_failure_commits_nothing() {
        let service = failing_service();
        let (sid, _) = service.create_session().unwrap();
        service.handle_message("first works? no", Some(sid)).unwrap_err();

        let err = service
            .handle_message("second attempt", Some(sid))
            .unwrap_err();
        assert!(matches!(err, ChatError::BackendCall(_)));
        assert!(service.render_log(sid).unwrap().is_empty());
    }

    #[test]
    fn test_backend_failure_preserves_earlier_turns() {
        struct FlakyBackend {
            inner: StaticBackend,
            fail_after: usize,
            calls: Mutex<usize>,
        }
        impl ResponseBackend for FlakyBackend {
            fn respond(&self, message: &str) -> Result<BackendResponse, BackendError> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls > self.fail_after {
                    return Err(BackendError("index went away".to_string()));
                }
                self.inner.respond(message)
            }
        }

        let service = ChatService::initialize(
            &RefdeskConfig::default(),
            Box::new(FlakyBackend {
                inner: StaticBackend::new(5, 0.05),
                fail_after: 2,
                calls: Mutex::new(0),
            }),
        )
        .unwrap();

        let (sid, _) = service.create_session().unwrap();
        service.handle_message("employee roster", Some(sid)).unwrap();
        service.handle_message("expense rules", Some(sid)).unwrap();
        assert_eq!(service.render_log(sid).unwrap().len(), 4);

        let err = service.handle_message("third one", Some(sid)).unwrap_err();
        assert!(matches!(err, ChatError::BackendCall(_)));
        // Log unchanged from before the failing turn.
        assert_eq!(service.render_log(sid).unwrap().len(), 4);

        // The session stays usable on the next cycle.
        let err = service.handle_message("fourth", Some(sid)).unwrap_err();
        assert!(matches!(err, ChatError::BackendCall(_)));
    }

    #[test]
    fn test_failure_clears_in_flight() {
        let service = failing_service();
        let (sid, _) = service.create_session().unwrap();
        service.handle_message("boom", Some(sid)).unwrap_err();
        // A failed turn must not leave the session stuck busy.
        let err = service.handle_message("again", Some(sid)).unwrap_err();
        assert!(matches!(err, ChatError::BackendCall(_)));
    }

    // ---- Sessions ----

    #[test]
    fn test_handle_message_creates_session() {
        let service = default_service();
        let turn = service
            .handle_message("employee roster", None)
            .unwrap()
            .unwrap();
        assert_ne!(turn.session_id, Uuid::nil());
        assert_eq!(service.session_count(), 1);
    }

    #[test]
    fn test_same_session_id_reuses_session() {
        let service = default_service();
        let t1 = service.handle_message("first", None).unwrap().unwrap();
        let t2 = service
            .handle_message("second", Some(t1.session_id))
            .unwrap()
            .unwrap();
        assert_eq!(t1.session_id, t2.session_id);
        assert_eq!(service.session_count(), 1);
    }

    #[test]
    fn test_unknown_session_id_creates_new() {
        let service = default_service();
        let fake = Uuid::new_v4();
        let turn = service
            .handle_message("employee roster", Some(fake))
            .unwrap()
            .unwrap();
        assert_ne!(turn.session_id, fake);
    }

    #[test]
    fn test_expired_session_replaced() {
        let service = default_service();
        let (sid, _) = service.create_session().unwrap();
        {
            let mut sessions = service.sessions.lock().unwrap();
            sessions.get_mut(&sid).unwrap().last_message_at =
                Local::now().timestamp() - 2 * 60 * 60;
        }
        let turn = service
            .handle_message("employee roster", Some(sid))
            .unwrap()
            .unwrap();
        assert_ne!(turn.session_id, sid);
    }

    #[test]
    fn test_render_log_unknown_session() {
        let service = default_service();
        let err = service.render_log(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(_)));
    }

    #[test]
    fn test_list_sessions_summary_fields() {
        let service = default_service();
        let turn = service
            .handle_message("employee roster", None)
            .unwrap()
            .unwrap();
        let summaries = service.list_sessions();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, turn.session_id);
        assert_eq!(summaries[0].message_count, 2);
        assert!(!summaries[0].started_at.is_empty());
    }

    // ---- Mode ----

    #[test]
    fn test_set_mode_persists() {
        let service = default_service();
        let (sid, _) = service.create_session().unwrap();
        service.set_mode(sid, Mode::Inquiry).unwrap();
        assert_eq!(service.mode(sid).unwrap(), Mode::Inquiry);
    }

    #[test]
    fn test_mode_change_keeps_log() {
        let service = default_service();
        let (sid, _) = service.create_session().unwrap();
        service.handle_message("employee roster", Some(sid)).unwrap();
        service.set_mode(sid, Mode::Inquiry).unwrap();
        assert_eq!(service.render_log(sid).unwrap().len(), 2);
    }

    #[test]
    fn test_mode_governs_next_turn() {
        let service = default_service();
        let (sid, _) = service.create_session().unwrap();
        service.set_mode(sid, Mode::Inquiry).unwrap();
        let turn = service
            .handle_message("what are the expense reimbursement rules", Some(sid))
            .unwrap()
            .unwrap();
        assert_eq!(turn.mode, Mode::Inquiry);
        assert!(turn.reply.content.contains("References:"));
    }

    #[test]
    fn test_set_mode_unknown_session() {
        let service = default_service();
        let err = service.set_mode(Uuid::new_v4(), Mode::Inquiry).unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound(_)));
    }

    // ---- Mid-flight behavior ----

    /// Backend that signals when a call enters and blocks until released.
    struct GateBackend {
        entered: mpsc::Sender<()>,
        release: Mutex<mpsc::Receiver<()>>,
        inner: StaticBackend,
    }

    impl ResponseBackend for GateBackend {
        fn respond(&self, message: &str) -> Result<BackendResponse, BackendError> {
            self.entered.send(()).expect("test receiver alive");
            self.release
                .lock()
                .expect("release lock")
                .recv()
                .expect("test sender alive");
            self.inner.respond(message)
        }
    }

    fn gated_service() -> (Arc<ChatService>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let service = ChatService::initialize(
            &RefdeskConfig::default(),
            Box::new(GateBackend {
                entered: entered_tx,
                release: Mutex::new(release_rx),
                inner: StaticBackend::new(5, 0.05),
            }),
        )
        .unwrap();
        (Arc::new(service), entered_rx, release_tx)
    }

    #[test]
    fn test_mode_switch_mid_flight_keeps_snapshot() {
        let (service, entered_rx, release_tx) = gated_service();
        let (sid, _) = service.create_session().unwrap();

        let worker = {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .handle_message("employee training policy", Some(sid))
                    .unwrap()
                    .unwrap()
            })
        };

        // Wait until the backend call is in flight, then switch modes.
        entered_rx.recv().unwrap();
        service.set_mode(sid, Mode::Inquiry).unwrap();
        release_tx.send(()).unwrap();

        let turn = worker.join().unwrap();
        // The dispatch-time snapshot governs the renderer.
        assert_eq!(turn.mode, Mode::DocSearch);
        assert!(turn.reply.content.contains("closest match"));
        // The new mode applies from the next message.
        assert_eq!(service.mode(sid).unwrap(), Mode::Inquiry);
    }

    #[test]
    fn test_concurrent_submission_rejected_while_in_flight() {
        let (service, entered_rx, release_tx) = gated_service();
        let (sid, _) = service.create_session().unwrap();

        let worker = {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .handle_message("employee roster", Some(sid))
                    .unwrap()
                    .unwrap()
            })
        };

        entered_rx.recv().unwrap();
        let err = service
            .handle_message("second message", Some(sid))
            .unwrap_err();
        assert!(matches!(err, ChatError::Busy));

        release_tx.send(()).unwrap();
        let turn = worker.join().unwrap();
        // Only the first submission was committed.
        assert_eq!(turn.log_len, 2);
        assert_eq!(service.render_log(sid).unwrap().len(), 2);
    }

    #[test]
    fn test_distinct_sessions_dispatch_independently() {
        let service = Arc::new(default_service());
        let mut handles = Vec::new();
        for i in 0..8 {
            let service = Arc::clone(&service);
            handles.push(thread::spawn(move || {
                service
                    .handle_message(&format!("employee question {}", i), None)
                    .unwrap()
                    .unwrap()
            }));
        }
        let turns: Vec<ChatTurn> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(turns.len(), 8);
        assert_eq!(service.session_count(), 8);
        for turn in turns {
            assert_eq!(turn.log_len, 2);
        }
    }

    // ---- format_epoch ----

    #[test]
    fn test_format_epoch_valid() {
        let s = format_epoch(1700000000);
        assert!(s.contains("2023"));
    }

    #[test]
    fn test_format_epoch_zero() {
        assert!(!format_epoch(0).is_empty());
    }
}
