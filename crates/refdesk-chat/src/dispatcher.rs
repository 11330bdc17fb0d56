//! Per-turn dispatch state machine.
//!
//! Enforces the allowed phase transitions for one submission:
//! Idle -> AwaitingInput -> BackendCall -> Rendering -> Committed,
//! with Failed reachable from AwaitingInput, BackendCall, and Rendering.
//!
//! The dispatcher owns the backend call and renderer selection. The mode is
//! taken by value: whoever dispatches snapshots it exactly once, so a mode
//! change racing an in-flight call cannot switch the renderer. Committing
//! the turn to the log is the caller's step; the dispatcher never touches
//! session state.

use crate::backend::ResponseBackend;
use crate::error::ChatError;
use crate::render::render_reply;
use crate::types::{Mode, RenderedReply};

// =============================================================================
// Turn phases
// =============================================================================

/// The phase a turn is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingInput,
    BackendCall,
    Rendering,
    Committed,
    Failed,
}

/// Whether a phase transition is allowed.
///
/// Valid transitions:
/// - Idle -> AwaitingInput
/// - AwaitingInput -> BackendCall
/// - AwaitingInput -> Failed (validation)
/// - BackendCall -> Rendering
/// - BackendCall -> Failed
/// - Rendering -> Committed
/// - Rendering -> Failed
pub fn is_valid_transition(from: TurnPhase, to: TurnPhase) -> bool {
    matches!(
        (from, to),
        (TurnPhase::Idle, TurnPhase::AwaitingInput)
            | (TurnPhase::AwaitingInput, TurnPhase::BackendCall)
            | (TurnPhase::AwaitingInput, TurnPhase::Failed)
            | (TurnPhase::BackendCall, TurnPhase::Rendering)
            | (TurnPhase::BackendCall, TurnPhase::Failed)
            | (TurnPhase::Rendering, TurnPhase::Committed)
            | (TurnPhase::Rendering, TurnPhase::Failed)
    )
}

/// Phase tracker for one submission.
#[derive(Debug)]
pub struct Turn {
    phase: TurnPhase,
}

impl Turn {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Idle,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Advance to the next phase. Transitions are hard-coded at the call
    /// sites, so an invalid one is a programming error.
    pub fn advance(&mut self, to: TurnPhase) {
        debug_assert!(
            is_valid_transition(self.phase, to),
            "invalid turn transition {:?} -> {:?}",
            self.phase,
            to
        );
        tracing::trace!(from = ?self.phase, to = ?to, "turn transition");
        self.phase = to;
    }
}

impl Default for Turn {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TurnDispatcher
// =============================================================================

/// Result of a dispatch that did not fail.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Empty input: nothing was submitted, nothing changed.
    Ignored,
    /// Backend and renderer succeeded; the reply is ready to commit.
    Completed(RenderedReply),
}

/// Drives one submission through validation, the backend call, and rendering.
pub struct TurnDispatcher {
    backend: Box<dyn ResponseBackend>,
    max_message_chars: usize,
}

impl TurnDispatcher {
    pub fn new(backend: Box<dyn ResponseBackend>, max_message_chars: usize) -> Self {
        Self {
            backend,
            max_message_chars,
        }
    }

    /// Run one turn up to (not including) the log commit.
    ///
    /// `mode` is the dispatch-time snapshot. On any failure the turn moves to
    /// `Failed` and the phase error is returned carrying the underlying error
    /// text; the caller commits nothing.
    pub fn dispatch(
        &self,
        turn: &mut Turn,
        mode: Mode,
        input: &str,
    ) -> Result<TurnOutcome, ChatError> {
        let message = input.trim();
        if message.is_empty() {
            // No submission; stay idle.
            return Ok(TurnOutcome::Ignored);
        }
        turn.advance(TurnPhase::AwaitingInput);

        if message.chars().count() > self.max_message_chars {
            turn.advance(TurnPhase::Failed);
            return Err(ChatError::MessageTooLong(self.max_message_chars));
        }

        turn.advance(TurnPhase::BackendCall);
        tracing::info!(
            mode = ?mode,
            chars = message.chars().count(),
            "dispatching message to backend"
        );
        let response = match self.backend.respond(message) {
            Ok(response) => response,
            Err(e) => {
                turn.advance(TurnPhase::Failed);
                return Err(ChatError::BackendCall(e.to_string()));
            }
        };

        turn.advance(TurnPhase::Rendering);
        let reply = match render_reply(mode, &response) {
            Ok(reply) => reply,
            Err(e) => {
                turn.advance(TurnPhase::Failed);
                return Err(e);
            }
        };

        Ok(TurnOutcome::Completed(reply))
    }
}

// =============================================================================
// Tests
// =============================================================================
